//! Chart rendering with plotters: cumulative count lines and the
//! weekday/time-of-day scatter, drawn into an in-memory PNG.

use std::io::Cursor;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Duration, NaiveDateTime};
use plotters::coord::types::RangedDateTime;
use plotters::prelude::*;

use crate::outbound::{ChartRenderer, UserScatter, UserSeries};

const CHART_WIDTH: u32 = 850;
const CHART_HEIGHT: u32 = 600;

const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Renders charts with the plotters bitmap backend.
#[derive(Debug, Default)]
pub struct PlottersRenderer;

impl PlottersRenderer {
    pub fn new() -> Self {
        PlottersRenderer
    }
}

fn time_bounds(series: &[UserSeries]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let mut bounds: Option<(NaiveDateTime, NaiveDateTime)> = None;
    for s in series {
        for (ts, _) in &s.points {
            bounds = Some(match bounds {
                None => (*ts, *ts),
                Some((min, max)) => (min.min(*ts), max.max(*ts)),
            });
        }
    }
    bounds
}

fn encode_png(raw: Vec<u8>) -> Result<Vec<u8>> {
    let img = image::RgbImage::from_raw(CHART_WIDTH, CHART_HEIGHT, raw)
        .context("chart buffer has unexpected size")?;
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .context("Failed to encode chart as PNG")?;
    Ok(out.into_inner())
}

impl ChartRenderer for PlottersRenderer {
    fn render_cumulative(&self, series: &[UserSeries], title: &str) -> Result<Vec<u8>> {
        let (min_ts, max_ts) =
            time_bounds(series).ok_or_else(|| anyhow!("no points to plot"))?;
        // pad a single-point range so the axis stays non-degenerate
        let (min_ts, max_ts) = if min_ts == max_ts {
            (min_ts - Duration::hours(1), max_ts + Duration::hours(1))
        } else {
            (min_ts, max_ts)
        };
        let max_count = series
            .iter()
            .flat_map(|s| s.points.iter().map(|(_, c)| *c))
            .max()
            .unwrap_or(1);

        let mut raw = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
        {
            let root =
                BitMapBackend::with_buffer(&mut raw, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
            root.fill(&WHITE).map_err(|e| anyhow!("chart fill failed: {e}"))?;

            let mut chart = ChartBuilder::on(&root)
                .caption(title, ("sans-serif", 24))
                .margin(10)
                .x_label_area_size(60)
                .y_label_area_size(50)
                .build_cartesian_2d(RangedDateTime::from(min_ts..max_ts), 0u64..max_count + 1)
                .map_err(|e| anyhow!("chart setup failed: {e}"))?;
            chart
                .configure_mesh()
                .x_desc("date")
                .y_desc("#coffees")
                .x_labels(6)
                .draw()
                .map_err(|e| anyhow!("chart mesh failed: {e}"))?;

            for (idx, s) in series.iter().enumerate() {
                let color = Palette99::pick(idx);
                chart
                    .draw_series(LineSeries::new(
                        s.points.iter().map(|(ts, count)| (*ts, *count)),
                        color.stroke_width(2),
                    ))
                    .map_err(|e| anyhow!("chart series failed: {e}"))?
                    .label(s.label.clone())
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
                    });
            }

            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .position(SeriesLabelPosition::UpperRight)
                .draw()
                .map_err(|e| anyhow!("chart legend failed: {e}"))?;
            root.present().map_err(|e| anyhow!("chart present failed: {e}"))?;
        }
        encode_png(raw)
    }

    fn render_per_hour(&self, series: &[UserScatter], title: &str) -> Result<Vec<u8>> {
        if series.iter().all(|s| s.points.is_empty()) {
            bail!("no points to plot");
        }

        let mut raw = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
        {
            let root =
                BitMapBackend::with_buffer(&mut raw, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
            root.fill(&WHITE).map_err(|e| anyhow!("chart fill failed: {e}"))?;

            let mut chart = ChartBuilder::on(&root)
                .caption(title, ("sans-serif", 24))
                .margin(10)
                .x_label_area_size(60)
                .y_label_area_size(50)
                // y axis runs downwards, morning at the top
                .build_cartesian_2d(-0.5f64..6.5f64, 24.0f64..0.0f64)
                .map_err(|e| anyhow!("chart setup failed: {e}"))?;
            chart
                .configure_mesh()
                .x_desc("day of week")
                .y_desc("time of day")
                .x_labels(7)
                .x_label_formatter(&|x| {
                    let idx = x.round() as i64;
                    if (0..7).contains(&idx) {
                        WEEKDAY_LABELS[idx as usize].to_string()
                    } else {
                        String::new()
                    }
                })
                .y_labels(24)
                .draw()
                .map_err(|e| anyhow!("chart mesh failed: {e}"))?;

            for (idx, s) in series.iter().enumerate() {
                let color = Palette99::pick(idx);
                chart
                    .draw_series(
                        s.points
                            .iter()
                            .map(|(weekday, hour)| {
                                Cross::new((*weekday as f64, *hour), 5, color.stroke_width(2))
                            }),
                    )
                    .map_err(|e| anyhow!("chart series failed: {e}"))?
                    .label(s.label.clone())
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
                    });
            }

            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .position(SeriesLabelPosition::UpperRight)
                .draw()
                .map_err(|e| anyhow!("chart legend failed: {e}"))?;
            root.present().map_err(|e| anyhow!("chart present failed: {e}"))?;
        }
        encode_png(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cumulative_series_is_an_error() {
        let renderer = PlottersRenderer::new();
        assert!(renderer.render_cumulative(&[], "title").is_err());
        let empty = UserSeries {
            label: "A".to_string(),
            points: vec![],
        };
        assert!(renderer.render_cumulative(&[empty], "title").is_err());
    }

    #[test]
    fn test_empty_scatter_is_an_error() {
        let renderer = PlottersRenderer::new();
        assert!(renderer.render_per_hour(&[], "title").is_err());
    }

    #[test]
    fn test_cumulative_chart_renders_to_png() {
        let base = chrono::NaiveDate::from_ymd_opt(2026, 3, 9)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let series = vec![
            UserSeries {
                label: "Alice".to_string(),
                points: vec![(base, 1), (base + Duration::hours(4), 2)],
            },
            UserSeries {
                label: "Bob".to_string(),
                points: vec![(base + Duration::hours(1), 1)],
            },
        ];
        let png = PlottersRenderer::new()
            .render_cumulative(&series, "coffee counts over time")
            .unwrap();
        assert_eq!(&png[..4], &[0x89, 0x50, 0x4e, 0x47]);
    }

    #[test]
    fn test_single_point_series_renders() {
        let ts = chrono::NaiveDate::from_ymd_opt(2026, 3, 9)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let series = vec![UserSeries {
            label: "Alice".to_string(),
            points: vec![(ts, 1)],
        }];
        assert!(PlottersRenderer::new()
            .render_cumulative(&series, "coffee counts over time")
            .is_ok());
    }

    #[test]
    fn test_time_bounds_span_all_series() {
        let early = chrono::NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let late = chrono::NaiveDate::from_ymd_opt(2026, 3, 20)
            .unwrap()
            .and_hms_opt(17, 0, 0)
            .unwrap();
        let series = vec![
            UserSeries {
                label: "A".to_string(),
                points: vec![(late, 1)],
            },
            UserSeries {
                label: "B".to_string(),
                points: vec![(early, 1)],
            },
        ];
        assert_eq!(time_bounds(&series), Some((early, late)));
    }
}
