//! Aggregate views over the ledger: monthly leaderboards and the series
//! fed to the chart renderer. All functions here are pure.

use chrono::{DateTime, Datelike, Local, NaiveDateTime, Timelike};

use crate::domain::{DateRange, DrinkKind, Ledger};

/// Per-user event counts for the calendar month of `as_of`, sorted by count
/// descending. Ties keep the incoming order (sort is stable).
pub fn monthly_counts(
    ledger: &Ledger,
    kind: DrinkKind,
    as_of: DateTime<Local>,
) -> Vec<(String, usize)> {
    let range = DateRange::Month {
        year: as_of.year(),
        month: as_of.month(),
    };
    let mut counts: Vec<(String, usize)> = ledger
        .values()
        .map(|user| {
            let count = user.events(kind).iter().filter(|ts| range.contains(ts)).count();
            (user.name.clone(), count)
        })
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// The leaderboard text sent alongside most replies: the drink emoji on its
/// own line, then one `name: count` line per user.
pub fn summary_text(ledger: &Ledger, kind: DrinkKind, as_of: DateTime<Local>) -> String {
    let lines: Vec<String> = monthly_counts(ledger, kind, as_of)
        .into_iter()
        .map(|(name, count)| format!("{}: {}", name, count))
        .collect();
    format!("{}\n{}", kind.emoji(), lines.join("\n"))
}

/// Events falling inside the given range, in their original order.
pub fn filter_range(events: &[DateTime<Local>], range: DateRange) -> Vec<DateTime<Local>> {
    events.iter().filter(|ts| range.contains(ts)).copied().collect()
}

/// Running count over time, one point per event.
pub fn cumulative_series(events: &[DateTime<Local>]) -> Vec<(NaiveDateTime, u64)> {
    events
        .iter()
        .enumerate()
        .map(|(i, ts)| (ts.naive_local(), (i + 1) as u64))
        .collect()
}

/// (weekday, fractional hour) points for the time-of-day scatter chart.
/// Weekdays are numbered from Monday = 0.
pub fn hour_of_day_scatter(events: &[DateTime<Local>]) -> Vec<(u32, f64)> {
    events
        .iter()
        .map(|ts| {
            let hour = ts.hour() as f64
                + ts.minute() as f64 / 60.0
                + ts.second() as f64 / (60.0 * 60.0);
            (ts.weekday().num_days_from_monday(), hour)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, User};
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;

    fn ledger_with(users: Vec<(&str, User)>) -> Ledger {
        users
            .into_iter()
            .map(|(id, user)| (id.to_string(), user))
            .collect::<HashMap<_, _>>()
    }

    #[test]
    fn test_monthly_counts_filters_and_sorts() {
        let now = Local::now();
        let last_month = now - Duration::days(40);

        let mut a = User::new("A", Role::User);
        for _ in 0..3 {
            a.record(DrinkKind::Coffee, now);
        }
        a.record(DrinkKind::Coffee, last_month);

        let mut b = User::new("B", Role::User);
        b.record(DrinkKind::Coffee, now);

        let ledger = ledger_with(vec![("1", a), ("2", b)]);
        let counts = monthly_counts(&ledger, DrinkKind::Coffee, now);
        assert_eq!(counts, vec![("A".to_string(), 3), ("B".to_string(), 1)]);
    }

    #[test]
    fn test_monthly_counts_ignores_other_drink() {
        let now = Local::now();
        let mut a = User::new("A", Role::User);
        a.record(DrinkKind::Tea, now);
        let ledger = ledger_with(vec![("1", a)]);
        assert_eq!(
            monthly_counts(&ledger, DrinkKind::Coffee, now),
            vec![("A".to_string(), 0)]
        );
        assert_eq!(
            monthly_counts(&ledger, DrinkKind::Tea, now),
            vec![("A".to_string(), 1)]
        );
    }

    #[test]
    fn test_summary_text_layout() {
        let now = Local::now();
        let mut a = User::new("Alice", Role::User);
        a.record(DrinkKind::Coffee, now);
        let ledger = ledger_with(vec![("1", a)]);
        let text = summary_text(&ledger, DrinkKind::Coffee, now);
        assert!(text.starts_with("\u{2615}\n"));
        assert!(text.contains("Alice: 1"));
    }

    #[test]
    fn test_cumulative_series_counts_up() {
        let base = Local.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let events = vec![base, base + Duration::hours(1), base + Duration::hours(2)];
        let series = cumulative_series(&events);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].1, 1);
        assert_eq!(series[2].1, 3);
        assert_eq!(series[2].0, (base + Duration::hours(2)).naive_local());
    }

    #[test]
    fn test_filter_range_by_month() {
        let march = Local.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let april = Local.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap();
        let events = vec![march, april];

        let range = DateRange::Month { year: 2026, month: 3 };
        assert_eq!(filter_range(&events, range), vec![march]);
        assert_eq!(filter_range(&events, DateRange::All), events);
    }

    #[test]
    fn test_hour_of_day_scatter_points() {
        // 2026-03-09 is a Monday
        let monday = Local.with_ymd_and_hms(2026, 3, 9, 14, 30, 0).unwrap();
        let points = hour_of_day_scatter(&[monday]);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].0, 0);
        assert!((points[0].1 - 14.5).abs() < 1e-9);
    }
}
