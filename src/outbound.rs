//! Collaborator seams between the core and the outside world: outbound
//! delivery and chart rendering. The executor only ever talks to these
//! traits; failures behind them are logged, never retried.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::keyboard::ReplySpec;

/// Pushes content to a remote chat. Every send carries the keyboard the
/// recipient should see afterwards.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, user_id: &str, text: &str, keyboard: ReplySpec) -> Result<()>;

    async fn send_image(
        &self,
        user_id: &str,
        filename: &str,
        png: Vec<u8>,
        keyboard: ReplySpec,
    ) -> Result<()>;

    async fn send_file(&self, user_id: &str, path: &Path, keyboard: ReplySpec) -> Result<()>;
}

/// One user's cumulative count-over-time line.
#[derive(Clone, Debug, PartialEq)]
pub struct UserSeries {
    pub label: String,
    pub points: Vec<(NaiveDateTime, u64)>,
}

/// One user's (weekday, fractional hour) scatter points, Monday = 0.
#[derive(Clone, Debug, PartialEq)]
pub struct UserScatter {
    pub label: String,
    pub points: Vec<(u32, f64)>,
}

/// Renders the per-user series into an image byte stream.
pub trait ChartRenderer: Send + Sync {
    fn render_cumulative(&self, series: &[UserSeries], title: &str) -> Result<Vec<u8>>;

    fn render_per_hour(&self, series: &[UserScatter], title: &str) -> Result<Vec<u8>>;
}
