//! Silence growth over time-in-system buckets.

use super::{ViewContent, chart};
use crate::api::TemporalBucket;

pub const SLOTS: &[(&str, &str)] = &[("temporal", "Silence Over Time")];

pub fn content(rows: &[TemporalBucket]) -> ViewContent {
    let summary = match (rows.first(), rows.last()) {
        (Some(first), Some(last)) if rows.len() > 1 => vec![format!(
            "Silenced share moves from {:.1}% ({}) to {:.1}% ({})",
            first.silenced_pct, first.time_bucket, last.silenced_pct, last.time_bucket
        )],
        (Some(only), _) => vec![format!(
            "{:.1}% silenced in {}",
            only.silenced_pct, only.time_bucket
        )],
        _ => vec!["No temporal data.".to_string()],
    };

    let charts = chart(
        "temporal",
        "line",
        "Silenced % by Days in System",
        "Silenced %",
        rows.iter().map(|r| (r.time_bucket.clone(), r.silenced_pct)),
    )
    .into_iter()
    .collect();

    ViewContent { summary, charts }
}
