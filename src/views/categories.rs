//! Complaint categories.
//!
//! The backend sends rows sorted by `silenced_pct` descending; the first row
//! is the most ignored category and the last the least. Nothing here
//! re-sorts.

use super::{ViewContent, chart};
use crate::api::CategoryStat;

pub const SLOTS: &[(&str, &str)] = &[("categories", "Silenced % by Category")];

/// `(most ignored, least ignored)`.
pub fn extremes(rows: &[CategoryStat]) -> Option<(&CategoryStat, &CategoryStat)> {
    Some((rows.first()?, rows.last()?))
}

pub fn content(rows: &[CategoryStat]) -> ViewContent {
    let summary = match extremes(rows) {
        Some((most, least)) => vec![
            format!("Most ignored:  {} ({:.1}% silenced)", most.category, most.silenced_pct),
            format!("Least ignored: {} ({:.1}% silenced)", least.category, least.silenced_pct),
        ],
        None => vec!["No category data.".to_string()],
    };

    let charts = chart(
        "categories",
        "bar",
        "Silenced % by Complaint Category",
        "Silenced %",
        rows.iter().map(|r| (r.category.clone(), r.silenced_pct)),
    )
    .into_iter()
    .collect();

    ViewContent { summary, charts }
}
