//! Most-silenced wards.

use super::{ViewContent, chart};
use crate::api::Geography;
use crate::utils::format::{format_number, truncate};

pub const SLOTS: &[(&str, &str)] = &[("wards", "Most Silenced Wards")];

pub fn content(g: &Geography) -> ViewContent {
    let summary = if g.top_silenced.is_empty() {
        vec!["No ward data.".to_string()]
    } else {
        let mut lines = vec![format!(
            "{:<4} {:<24} {:>10} {:>10} {:>8}",
            "#", "Ward", "Avg score", "Silenced", "Count"
        )];
        lines.extend(g.top_silenced.iter().enumerate().map(|(i, w)| {
            format!(
                "{:<4} {:<24} {:>10.1} {:>9.1}% {:>8}",
                i + 1,
                truncate(&w.ward, 24),
                w.avg_silence,
                w.silenced_pct,
                format_number(w.count)
            )
        }));
        lines
    };

    let charts = chart(
        "wards",
        "horizontalBar",
        "Avg Silence Score by Ward",
        "Avg silence",
        g.top_silenced
            .iter()
            .map(|w| (w.ward.clone(), w.avg_silence)),
    )
    .into_iter()
    .collect();

    ViewContent { summary, charts }
}
