//! Summary statistics for the dashboard.

use super::ViewContent;
use crate::api::Stats;
use crate::utils::format::format_number;

/// Absolute number of silenced complaints: `round(total * rate / 100)`.
pub fn silenced_count(total: u64, rate: f64) -> u64 {
    (total as f64 * rate / 100.0).round().max(0.0) as u64
}

pub fn alert_text(rate: f64, silenced: u64) -> String {
    format!(
        "{rate:.1}% of complaints ({} cases) are being systematically ignored",
        format_number(silenced)
    )
}

pub fn content(stats: &Stats) -> ViewContent {
    let silenced = silenced_count(stats.total_complaints, stats.silence_rate);
    ViewContent {
        summary: vec![
            format!("Total complaints:   {}", format_number(stats.total_complaints)),
            format!("Silenced:           {}", format_number(silenced)),
            format!("Silence rate:       {:.1}%", stats.silence_rate),
            format!("Avg silence score:  {:.1}", stats.avg_silence_score),
            format!("Avg days in system: {:.1}", stats.avg_days_in_system),
            String::new(),
            format!("⚠ {}", alert_text(stats.silence_rate, silenced)),
        ],
        charts: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_derives_count_and_alert() {
        let stats = Stats {
            total_complaints: 10_000,
            total_silenced: None,
            silence_rate: 42.5,
            avg_silence_score: 61.0,
            avg_days_in_system: 37.8,
        };
        assert_eq!(silenced_count(stats.total_complaints, stats.silence_rate), 4250);

        let content = content(&stats);
        assert_eq!(
            content.summary.last().map(String::as_str),
            Some("⚠ 42.5% of complaints (4,250 cases) are being systematically ignored")
        );
        assert!(content.charts.is_empty());
    }

    #[test]
    fn silenced_count_rounds_half_up() {
        assert_eq!(silenced_count(3, 50.0), 2);
        assert_eq!(silenced_count(0, 42.5), 0);
    }
}
