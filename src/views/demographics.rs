//! Demographic breakdown: three charts plus ratio findings.
//!
//! A finding needs both operands present and a positive denominator;
//! otherwise it is left out.

use std::collections::BTreeMap;

use super::{ViewContent, chart};
use crate::api::types::{GroupStat, INCOME_BRACKETS};
use crate::api::Demographics;

pub const SLOTS: &[(&str, &str)] = &[
    ("gender", "Silence by Gender"),
    ("caste", "Silence by Caste"),
    ("income", "Silence by Income"),
];

/// A computed comparison between two groups.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub ratio: f64,
    pub text: String,
}

/// `numerator / denominator` on `avg_silence`, if both groups are present.
fn ratio(groups: &BTreeMap<String, GroupStat>, numerator: &str, denominator: &str) -> Option<f64> {
    let num = groups.get(numerator)?.avg_silence;
    let den = groups.get(denominator)?.avg_silence;
    (den > 0.0 && num.is_finite()).then(|| num / den)
}

pub fn findings(d: &Demographics) -> Vec<Finding> {
    let lowest = INCOME_BRACKETS[0];
    let highest = INCOME_BRACKETS[INCOME_BRACKETS.len() - 1];
    let mut found = Vec::new();

    if let Some(r) = ratio(&d.by_gender, "F", "M") {
        found.push(Finding {
            ratio: r,
            text: format!("Women's complaints are silenced {r:.2}x as much as men's"),
        });
    }
    if let Some(r) = ratio(&d.by_income, lowest, highest) {
        found.push(Finding {
            ratio: r,
            text: format!("The {lowest} income bracket is silenced {r:.2}x as much as {highest}"),
        });
    }
    if let Some(r) = ratio(&d.by_caste, "SC", "General") {
        found.push(Finding {
            ratio: r,
            text: format!("SC complainants are silenced {r:.2}x as much as General"),
        });
    }
    found
}

pub fn content(d: &Demographics) -> ViewContent {
    let points = |groups: &BTreeMap<String, GroupStat>| -> Vec<(String, f64)> {
        groups
            .iter()
            .map(|(k, v)| (k.clone(), v.avg_silence))
            .collect()
    };

    // income brackets in ascending order, unknown keys after them
    let mut income: Vec<(String, f64)> = INCOME_BRACKETS
        .iter()
        .filter_map(|k| d.by_income.get(*k).map(|v| (k.to_string(), v.avg_silence)))
        .collect();
    income.extend(
        d.by_income
            .iter()
            .filter(|(k, _)| !INCOME_BRACKETS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.avg_silence)),
    );

    let charts = [
        chart("gender", "doughnut", "Avg Silence by Gender", "Avg silence", points(&d.by_gender)),
        chart("caste", "bar", "Avg Silence by Caste", "Avg silence", points(&d.by_caste)),
        chart("income", "bar", "Avg Silence by Income", "Avg silence", income),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut summary: Vec<String> = findings(d).into_iter().map(|f| f.text).collect();
    if summary.is_empty() {
        summary.push("Not enough data for group comparisons.".to_string());
    }

    ViewContent { summary, charts }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(avg: f64) -> GroupStat {
        GroupStat {
            avg_silence: avg,
            count: 1,
            silenced_pct: 0.0,
        }
    }

    fn groups(entries: &[(&str, f64)]) -> BTreeMap<String, GroupStat> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), group(*v)))
            .collect()
    }

    #[test]
    fn all_three_findings_when_operands_present() {
        let d = Demographics {
            by_gender: groups(&[("F", 60.0), ("M", 40.0), ("O", 50.0)]),
            by_caste: groups(&[("SC", 70.0), ("General", 35.0)]),
            by_income: groups(&[("0-3L", 80.0), ("3-6L", 60.0), ("10L+", 40.0)]),
        };
        let f = findings(&d);
        assert_eq!(f.len(), 3);
        assert!((f[0].ratio - 1.5).abs() < 1e-9);
        assert!(f[0].text.contains("1.50x"));
        assert!((f[1].ratio - 2.0).abs() < 1e-9);
        assert!((f[2].ratio - 2.0).abs() < 1e-9);
    }

    #[test]
    fn missing_operand_omits_only_that_finding() {
        let d = Demographics {
            by_gender: groups(&[("F", 60.0)]),
            by_caste: groups(&[("SC", 70.0), ("General", 35.0)]),
            by_income: BTreeMap::new(),
        };
        let f = findings(&d);
        assert_eq!(f.len(), 1);
        assert!(f[0].text.starts_with("SC"));
    }

    #[test]
    fn zero_denominator_is_omitted() {
        let d = Demographics {
            by_gender: groups(&[("F", 60.0), ("M", 0.0)]),
            ..Demographics::default()
        };
        assert!(findings(&d).is_empty());
        assert_eq!(
            content(&d).summary,
            vec!["Not enough data for group comparisons.".to_string()]
        );
    }

    #[test]
    fn income_chart_uses_bracket_order() {
        let d = Demographics {
            by_income: groups(&[("10L+", 1.0), ("0-3L", 4.0), ("6-10L", 2.0), ("3-6L", 3.0)]),
            ..Demographics::default()
        };
        let content = content(&d);
        let (_, income) = content
            .charts
            .iter()
            .find(|(slot, _)| slot.as_str() == "income")
            .unwrap();
        assert_eq!(income.labels(), &["0-3L", "3-6L", "6-10L", "10L+"]);
    }
}
