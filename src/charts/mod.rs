//! Chart model: specs, kinds, axis policy and series colours.
//!
//! A [`ChartSpec`] is a backend-agnostic description of a visualization:
//! a kind name, a title, ordered labels and one or more numeric series
//! aligned with those labels. Specs are either built locally by the
//! analytics views or converted from the Chart.js-shaped payload the chat
//! backend returns ([`WireChart`]).
//!
//! Kind names resolve through one closed table ([`resolve_kind`]) so the
//! "pie and doughnut have no axes" rule lives in exactly one place. Unknown
//! kinds are passed through untouched; whether they render is the surface's
//! call.

pub mod registry;
pub mod terminal;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use registry::{ChartRegistry, ChartSurface, RenderOutcome};
pub use terminal::TerminalSurface;

/// Fixed series palette. Colours cycle once a chart has more series (or pie
/// segments) than entries.
pub const PALETTE: [&str; 12] = [
    "#00d4ff", "#ff6b6b", "#ffb700", "#00ff88", "#a855f7", "#f97316", "#ec4899", "#14b8a6",
    "#6366f1", "#eab308", "#ef4444", "#22d3ee",
];

/// Colour for the series (or segment) at `index`.
pub fn series_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// Name of a rendering target that hosts at most one live chart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(String);

impl SlotId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The slot the chat orchestrator renders backend-supplied charts into.
    pub fn dynamic() -> Self {
        Self::new(DYNAMIC_SLOT)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const DYNAMIC_SLOT: &str = "dynamic";

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Doughnut,
    PolarArea,
    Radar,
    /// Anything not in the table; rendered (or refused) by the surface.
    Unrecognized,
}

/// Which axes a kind draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisPolicy {
    /// Category axis plus value axis.
    CategoryAndValue,
    /// No numeric axes (pie, doughnut).
    Suppressed,
}

/// Closed lookup from wire kind name to kind and axis policy.
const KIND_TABLE: &[(&str, ChartKind, AxisPolicy)] = &[
    ("bar", ChartKind::Bar, AxisPolicy::CategoryAndValue),
    ("horizontalBar", ChartKind::Bar, AxisPolicy::CategoryAndValue),
    ("grouped", ChartKind::Bar, AxisPolicy::CategoryAndValue),
    ("stacked", ChartKind::Bar, AxisPolicy::CategoryAndValue),
    ("line", ChartKind::Line, AxisPolicy::CategoryAndValue),
    ("pie", ChartKind::Pie, AxisPolicy::Suppressed),
    ("doughnut", ChartKind::Doughnut, AxisPolicy::Suppressed),
    ("polarArea", ChartKind::PolarArea, AxisPolicy::CategoryAndValue),
    ("radar", ChartKind::Radar, AxisPolicy::CategoryAndValue),
];

/// A kind name resolved through [`KIND_TABLE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKind {
    /// The name as supplied, preserved for pass-through.
    pub name: String,
    pub kind: ChartKind,
    pub axes: AxisPolicy,
}

pub fn resolve_kind(name: &str) -> ResolvedKind {
    let found = KIND_TABLE
        .iter()
        .find(|(key, _, _)| key.eq_ignore_ascii_case(name.trim()));

    match found {
        Some(&(_, kind, axes)) => ResolvedKind {
            name: name.to_string(),
            kind,
            axes,
        },
        None => ResolvedKind {
            name: name.to_string(),
            kind: ChartKind::Unrecognized,
            axes: AxisPolicy::CategoryAndValue,
        },
    }
}

// ---------------------------------------------------------------------------
// Specs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartSpecError {
    #[error("chart has no data series")]
    NoSeries,
    #[error("series '{series}' has {values} values for {labels} labels")]
    MisalignedSeries {
        series: String,
        values: usize,
        labels: usize,
    },
}

/// One named numeric sequence, positionally aligned with the labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Validated chart description.
///
/// Construction enforces `labels.len() == series[i].values.len()` for every
/// series, so a spec that exists is always renderable shape-wise.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    kind: String,
    title: String,
    labels: Vec<String>,
    series: Vec<Series>,
    stacked: bool,
}

impl ChartSpec {
    pub fn new(
        kind: impl Into<String>,
        title: impl Into<String>,
        labels: Vec<String>,
        series: Vec<Series>,
    ) -> Result<Self, ChartSpecError> {
        if series.is_empty() {
            return Err(ChartSpecError::NoSeries);
        }
        if let Some(bad) = series.iter().find(|s| s.values.len() != labels.len()) {
            return Err(ChartSpecError::MisalignedSeries {
                series: bad.name.clone(),
                values: bad.values.len(),
                labels: labels.len(),
            });
        }

        Ok(Self {
            kind: kind.into(),
            title: title.into(),
            labels,
            series,
            stacked: false,
        })
    }

    /// Convenience for the common one-series case.
    pub fn single(
        kind: &str,
        title: &str,
        series_name: &str,
        points: impl IntoIterator<Item = (String, f64)>,
    ) -> Result<Self, ChartSpecError> {
        let (labels, values): (Vec<String>, Vec<f64>) = points.into_iter().unzip();
        Self::new(kind, title, labels, vec![Series::new(series_name, values)])
    }

    pub fn stacked(mut self, stacked: bool) -> Self {
        self.stacked = stacked;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn is_stacked(&self) -> bool {
        self.stacked
    }
}

// ---------------------------------------------------------------------------
// Resolved configuration handed to surfaces
// ---------------------------------------------------------------------------

/// A series with its assigned colour.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub values: Vec<f64>,
    pub color: &'static str,
}

/// Everything a surface needs to draw one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub kind: ResolvedKind,
    pub title: String,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    /// Per-label colours, used by kinds that colour segments rather than
    /// series.
    pub segment_colors: Vec<&'static str>,
    /// Series share one bar per label instead of one bar each.
    pub stacked: bool,
}

impl ChartConfig {
    pub fn from_spec(spec: &ChartSpec) -> Self {
        let datasets = spec
            .series
            .iter()
            .enumerate()
            .map(|(i, s)| Dataset {
                name: s.name.clone(),
                values: s.values.clone(),
                color: series_color(i),
            })
            .collect();

        Self {
            kind: resolve_kind(&spec.kind),
            title: spec.title.clone(),
            labels: spec.labels.clone(),
            datasets,
            segment_colors: (0..spec.labels.len()).map(series_color).collect(),
            stacked: spec.stacked,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire format (Chart.js-shaped)
// ---------------------------------------------------------------------------

/// Chart payload as the chat backend sends it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireChart {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub data: WireChartData,
    #[serde(default)]
    pub options: serde_json::Value,
}

fn default_kind() -> String {
    "bar".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireChartData {
    #[serde(default)]
    pub labels: Vec<serde_json::Value>,
    #[serde(default)]
    pub datasets: Vec<WireDataset>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireDataset {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub data: Vec<Option<f64>>,
}

impl TryFrom<WireChart> for ChartSpec {
    type Error = ChartSpecError;

    fn try_from(wire: WireChart) -> Result<Self, Self::Error> {
        let labels = wire.data.labels.iter().map(label_text).collect();
        let series = wire
            .data
            .datasets
            .into_iter()
            .enumerate()
            .map(|(i, ds)| Series {
                name: ds.label.unwrap_or_else(|| format!("Series {}", i + 1)),
                values: ds.data.into_iter().map(|v| v.unwrap_or(0.0)).collect(),
            })
            .collect();

        let stacked = wire.kind == "stacked"
            || ["/scales/x/stacked", "/scales/y/stacked"].iter().any(|axis| {
                wire.options
                    .pointer(axis)
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false)
            });
        let title = wire
            .title
            .or_else(|| {
                wire.options
                    .pointer("/plugins/title/text")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Analysis Chart".to_string());

        Ok(ChartSpec::new(wire.kind, title, labels, series)?.stacked(stacked))
    }
}

/// Labels are usually strings but numbers show up for bucketed axes.
fn label_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_table_suppresses_axes_for_pie_and_doughnut() {
        assert_eq!(resolve_kind("pie").axes, AxisPolicy::Suppressed);
        assert_eq!(resolve_kind("doughnut").axes, AxisPolicy::Suppressed);
        assert_eq!(resolve_kind("bar").axes, AxisPolicy::CategoryAndValue);
        assert_eq!(resolve_kind("line").axes, AxisPolicy::CategoryAndValue);
        assert_eq!(resolve_kind("polarArea").axes, AxisPolicy::CategoryAndValue);
    }

    #[test]
    fn unknown_kinds_pass_through() {
        let resolved = resolve_kind("sankey");
        assert_eq!(resolved.kind, ChartKind::Unrecognized);
        assert_eq!(resolved.name, "sankey");
        assert_eq!(resolved.axes, AxisPolicy::CategoryAndValue);
    }

    #[test]
    fn palette_cycles_past_its_length() {
        assert_eq!(series_color(0), PALETTE[0]);
        assert_eq!(series_color(PALETTE.len()), PALETTE[0]);
        assert_eq!(series_color(PALETTE.len() + 3), PALETTE[3]);
    }

    #[test]
    fn spec_rejects_misaligned_series() {
        let err = ChartSpec::new(
            "bar",
            "t",
            vec!["a".into(), "b".into()],
            vec![Series::new("s", vec![1.0])],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ChartSpecError::MisalignedSeries {
                series: "s".to_string(),
                values: 1,
                labels: 2
            }
        );
    }

    #[test]
    fn spec_rejects_empty_series_list() {
        assert_eq!(
            ChartSpec::new("bar", "t", vec![], vec![]),
            Err(ChartSpecError::NoSeries)
        );
    }

    #[test]
    fn config_assigns_colours_by_position() {
        let series = (0..14)
            .map(|i| Series::new(format!("s{i}"), vec![1.0]))
            .collect();
        let spec = ChartSpec::new("bar", "t", vec!["x".into()], series).unwrap();
        let config = ChartConfig::from_spec(&spec);
        assert_eq!(config.datasets[0].color, PALETTE[0]);
        assert_eq!(config.datasets[12].color, PALETTE[0]);
        assert_eq!(config.datasets[13].color, PALETTE[1]);
    }

    #[test]
    fn wire_chart_converts_to_spec() {
        let json = r#"{
            "type": "bar",
            "title": "Silence by Gender",
            "data": {"labels": ["F", "M"], "datasets": [{"label": "Avg Silence", "data": [61.2, null]}]},
            "options": {"indexAxis": "y", "scales": {"y": {"stacked": true}}}
        }"#;
        let wire: WireChart = serde_json::from_str(json).unwrap();
        let spec = ChartSpec::try_from(wire).unwrap();
        assert_eq!(spec.title(), "Silence by Gender");
        assert_eq!(spec.labels(), &["F".to_string(), "M".to_string()]);
        assert_eq!(spec.series()[0].values, vec![61.2, 0.0]);
        assert!(spec.is_stacked());
    }

    #[test]
    fn wire_chart_with_ragged_dataset_is_rejected() {
        let json = r#"{"type": "line", "data": {"labels": [1, 2, 3], "datasets": [{"data": [1, 2]}]}}"#;
        let wire: WireChart = serde_json::from_str(json).unwrap();
        assert!(matches!(
            ChartSpec::try_from(wire),
            Err(ChartSpecError::MisalignedSeries { .. })
        ));
    }
}
