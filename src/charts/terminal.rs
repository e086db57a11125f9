/// Text rendering surface for the console.
///
/// Every slot is a panel with a title, a visibility flag and at most one
/// mounted chart. Cartesian kinds render as horizontal bars against a value
/// axis, one bar per series or a single segmented bar when stacked; pie and
/// doughnut render as percentage shares with no axes.
use std::collections::BTreeMap;

use colored::{ColoredString, Colorize};

use super::registry::{ChartSurface, RenderError};
use super::{AxisPolicy, ChartConfig, ChartKind, Dataset, SlotId};
use crate::utils::format::{format_value, truncate};

const LABEL_WIDTH: usize = 16;

#[derive(Debug, Clone)]
struct Panel {
    heading: String,
    visible: bool,
    instance: Option<u64>,
    lines: Vec<String>,
}

#[derive(Debug)]
pub struct TerminalSurface {
    panels: BTreeMap<SlotId, Panel>,
    bar_width: usize,
    next_instance: u64,
}

impl TerminalSurface {
    pub fn new(bar_width: usize) -> Self {
        Self {
            panels: BTreeMap::new(),
            bar_width: bar_width.max(4),
            next_instance: 0,
        }
    }

    /// Create an empty panel for `slot`.
    pub fn add_panel(&mut self, slot: SlotId, heading: &str, visible: bool) {
        self.panels.insert(
            slot,
            Panel {
                heading: heading.to_string(),
                visible,
                instance: None,
                lines: Vec::new(),
            },
        );
    }

    /// Tear a panel down; any chart it hosted goes with it.
    #[cfg(test)]
    pub fn remove_panel(&mut self, slot: &SlotId) -> bool {
        self.panels.remove(slot).is_some()
    }

    pub fn is_visible(&self, slot: &SlotId) -> bool {
        self.panels.get(slot).is_some_and(|p| p.visible)
    }

    /// Rendered lines of a visible, populated panel.
    pub fn lines(&self, slot: &SlotId) -> Option<&[String]> {
        self.panels
            .get(slot)
            .filter(|p| p.visible && p.instance.is_some())
            .map(|p| p.lines.as_slice())
    }

    /// Slots that currently show a chart, in name order.
    pub fn visible_slots(&self) -> Vec<(&SlotId, &str)> {
        self.panels
            .iter()
            .filter(|(_, p)| p.visible && p.instance.is_some())
            .map(|(slot, p)| (slot, p.heading.as_str()))
            .collect()
    }

    pub fn live_instances(&self) -> usize {
        self.panels.values().filter(|p| p.instance.is_some()).count()
    }

    fn draw(&self, config: &ChartConfig) -> Result<Vec<String>, RenderError> {
        if config.kind.kind == ChartKind::Unrecognized {
            return Err(RenderError::UnsupportedKind(config.kind.name.clone()));
        }

        let mut lines = vec![config.title.bold().to_string()];
        match config.kind.axes {
            AxisPolicy::Suppressed => lines.extend(self.draw_shares(config)),
            AxisPolicy::CategoryAndValue => lines.extend(self.draw_bars(config)),
        }
        Ok(lines)
    }

    fn draw_bars(&self, config: &ChartConfig) -> Vec<String> {
        let stacked = config.stacked && config.datasets.len() > 1;
        let stack_total = |i: usize| -> f64 {
            config
                .datasets
                .iter()
                .map(|d| value_at(d, i).max(0.0))
                .sum()
        };
        let max = if stacked {
            (0..config.labels.len())
                .map(stack_total)
                .fold(0.0_f64, f64::max)
        } else {
            config
                .datasets
                .iter()
                .flat_map(|d| d.values.iter().copied())
                .fold(0.0_f64, f64::max)
        };
        let scale = if max > 0.0 { max } else { 1.0 };
        let cells = |value: f64| ((value.max(0.0) / scale) * self.bar_width as f64).round() as usize;

        let mut lines = Vec::new();
        for (i, label) in config.labels.iter().enumerate() {
            if stacked {
                let bar: String = config
                    .datasets
                    .iter()
                    .map(|d| paint(&"█".repeat(cells(value_at(d, i))), d.color).to_string())
                    .collect();
                lines.push(format!(
                    "  {:<width$} {} {}",
                    truncate(label, LABEL_WIDTH),
                    bar,
                    format_value(stack_total(i)),
                    width = LABEL_WIDTH
                ));
                continue;
            }

            for (j, dataset) in config.datasets.iter().enumerate() {
                let value = value_at(dataset, i);
                let head = if j == 0 {
                    truncate(label, LABEL_WIDTH)
                } else {
                    String::new()
                };
                lines.push(format!(
                    "  {:<width$} {} {}",
                    head,
                    paint(&"█".repeat(cells(value).max(1)), dataset.color),
                    format_value(value),
                    width = LABEL_WIDTH
                ));
            }
        }

        lines.push(format!(
            "  {:<width$} 0{}{}",
            "",
            "─".repeat(self.bar_width.saturating_sub(1)),
            format_value(max),
            width = LABEL_WIDTH
        ));

        if config.datasets.len() > 1 {
            let legend: Vec<String> = config
                .datasets
                .iter()
                .map(|d| format!("{} {}", paint("■", d.color), d.name))
                .collect();
            lines.push(format!("  {}", legend.join("  ")));
        }
        lines
    }

    fn draw_shares(&self, config: &ChartConfig) -> Vec<String> {
        let Some(dataset) = config.datasets.first() else {
            return Vec::new();
        };
        let total: f64 = dataset.values.iter().map(|v| v.max(0.0)).sum();

        config
            .labels
            .iter()
            .zip(&dataset.values)
            .enumerate()
            .map(|(i, (label, value))| {
                let pct = if total > 0.0 {
                    value.max(0.0) / total * 100.0
                } else {
                    0.0
                };
                let color = config.segment_colors.get(i).copied().unwrap_or("#ffffff");
                format!(
                    "  {} {:<width$} {:>5.1}%  ({})",
                    paint("●", color),
                    truncate(label, LABEL_WIDTH),
                    pct,
                    format_value(*value),
                    width = LABEL_WIDTH
                )
            })
            .collect()
    }
}

impl ChartSurface for TerminalSurface {
    type Instance = u64;

    fn has_slot(&self, slot: &SlotId) -> bool {
        self.panels.contains_key(slot)
    }

    fn mount(&mut self, slot: &SlotId, config: &ChartConfig) -> Result<u64, RenderError> {
        let lines = self.draw(config)?;
        self.next_instance += 1;
        let id = self.next_instance;

        let panel = self
            .panels
            .get_mut(slot)
            .ok_or_else(|| RenderError::MissingSurface(slot.to_string()))?;
        if panel.instance.is_some() {
            return Err(RenderError::SlotOccupied(slot.to_string()));
        }
        panel.instance = Some(id);
        panel.lines = lines;
        Ok(id)
    }

    fn dispose(&mut self, slot: &SlotId, instance: u64) {
        if let Some(panel) = self.panels.get_mut(slot)
            && panel.instance == Some(instance)
        {
            panel.instance = None;
            panel.lines.clear();
        }
    }

    fn set_visible(&mut self, slot: &SlotId, visible: bool) {
        if let Some(panel) = self.panels.get_mut(slot) {
            panel.visible = visible;
        }
    }
}

fn value_at(dataset: &Dataset, i: usize) -> f64 {
    dataset.values.get(i).copied().unwrap_or(0.0)
}

/// Colour text with a `#rrggbb` palette entry.
fn paint(text: &str, hex: &str) -> ColoredString {
    match parse_hex(hex) {
        Some((r, g, b)) => text.truecolor(r, g, b),
        None => text.normal(),
    }
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}
