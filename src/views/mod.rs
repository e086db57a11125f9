//! Dashboard and analytics views.
//!
//! Each view is `fetch → transform → render` with no state of its own:
//! [`fetch`] runs on a worker, [`ViewData::content`] turns the payload into
//! summary lines and chart specs, and [`apply`] pushes them into the Chart
//! Registry if the screen that asked is still on display.

pub mod categories;
pub mod demographics;
pub mod geography;
pub mod overview;
pub mod temporal;

use crate::activity::ActivityLog;
use crate::api::{ApiError, Backend, CategoryStat, Demographics, Geography, Stats, TemporalBucket};
use crate::charts::registry::RenderError;
use crate::charts::{ChartRegistry, ChartSpec, ChartSurface, RenderOutcome, SlotId};
use crate::nav::{Navigator, Screen, ScreenVisit};

/// Payload of one screen refresh.
#[derive(Debug, Clone)]
pub enum ViewData {
    Overview(Stats),
    Demographics(Demographics),
    Geography(Geography),
    Categories(Vec<CategoryStat>),
    Temporal(Vec<TemporalBucket>),
}

/// What a view wants shown.
#[derive(Debug, Default)]
pub struct ViewContent {
    pub summary: Vec<String>,
    pub charts: Vec<(SlotId, ChartSpec)>,
}

#[derive(Debug, Default)]
pub struct ViewReport {
    pub summary: Vec<String>,
    pub rendered: Vec<SlotId>,
    pub detached: Vec<SlotId>,
    pub failed: Vec<(SlotId, RenderError)>,
}

#[derive(Debug)]
pub enum RefreshOutcome {
    Shown(ViewReport),
    Failed(ApiError),
    /// The user navigated away before the data arrived.
    Stale,
}

/// Chart slots (and panel headings) owned by `screen`.
pub fn slots(screen: Screen) -> &'static [(&'static str, &'static str)] {
    match screen {
        Screen::Demographics => demographics::SLOTS,
        Screen::Geography => geography::SLOTS,
        Screen::Categories => categories::SLOTS,
        Screen::Temporal => temporal::SLOTS,
        _ => &[],
    }
}

/// Blocking backend call for `screen`'s refresh. `None` for screens that
/// fetch nothing on selection.
pub fn fetch(
    backend: &dyn Backend,
    screen: Screen,
    top_n: u32,
) -> Option<Result<ViewData, ApiError>> {
    let result = match screen {
        Screen::Dashboard => backend.stats().map(ViewData::Overview),
        Screen::Demographics => backend.demographics().map(ViewData::Demographics),
        Screen::Geography => backend.geography(top_n).map(ViewData::Geography),
        Screen::Categories => backend.complaint_types().map(ViewData::Categories),
        Screen::Temporal => backend.temporal_decay().map(ViewData::Temporal),
        Screen::Search | Screen::Chat | Screen::Investigate => return None,
    };
    Some(result)
}

impl ViewData {
    pub fn content(&self) -> ViewContent {
        match self {
            ViewData::Overview(stats) => overview::content(stats),
            ViewData::Demographics(d) => demographics::content(d),
            ViewData::Geography(g) => geography::content(g),
            ViewData::Categories(rows) => categories::content(rows),
            ViewData::Temporal(rows) => temporal::content(rows),
        }
    }
}

/// Apply a refresh result for `visit`.
pub fn apply<S: ChartSurface>(
    nav: &Navigator,
    visit: &ScreenVisit,
    charts: &mut ChartRegistry<S>,
    result: Result<ViewData, ApiError>,
    log: &ActivityLog,
) -> RefreshOutcome {
    if !nav.is_current(visit) {
        log.discarded(
            "view",
            visit.screen.id(),
            "screen is no longer active",
        );
        return RefreshOutcome::Stale;
    }

    let data = match result {
        Ok(data) => data,
        Err(e) => return RefreshOutcome::Failed(e),
    };

    let content = data.content();
    let mut report = ViewReport {
        summary: content.summary,
        ..ViewReport::default()
    };
    for (slot, spec) in content.charts {
        match charts.render(&slot, &spec) {
            Ok(RenderOutcome::Rendered) => {
                charts.show(&slot);
                report.rendered.push(slot);
            }
            Ok(RenderOutcome::Detached) => {
                log.discarded("chart", slot.as_str(), "panel no longer mounted");
                report.detached.push(slot);
            }
            Err(e) => report.failed.push((slot, e)),
        }
    }
    RefreshOutcome::Shown(report)
}

/// Build a one-series chart; views never produce misaligned series, so a
/// failure just drops the chart.
pub(crate) fn chart(
    slot: &str,
    kind: &str,
    title: &str,
    series: &str,
    points: impl IntoIterator<Item = (String, f64)>,
) -> Option<(SlotId, ChartSpec)> {
    ChartSpec::single(kind, title, series, points)
        .ok()
        .map(|spec| (SlotId::new(slot), spec))
}
