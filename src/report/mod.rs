//! Report Runner: the single-flight full investigation.
//!
//! The trigger is disabled from [`ReportRunner::trigger`] until the matching
//! [`ReportRunner::complete`], whatever the outcome. The console guarantees a
//! completion for every dispatched request, so the trigger can never stay
//! stuck.

use crate::api::{ApiError, Report};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportTicket(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum ReportPanel {
    Hidden,
    Running,
    Shown(Report),
    Error(String),
}

#[derive(Debug)]
pub struct ReportRunner {
    pending: Option<ReportTicket>,
    panel: ReportPanel,
    seq: u64,
}

impl Default for ReportRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportRunner {
    pub fn new() -> Self {
        Self {
            pending: None,
            panel: ReportPanel::Hidden,
            seq: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.pending.is_none()
    }

    pub fn panel(&self) -> &ReportPanel {
        &self.panel
    }

    /// Start an investigation. `None` while one is already running.
    pub fn trigger(&mut self) -> Option<ReportTicket> {
        if self.pending.is_some() {
            return None;
        }
        self.seq += 1;
        let ticket = ReportTicket(self.seq);
        self.pending = Some(ticket);
        self.panel = ReportPanel::Running;
        Some(ticket)
    }

    /// Finish the run. Re-enables the trigger in every outcome.
    pub fn complete(&mut self, ticket: ReportTicket, result: Result<Report, ApiError>) {
        if self.pending != Some(ticket) {
            return;
        }
        self.pending = None;
        self.panel = match result {
            Ok(report) => ReportPanel::Shown(report),
            Err(e) => ReportPanel::Error(e.to_string()),
        };
    }
}
