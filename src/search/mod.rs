//! Search Controller: filtered semantic search over complaints.
//!
//! The results panel is always in exactly one state. Each query replaces
//! the previous one; a response for an older query is dropped.

use crate::activity::ActivityLog;
use crate::api::{ApiError, SearchQuery, SearchResults};
use crate::config::schema::SearchConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchPanel {
    Idle,
    /// The query was empty; ask for one.
    Prompt,
    Loading { query: String },
    Empty { query: String },
    Populated(SearchResults),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

#[derive(Debug)]
pub struct SearchController {
    panel: SearchPanel,
    seq: u64,
    top_k: u32,
    silenced_threshold: f64,
    log: ActivityLog,
}

impl SearchController {
    pub fn new(config: &SearchConfig, log: ActivityLog) -> Self {
        Self {
            panel: SearchPanel::Idle,
            seq: 0,
            top_k: config.top_k,
            silenced_threshold: config.silenced_threshold,
            log,
        }
    }

    pub fn panel(&self) -> &SearchPanel {
        &self.panel
    }

    /// Begin a search. `silenced_only` becomes a score threshold on the
    /// backend; nothing is filtered locally.
    pub fn search(&mut self, query: &str, silenced_only: bool) -> Option<(SearchTicket, SearchQuery)> {
        let query = query.trim();
        if query.is_empty() {
            self.panel = SearchPanel::Prompt;
            return None;
        }

        self.seq += 1;
        self.panel = SearchPanel::Loading {
            query: query.to_string(),
        };
        Some((
            SearchTicket(self.seq),
            SearchQuery {
                query: query.to_string(),
                top_k: self.top_k,
                silence_threshold: silenced_only.then_some(self.silenced_threshold),
            },
        ))
    }

    /// Apply a response. Returns `false` if a newer query superseded it.
    pub fn complete(&mut self, ticket: SearchTicket, result: Result<SearchResults, ApiError>) -> bool {
        if ticket.0 != self.seq {
            self.log
                .discarded("search", "results", "a newer query was issued");
            return false;
        }

        self.panel = match result {
            Ok(results) if results.results.is_empty() => {
                let query = match &self.panel {
                    SearchPanel::Loading { query } => query.clone(),
                    _ => results.query,
                };
                SearchPanel::Empty { query }
            }
            Ok(results) => SearchPanel::Populated(results),
            Err(e) => SearchPanel::Error(e.to_string()),
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SearchResult;

    fn controller() -> SearchController {
        SearchController::new(&SearchConfig::default(), ActivityLog::disabled())
    }

    #[test]
    fn empty_query_prompts_without_request() {
        let mut search = controller();
        assert!(search.search("   ", true).is_none());
        assert_eq!(search.panel(), &SearchPanel::Prompt);
    }

    #[test]
    fn silenced_only_sends_threshold() {
        let mut search = controller();
        let (_, query) = search.search("sewage", true).unwrap();
        assert_eq!(query.silence_threshold, Some(70.0));
        assert_eq!(query.top_k, 20);

        let (_, query) = search.search("sewage", false).unwrap();
        assert_eq!(query.silence_threshold, None);
    }

    #[test]
    fn zero_results_show_empty_state() {
        let mut search = controller();
        let (ticket, _) = search.search("sewage", true).unwrap();
        assert_eq!(
            search.panel(),
            &SearchPanel::Loading {
                query: "sewage".into()
            }
        );

        assert!(search.complete(ticket, Ok(SearchResults::default())));
        assert_eq!(
            search.panel(),
            &SearchPanel::Empty {
                query: "sewage".into()
            }
        );
    }

    #[test]
    fn failure_shows_error_state() {
        let mut search = controller();
        let (ticket, _) = search.search("drain", false).unwrap();
        search.complete(ticket, Err(ApiError::NetworkFailure("timed out".into())));
        assert!(matches!(search.panel(), SearchPanel::Error(m) if m.contains("timed out")));
    }

    #[test]
    fn older_response_is_dropped() {
        let mut search = controller();
        let (old, _) = search.search("water", false).unwrap();
        let (new, _) = search.search("roads", false).unwrap();

        let results = SearchResults {
            query: "roads".into(),
            total_results: 1,
            results: vec![SearchResult {
                text: "pothole".into(),
                ..SearchResult::default()
            }],
        };
        assert!(search.complete(new, Ok(results)));
        assert!(!search.complete(old, Ok(SearchResults::default())));
        assert!(matches!(search.panel(), SearchPanel::Populated(r) if r.results.len() == 1));
    }
}
