//! Backend contract: the JSON-over-HTTP API every component talks to.
//!
//! All endpoints wrap their payload in the same envelope,
//! `{ success, data?, error? }`. [`Envelope::into_result`] turns that into a
//! `Result`, so callers only ever see the two terminal failure kinds in
//! [`ApiError`].

pub mod http;
pub mod types;

use serde::Deserialize;
use thiserror::Error;

pub use http::HttpBackend;
pub use types::{
    CategoryStat, ChatReply, Demographics, Geography, GroupStat, Health, HistoryHit, Message,
    Report, Role, SearchQuery, SearchResult, SearchResults, Session, SessionId, Stats,
    TemporalBucket, WardStat,
};

/// Terminal failure of a backend call.
///
/// Both kinds are caught at the component boundary and turned into a visible
/// message; nothing retries automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never reached the backend, never came back, or came back
    /// as something other than an envelope.
    #[error("network failure: {0}")]
    NetworkFailure(String),
    /// The backend answered with `success: false`.
    #[error("{0}")]
    BackendError(String),
}

impl ApiError {
    /// Used when a worker exits without reporting an outcome.
    pub fn aborted() -> Self {
        Self::NetworkFailure("request aborted before a response arrived".to_string())
    }
}

/// The uniform response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn into_result(self) -> Result<T, ApiError> {
        if !self.success {
            let message = self
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "backend reported failure without a message".to_string());
            return Err(ApiError::BackendError(message));
        }

        self.data
            .ok_or_else(|| ApiError::BackendError("response carried no data".to_string()))
    }
}

/// One method per consumed endpoint.
///
/// Implementations block the calling thread; the console runs them on worker
/// threads so completions interleave with user input.
pub trait Backend: Send + Sync {
    fn stats(&self) -> Result<Stats, ApiError>;
    fn demographics(&self) -> Result<Demographics, ApiError>;
    fn geography(&self, top_n: u32) -> Result<Geography, ApiError>;
    fn complaint_types(&self) -> Result<Vec<CategoryStat>, ApiError>;
    fn temporal_decay(&self) -> Result<Vec<TemporalBucket>, ApiError>;
    fn search(&self, query: &SearchQuery) -> Result<SearchResults, ApiError>;
    fn chat(&self, message: &str, session_id: Option<&SessionId>) -> Result<ChatReply, ApiError>;
    fn sessions(&self) -> Result<Vec<Session>, ApiError>;
    fn create_session(&self, name: Option<&str>) -> Result<Session, ApiError>;
    fn history(&self, session_id: &SessionId) -> Result<Vec<Message>, ApiError>;
    fn search_history(
        &self,
        query: &str,
        session_id: Option<&SessionId>,
        limit: u32,
    ) -> Result<Vec<HistoryHit>, ApiError>;
    fn investigate(&self) -> Result<Report, ApiError>;
    fn health(&self) -> Result<Health, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_yields_data() {
        let env: Envelope<Stats> = serde_json::from_str(
            r#"{"success": true, "data": {"total_complaints": 10, "silence_rate": 5.0}}"#,
        )
        .unwrap();
        let stats = env.into_result().unwrap();
        assert_eq!(stats.total_complaints, 10);
    }

    #[test]
    fn failure_envelope_yields_backend_error() {
        let env: Envelope<Stats> =
            serde_json::from_str(r#"{"success": false, "error": "qdrant down"}"#).unwrap();
        assert_eq!(
            env.into_result(),
            Err(ApiError::BackendError("qdrant down".to_string()))
        );
    }

    #[test]
    fn failure_without_message_gets_generic_text() {
        let env: Envelope<Stats> = serde_json::from_str(r#"{"success": false}"#).unwrap();
        match env.into_result() {
            Err(ApiError::BackendError(msg)) => assert!(msg.contains("without a message")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn success_without_data_is_an_error() {
        let env: Envelope<Stats> = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(matches!(env.into_result(), Err(ApiError::BackendError(_))));
    }
}
