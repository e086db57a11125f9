/// Wire types for the analytics backend.
///
/// Field names follow the backend's JSON exactly. Optional or extra fields are
/// defaulted so a partially populated payload still decodes; the client never
/// mutates any of these values.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::charts::WireChart;

// ---------------------------------------------------------------------------
// Sessions and messages
// ---------------------------------------------------------------------------

/// Opaque conversation identifier minted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The "new investigation" placeholder uses the empty id.
    pub fn is_placeholder(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One persisted conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "session_id")]
    pub id: SessionId,
    #[serde(rename = "name", default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// `GET /chat/sessions`: the backend has shipped both a bare list and a
/// `{sessions: [...]}` wrapper.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SessionListing {
    Wrapped { sessions: Vec<Session> },
    Bare(Vec<Session>),
}

impl SessionListing {
    pub(crate) fn into_sessions(self) -> Vec<Session> {
        match self {
            Self::Wrapped { sessions } => sessions,
            Self::Bare(sessions) => sessions,
        }
    }
}

/// `POST /chat/session/new` response data.
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedSession {
    pub session_id: SessionId,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    #[serde(other)]
    System,
}

/// A single transcript message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// `GET /chat/history/{id}`: bare list or `{messages: [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum HistoryListing {
    Wrapped { messages: Vec<Message> },
    Bare(Vec<Message>),
}

impl HistoryListing {
    pub(crate) fn into_messages(self) -> Vec<Message> {
        match self {
            Self::Wrapped { messages } => messages,
            Self::Bare(messages) => messages,
        }
    }
}

/// `POST /chat` request body. `session_id` is sent as `null` when unset.
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequestBody<'a> {
    pub message: &'a str,
    pub session_id: Option<&'a SessionId>,
}

/// `POST /chat` response data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub response: String,
    #[serde(default, alias = "chart_data")]
    pub chart: Option<WireChart>,
    #[serde(default)]
    pub tools_used: Vec<String>,
}

/// A semantic hit from `POST /chat/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryHit {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

fn default_role() -> Role {
    Role::System
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// `GET /stats` data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_complaints: u64,
    #[serde(default)]
    pub total_silenced: Option<u64>,
    pub silence_rate: f64,
    #[serde(default)]
    pub avg_silence_score: f64,
    #[serde(default)]
    pub avg_days_in_system: f64,
}

/// Aggregate for one demographic group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStat {
    pub avg_silence: f64,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub silenced_pct: f64,
}

/// `GET /demographic-silence` data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Demographics {
    #[serde(default)]
    pub by_gender: BTreeMap<String, GroupStat>,
    #[serde(default)]
    pub by_caste: BTreeMap<String, GroupStat>,
    #[serde(default)]
    pub by_income: BTreeMap<String, GroupStat>,
}

/// Income bracket keys in ascending order.
pub const INCOME_BRACKETS: [&str; 4] = ["0-3L", "3-6L", "6-10L", "10L+"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardStat {
    pub ward: String,
    pub avg_silence: f64,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub silenced_pct: f64,
}

/// `GET /geographic-silence?top_n=N` data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Geography {
    #[serde(default)]
    pub top_silenced: Vec<WardStat>,
}

/// `GET /complaint-types` row. Rows arrive sorted by `silenced_pct`
/// descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStat {
    pub category: String,
    #[serde(default)]
    pub avg_silence: f64,
    #[serde(default)]
    pub count: u64,
    pub silenced_pct: f64,
}

/// `GET /temporal-decay` row, in chronological bucket order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalBucket {
    pub time_bucket: String,
    #[serde(default)]
    pub avg_silence: f64,
    #[serde(default)]
    pub count: u64,
    pub silenced_pct: f64,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// `POST /search` request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    pub query: String,
    pub top_k: u32,
    pub silence_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub id: Option<String>,
    pub text: String,
    pub silence_score: f64,
    pub category: String,
    pub gender: String,
    pub caste: String,
    pub income: String,
    pub ward: String,
    pub ward_type: String,
    pub days_in_system: f64,
    pub response_status: String,
    pub similarity: f64,
}

/// `POST /search` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResults {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<SearchResult>,
}

// ---------------------------------------------------------------------------
// Investigation and health
// ---------------------------------------------------------------------------

/// `POST /agent/investigate` data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub report: String,
    #[serde(default)]
    pub report_file: Option<String>,
}

/// `GET /health` (not enveloped).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub service: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_listing_accepts_both_shapes() {
        let bare = r#"[{"session_id": "a1", "name": "Water", "created_at": "2024-01-01"}]"#;
        let wrapped = r#"{"sessions": [{"session_id": "a1", "name": "Water"}]}"#;

        let bare: SessionListing = serde_json::from_str(bare).unwrap();
        let wrapped: SessionListing = serde_json::from_str(wrapped).unwrap();

        assert_eq!(bare.into_sessions()[0].display_name, "Water");
        assert_eq!(wrapped.into_sessions()[0].id, SessionId::new("a1"));
    }

    #[test]
    fn unknown_roles_decode_as_system() {
        let msg: Message = serde_json::from_str(r#"{"role": "tool", "content": "x"}"#).unwrap();
        assert_eq!(msg.role, Role::System);
    }

    #[test]
    fn chat_body_sends_null_session() {
        let body = ChatRequestBody {
            message: "hi",
            session_id: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"message":"hi","session_id":null}"#);
    }

    #[test]
    fn chat_reply_accepts_chart_data_alias() {
        let json = r#"{
            "session_id": "s1",
            "response": "ok",
            "chart_data": {"type": "bar", "data": {"labels": ["a"], "datasets": [{"label": "x", "data": [1]}]}}
        }"#;
        let reply: ChatReply = serde_json::from_str(json).unwrap();
        assert!(reply.chart.is_some());
        assert!(reply.tools_used.is_empty());
    }

    #[test]
    fn search_query_serializes_missing_threshold_as_null() {
        let q = SearchQuery {
            query: "sewage".to_string(),
            top_k: 20,
            silence_threshold: None,
        };
        let json = serde_json::to_string(&q).unwrap();
        assert!(json.contains("\"silence_threshold\":null"));
    }

    #[test]
    fn placeholder_session_id_is_empty() {
        assert!(SessionId::new("").is_placeholder());
        assert!(SessionId::new("  ").is_placeholder());
        assert!(!SessionId::new("abc").is_placeholder());
    }
}
