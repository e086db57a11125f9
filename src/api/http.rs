/// Blocking HTTP implementation of [`Backend`] over `ureq`.
///
/// One agent is shared by every call. Each request carries its own timeout:
/// the investigation endpoint runs a multi-step agent on the server and gets
/// a much longer budget than everything else.
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::{ChatRequestBody, CreatedSession, HistoryListing, SessionListing};
use super::{
    ApiError, Backend, CategoryStat, ChatReply, Demographics, Envelope, Geography, Health,
    HistoryHit, Message, Report, SearchQuery, SearchResults, Session, SessionId, Stats,
    TemporalBucket,
};
use crate::activity::ActivityLog;
use crate::config::schema::BackendConfig;

/// Synchronous client for the analytics backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    agent: ureq::Agent,
    timeout: Duration,
    investigate_timeout: Duration,
    log: ActivityLog,
}

#[derive(Serialize)]
struct NewSessionBody<'a> {
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct HistorySearchBody<'a> {
    query: &'a str,
    session_id: Option<&'a SessionId>,
    limit: u32,
}

impl HttpBackend {
    /// Build a client from the resolved `[backend]` config.
    pub fn from_config(config: &BackendConfig, log: ActivityLog) -> Self {
        Self {
            base_url: normalize_base_url(&config.base_url),
            agent: ureq::AgentBuilder::new().build(),
            timeout: Duration::from_millis(config.timeout_ms),
            investigate_timeout: Duration::from_millis(config.investigate_timeout_ms),
            log,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let mut request = self.agent.get(&self.url(path)).timeout(self.timeout);
        for (key, value) in query {
            request = request.query(key, value);
        }

        let start = Instant::now();
        let result = decode(request.call());
        self.record("GET", path, start, &result);
        result
    }

    fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: Option<&B>,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let request = self.agent.post(&self.url(path)).timeout(timeout);

        let start = Instant::now();
        let response = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        let result = decode(response);
        self.record("POST", path, start, &result);
        result
    }

    fn record<T>(&self, method: &str, path: &str, start: Instant, result: &Result<T, ApiError>) {
        let latency_ms = start.elapsed().as_millis() as u64;
        let action = format!("{method} {path}");
        match result {
            Ok(_) => self
                .log
                .record("backend", &action, "ok", Some(&format!("{latency_ms}ms"))),
            Err(e) => self.log.record(
                "backend",
                &action,
                "error",
                Some(&format!("{e} ({latency_ms}ms)")),
            ),
        }
    }
}

/// Strip trailing slashes and pin `localhost` to IPv4.
fn normalize_base_url(raw: &str) -> String {
    raw.trim()
        .trim_end_matches('/')
        .replace("://localhost", "://127.0.0.1")
}

/// The health check lives at the server root, outside the `/api` prefix.
fn health_url(base_url: &str) -> String {
    let root = base_url.strip_suffix("/api").unwrap_or(base_url);
    format!("{root}/health")
}

/// Map a raw `ureq` outcome onto the envelope contract.
///
/// Error statuses whose body is still an envelope surface the backend's own
/// message; anything else that reached the server becomes a generic
/// `BackendError` carrying the status code.
fn decode<T: DeserializeOwned>(
    response: Result<ureq::Response, ureq::Error>,
) -> Result<T, ApiError> {
    match response {
        Ok(resp) => resp
            .into_json::<Envelope<T>>()
            .map_err(|e| ApiError::NetworkFailure(format!("undecodable response: {e}")))?
            .into_result(),
        Err(ureq::Error::Status(code, resp)) => match resp.into_json::<Envelope<T>>() {
            Ok(envelope) => envelope.into_result(),
            Err(_) => Err(ApiError::BackendError(format!("HTTP {code}"))),
        },
        Err(ureq::Error::Transport(transport)) => {
            Err(ApiError::NetworkFailure(transport.to_string()))
        }
    }
}

impl Backend for HttpBackend {
    fn stats(&self) -> Result<Stats, ApiError> {
        self.get("/stats", &[])
    }

    fn demographics(&self) -> Result<Demographics, ApiError> {
        self.get("/demographic-silence", &[])
    }

    fn geography(&self, top_n: u32) -> Result<Geography, ApiError> {
        self.get("/geographic-silence", &[("top_n", top_n.to_string())])
    }

    fn complaint_types(&self) -> Result<Vec<CategoryStat>, ApiError> {
        self.get("/complaint-types", &[])
    }

    fn temporal_decay(&self) -> Result<Vec<TemporalBucket>, ApiError> {
        self.get("/temporal-decay", &[])
    }

    fn search(&self, query: &SearchQuery) -> Result<SearchResults, ApiError> {
        self.post("/search", Some(query), self.timeout)
    }

    fn chat(&self, message: &str, session_id: Option<&SessionId>) -> Result<ChatReply, ApiError> {
        let body = ChatRequestBody {
            message,
            session_id,
        };
        self.post("/chat", Some(&body), self.timeout)
    }

    fn sessions(&self) -> Result<Vec<Session>, ApiError> {
        self.get::<SessionListing>("/chat/sessions", &[])
            .map(SessionListing::into_sessions)
    }

    fn create_session(&self, name: Option<&str>) -> Result<Session, ApiError> {
        let created: CreatedSession =
            self.post("/chat/session/new", Some(&NewSessionBody { name }), self.timeout)?;
        let display_name = created
            .name
            .or_else(|| name.map(str::to_string))
            .unwrap_or_else(|| format!("Investigation {}", created.session_id));
        Ok(Session {
            id: created.session_id,
            display_name,
            created_at: Some(chrono::Local::now().to_rfc3339()),
        })
    }

    fn history(&self, session_id: &SessionId) -> Result<Vec<Message>, ApiError> {
        let path = format!("/chat/history/{}", session_id.as_str());
        self.get::<HistoryListing>(&path, &[])
            .map(HistoryListing::into_messages)
    }

    fn search_history(
        &self,
        query: &str,
        session_id: Option<&SessionId>,
        limit: u32,
    ) -> Result<Vec<HistoryHit>, ApiError> {
        let body = HistorySearchBody {
            query,
            session_id,
            limit,
        };
        self.post("/chat/search", Some(&body), self.timeout)
    }

    fn investigate(&self) -> Result<Report, ApiError> {
        self.post::<Report, ()>("/agent/investigate", None, self.investigate_timeout)
    }

    fn health(&self) -> Result<Health, ApiError> {
        let start = Instant::now();
        let result = match self
            .agent
            .get(&health_url(&self.base_url))
            .timeout(Duration::from_secs(5))
            .call()
        {
            Ok(resp) => resp
                .into_json::<Health>()
                .map_err(|e| ApiError::NetworkFailure(format!("undecodable response: {e}"))),
            Err(ureq::Error::Status(code, _)) => Err(ApiError::BackendError(format!("HTTP {code}"))),
            Err(ureq::Error::Transport(t)) => Err(ApiError::NetworkFailure(t.to_string())),
        };
        self.record("GET", "/health", start, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(
            normalize_base_url("http://localhost:5000/api/"),
            "http://127.0.0.1:5000/api"
        );
        assert_eq!(normalize_base_url("https://x.org/api"), "https://x.org/api");
    }

    #[test]
    fn health_lives_outside_api_prefix() {
        assert_eq!(health_url("http://h:5000/api"), "http://h:5000/health");
        assert_eq!(health_url("http://h:5000"), "http://h:5000/health");
    }

    #[test]
    fn client_uses_configured_timeouts() {
        let config = BackendConfig::default();
        let client = HttpBackend::from_config(&config, ActivityLog::disabled());
        assert_eq!(client.timeout, Duration::from_millis(config.timeout_ms));
        assert_eq!(
            client.investigate_timeout,
            Duration::from_millis(config.investigate_timeout_ms)
        );
    }
}
