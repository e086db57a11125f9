/// HTTP client tests against an in-process fake backend.
///
/// Each test starts a `tiny_http` server on an ephemeral port, points an
/// `HttpBackend` at it and checks both what was sent and how the response
/// (or lack of one) surfaces as an `ApiError`.
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use sentinel::activity::ActivityLog;
use sentinel::api::{ApiError, Backend, HttpBackend, Role, SearchQuery, SessionId};
use sentinel::config::schema::BackendConfig;
use tiny_http::{Header, Response, Server};

// ---------------------------------------------------------------------------
// Fake backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    url: String,
    body: String,
}

struct Fake {
    base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Fake {
    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn backend(&self) -> HttpBackend {
        self.backend_with_timeout(2_000)
    }

    fn backend_with_timeout(&self, timeout_ms: u64) -> HttpBackend {
        let config = BackendConfig {
            base_url: format!("{}/api", self.base_url),
            timeout_ms,
            investigate_timeout_ms: timeout_ms,
        };
        HttpBackend::from_config(&config, ActivityLog::disabled())
    }
}

/// Serve every request with `route(method, url, body) -> (status, json)`.
fn serve<F>(route: F) -> Fake
where
    F: Fn(&str, &str, &str) -> (u16, String) + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").expect("bind fake backend");
    let addr = server.server_addr().to_ip().expect("ip listener");
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let mut body = String::new();
            let _ = request.as_reader().read_to_string(&mut body);
            let method = request.method().to_string();
            let url = request.url().to_string();
            seen.lock().unwrap().push(Recorded {
                method: method.clone(),
                url: url.clone(),
                body: body.clone(),
            });

            let (status, json) = route(&method, &url, &body);
            let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
            let _ = request.respond(
                Response::from_string(json)
                    .with_status_code(status)
                    .with_header(header),
            );
        }
    });

    Fake {
        base_url: format!("http://{addr}"),
        requests,
    }
}

fn ok(data: &str) -> (u16, String) {
    (200, format!(r#"{{"success": true, "data": {data}}}"#))
}

// ---------------------------------------------------------------------------
// Analytics endpoints
// ---------------------------------------------------------------------------

#[test]
fn stats_decodes_envelope() {
    let fake = serve(|_, _, _| {
        ok(r#"{"total_complaints": 10000, "total_silenced": 4250, "silence_rate": 42.5,
               "avg_silence_score": 61, "avg_days_in_system": 37.8}"#)
    });

    let stats = fake.backend().stats().unwrap();
    assert_eq!(stats.total_complaints, 10_000);
    assert_eq!(stats.total_silenced, Some(4250));
    assert!((stats.silence_rate - 42.5).abs() < f64::EPSILON);

    let requests = fake.requests();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].url, "/api/stats");
}

#[test]
fn geography_sends_top_n() {
    let fake = serve(|_, _, _| {
        ok(r#"{"top_silenced": [{"ward": "Ward 12", "avg_silence": 78.2, "count": 120, "silenced_pct": 64.0}]}"#)
    });

    let geography = fake.backend().geography(5).unwrap();
    assert_eq!(geography.top_silenced[0].ward, "Ward 12");
    assert_eq!(fake.requests()[0].url, "/api/geographic-silence?top_n=5");
}

#[test]
fn complaint_types_keep_backend_order() {
    let fake = serve(|_, _, _| {
        ok(r#"[{"category": "Noise", "silenced_pct": 12}, {"category": "Water", "silenced_pct": 81}]"#)
    });

    let rows = fake.backend().complaint_types().unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.category.as_str()).collect();
    assert_eq!(names, vec!["Noise", "Water"]);
}

// ---------------------------------------------------------------------------
// Search and chat
// ---------------------------------------------------------------------------

#[test]
fn search_posts_threshold_or_null() {
    let fake = serve(|_, _, _| ok(r#"{"query": "sewage", "total_results": 0, "results": []}"#));
    let backend = fake.backend();

    let mut query = SearchQuery {
        query: "sewage".into(),
        top_k: 20,
        silence_threshold: Some(70.0),
    };
    let results = backend.search(&query).unwrap();
    assert!(results.results.is_empty());

    query.silence_threshold = None;
    backend.search(&query).unwrap();

    let requests = fake.requests();
    let first: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    let second: serde_json::Value = serde_json::from_str(&requests[1].body).unwrap();
    assert_eq!(first["silence_threshold"], serde_json::json!(70.0));
    assert_eq!(first["top_k"], serde_json::json!(20));
    assert!(second["silence_threshold"].is_null());
}

#[test]
fn chat_sends_null_session_and_reads_chart() {
    let fake = serve(|_, _, _| {
        ok(r#"{"session_id": "abc", "response": "**Ward 12** is worst",
               "chart": {"type": "bar", "title": "Wards",
                         "data": {"labels": ["Ward 12"], "datasets": [{"label": "Avg", "data": [78.2]}]}},
               "tools_used": ["geographic_breakdown"]}"#)
    });

    let reply = fake.backend().chat("which ward?", None).unwrap();
    assert_eq!(reply.session_id, Some(SessionId::new("abc")));
    assert_eq!(reply.tools_used, vec!["geographic_breakdown".to_string()]);
    assert_eq!(reply.chart.unwrap().data.labels.len(), 1);

    let body: serde_json::Value = serde_json::from_str(&fake.requests()[0].body).unwrap();
    assert_eq!(body["message"], "which ward?");
    assert!(body["session_id"].is_null());
}

#[test]
fn sessions_and_history_accept_bare_lists() {
    let fake = serve(|_, url, _| {
        if url.starts_with("/api/chat/history/") {
            ok(r#"[{"role": "system", "content": "Session created: Audit"},
                   {"role": "user", "content": "hi"}]"#)
        } else {
            ok(r#"[{"session_id": "s1", "name": "Audit", "created_at": "2024-03-01T10:00:00"}]"#)
        }
    });
    let backend = fake.backend();

    let sessions = backend.sessions().unwrap();
    assert_eq!(sessions[0].display_name, "Audit");

    let history = backend.history(&SessionId::new("s1")).unwrap();
    assert_eq!(history[0].role, Role::System);
    assert_eq!(history[1].content, "hi");
    assert_eq!(fake.requests()[1].url, "/api/chat/history/s1");
}

#[test]
fn create_session_posts_name() {
    let fake = serve(|_, _, _| ok(r#"{"session_id": "new-1", "name": "Water audit"}"#));

    let session = fake.backend().create_session(Some("Water audit")).unwrap();
    assert_eq!(session.id.as_str(), "new-1");
    assert_eq!(session.display_name, "Water audit");

    let requests = fake.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].url, "/api/chat/session/new");
    assert!(requests[0].body.contains("Water audit"));
}

#[test]
fn health_lives_at_server_root() {
    let fake = serve(|_, _, _| (200, r#"{"status": "healthy", "service": "silence-api"}"#.into()));

    let health = fake.backend().health().unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(fake.requests()[0].url, "/health");
}

// ---------------------------------------------------------------------------
// Failure mapping
// ---------------------------------------------------------------------------

#[test]
fn success_false_is_backend_error() {
    let fake = serve(|_, _, _| (200, r#"{"success": false, "error": "index not built"}"#.into()));
    assert_eq!(
        fake.backend().stats().unwrap_err(),
        ApiError::BackendError("index not built".into())
    );
}

#[test]
fn error_status_with_envelope_keeps_message() {
    let fake = serve(|_, _, _| (500, r#"{"success": false, "error": "qdrant offline"}"#.into()));
    assert_eq!(
        fake.backend().temporal_decay().unwrap_err(),
        ApiError::BackendError("qdrant offline".into())
    );
}

#[test]
fn error_status_without_envelope_reports_code() {
    let fake = serve(|_, _, _| (502, "<html>bad gateway</html>".into()));
    assert_eq!(
        fake.backend().stats().unwrap_err(),
        ApiError::BackendError("HTTP 502".into())
    );
}

#[test]
fn slow_backend_times_out_as_network_failure() {
    let fake = serve(|_, _, _| {
        thread::sleep(Duration::from_millis(800));
        ok("{}")
    });

    let err = fake.backend_with_timeout(100).investigate().unwrap_err();
    assert!(matches!(err, ApiError::NetworkFailure(_)));
}

#[test]
fn unreachable_backend_is_network_failure() {
    let config = BackendConfig {
        base_url: "http://127.0.0.1:1/api".into(),
        timeout_ms: 500,
        investigate_timeout_ms: 500,
    };
    let backend = HttpBackend::from_config(&config, ActivityLog::disabled());
    assert!(matches!(
        backend.sessions().unwrap_err(),
        ApiError::NetworkFailure(_)
    ));
}

#[test]
fn calls_are_recorded_in_activity_log() {
    let fake = serve(|_, _, _| (200, r#"{"success": false, "error": "nope"}"#.into()));
    let path = std::env::temp_dir().join(format!(
        "sentinel-http-{}-{}.jsonl",
        std::process::id(),
        fake.base_url.rsplit(':').next().unwrap_or("0")
    ));
    let _ = std::fs::remove_file(&path);

    let config = BackendConfig {
        base_url: format!("{}/api", fake.base_url),
        ..BackendConfig::default()
    };
    let log = ActivityLog::at(&path);
    let backend = HttpBackend::from_config(&config, log.clone());
    let _ = backend.stats();

    let entries = log.read_all();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].component, "backend");
    assert_eq!(entries[0].action, "GET /stats");
    assert_eq!(entries[0].outcome, "error");
    let _ = std::fs::remove_file(&path);
}
