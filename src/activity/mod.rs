//! Activity log: one JSON line per notable event in the console.
//!
//! Records backend call outcomes, discarded stale responses, queued or
//! rejected chat sends and other orchestration decisions that never reach
//! the screen. Used for after-the-fact diagnosis of ordering problems.
//!
//! Log file: `~/.sentinel/activity.jsonl` (configurable via `[logging]`).
//! Writes are best-effort; failures are silently ignored.

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::schema::LoggingConfig;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// A single activity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: String,
    /// Component that produced the event (`"chat"`, `"backend"`, ...).
    pub component: String,
    pub action: String,
    /// `"ok"`, `"error"`, `"discarded"`, `"queued"`, ...
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
}

// ---------------------------------------------------------------------------
// Log handle
// ---------------------------------------------------------------------------

/// Cheap, cloneable handle to the activity log file.
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    path: Option<PathBuf>,
}

impl ActivityLog {
    /// Build from the resolved `[logging]` section.
    pub fn from_config(config: &LoggingConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        Self {
            path: expand_home(&config.path),
        }
    }

    /// A log that drops everything.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Log to an explicit file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Append one record.
    pub fn record(&self, component: &str, action: &str, outcome: &str, detail: Option<&str>) {
        let entry = ActivityEntry {
            timestamp: Utc::now().to_rfc3339(),
            component: component.to_string(),
            action: action.to_string(),
            outcome: outcome.to_string(),
            detail: detail.map(|d| d.to_string()),
        };
        let _ = self.append(&entry);
    }

    /// Convenience: a response arrived for something the user has moved away
    /// from and was dropped.
    pub fn discarded(&self, component: &str, action: &str, reason: &str) {
        self.record(component, action, "discarded", Some(reason));
    }

    /// Read every entry back. Malformed lines are skipped.
    pub fn read_all(&self) -> Vec<ActivityEntry> {
        let Some(path) = &self.path else {
            return Vec::new();
        };
        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };

        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str::<ActivityEntry>(&line).ok())
            .collect()
    }

    fn append(&self, entry: &ActivityEntry) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let json = serde_json::to_string(entry)?;
        writeln!(file, "{json}")?;

        Ok(())
    }
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &str) -> Option<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        return dirs::home_dir().map(|home| home.join(rest));
    }
    if path == "~" {
        return dirs::home_dir();
    }
    Some(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log(name: &str) -> ActivityLog {
        let path = std::env::temp_dir()
            .join(format!("sentinel-activity-{}-{name}.jsonl", std::process::id()));
        let _ = fs::remove_file(&path);
        ActivityLog::at(path)
    }

    #[test]
    fn records_round_trip_through_file() {
        let log = temp_log("roundtrip");
        log.record("chat", "send", "queued", Some("1 pending"));
        log.discarded("search", "complete", "superseded");

        let entries = log.read_all();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].component, "chat");
        assert_eq!(entries[0].detail.as_deref(), Some("1 pending"));
        assert_eq!(entries[1].outcome, "discarded");

        if let Some(path) = log.path() {
            let _ = fs::remove_file(path);
        }
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let log = ActivityLog::disabled();
        log.record("chat", "send", "ok", None);
        assert!(log.read_all().is_empty());
    }

    #[test]
    fn config_disabled_yields_disabled_log() {
        let config = LoggingConfig {
            enabled: false,
            ..LoggingConfig::default()
        };
        assert!(ActivityLog::from_config(&config).path().is_none());
    }

    #[test]
    fn expand_home_handles_plain_paths() {
        assert_eq!(expand_home("/tmp/a.jsonl"), Some(PathBuf::from("/tmp/a.jsonl")));
    }
}
