/// Configuration schema and defaults for the sentinel console.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[backend]`, `[search]`, `[geography]`, `[chat]`, `[logging]` and
/// `[display]`.
///
/// Every field has a sensible built-in default. Users only need to set the
/// values they want to override.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level sentinel configuration.
///
/// Maps directly to the `~/.sentinel/config.toml` and `.sentinel.toml` file
/// schemas. All sections and fields are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub backend: BackendConfig,
    pub search: SearchConfig,
    pub geography: GeographyConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
    pub display: DisplayConfig,
}

// ---------------------------------------------------------------------------
// [backend]
// ---------------------------------------------------------------------------

/// Where the analytics API lives and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL including the `/api` prefix.
    pub base_url: String,
    /// Timeout for ordinary requests (milliseconds).
    pub timeout_ms: u64,
    /// Timeout for `POST /agent/investigate` (milliseconds).
    pub investigate_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout_ms: 30_000,
            investigate_timeout_ms: 300_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [search]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of results requested per query.
    pub top_k: u32,
    /// Silence-score threshold sent when "silenced only" is requested.
    pub silenced_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 20,
            silenced_threshold: 70.0,
        }
    }
}

// ---------------------------------------------------------------------------
// [geography]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeographyConfig {
    /// Number of most-silenced wards to fetch.
    pub top_n: u32,
}

impl Default for GeographyConfig {
    fn default() -> Self {
        Self { top_n: 10 }
    }
}

// ---------------------------------------------------------------------------
// [chat]
// ---------------------------------------------------------------------------

/// What happens to a chat message sent while a reply is still pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusyPolicy {
    /// Hold the message and deliver it once the pending reply resolves.
    #[default]
    Queue,
    /// Refuse the message and ask the user to wait.
    Reject,
}

impl std::fmt::Display for BusyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queue => write!(f, "queue"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub busy_policy: BusyPolicy,
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether activity logging is enabled.
    pub enabled: bool,
    /// Path to the activity log file. `~` is expanded to the home directory.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.sentinel/activity.jsonl".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [display]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Colored terminal output.
    pub color: bool,
    /// Width of the longest chart bar, in cells.
    pub bar_width: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: true,
            bar_width: 40,
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl SentinelConfig {
    /// Generate the annotated default TOML config file content.
    ///
    /// Used by `sentinel config init`.
    pub fn default_toml() -> String {
        r#"# sentinel Configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (SENTINEL_*)
#   2. Project config (.sentinel.toml in current directory)
#   3. User global config (~/.sentinel/config.toml)
#   4. Built-in defaults

[backend]
base_url = "http://localhost:5000/api"
timeout_ms = 30000
investigate_timeout_ms = 300000   # the investigation agent is slow

[search]
top_k = 20
silenced_threshold = 70.0         # applied when --silenced is given

[geography]
top_n = 10

[chat]
busy_policy = "queue"             # queue | reject: second send while a reply is pending

[logging]
enabled = true
path = "~/.sentinel/activity.jsonl"

[display]
color = true
bar_width = 40
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = SentinelConfig::default();
        assert_eq!(config.backend.base_url, "http://localhost:5000/api");
        assert_eq!(config.backend.timeout_ms, 30_000);
        assert_eq!(config.search.top_k, 20);
        assert!((config.search.silenced_threshold - 70.0).abs() < f64::EPSILON);
        assert_eq!(config.geography.top_n, 10);
        assert_eq!(config.chat.busy_policy, BusyPolicy::Queue);
        assert!(config.logging.enabled);
        assert!(config.display.color);
    }

    #[test]
    fn deserialize_minimal_toml() {
        let toml_str = r#"
[chat]
busy_policy = "reject"
"#;
        let config: SentinelConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.chat.busy_policy, BusyPolicy::Reject);
        // Untouched sections keep defaults
        assert_eq!(config.search.top_k, 20);
    }

    #[test]
    fn empty_toml_produces_defaults() {
        let config: SentinelConfig = toml::from_str("").unwrap();
        assert_eq!(config.backend.investigate_timeout_ms, 300_000);
    }

    #[test]
    fn default_toml_parses_back() {
        let toml_str = SentinelConfig::default_toml();
        let config: SentinelConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.display.bar_width, 40);
        assert_eq!(config.chat.busy_policy, BusyPolicy::Queue);
    }
}
