/// Configuration system for sentinel.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::SentinelConfig::default()`]
/// 2. **User global config**: `~/.sentinel/config.toml`
/// 3. **Project local config**: `.sentinel.toml` in the current working directory
/// 4. **Environment variables**: `SENTINEL_*` overrides (highest precedence)
///
/// A later file layer replaces the earlier one; environment variables then
/// override individual fields.
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::SentinelConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
pub fn load() -> SentinelConfig {
    let mut config = SentinelConfig::default();

    if let Some(global) = load_toml_file(global_config_path()) {
        config = global;
    }

    if let Some(project) = load_toml_file(project_config_path()) {
        config = project;
    }

    apply_env_overrides(&mut config);

    config
}

/// Load a TOML config file from the given path (if it exists).
///
/// Malformed files are ignored so a typo never locks the console out.
fn load_toml_file(path: Option<PathBuf>) -> Option<SentinelConfig> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    toml::from_str(&content).ok()
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.sentinel/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".sentinel").join("config.toml"))
}

/// Path to the project local config: `.sentinel.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".sentinel.toml"))
}

pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `SENTINEL_API_URL`: backend base URL
/// - `SENTINEL_TIMEOUT_MS`: ordinary request timeout
/// - `SENTINEL_BUSY_POLICY`: `queue` or `reject`
/// - `SENTINEL_LOG`: activity logging on/off
/// - `SENTINEL_COLOR`: colored output on/off
fn apply_env_overrides(config: &mut SentinelConfig) {
    if let Ok(val) = std::env::var("SENTINEL_API_URL")
        && !val.is_empty()
    {
        config.backend.base_url = val;
    }
    if let Ok(val) = std::env::var("SENTINEL_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.backend.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("SENTINEL_BUSY_POLICY")
        && let Some(policy) = parse_busy_policy(&val)
    {
        config.chat.busy_policy = policy;
    }
    if let Ok(val) = std::env::var("SENTINEL_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("SENTINEL_COLOR") {
        config.display.color = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_busy_policy(val: &str) -> Option<schema::BusyPolicy> {
    match val.to_ascii_lowercase().as_str() {
        "queue" => Some(schema::BusyPolicy::Queue),
        "reject" => Some(schema::BusyPolicy::Reject),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.sentinel/config.toml`.
///
/// Returns an error if the file already exists and `force` is false.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.sentinel/ directory")?;
    }

    fs::write(&path, SentinelConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single dotted key (e.g. `chat.busy_policy`) in the global config file.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&SentinelConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    // Reject values that would no longer deserialize into the schema.
    let rendered = toml::to_string_pretty(&root).context("failed to serialize config")?;
    toml::from_str::<SentinelConfig>(&rendered)
        .with_context(|| format!("invalid value '{value}' for '{key}'"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, rendered).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    let mut current = root;
    for &part in sections {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected table above '{key}'"))?;

    let new_value = match table.get(*leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("yes"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn parse_busy_policy_handles_variants() {
        assert_eq!(parse_busy_policy("queue"), Some(schema::BusyPolicy::Queue));
        assert_eq!(parse_busy_policy("REJECT"), Some(schema::BusyPolicy::Reject));
        assert_eq!(parse_busy_policy("drop"), None);
    }

    #[test]
    fn set_toml_value_updates_string() {
        let mut root: toml::Value = toml::from_str(
            r#"
[backend]
base_url = "http://a/api"
"#,
        )
        .unwrap();
        set_toml_value(&mut root, "backend.base_url", "http://b/api").unwrap();
        assert_eq!(root["backend"]["base_url"].as_str(), Some("http://b/api"));
    }

    #[test]
    fn set_toml_value_updates_integer_and_float() {
        let mut root: toml::Value = toml::from_str(
            r#"
[search]
top_k = 20
silenced_threshold = 70.0
"#,
        )
        .unwrap();
        set_toml_value(&mut root, "search.top_k", "50").unwrap();
        set_toml_value(&mut root, "search.silenced_threshold", "80").unwrap();
        assert_eq!(root["search"]["top_k"].as_integer(), Some(50));
        assert_eq!(root["search"]["silenced_threshold"].as_float(), Some(80.0));
    }

    #[test]
    fn set_toml_value_rejects_unknown_keys() {
        let mut root: toml::Value = toml::from_str("[chat]\nbusy_policy = \"queue\"\n").unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "x").is_err());
        assert!(set_toml_value(&mut root, "chat.nope", "x").is_err());
        assert!(set_toml_value(&mut root, "", "x").is_err());
    }

    #[test]
    fn show_effective_config_returns_toml() {
        let toml_str = show_effective_config().unwrap();
        let _: SentinelConfig = toml::from_str(&toml_str).unwrap();
    }
}
