//! One-shot command implementations.
//!
//! Provides subcommand handlers for:
//! - `sentinel stats | demographics | geography | categories | temporal`
//! - `sentinel search "query" [--silenced]`
//! - `sentinel chat "message" [--session ID]`, `sessions`, `history ID`,
//!   `history-search "query"`
//! - `sentinel investigate`
//! - `sentinel health`
//! - `sentinel config show|init|set|reset`
//!
//! Each handler makes one blocking backend call and prints the result. The
//! interactive console lives in [`crate::console`].

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::api::types::INCOME_BRACKETS;
use crate::api::{Backend, HttpBackend, Role, SearchQuery, SessionId};
use crate::config::{self, SentinelConfig};
use crate::console::{markdown, print_results};
use crate::utils::format::{format_number, truncate};
use crate::views::{ViewData, demographics};

/// Output format for data commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            _ => Self::Table,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize output")?
    );
    Ok(())
}

fn heading(title: &str) {
    println!("{}", title.bold().cyan());
    println!("{}", "=".repeat(60));
}

// ---------------------------------------------------------------------------
// sentinel stats | demographics | geography | categories | temporal
// ---------------------------------------------------------------------------

/// Summary statistics with the derived silenced count and alert.
pub fn run_stats(backend: &dyn Backend, format: OutputFormat) -> Result<()> {
    let stats = backend.stats().context("failed to fetch statistics")?;
    if format == OutputFormat::Json {
        return print_json(&stats);
    }

    heading("Overview");
    print_summary(&ViewData::Overview(stats));
    Ok(())
}

pub fn run_demographics(backend: &dyn Backend, format: OutputFormat) -> Result<()> {
    let data = backend
        .demographics()
        .context("failed to fetch demographic breakdown")?;
    if format == OutputFormat::Json {
        return print_json(&data);
    }

    heading("Demographic Analysis");
    for (label, groups, order) in [
        ("Gender", &data.by_gender, None),
        ("Caste", &data.by_caste, None),
        ("Income", &data.by_income, Some(INCOME_BRACKETS)),
    ] {
        println!();
        println!(
            "  {:<12} {:>10} {:>10} {:>8}",
            label.bold(),
            "Avg score",
            "Silenced",
            "Count"
        );
        let keys: Vec<&str> = match order {
            Some(order) => order
                .iter()
                .copied()
                .filter(|k| groups.contains_key(*k))
                .chain(
                    groups
                        .keys()
                        .map(String::as_str)
                        .filter(|k| !order.contains(k)),
                )
                .collect(),
            None => groups.keys().map(String::as_str).collect(),
        };
        for key in keys {
            if let Some(g) = groups.get(key) {
                println!(
                    "  {:<12} {:>10.1} {:>9.1}% {:>8}",
                    key,
                    g.avg_silence,
                    g.silenced_pct,
                    format_number(g.count)
                );
            }
        }
    }

    println!();
    let findings = demographics::findings(&data);
    if findings.is_empty() {
        println!("{}", "  Not enough data for group comparisons.".dimmed());
    }
    for finding in findings {
        println!("  {} {}", "•".yellow(), finding.text);
    }
    Ok(())
}

pub fn run_geography(backend: &dyn Backend, top_n: u32, format: OutputFormat) -> Result<()> {
    let data = backend
        .geography(top_n)
        .context("failed to fetch ward breakdown")?;
    if format == OutputFormat::Json {
        return print_json(&data);
    }

    heading("Most Silenced Wards");
    print_summary(&ViewData::Geography(data));
    Ok(())
}

pub fn run_categories(backend: &dyn Backend, format: OutputFormat) -> Result<()> {
    let rows = backend
        .complaint_types()
        .context("failed to fetch complaint categories")?;
    if format == OutputFormat::Json {
        return print_json(&rows);
    }

    heading("Complaint Categories");
    for row in &rows {
        println!(
            "  {:<28} {:>9.1}% {:>8}",
            truncate(&row.category, 28),
            row.silenced_pct,
            format_number(row.count)
        );
    }
    println!();
    print_summary(&ViewData::Categories(rows));
    Ok(())
}

pub fn run_temporal(backend: &dyn Backend, format: OutputFormat) -> Result<()> {
    let rows = backend
        .temporal_decay()
        .context("failed to fetch temporal breakdown")?;
    if format == OutputFormat::Json {
        return print_json(&rows);
    }

    heading("Temporal Analysis");
    for row in &rows {
        println!(
            "  {:<16} {:>9.1}% {:>10.1} {:>8}",
            row.time_bucket,
            row.silenced_pct,
            row.avg_silence,
            format_number(row.count)
        );
    }
    println!();
    print_summary(&ViewData::Temporal(rows));
    Ok(())
}

fn print_summary(data: &ViewData) {
    for line in data.content().summary {
        println!("  {line}");
    }
}

// ---------------------------------------------------------------------------
// sentinel search
// ---------------------------------------------------------------------------

pub fn run_search(
    backend: &dyn Backend,
    config: &SentinelConfig,
    query: &str,
    silenced: bool,
    format: OutputFormat,
) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        println!("{}", "Enter a search query.".yellow());
        return Ok(());
    }

    let request = SearchQuery {
        query: query.to_string(),
        top_k: config.search.top_k,
        silence_threshold: silenced.then_some(config.search.silenced_threshold),
    };
    let results = backend.search(&request).context("search failed")?;

    if format == OutputFormat::Json {
        return print_json(&results);
    }
    if results.results.is_empty() {
        println!("{}", format!("No complaints matched '{query}'.").yellow());
        return Ok(());
    }
    print_results(&results);
    Ok(())
}

// ---------------------------------------------------------------------------
// sentinel chat | sessions | history | history-search
// ---------------------------------------------------------------------------

pub fn run_chat(backend: &dyn Backend, message: &str, session: Option<&str>) -> Result<()> {
    let message = message.trim();
    if message.is_empty() {
        return Ok(());
    }

    let session = session.map(SessionId::new);
    let reply = backend
        .chat(message, session.as_ref())
        .context("chat request failed")?;

    for line in markdown::render(&reply.response) {
        println!("{line}");
    }
    if !reply.tools_used.is_empty() {
        println!();
        println!("{}", format!("tools used: {}", reply.tools_used.join(", ")).dimmed());
    }
    if reply.chart.is_some() {
        println!("{}", "(chart attached; open the console to view it)".dimmed());
    }
    if let Some(id) = reply.session_id {
        println!("{}", format!("session: {id}").dimmed());
    }
    Ok(())
}

pub fn run_sessions(backend: &dyn Backend, format: OutputFormat) -> Result<()> {
    let sessions = backend.sessions().context("failed to list sessions")?;
    if format == OutputFormat::Json {
        return print_json(&sessions);
    }
    if sessions.is_empty() {
        println!("{}", "No sessions yet. Start one with `sentinel chat`.".yellow());
        return Ok(());
    }

    heading("Chat Sessions");
    for s in &sessions {
        println!(
            "  {:<38} {:<28} {}",
            s.id.as_str(),
            truncate(&s.display_name, 28),
            s.created_at.as_deref().unwrap_or("").dimmed()
        );
    }
    Ok(())
}

pub fn run_history(backend: &dyn Backend, session: &str) -> Result<()> {
    let messages = backend
        .history(&SessionId::new(session))
        .with_context(|| format!("failed to load history for session {session}"))?;

    for m in &messages {
        match m.role {
            Role::User => println!("{} {}", "you ›".bold().green(), m.content),
            Role::Assistant => {
                println!("{}", "sentinel ›".bold().cyan());
                for line in markdown::render(&m.content) {
                    println!("  {line}");
                }
            }
            Role::System => println!("{}", format!("· {}", m.content).dimmed()),
        }
    }
    Ok(())
}

pub fn run_history_search(
    backend: &dyn Backend,
    query: &str,
    session: Option<&str>,
    limit: u32,
) -> Result<()> {
    let session = session.map(SessionId::new);
    let hits = backend
        .search_history(query, session.as_ref(), limit)
        .context("history search failed")?;

    if hits.is_empty() {
        println!("{}", format!("No messages matched '{query}'.").yellow());
        return Ok(());
    }
    for hit in &hits {
        let session = hit
            .session_id
            .as_ref()
            .map(SessionId::as_str)
            .unwrap_or("?");
        println!(
            "  {:>5.2}  {:<10} {:<12} {}",
            hit.score,
            format!("{:?}", hit.role).to_lowercase(),
            truncate(session, 12),
            truncate(&hit.content, 70)
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// sentinel investigate
// ---------------------------------------------------------------------------

pub fn run_investigate(backend: &dyn Backend) -> Result<()> {
    println!(
        "{}",
        "Running full investigation. This can take several minutes…".dimmed()
    );
    let report = backend.investigate().context("investigation failed")?;
    for line in markdown::render(&report.report) {
        println!("{line}");
    }
    if let Some(file) = report.report_file {
        println!();
        println!("{}", format!("Saved to {file}").dimmed());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// sentinel health
// ---------------------------------------------------------------------------

pub fn run_health(backend: &HttpBackend) -> Result<()> {
    heading("Sentinel Health Check");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.sentinel/config.toml found"
        } else {
            "not found (run `sentinel config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".sentinel.toml found"
        } else {
            "none (optional)"
        },
    );

    match backend.health() {
        Ok(health) => print_health_item(
            "Backend",
            health.status == "healthy",
            &format!("{} at {} ({})", health.service, backend.base_url(), health.status),
        ),
        Err(e) => print_health_item(
            "Backend",
            false,
            &format!("not reachable at {}: {e}", backend.base_url()),
        ),
    }

    match backend.stats() {
        Ok(stats) => print_health_item(
            "Data",
            stats.total_complaints > 0,
            &format!("{} complaints indexed", format_number(stats.total_complaints)),
        ),
        Err(e) => print_health_item("Data", false, &e.to_string()),
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<25} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// sentinel config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    heading("Effective Sentinel Configuration");
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    if global_exists {
        println!("  {} {}", "✓".green(), "~/.sentinel/config.toml".dimmed());
    } else {
        println!(
            "  {} {}",
            "·".dimmed(),
            "~/.sentinel/config.toml (not found)".dimmed()
        );
    }
    if project_exists {
        println!("  {} {}", "✓".green(), ".sentinel.toml".dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), ".sentinel.toml (not found)".dimmed());
    }
    println!(
        "  {} {}",
        "·".dimmed(),
        "SENTINEL_* environment variables".dimmed()
    );

    Ok(())
}

/// Initialize a default config file at `~/.sentinel/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}
