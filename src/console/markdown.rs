//! Terminal rendering for the assistant's markdown replies.
//!
//! Covers what the agent actually emits: `#` headings, `**bold**`,
//! `` `code` ``, `-`/`*` bullets, numbered lists and `---` rules. Anything
//! else passes through unchanged.

use std::sync::LazyLock;

use colored::Colorize;
use regex::Regex;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").expect("heading regex must compile"));

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)[-*+]\s+(.*)$").expect("bullet regex must compile"));

static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(\d+)[.)]\s+(.*)$").expect("numbered regex must compile"));

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*|__([^_]+)__").expect("bold regex must compile"));

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("code regex must compile"));

static RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([-*_])(\s*[-*_]){2,}\s*$").expect("rule regex must compile"));

/// Render markdown into terminal lines.
pub fn render(text: &str) -> Vec<String> {
    let mut in_fence = false;
    let mut lines = Vec::new();

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            lines.push(format!("    {}", line.dimmed()));
            continue;
        }
        lines.push(render_line(line));
    }
    lines
}

fn render_line(line: &str) -> String {
    if RULE_RE.is_match(line) {
        return "─".repeat(40).dimmed().to_string();
    }
    if let Some(caps) = HEADING_RE.captures(line) {
        let text = inline(&caps[2]);
        return if caps[1].len() <= 2 {
            text.bold().cyan().to_string()
        } else {
            text.bold().to_string()
        };
    }
    if let Some(caps) = BULLET_RE.captures(line) {
        return format!("{}  • {}", &caps[1], inline(&caps[2]));
    }
    if let Some(caps) = NUMBERED_RE.captures(line) {
        return format!("{}  {}. {}", &caps[1], &caps[2], inline(&caps[3]));
    }
    inline(line)
}

/// Inline spans: bold and code.
fn inline(text: &str) -> String {
    let text = CODE_RE.replace_all(text, |caps: &regex::Captures| caps[1].yellow().to_string());
    BOLD_RE
        .replace_all(&text, |caps: &regex::Captures| {
            let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            inner.bold().to_string()
        })
        .into_owned()
}
