use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use sentinel::activity::ActivityLog;
use sentinel::api::HttpBackend;
use sentinel::cli::{self, OutputFormat};
use sentinel::config;
use sentinel::console::Console;

#[derive(Debug, Parser)]
#[command(name = "sentinel")]
#[command(about = "Investigation console for silenced civic complaints")]
struct App {
    /// Backend base URL, including the /api prefix (overrides config)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive console (default)
    Console,
    /// Overall silence statistics
    Stats {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Silence by gender, caste and income
    Demographics {
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Most silenced wards
    Geography {
        /// Number of wards to show (default from config)
        #[arg(long)]
        top: Option<u32>,
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Silenced share per complaint category
    Categories {
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Silenced share by days in system
    Temporal {
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Semantic search over complaints
    Search {
        /// Free-text query
        #[arg(required = true)]
        query: Vec<String>,
        /// Only complaints above the silenced threshold
        #[arg(long)]
        silenced: bool,
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Ask the investigation agent one question
    Chat {
        #[arg(required = true)]
        message: Vec<String>,
        /// Continue an existing session
        #[arg(long)]
        session: Option<String>,
    },
    /// List chat sessions
    Sessions {
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Print a session's message history
    History {
        /// Session id
        session: String,
    },
    /// Semantic search over past chat messages
    HistorySearch {
        #[arg(required = true)]
        query: Vec<String>,
        /// Restrict to one session
        #[arg(long)]
        session: Option<String>,
        #[arg(long, default_value = "10")]
        limit: u32,
    },
    /// Run the full multi-step investigation report
    Investigate,
    /// Check config and backend reachability
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write the default config to ~/.sentinel/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `chat.busy_policy reject`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    let mut cfg = config::load();
    if let Some(url) = app.api_url {
        cfg.backend.base_url = url;
    }
    if !cfg.display.color {
        colored::control::set_override(false);
    }

    let log = ActivityLog::from_config(&cfg.logging);
    let backend = HttpBackend::from_config(&cfg.backend, log.clone());
    let fmt = |format: &str| OutputFormat::from_str_opt(Some(format));

    match app.command.unwrap_or(Commands::Console) {
        Commands::Console => Console::new(Arc::new(backend), cfg, log).run(),
        Commands::Stats { format } => cli::run_stats(&backend, fmt(&format)),
        Commands::Demographics { format } => cli::run_demographics(&backend, fmt(&format)),
        Commands::Geography { top, format } => {
            let top_n = top.unwrap_or(cfg.geography.top_n);
            cli::run_geography(&backend, top_n, fmt(&format))
        }
        Commands::Categories { format } => cli::run_categories(&backend, fmt(&format)),
        Commands::Temporal { format } => cli::run_temporal(&backend, fmt(&format)),
        Commands::Search {
            query,
            silenced,
            format,
        } => cli::run_search(&backend, &cfg, &query.join(" "), silenced, fmt(&format)),
        Commands::Chat { message, session } => {
            cli::run_chat(&backend, &message.join(" "), session.as_deref())
        }
        Commands::Sessions { format } => cli::run_sessions(&backend, fmt(&format)),
        Commands::History { session } => cli::run_history(&backend, &session),
        Commands::HistorySearch {
            query,
            session,
            limit,
        } => cli::run_history_search(&backend, &query.join(" "), session.as_deref(), limit),
        Commands::Investigate => cli::run_investigate(&backend),
        Commands::Health => cli::run_health(&backend),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
