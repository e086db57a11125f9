//! Sentinel: an investigation console for civic complaint analytics.
//!
//! The library holds the client orchestration core (screen navigation,
//! chat sessions, chart slots, search and the long-running report) plus the
//! HTTP client for the analytics backend. The `sentinel` binary hosts it in
//! an interactive terminal console and exposes one-shot subcommands.

pub mod activity;
pub mod api;
pub mod charts;
pub mod chat;
pub mod cli;
pub mod config;
pub mod console;
pub mod nav;
pub mod report;
pub mod search;
pub mod session;
pub mod utils;
pub mod views;
