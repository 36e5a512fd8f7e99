//! CLI argument definitions for puckline.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `teams` | List league teams |
//! | `player` | Show one player |
//! | `rosters` | Show every team with its roster |
//! | `refresh` | Re-fetch teams and rosters into the warehouse |
//! | `games` | Show enriched games for a date |
//! | `history` | Show recent refresh attempts |
//!
//! Global options mirror the `PUCKLINE_*` environment variables; a flag wins
//! over the variable.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Hockey statistics aggregation CLI.
#[derive(Debug, Parser)]
#[command(
    name = "puckline",
    author,
    version,
    about = "Normalized, cached access to league teams, rosters, players and live games"
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    /// Upstream API base URL.
    #[arg(long, global = true, env = "PUCKLINE_BASE_URL")]
    pub base_url: Option<String>,

    /// API key forwarded to the upstream on every call.
    #[arg(long, global = true, env = "PUCKLINE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Upstream schema generation (legacy, locale-v1, locale-v2).
    #[arg(long, global = true, env = "PUCKLINE_SCHEMA")]
    pub schema: Option<String>,

    /// Per-request timeout in milliseconds.
    #[arg(long, global = true, env = "PUCKLINE_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Concurrent roster fetches during a refresh.
    #[arg(long, global = true, env = "PUCKLINE_FANOUT")]
    pub fan_out: Option<usize>,

    /// Path to the DuckDB warehouse file.
    #[arg(long, global = true, env = "PUCKLINE_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Use a throwaway in-memory warehouse.
    #[arg(long, global = true, default_value_t = false)]
    pub in_memory: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List league teams.
    ///
    ///   puckline teams --pretty
    Teams,

    /// Show one player by id.
    ///
    ///   puckline player 8478402
    Player(PlayerArgs),

    /// Show every team with its persisted roster, refreshing first when the
    /// warehouse is empty.
    Rosters,

    /// Re-fetch all teams and rosters and replace the persisted snapshot.
    Refresh,

    /// Show enriched games for a date.
    ///
    ///   puckline games
    ///   puckline games 2024-10-12
    Games(GamesArgs),

    /// Show recent refresh attempts from the warehouse log.
    History(HistoryArgs),
}

#[derive(Debug, Args)]
pub struct PlayerArgs {
    /// Upstream player id.
    pub id: i64,
}

#[derive(Debug, Args)]
pub struct GamesArgs {
    /// Date as YYYY-MM-DD; defaults to today.
    pub date: Option<String>,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Maximum number of entries.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}
