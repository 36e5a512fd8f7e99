//! # Puckline Core
//!
//! Resilient aggregation and caching in front of a public hockey statistics
//! API.
//!
//! ## Overview
//!
//! - **Upstream client** that normalizes three upstream schema generations,
//!   retries rate limits and falls back across team discovery endpoints
//! - **Cache-aside store** with per-resource TTLs
//! - **Team/roster reconciler** that fans out roster fetches and atomically
//!   replaces the persisted snapshot
//! - **Game aggregator** that merges live box scores with the roster catalog
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Read-through TTL cache |
//! | [`config`] | Settings and `PUCKLINE_*` environment overrides |
//! | [`context`] | Cancellation and deadline context |
//! | [`domain`] | Teams, players, live feeds and games |
//! | [`error`] | Core error types |
//! | [`games`] | Game view aggregation |
//! | [`http_client`] | HTTP client abstraction |
//! | [`league`] | Cached team and player reads |
//! | [`reconciler`] | Team/roster snapshot reconciliation |
//! | [`retry`] | Rate-limit retry policy |
//! | [`schema`] | Upstream schema adapters |
//! | [`throttling`] | Request pacing |
//! | [`upstream`] | Upstream API client |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use puckline_core::{FetchContext, Puckline, Settings, Warehouse};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env()?;
//!     let warehouse = Warehouse::open(settings.warehouse.config())?;
//!     let puckline = Puckline::with_reqwest(&settings, warehouse);
//!
//!     let games = puckline
//!         .get_games(&FetchContext::background(), "2024-10-12")
//!         .await?;
//!     println!("{} games", games.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`ApiError`]; branch on its kind:
//!
//! ```rust
//! use puckline_core::{ApiError, ApiErrorKind};
//!
//! fn handle_error(error: ApiError) {
//!     match error.kind() {
//!         ApiErrorKind::NotFound => {
//!             // Answer 404
//!         }
//!         ApiErrorKind::Upstream => {
//!             // Pass error.status() through
//!         }
//!         _ => {}
//!     }
//! }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod games;
pub mod http_client;
pub mod league;
pub mod reconciler;
pub mod retry;
pub mod schema;
pub mod throttling;
pub mod upstream;

use std::sync::Arc;

// Caching
pub use cache::CacheAsideStore;

// Configuration
pub use config::{
    CacheSettings, GameSettings, ReconcileSettings, RetrySettings, Settings, UpstreamSettings,
    WarehouseSettings,
};

pub use context::FetchContext;

// Domain models
pub use domain::{
    FeedPlayer, FeedSide, Game, GameDate, GamePlayer, GameStatus, GameTeam, GoalieStats,
    LiveFeed, Player, PlayerKind, Team, TeamRoster,
};

// Error types
pub use error::{ApiError, ApiErrorKind, ValidationError};

// Services
pub use games::GameAggregator;
pub use league::LeagueService;
pub use reconciler::{RefreshReport, TeamRosterReconciler};
pub use upstream::UpstreamClient;

// HTTP client types
pub use http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Retry and pacing
pub use retry::{Backoff, RetryPolicy};
pub use throttling::RequestPacer;

pub use schema::{SchemaAdapter, SchemaGeneration};

// Warehouse (re-exported from puckline-warehouse)
pub use puckline_warehouse::{RefreshLogEntry, RefreshStatus, Warehouse, WarehouseConfig, WarehouseError};

/// The five core operations, wired over one shared cache and warehouse.
#[derive(Debug, Clone)]
pub struct Puckline {
    league: LeagueService,
    reconciler: TeamRosterReconciler,
    games: GameAggregator,
}

impl Puckline {
    pub fn new(http: Arc<dyn HttpClient>, settings: &Settings, warehouse: Warehouse) -> Self {
        let upstream = UpstreamClient::from_settings(http, settings);
        let league = LeagueService::new(upstream, CacheAsideStore::new(), &settings.cache);
        Self::from_league(league, settings, warehouse)
    }

    /// Wired with the production reqwest transport.
    pub fn with_reqwest(settings: &Settings, warehouse: Warehouse) -> Self {
        Self::new(Arc::new(ReqwestHttpClient::new()), settings, warehouse)
    }

    /// Wire the reconciler and aggregator around an existing league service,
    /// sharing its upstream client and cache.
    pub fn from_league(league: LeagueService, settings: &Settings, warehouse: Warehouse) -> Self {
        let reconciler = TeamRosterReconciler::new(league.clone(), warehouse, settings);
        let games = GameAggregator::new(league.clone(), reconciler.clone(), settings);
        Self {
            league,
            reconciler,
            games,
        }
    }

    pub fn cache(&self) -> &CacheAsideStore {
        self.league.cache()
    }

    pub fn warehouse(&self) -> &Warehouse {
        self.reconciler.warehouse()
    }

    pub async fn get_teams(&self, ctx: &FetchContext) -> Result<Vec<Team>, ApiError> {
        self.league.get_teams(ctx).await
    }

    pub async fn get_player(&self, ctx: &FetchContext, id: i64) -> Result<Player, ApiError> {
        self.league.get_player(ctx, id).await
    }

    pub async fn get_teams_with_rosters(
        &self,
        ctx: &FetchContext,
    ) -> Result<Vec<TeamRoster>, ApiError> {
        self.reconciler.get_teams_with_rosters(ctx).await
    }

    pub async fn refresh_teams_and_rosters(
        &self,
        ctx: &FetchContext,
    ) -> Result<RefreshReport, ApiError> {
        self.reconciler.refresh_teams_and_rosters(ctx).await
    }

    /// Games for a `YYYY-MM-DD` date.
    pub async fn get_games(&self, ctx: &FetchContext, date: &str) -> Result<Vec<Game>, ApiError> {
        self.games.get_games(ctx, date).await
    }
}
