//! Cached team and player lookups.

use std::time::Duration;

use tracing::instrument;

use crate::cache::CacheAsideStore;
use crate::config::CacheSettings;
use crate::context::FetchContext;
use crate::domain::{GameDate, Player, Team};
use crate::error::{ApiError, ValidationError};
use crate::upstream::UpstreamClient;

pub const TEAMS_KEY: &str = "teams";

pub fn player_key(id: i64) -> String {
    format!("player:{id}")
}

/// Team list and single-player reads, each cached with its own TTL.
#[derive(Debug, Clone)]
pub struct LeagueService {
    upstream: UpstreamClient,
    cache: CacheAsideStore,
    teams_ttl: Duration,
    players_ttl: Duration,
    today: Option<GameDate>,
}

impl LeagueService {
    pub fn new(upstream: UpstreamClient, cache: CacheAsideStore, ttls: &CacheSettings) -> Self {
        Self {
            upstream,
            cache,
            teams_ttl: ttls.teams_ttl(),
            players_ttl: ttls.players_ttl(),
            today: None,
        }
    }

    /// Pin the date used for team discovery instead of the local date.
    pub fn with_today(mut self, today: GameDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn today(&self) -> GameDate {
        self.today.unwrap_or_else(GameDate::today)
    }

    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    pub fn cache(&self) -> &CacheAsideStore {
        &self.cache
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_teams(&self, ctx: &FetchContext) -> Result<Vec<Team>, ApiError> {
        let today = self.today();
        let teams: Vec<Team> = self
            .cache
            .get_or_load(TEAMS_KEY, self.teams_ttl, || {
                self.upstream.get_teams(ctx, today)
            })
            .await?;
        if teams.is_empty() {
            return Err(ApiError::not_found("no teams available"));
        }
        Ok(teams)
    }

    /// Fails `NotFound` for id 0 or an unknown player, `InvalidRequest` for
    /// a negative id.
    #[instrument(skip(self, ctx))]
    pub async fn get_player(&self, ctx: &FetchContext, id: i64) -> Result<Player, ApiError> {
        if id < 0 {
            return Err(ValidationError::NegativePlayerId { id }.into());
        }
        self.cache
            .get_or_load(&player_key(id), self.players_ttl, || {
                self.upstream.get_player(ctx, id)
            })
            .await
    }
}
