//! Upstream API client.
//!
//! Every call goes through [`UpstreamClient::get_json`], which paces the
//! request, retries HTTP 429 with the configured [`RetryPolicy`] and turns
//! every other failure into a terminal [`ApiError`].

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::config::{Settings, UpstreamSettings};
use crate::context::FetchContext;
use crate::domain::{dedupe_by_id, GameDate, LiveFeed, Player, Team};
use crate::error::{ApiError, ApiErrorKind, ValidationError};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::retry::{parse_retry_after, RetryPolicy};
use crate::schema::{trailing_game_id, SchemaAdapter};
use crate::throttling::RequestPacer;

/// Team discovery sources, tried in order until one yields teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TeamSource {
    SeasonStandings(GameDate),
    CurrentStandings,
    Scoreboard(GameDate),
}

impl TeamSource {
    fn path(self) -> String {
        match self {
            Self::SeasonStandings(date) => format!("/standings/{date}"),
            Self::CurrentStandings => String::from("/standings/now"),
            Self::Scoreboard(date) => format!("/scoreboard/{date}"),
        }
    }
}

/// Normalizing client for the upstream statistics API.
#[derive(Clone)]
pub struct UpstreamClient {
    http: Arc<dyn HttpClient>,
    adapter: SchemaAdapter,
    base_url: String,
    auth: HttpAuth,
    retry: RetryPolicy,
    pacer: RequestPacer,
    timeout_ms: u64,
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("base_url", &self.base_url)
            .field("generation", &self.adapter.generation())
            .field("retry", &self.retry)
            .field("pacer", &self.pacer)
            .finish_non_exhaustive()
    }
}

impl UpstreamClient {
    pub fn new(http: Arc<dyn HttpClient>, settings: &UpstreamSettings) -> Self {
        let base_url = settings.base_url.trim().trim_end_matches('/').to_string();
        Self {
            http,
            adapter: SchemaAdapter::new(settings.schema, base_url.clone()),
            base_url,
            auth: settings.auth(),
            retry: RetryPolicy::default(),
            pacer: settings.pacer(),
            timeout_ms: settings.timeout_ms,
        }
    }

    /// Client configured from the upstream and retry sections of `settings`.
    pub fn from_settings(http: Arc<dyn HttpClient>, settings: &Settings) -> Self {
        Self::new(http, &settings.upstream).with_retry_policy(settings.retry.policy())
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Teams from the first discovery source that yields any: season
    /// standings, current standings, then today's scoreboard.
    ///
    /// A failing source is logged and skipped. Fails with `NotFound` when no
    /// source yields a team, or with the last source error when every
    /// source failed.
    #[instrument(skip(self, ctx), fields(today = %today))]
    pub async fn get_teams(
        &self,
        ctx: &FetchContext,
        today: GameDate,
    ) -> Result<Vec<Team>, ApiError> {
        let sources = [
            TeamSource::SeasonStandings(today.season_start()),
            TeamSource::CurrentStandings,
            TeamSource::Scoreboard(today),
        ];

        let mut any_answered = false;
        let mut last_error = None;
        for source in sources {
            match self.teams_from(ctx, source).await {
                Ok(teams) if !teams.is_empty() => {
                    let teams = dedupe_by_id(teams);
                    debug!(source = ?source, count = teams.len(), "resolved teams");
                    return Ok(teams);
                }
                Ok(_) => {
                    any_answered = true;
                    debug!(source = ?source, "team source yielded no teams");
                }
                Err(err) if err.kind() == ApiErrorKind::Cancelled => return Err(err),
                Err(err) => {
                    warn!(source = ?source, error = %err, "team source failed, trying next");
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if !any_answered => Err(err),
            _ => Err(ApiError::not_found("no teams returned by any team source")),
        }
    }

    async fn teams_from(
        &self,
        ctx: &FetchContext,
        source: TeamSource,
    ) -> Result<Vec<Team>, ApiError> {
        let raw = self.get_json(ctx, &source.path()).await?;
        match source {
            TeamSource::SeasonStandings(_) | TeamSource::CurrentStandings => {
                self.adapter.standings_teams(raw)
            }
            TeamSource::Scoreboard(_) => self.adapter.scoreboard_teams(raw),
        }
    }

    /// Single player from its landing resource.
    #[instrument(skip(self, ctx))]
    pub async fn get_player(&self, ctx: &FetchContext, id: i64) -> Result<Player, ApiError> {
        if id == 0 {
            return Err(ApiError::not_found("player id 0 does not exist"));
        }
        let raw = self.get_json(ctx, &format!("/player/{id}/landing")).await?;
        self.adapter
            .player(raw)?
            .ok_or_else(|| ApiError::not_found(format!("player {id} not found")))
    }

    /// Current roster of the team with `abbreviation`, every position group
    /// merged.
    #[instrument(skip(self, ctx))]
    pub async fn get_roster(
        &self,
        ctx: &FetchContext,
        abbreviation: &str,
    ) -> Result<Vec<Player>, ApiError> {
        let abbreviation = abbreviation.trim();
        if abbreviation.is_empty() {
            return Err(ValidationError::EmptyAbbreviation.into());
        }
        let path = format!("/roster/{}/current", urlencoding::encode(abbreviation));
        let raw = self.get_json(ctx, &path).await?;
        self.adapter.roster(raw)
    }

    /// References of the games scheduled on exactly `date`.
    #[instrument(skip(self, ctx), fields(date = %date))]
    pub async fn get_schedule_games_by_date(
        &self,
        ctx: &FetchContext,
        date: GameDate,
    ) -> Result<Vec<String>, ApiError> {
        let raw = self.get_json(ctx, &format!("/schedule/{date}")).await?;
        self.adapter.schedule(raw, date)
    }

    /// Box score of the game named by `reference`, which may be a bare id or
    /// any path ending in one.
    #[instrument(skip(self, ctx))]
    pub async fn get_live_feed(
        &self,
        ctx: &FetchContext,
        reference: &str,
    ) -> Result<LiveFeed, ApiError> {
        let game_id = trailing_game_id(reference).ok_or_else(|| {
            ApiError::invalid_request(format!("no game id in reference '{reference}'"))
        })?;
        let raw = self
            .get_json(ctx, &format!("/gamecenter/{game_id}/boxscore"))
            .await?;
        self.adapter
            .live_feed(raw, game_id)?
            .ok_or_else(|| ApiError::not_found(format!("no live feed for game {game_id}")))
    }

    /// GET `path` below the base URL and return its JSON object body.
    pub async fn get_json(&self, ctx: &FetchContext, path: &str) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0_u32;

        loop {
            self.pacer.acquire(ctx).await?;
            let request = HttpRequest::get(url.as_str())
                .with_auth(&self.auth)
                .with_timeout_ms(self.timeout_ms);

            let response = ctx.run(self.http.execute(request)).await?.map_err(|err| {
                error!(url = %url, error = %err, "upstream transport failure");
                ApiError::transport(err.message()).with_url(url.as_str())
            })?;

            if response.is_rate_limited() {
                if attempt >= self.retry.max_rate_limit_retries {
                    error!(url = %url, attempts = attempt + 1, "rate limit retries exhausted");
                    return Err(ApiError::rate_limited(url));
                }
                let hint = response.header("retry-after").and_then(parse_retry_after);
                let delay = self.retry.delay_for_attempt(attempt, hint);
                warn!(
                    url = %url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "rate limited by upstream, retrying"
                );
                ctx.sleep(delay).await?;
                attempt += 1;
                continue;
            }

            if !response.is_success() {
                error!(url = %url, status = response.status, "upstream returned error status");
                return Err(ApiError::upstream(response.status, url));
            }

            let value: Value = serde_json::from_str(&response.body).map_err(|err| {
                error!(url = %url, status = response.status, error = %err, "upstream body is not JSON");
                ApiError::parse(format!("response body is not valid JSON: {err}"))
                    .with_url(url.as_str())
            })?;
            if !value.is_object() {
                error!(url = %url, status = response.status, "upstream body is not a JSON object");
                return Err(ApiError::parse("response body is not a JSON object").with_url(url));
            }
            return Ok(value);
        }
    }
}
