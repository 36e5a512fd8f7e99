//! Team/roster reconciliation against the warehouse snapshot.
//!
//! A refresh walks `Fetching(teams) -> FetchingRosters -> Committing` and ends
//! either committed, which drops the cached catalog, or rolled back, which
//! leaves the previous snapshot as the effective state.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use puckline_warehouse::{
    RefreshLogEntry, RefreshStatus, RosterSnapshot, SnapshotCounts, Warehouse, WarehouseError,
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::cache::CacheAsideStore;
use crate::config::Settings;
use crate::context::FetchContext;
use crate::domain::{Player, Team, TeamRoster};
use crate::error::{ApiError, ApiErrorKind};
use crate::league::LeagueService;

pub const CATALOG_KEY: &str = "teams_with_rosters";

const ROSTER_PREFIX: &str = "roster:";

pub fn roster_key(abbreviation: &str) -> String {
    format!("{ROSTER_PREFIX}{}", abbreviation.trim().to_ascii_uppercase())
}

/// Outcome of a committed refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub run_id: Uuid,
    pub team_count: usize,
    pub player_count: usize,
    /// Teams whose roster could not be fetched and were stored empty.
    pub failed_rosters: Vec<String>,
    pub latency_ms: u64,
}

impl RefreshReport {
    pub fn is_partial(&self) -> bool {
        !self.failed_rosters.is_empty()
    }
}

/// Maintains the persisted team/roster snapshot and the cached catalog
/// built from it.
#[derive(Clone)]
pub struct TeamRosterReconciler {
    league: LeagueService,
    warehouse: Warehouse,
    rosters_ttl: Duration,
    fan_out: usize,
}

impl std::fmt::Debug for TeamRosterReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamRosterReconciler")
            .field("db_path", &self.warehouse.db_path())
            .field("rosters_ttl", &self.rosters_ttl)
            .field("fan_out", &self.fan_out)
            .finish_non_exhaustive()
    }
}

impl TeamRosterReconciler {
    pub fn new(league: LeagueService, warehouse: Warehouse, settings: &Settings) -> Self {
        Self {
            league,
            warehouse,
            rosters_ttl: settings.cache.rosters_ttl(),
            fan_out: settings.reconcile.roster_fan_out.max(1),
        }
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    fn cache(&self) -> &CacheAsideStore {
        self.league.cache()
    }

    /// The team/roster catalog, from cache or the persisted snapshot. An
    /// empty snapshot triggers a full refresh first.
    #[instrument(skip(self, ctx))]
    pub async fn get_teams_with_rosters(
        &self,
        ctx: &FetchContext,
    ) -> Result<Vec<TeamRoster>, ApiError> {
        self.cache()
            .get_or_load(CATALOG_KEY, self.rosters_ttl, || async {
                let mut snapshot = self.load_snapshot().await?;
                if snapshot.is_empty() {
                    info!("persisted snapshot is empty, refreshing");
                    self.refresh_teams_and_rosters(ctx).await?;
                    snapshot = self.load_snapshot().await?;
                }
                Ok::<_, ApiError>(catalog_from_snapshot(snapshot))
            })
            .await
    }

    /// Fetch every team and its roster, then atomically replace the
    /// persisted snapshot.
    ///
    /// Cached rosters are dropped first so every roster is fetched fresh.
    /// Roster failures are logged and stored as empty rosters. A commit
    /// failure rolls back, is logged to `refresh_log` and is returned.
    #[instrument(skip(self, ctx))]
    pub async fn refresh_teams_and_rosters(
        &self,
        ctx: &FetchContext,
    ) -> Result<RefreshReport, ApiError> {
        let started = Instant::now();
        let run_id = Uuid::new_v4();

        let teams = self.league.get_teams(ctx).await?;
        let stale = self.cache().invalidate_prefix(ROSTER_PREFIX).await;
        info!(%run_id, teams = teams.len(), fan_out = self.fan_out, stale, "fetching rosters");

        let fetched: Vec<(Team, Result<Vec<Player>, ApiError>)> = stream::iter(teams)
            .map(|team| async move {
                let roster = self.roster_for(ctx, &team).await;
                (team, roster)
            })
            .buffered(self.fan_out)
            .collect()
            .await;
        ctx.check()?;

        let mut rosters = Vec::with_capacity(fetched.len());
        let mut failed_rosters = Vec::new();
        for (team, roster) in fetched {
            match roster {
                Ok(players) => rosters.push(TeamRoster::new(team, players)),
                Err(err) if err.kind() == ApiErrorKind::Cancelled => return Err(err),
                Err(err) => {
                    let label = team
                        .roster_key()
                        .map_or_else(|| team.id.to_string(), str::to_string);
                    warn!(%run_id, team = %label, error = %err, "roster fetch failed, storing empty roster");
                    failed_rosters.push(label);
                    rosters.push(TeamRoster::new(team, Vec::new()));
                }
            }
        }

        let snapshot = snapshot_from_catalog(&rosters);
        let outcome = self.replace_snapshot(snapshot).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let status = match &outcome {
            Ok(_) => RefreshStatus::Committed,
            Err(_) => RefreshStatus::RolledBack,
        };
        let player_count: usize = rosters.iter().map(|roster| roster.players.len()).sum();
        self.record_refresh(RefreshLogEntry {
            run_id: run_id.to_string(),
            team_count: rosters.len() as u64,
            player_count: player_count as u64,
            failed_rosters: failed_rosters.len() as u64,
            status,
            latency_ms,
            recorded_at: None,
        })
        .await;

        match outcome {
            Ok(counts) => {
                self.cache().invalidate(CATALOG_KEY).await;
                info!(
                    %run_id,
                    teams = counts.teams,
                    players = counts.players,
                    failed = failed_rosters.len(),
                    latency_ms,
                    "refresh committed"
                );
                Ok(RefreshReport {
                    run_id,
                    team_count: counts.teams,
                    player_count: counts.players,
                    failed_rosters,
                    latency_ms,
                })
            }
            Err(err) => {
                error!(%run_id, error = %err, "refresh rolled back");
                Err(err)
            }
        }
    }

    async fn roster_for(&self, ctx: &FetchContext, team: &Team) -> Result<Vec<Player>, ApiError> {
        let Some(abbreviation) = team.roster_key() else {
            return Err(ApiError::invalid_request(format!(
                "team {} has no abbreviation",
                team.id
            )));
        };
        let upstream = self.league.upstream();
        self.cache()
            .get_or_load(&roster_key(abbreviation), self.rosters_ttl, || {
                upstream.get_roster(ctx, abbreviation)
            })
            .await
    }

    async fn load_snapshot(&self) -> Result<RosterSnapshot, ApiError> {
        let warehouse = self.warehouse.clone();
        blocking(move || warehouse.load_snapshot()).await
    }

    async fn replace_snapshot(&self, snapshot: RosterSnapshot) -> Result<SnapshotCounts, ApiError> {
        let warehouse = self.warehouse.clone();
        blocking(move || warehouse.replace_snapshot(&snapshot)).await
    }

    async fn record_refresh(&self, entry: RefreshLogEntry) {
        let warehouse = self.warehouse.clone();
        if let Err(err) = blocking(move || warehouse.record_refresh(&entry)).await {
            warn!(error = %err, "failed to record refresh");
        }
    }
}

async fn blocking<T, F>(task: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, WarehouseError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApiError::storage(format!("warehouse task failed: {err}")))?
        .map_err(ApiError::from)
}

/// Teams in snapshot order, each with its players in roster order.
fn catalog_from_snapshot(snapshot: RosterSnapshot) -> Vec<TeamRoster> {
    let mut players: HashMap<i64, Vec<Player>> = HashMap::new();
    for record in snapshot.players {
        if let Some(team_id) = record.team_id {
            players
                .entry(team_id)
                .or_default()
                .push(Player::from_record(record));
        }
    }

    snapshot
        .teams
        .into_iter()
        .map(|record| {
            let roster = players.remove(&record.id).unwrap_or_default();
            TeamRoster::new(Team::from_record(record), roster)
        })
        .collect()
}

fn snapshot_from_catalog(rosters: &[TeamRoster]) -> RosterSnapshot {
    RosterSnapshot {
        teams: rosters.iter().map(|roster| roster.team.to_record()).collect(),
        players: rosters
            .iter()
            .flat_map(|roster| {
                roster
                    .players
                    .iter()
                    .map(|player| player.to_record(Some(roster.team.id)))
            })
            .collect(),
    }
}
