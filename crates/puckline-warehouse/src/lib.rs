//! # Puckline Warehouse
//!
//! DuckDB-backed store for the persisted team/roster snapshot.
//!
//! The snapshot is only ever replaced as a whole: `replace_snapshot` deletes
//! every player and team and inserts the new set inside one transaction, so a
//! reader sees either the previous snapshot or the new one, never a mix.
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `teams` | Teams keyed by upstream id |
//! | `players` | Players keyed by upstream id, nullable `team_id` |
//! | `refresh_log` | One row per reconciliation attempt |
//! | `schema_migrations` | Applied migration versions |
//!
//! ```rust,no_run
//! use puckline_warehouse::{RosterSnapshot, Warehouse};
//!
//! let warehouse = Warehouse::open_default()?;
//! let snapshot = warehouse.load_snapshot()?;
//! println!("{} teams persisted", snapshot.teams.len());
//! # Ok::<(), puckline_warehouse::WarehouseError>(())
//! ```

pub mod duckdb;
pub mod migrations;

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, ToSql};
use serde::Serialize;
use thiserror::Error;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The snapshot violates an invariant and was not written.
    #[error("snapshot rejected: {0}")]
    SnapshotRejected(String),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for puckline data.
    pub puckline_home: PathBuf,
    /// Path to the `DuckDB` database file, `None` for an in-memory database.
    pub db_path: Option<PathBuf>,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let puckline_home = resolve_puckline_home();
        let db_path = puckline_home.join("warehouse.duckdb");
        Self {
            puckline_home,
            db_path: Some(db_path),
            max_pool_size: 4,
        }
    }
}

impl WarehouseConfig {
    /// Configuration for a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            db_path: None,
            ..Self::default()
        }
    }
}

/// A persisted team row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamRecord {
    pub id: i64,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub abbreviation: Option<String>,
    pub link: Option<String>,
}

/// A persisted player row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerRecord {
    pub id: i64,
    /// Owning team, `None` while a player is unassigned.
    pub team_id: Option<i64>,
    pub full_name: Option<String>,
    pub last_name: Option<String>,
    pub nationality: Option<String>,
    pub link: Option<String>,
    /// `skater` or `goalie`.
    pub player_kind: String,
}

/// Full team/roster snapshot in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RosterSnapshot {
    pub teams: Vec<TeamRecord>,
    pub players: Vec<PlayerRecord>,
}

impl RosterSnapshot {
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Players owned by `team_id`, in roster order.
    pub fn players_of(&self, team_id: i64) -> impl Iterator<Item = &PlayerRecord> {
        self.players
            .iter()
            .filter(move |player| player.team_id == Some(team_id))
    }
}

/// Row counts written by a successful snapshot replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotCounts {
    pub teams: usize,
    pub players: usize,
}

/// Outcome of a reconciliation attempt as recorded in `refresh_log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStatus {
    Committed,
    RolledBack,
}

impl RefreshStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        }
    }

    fn parse(value: &str) -> Self {
        if value == "committed" {
            Self::Committed
        } else {
            Self::RolledBack
        }
    }
}

/// A `refresh_log` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshLogEntry {
    pub run_id: String,
    pub team_count: u64,
    pub player_count: u64,
    pub failed_rosters: u64,
    pub status: RefreshStatus,
    pub latency_ms: u64,
    /// Set by the database; ignored on insert.
    pub recorded_at: Option<String>,
}

/// The snapshot store.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse with the specified configuration.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        let manager = match &config.db_path {
            Some(db_path) => {
                if let Some(parent) = db_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                DuckDbConnectionManager::open(db_path.clone(), config.max_pool_size)?
            }
            None => DuckDbConnectionManager::open_in_memory(config.max_pool_size)?,
        };

        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Apply pending migrations.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.manager.db_path()
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Read the persisted teams and players.
    pub fn load_snapshot(&self) -> Result<RosterSnapshot, WarehouseError> {
        let connection = self.manager.acquire()?;

        let mut statement = connection.prepare(
            "SELECT id, name, short_name, abbreviation, link FROM teams ORDER BY ordinal, id",
        )?;
        let teams = statement
            .query_map([], |row| {
                Ok(TeamRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    short_name: row.get(2)?,
                    abbreviation: row.get(3)?,
                    link: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut statement = connection.prepare(
            "SELECT id, team_id, full_name, last_name, nationality, link, player_kind \
             FROM players ORDER BY team_id NULLS LAST, ordinal, id",
        )?;
        let players = statement
            .query_map([], |row| {
                Ok(PlayerRecord {
                    id: row.get(0)?,
                    team_id: row.get(1)?,
                    full_name: row.get(2)?,
                    last_name: row.get(3)?,
                    nationality: row.get(4)?,
                    link: row.get(5)?,
                    player_kind: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RosterSnapshot { teams, players })
    }

    /// Atomically replace the persisted snapshot.
    ///
    /// Deletes all players, then all teams, then inserts the new teams and
    /// players in one transaction. Any failure rolls the transaction back and
    /// leaves the previous snapshot in place.
    ///
    /// # Errors
    /// Returns [`WarehouseError::SnapshotRejected`] without touching the
    /// database when a player references a team that is not part of the
    /// snapshot, and a database error when the transaction fails.
    pub fn replace_snapshot(
        &self,
        snapshot: &RosterSnapshot,
    ) -> Result<SnapshotCounts, WarehouseError> {
        ensure_team_references(snapshot)?;

        let connection = self.manager.acquire()?;
        let transaction = SnapshotTransaction::begin(&connection)?;
        let result = (|| -> Result<SnapshotCounts, WarehouseError> {
            connection.execute_batch("DELETE FROM players; DELETE FROM teams;")?;

            for (ordinal, team) in snapshot.teams.iter().enumerate() {
                let ordinal = ordinal as i64;
                let params: [&dyn ToSql; 6] = [
                    &team.id,
                    &ordinal,
                    &team.name,
                    &team.short_name,
                    &team.abbreviation,
                    &team.link,
                ];
                connection.execute(
                    "INSERT INTO teams (id, ordinal, name, short_name, abbreviation, link) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                    params.as_slice(),
                )?;
            }

            for (ordinal, player) in snapshot.players.iter().enumerate() {
                let ordinal = ordinal as i64;
                let params: [&dyn ToSql; 8] = [
                    &player.id,
                    &player.team_id,
                    &ordinal,
                    &player.full_name,
                    &player.last_name,
                    &player.nationality,
                    &player.link,
                    &player.player_kind,
                ];
                connection.execute(
                    "INSERT INTO players \
                     (id, team_id, ordinal, full_name, last_name, nationality, link, player_kind) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                    params.as_slice(),
                )?;
            }

            Ok(SnapshotCounts {
                teams: snapshot.teams.len(),
                players: snapshot.players.len(),
            })
        })();

        finalize_transaction(transaction, result)
    }

    /// Append a reconciliation attempt to `refresh_log`.
    pub fn record_refresh(&self, entry: &RefreshLogEntry) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        let status = entry.status.as_str();
        let team_count = saturating_i64(entry.team_count);
        let player_count = saturating_i64(entry.player_count);
        let failed_rosters = saturating_i64(entry.failed_rosters);
        let latency_ms = saturating_i64(entry.latency_ms);
        let params: [&dyn ToSql; 6] = [
            &entry.run_id,
            &team_count,
            &player_count,
            &failed_rosters,
            &status,
            &latency_ms,
        ];
        connection.execute(
            "INSERT INTO refresh_log \
             (run_id, team_count, player_count, failed_rosters, status, latency_ms, recorded_at) \
             VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
            params.as_slice(),
        )?;
        Ok(())
    }

    /// Most recent `refresh_log` rows, newest first.
    pub fn recent_refreshes(&self, limit: usize) -> Result<Vec<RefreshLogEntry>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let limit = limit as i64;
        let mut statement = connection.prepare(
            "SELECT run_id, team_count, player_count, failed_rosters, status, \
                    COALESCE(latency_ms, 0), CAST(recorded_at AS VARCHAR) \
             FROM refresh_log ORDER BY recorded_at DESC LIMIT ?",
        )?;
        let rows = statement
            .query_map([limit], |row| {
                let status: String = row.get(4)?;
                Ok(RefreshLogEntry {
                    run_id: row.get(0)?,
                    team_count: non_negative(row.get(1)?),
                    player_count: non_negative(row.get(2)?),
                    failed_rosters: non_negative(row.get(3)?),
                    status: RefreshStatus::parse(&status),
                    latency_ms: non_negative(row.get(5)?),
                    recorded_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Explicit transaction scope. Rolls back on drop unless committed, so the
/// pooled connection never returns to the pool with an open transaction.
struct SnapshotTransaction<'c> {
    connection: &'c Connection,
    finished: bool,
}

impl<'c> SnapshotTransaction<'c> {
    fn begin(connection: &'c Connection) -> Result<Self, WarehouseError> {
        connection.execute_batch("BEGIN TRANSACTION")?;
        Ok(Self {
            connection,
            finished: false,
        })
    }

    fn commit(mut self) -> Result<(), WarehouseError> {
        self.finished = true;
        if let Err(error) = self.connection.execute_batch("COMMIT") {
            let _ = self.connection.execute_batch("ROLLBACK");
            return Err(error.into());
        }
        Ok(())
    }

    fn rollback(mut self) {
        self.finished = true;
        let _ = self.connection.execute_batch("ROLLBACK");
    }
}

impl Drop for SnapshotTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.connection.execute_batch("ROLLBACK");
        }
    }
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    transaction: SnapshotTransaction<'_>,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            transaction.commit()?;
            Ok(value)
        }
        Err(error) => {
            transaction.rollback();
            Err(error)
        }
    }
}

fn ensure_team_references(snapshot: &RosterSnapshot) -> Result<(), WarehouseError> {
    let team_ids: HashSet<i64> = snapshot.teams.iter().map(|team| team.id).collect();
    if let Some(orphan) = snapshot
        .players
        .iter()
        .find(|player| player.team_id.is_some_and(|id| !team_ids.contains(&id)))
    {
        return Err(WarehouseError::SnapshotRejected(format!(
            "player {} references unknown team {}",
            orphan.id,
            orphan.team_id.unwrap_or_default()
        )));
    }
    Ok(())
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn resolve_puckline_home() -> PathBuf {
    if let Ok(home) = env::var("PUCKLINE_HOME") {
        if !home.trim().is_empty() {
            return PathBuf::from(home);
        }
    }
    match env::var("HOME") {
        Ok(home) if !home.trim().is_empty() => PathBuf::from(home).join(".puckline"),
        _ => PathBuf::from(".puckline"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn team(id: i64, abbreviation: &str) -> TeamRecord {
        TeamRecord {
            id,
            name: Some(format!("Team {abbreviation}")),
            short_name: Some(abbreviation.to_string()),
            abbreviation: Some(abbreviation.to_string()),
            link: None,
        }
    }

    fn player(id: i64, team_id: i64) -> PlayerRecord {
        PlayerRecord {
            id,
            team_id: Some(team_id),
            full_name: Some(format!("Player {id}")),
            last_name: Some(format!("{id}")),
            nationality: Some(String::from("CAN")),
            link: None,
            player_kind: String::from("skater"),
        }
    }

    #[test]
    fn initializes_snapshot_tables() {
        let temp = tempdir().expect("tempdir");
        let warehouse = Warehouse::open(WarehouseConfig {
            puckline_home: temp.path().to_path_buf(),
            db_path: Some(temp.path().join("nested").join("warehouse.duckdb")),
            max_pool_size: 2,
        })
        .expect("warehouse open");

        let snapshot = warehouse.load_snapshot().expect("load");
        assert!(snapshot.is_empty());
        assert!(warehouse.db_path().is_some_and(Path::exists));
    }

    #[test]
    fn replace_snapshot_round_trips_in_order() {
        let warehouse = Warehouse::open(WarehouseConfig::in_memory()).expect("open");
        let snapshot = RosterSnapshot {
            teams: vec![team(5, "PIT"), team(1, "NJD")],
            players: vec![player(30, 5), player(10, 5), player(20, 1)],
        };

        let counts = warehouse.replace_snapshot(&snapshot).expect("replace");
        assert_eq!(counts, SnapshotCounts { teams: 2, players: 3 });

        let loaded = warehouse.load_snapshot().expect("load");
        assert_eq!(loaded.teams, snapshot.teams);
        let pit: Vec<i64> = loaded.players_of(5).map(|p| p.id).collect();
        assert_eq!(pit, vec![30, 10]);
    }

    #[test]
    fn failed_replace_keeps_previous_snapshot() {
        let warehouse = Warehouse::open(WarehouseConfig::in_memory()).expect("open");
        let original = RosterSnapshot {
            teams: vec![team(5, "PIT")],
            players: vec![player(10, 5)],
        };
        warehouse.replace_snapshot(&original).expect("seed");

        let duplicate_players = RosterSnapshot {
            teams: vec![team(5, "PIT"), team(17, "DET")],
            players: vec![player(11, 5), player(11, 17)],
        };
        let error = warehouse
            .replace_snapshot(&duplicate_players)
            .expect_err("duplicate player id must fail");
        assert!(matches!(error, WarehouseError::DuckDb(_)));

        assert_eq!(warehouse.load_snapshot().expect("load"), original);
    }

    #[test]
    fn orphaned_player_is_rejected_before_writing() {
        let warehouse = Warehouse::open(WarehouseConfig::in_memory()).expect("open");
        let snapshot = RosterSnapshot {
            teams: vec![team(5, "PIT")],
            players: vec![player(10, 99)],
        };

        let error = warehouse.replace_snapshot(&snapshot).expect_err("orphan");
        assert!(matches!(error, WarehouseError::SnapshotRejected(_)));
        assert!(warehouse.load_snapshot().expect("load").is_empty());
    }

    #[test]
    fn refresh_log_lists_newest_first() {
        let warehouse = Warehouse::open(WarehouseConfig::in_memory()).expect("open");
        for (run, status) in [("run-a", RefreshStatus::RolledBack), ("run-b", RefreshStatus::Committed)] {
            warehouse
                .record_refresh(&RefreshLogEntry {
                    run_id: run.to_string(),
                    team_count: 32,
                    player_count: 700,
                    failed_rosters: 1,
                    status,
                    latency_ms: 1200,
                    recorded_at: None,
                })
                .expect("record");
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let entries = warehouse.recent_refreshes(10).expect("entries");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].run_id, "run-b");
        assert_eq!(entries[0].status, RefreshStatus::Committed);
        assert!(entries[0].recorded_at.is_some());
    }
}
