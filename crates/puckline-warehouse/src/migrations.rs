use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

// Referential integrity between players.team_id and teams.id is checked by
// `Warehouse::replace_snapshot` before the transaction starts instead of by a
// REFERENCES clause, so the bulk delete of parents and children can happen in
// one transaction.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_snapshot_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS teams (
    id BIGINT PRIMARY KEY,
    ordinal INTEGER NOT NULL,
    name VARCHAR(300),
    short_name VARCHAR(300),
    abbreviation VARCHAR(20),
    link VARCHAR(500),
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS players (
    id BIGINT PRIMARY KEY,
    team_id BIGINT,
    ordinal INTEGER NOT NULL,
    full_name VARCHAR(300),
    last_name VARCHAR(300),
    nationality VARCHAR(20),
    link VARCHAR(500),
    player_kind VARCHAR(10) NOT NULL,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_refresh_log",
        sql: r#"
CREATE TABLE IF NOT EXISTS refresh_log (
    run_id VARCHAR NOT NULL,
    team_count BIGINT NOT NULL,
    player_count BIGINT NOT NULL,
    failed_rosters BIGINT NOT NULL,
    status VARCHAR NOT NULL,
    latency_ms BIGINT,
    recorded_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
];

/// Apply every migration that is not yet recorded in `schema_migrations`.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version VARCHAR PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            [migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                [migration.version],
            )?;
        }
    }

    Ok(())
}
