//! Runtime settings.
//!
//! Defaults are usable as-is against the public upstream. Every value can be
//! overridden through a `PUCKLINE_*` environment variable:
//!
//! | Variable | Setting | Default |
//! |----------|---------|---------|
//! | `PUCKLINE_BASE_URL` | upstream base URL | `https://api-web.nhle.com/v1` |
//! | `PUCKLINE_API_KEY` | API key forwarded on every call | none |
//! | `PUCKLINE_API_KEY_HEADER` | header carrying the API key | `X-API-Key` |
//! | `PUCKLINE_SCHEMA` | upstream schema generation | `locale-v2` |
//! | `PUCKLINE_TIMEOUT_MS` | per-request timeout | `10000` |
//! | `PUCKLINE_PACE_LIMIT` / `PUCKLINE_PACE_WINDOW_MS` | request quota per window | `0` (off) / `1000` |
//! | `PUCKLINE_TTL_TEAMS_SECS` | teams TTL | `86400` |
//! | `PUCKLINE_TTL_PLAYERS_SECS` | players TTL | `86400` |
//! | `PUCKLINE_TTL_ROSTERS_SECS` | rosters and catalog TTL | `86400` |
//! | `PUCKLINE_TTL_LIVE_SECS` | live feed TTL | `60` |
//! | `PUCKLINE_TTL_GAMES_SECS` | games-by-date TTL | `60` |
//! | `PUCKLINE_RETRY_MAX` | extra attempts on HTTP 429 | `2` |
//! | `PUCKLINE_RETRY_BASE_MS` / `PUCKLINE_RETRY_FACTOR` / `PUCKLINE_RETRY_CAP_MS` | fallback backoff | `500` / `2` / `10000` |
//! | `PUCKLINE_FANOUT` | concurrent roster fetches | `8` |
//! | `PUCKLINE_PLAYER_LOOKUP` | look up players missing from the roster catalog | `false` |
//! | `PUCKLINE_HOME` / `PUCKLINE_DB_PATH` / `PUCKLINE_POOL_SIZE` | warehouse location and pool | `~/.puckline` |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use puckline_warehouse::WarehouseConfig;
use serde::Deserialize;

use crate::error::ValidationError;
use crate::http_client::HttpAuth;
use crate::retry::{Backoff, RetryPolicy};
use crate::schema::SchemaGeneration;
use crate::throttling::RequestPacer;

pub const DEFAULT_BASE_URL: &str = "https://api-web.nhle.com/v1";
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// All runtime settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub upstream: UpstreamSettings,
    pub cache: CacheSettings,
    pub retry: RetrySettings,
    pub reconcile: ReconcileSettings,
    pub games: GameSettings,
    pub warehouse: WarehouseSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_key_header: String,
    pub schema: SchemaGeneration,
    pub timeout_ms: u64,
    /// Requests allowed per pacing window; zero disables pacing.
    pub pace_limit: u32,
    pub pace_window_ms: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            schema: SchemaGeneration::default(),
            timeout_ms: 10_000,
            pace_limit: 0,
            pace_window_ms: 1_000,
        }
    }
}

impl UpstreamSettings {
    pub fn auth(&self) -> HttpAuth {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => HttpAuth::Header {
                name: self.api_key_header.clone(),
                value: key.to_string(),
            },
            _ => HttpAuth::None,
        }
    }

    pub fn pacer(&self) -> RequestPacer {
        RequestPacer::new(Duration::from_millis(self.pace_window_ms), self.pace_limit)
    }
}

/// Per-resource TTLs in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub teams_ttl_secs: u64,
    pub players_ttl_secs: u64,
    pub rosters_ttl_secs: u64,
    pub live_feed_ttl_secs: u64,
    pub games_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            teams_ttl_secs: 86_400,
            players_ttl_secs: 86_400,
            rosters_ttl_secs: 86_400,
            live_feed_ttl_secs: 60,
            games_ttl_secs: 60,
        }
    }
}

impl CacheSettings {
    pub const fn teams_ttl(&self) -> Duration {
        Duration::from_secs(self.teams_ttl_secs)
    }

    pub const fn players_ttl(&self) -> Duration {
        Duration::from_secs(self.players_ttl_secs)
    }

    pub const fn rosters_ttl(&self) -> Duration {
        Duration::from_secs(self.rosters_ttl_secs)
    }

    pub const fn live_feed_ttl(&self) -> Duration {
        Duration::from_secs(self.live_feed_ttl_secs)
    }

    pub const fn games_ttl(&self) -> Duration {
        Duration::from_secs(self.games_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_rate_limit_retries: u32,
    pub base_delay_ms: u64,
    pub factor: f64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_rate_limit_retries: 2,
            base_delay_ms: 500,
            factor: 2.0,
            max_delay_ms: 10_000,
            jitter: true,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_rate_limit_retries: self.max_rate_limit_retries,
            backoff: Backoff::Exponential {
                base: Duration::from_millis(self.base_delay_ms),
                factor: self.factor,
                max: Duration::from_millis(self.max_delay_ms),
                jitter: self.jitter,
            },
            ..RetryPolicy::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    /// Concurrent roster fetches during a refresh.
    pub roster_fan_out: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self { roster_fan_out: 8 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Fetch players missing from the roster catalog individually.
    pub player_lookup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct WarehouseSettings {
    pub home: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub pool_size: Option<usize>,
    pub in_memory: bool,
}

impl WarehouseSettings {
    pub fn config(&self) -> WarehouseConfig {
        let mut config = if self.in_memory {
            WarehouseConfig::in_memory()
        } else {
            WarehouseConfig::default()
        };
        if let Some(home) = &self.home {
            config.puckline_home = home.clone();
            if !self.in_memory {
                config.db_path = Some(home.join("warehouse.duckdb"));
            }
        }
        if let Some(path) = self.db_path.as_ref().filter(|_| !self.in_memory) {
            config.db_path = Some(path.clone());
        }
        if let Some(size) = self.pool_size {
            config.max_pool_size = size;
        }
        config
    }
}

impl Settings {
    /// Defaults overlaid with `PUCKLINE_*` environment variables.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Defaults overlaid with values from `lookup`, keyed by variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut settings = Self::default();

        let upstream = &mut settings.upstream;
        if let Some(value) = read("PUCKLINE_BASE_URL") {
            upstream.base_url = value;
        }
        upstream.api_key = read("PUCKLINE_API_KEY").or(upstream.api_key.take());
        if let Some(value) = read("PUCKLINE_API_KEY_HEADER") {
            upstream.api_key_header = value;
        }
        if let Some(value) = read("PUCKLINE_SCHEMA") {
            upstream.schema = value.parse()?;
        }
        parse_into(&read, "PUCKLINE_TIMEOUT_MS", &mut upstream.timeout_ms)?;
        parse_into(&read, "PUCKLINE_PACE_LIMIT", &mut upstream.pace_limit)?;
        parse_into(&read, "PUCKLINE_PACE_WINDOW_MS", &mut upstream.pace_window_ms)?;

        let cache = &mut settings.cache;
        parse_into(&read, "PUCKLINE_TTL_TEAMS_SECS", &mut cache.teams_ttl_secs)?;
        parse_into(&read, "PUCKLINE_TTL_PLAYERS_SECS", &mut cache.players_ttl_secs)?;
        parse_into(&read, "PUCKLINE_TTL_ROSTERS_SECS", &mut cache.rosters_ttl_secs)?;
        parse_into(&read, "PUCKLINE_TTL_LIVE_SECS", &mut cache.live_feed_ttl_secs)?;
        parse_into(&read, "PUCKLINE_TTL_GAMES_SECS", &mut cache.games_ttl_secs)?;

        let retry = &mut settings.retry;
        parse_into(&read, "PUCKLINE_RETRY_MAX", &mut retry.max_rate_limit_retries)?;
        parse_into(&read, "PUCKLINE_RETRY_BASE_MS", &mut retry.base_delay_ms)?;
        parse_into(&read, "PUCKLINE_RETRY_FACTOR", &mut retry.factor)?;
        parse_into(&read, "PUCKLINE_RETRY_CAP_MS", &mut retry.max_delay_ms)?;

        parse_into(&read, "PUCKLINE_FANOUT", &mut settings.reconcile.roster_fan_out)?;
        parse_into(&read, "PUCKLINE_PLAYER_LOOKUP", &mut settings.games.player_lookup)?;

        let warehouse = &mut settings.warehouse;
        warehouse.home = read("PUCKLINE_HOME").map(PathBuf::from);
        warehouse.db_path = read("PUCKLINE_DB_PATH").map(PathBuf::from);
        if let Some(value) = read("PUCKLINE_POOL_SIZE") {
            warehouse.pool_size = Some(parse_value("PUCKLINE_POOL_SIZE", &value)?);
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values that would make the services misbehave.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let base = self.upstream.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ValidationError::InvalidBaseUrl {
                value: self.upstream.base_url.clone(),
            });
        }
        if self.upstream.api_key_header.trim().is_empty() {
            return Err(ValidationError::InvalidSetting {
                name: "PUCKLINE_API_KEY_HEADER",
                value: self.upstream.api_key_header.clone(),
            });
        }
        if self.upstream.timeout_ms == 0 {
            return Err(ValidationError::InvalidSetting {
                name: "PUCKLINE_TIMEOUT_MS",
                value: String::from("0"),
            });
        }
        if self.reconcile.roster_fan_out == 0 {
            return Err(ValidationError::InvalidSetting {
                name: "PUCKLINE_FANOUT",
                value: String::from("0"),
            });
        }
        if !self.retry.factor.is_finite() || self.retry.factor < 1.0 {
            return Err(ValidationError::InvalidSetting {
                name: "PUCKLINE_RETRY_FACTOR",
                value: self.retry.factor.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_into<T, R>(read: &R, name: &'static str, target: &mut T) -> Result<(), ValidationError>
where
    T: FromStr,
    R: Fn(&str) -> Option<String>,
{
    if let Some(value) = read(name) {
        *target = parse_value(name, &value)?;
    }
    Ok(())
}

fn parse_value<T: FromStr>(name: &'static str, value: &str) -> Result<T, ValidationError> {
    value
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidSetting {
            name,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::from_lookup(|_| None).expect("defaults");

        assert_eq!(settings.upstream.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.upstream.schema, SchemaGeneration::LocaleV2);
        assert_eq!(settings.cache.teams_ttl(), Duration::from_secs(86_400));
        assert_eq!(settings.cache.live_feed_ttl(), Duration::from_secs(60));
        assert_eq!(settings.retry.policy().max_attempts(), 3);
        assert_eq!(settings.reconcile.roster_fan_out, 8);
        assert!(!settings.games.player_lookup);
        assert_eq!(settings.upstream.auth(), HttpAuth::None);
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = Settings::from_lookup(lookup(&[
            ("PUCKLINE_BASE_URL", "http://localhost:9000/v1"),
            ("PUCKLINE_API_KEY", "secret"),
            ("PUCKLINE_SCHEMA", "legacy"),
            ("PUCKLINE_TTL_GAMES_SECS", "15"),
            ("PUCKLINE_FANOUT", "16"),
            ("PUCKLINE_PLAYER_LOOKUP", "true"),
            ("PUCKLINE_POOL_SIZE", "2"),
        ]))
        .expect("settings");

        assert_eq!(settings.upstream.base_url, "http://localhost:9000/v1");
        assert_eq!(settings.upstream.schema, SchemaGeneration::Legacy);
        assert_eq!(settings.cache.games_ttl(), Duration::from_secs(15));
        assert_eq!(settings.reconcile.roster_fan_out, 16);
        assert!(settings.games.player_lookup);
        assert_eq!(settings.warehouse.config().max_pool_size, 2);
        assert_eq!(
            settings.upstream.auth(),
            HttpAuth::Header {
                name: String::from("X-API-Key"),
                value: String::from("secret"),
            }
        );
    }

    #[test]
    fn malformed_values_are_rejected() {
        let error = Settings::from_lookup(lookup(&[("PUCKLINE_TTL_LIVE_SECS", "soon")]))
            .expect_err("invalid ttl");
        assert_eq!(
            error,
            ValidationError::InvalidSetting {
                name: "PUCKLINE_TTL_LIVE_SECS",
                value: String::from("soon"),
            }
        );

        assert!(Settings::from_lookup(lookup(&[("PUCKLINE_FANOUT", "0")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("PUCKLINE_BASE_URL", "ftp://x")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("PUCKLINE_SCHEMA", "v9")])).is_err());
    }

    #[test]
    fn home_override_moves_database_file() {
        let settings = WarehouseSettings {
            home: Some(PathBuf::from("/tmp/puckline-test")),
            ..WarehouseSettings::default()
        };

        let config = settings.config();

        assert_eq!(
            config.db_path,
            Some(PathBuf::from("/tmp/puckline-test/warehouse.duckdb"))
        );
    }
}
