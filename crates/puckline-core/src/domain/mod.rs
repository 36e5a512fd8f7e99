//! # Domain Models
//!
//! Canonical league types produced by the schema adapters and served by the
//! services.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Team`] | Team identity, names, abbreviation and link |
//! | [`Player`] | Player identity with [`PlayerKind`] |
//! | [`TeamRoster`] | A team paired with its roster |
//! | [`LiveFeed`] | Normalized box score of one game |
//! | [`Game`] | Enriched game view built from a live feed |
//! | [`GameDate`] | Validated `YYYY-MM-DD` date |
//!
//! Every type is serde-serializable so it can be cached and printed as JSON.

mod date;
mod game;
mod live_feed;
mod player;
mod team;

pub use date::GameDate;
pub use game::{sort_players, Game, GamePlayer, GameStatus, GameTeam, GoalieStats};
pub use live_feed::{FeedPlayer, FeedSide, LiveFeed};
pub use player::{synthesize_full_name, Player, PlayerKind};
pub use team::{dedupe_by_id, Team, TeamRoster};
