use serde::{Deserialize, Serialize};

use super::player::PlayerKind;

/// Normalized box-score snapshot of one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveFeed {
    pub game_id: i64,
    /// Raw upstream state, e.g. `LIVE`, `FINAL`, `FUT`.
    pub state: String,
    pub period: Option<String>,
    pub time_remaining: Option<String>,
    pub home: FeedSide,
    pub away: FeedSide,
}

/// One side of a live feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSide {
    pub team_id: i64,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub abbreviation: Option<String>,
    pub goals: u32,
    /// Forwards, defense and goalies merged in that order.
    pub players: Vec<FeedPlayer>,
}

/// A single player's stat line in a live feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedPlayer {
    pub id: i64,
    pub full_name: Option<String>,
    pub last_name: Option<String>,
    pub position_code: Option<String>,
    pub goals: u32,
    pub assists: u32,
    pub points: u32,
    pub saves: u32,
    pub save_percentage: f64,
    /// Upstream `saves/shots` text when reported.
    pub save_shots_against: Option<String>,
}

impl FeedPlayer {
    pub fn kind(&self) -> PlayerKind {
        PlayerKind::from_position_code(self.position_code.as_deref())
    }

    /// Whether the player shows up in the game view.
    pub fn contributed(&self) -> bool {
        self.goals > 0 || self.assists > 0 || self.saves > 0 || self.save_percentage > 0.0
    }
}
