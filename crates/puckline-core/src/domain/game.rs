use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use super::player::PlayerKind;

/// Coarse game status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Scheduled,
    InProgress,
    Final,
}

impl GameStatus {
    /// `FINAL` is final, `OFF` and `FUT` are scheduled, anything else is in
    /// progress.
    pub fn from_state(state: &str) -> Self {
        match state {
            "FINAL" => Self::Final,
            "OFF" | "FUT" => Self::Scheduled,
            _ => Self::InProgress,
        }
    }
}

/// Enriched game view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub game_id: i64,
    pub home: GameTeam,
    pub away: GameTeam,
    pub time_remaining: Option<String>,
    pub period: Option<String>,
    pub status: GameStatus,
}

/// One side of a game with its contributing players.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameTeam {
    pub id: i64,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub abbreviation: Option<String>,
    pub link: Option<String>,
    pub goals: u32,
    pub players: Vec<GamePlayer>,
}

/// Goalie-only statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalieStats {
    pub saves: u32,
    pub save_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_shots_against: Option<String>,
}

/// A player's line in the game view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePlayer {
    pub id: i64,
    pub full_name: Option<String>,
    pub last_name: Option<String>,
    pub nationality: Option<String>,
    pub link: Option<String>,
    pub kind: PlayerKind,
    pub position: Option<String>,
    pub goals: u32,
    pub assists: u32,
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goalie: Option<GoalieStats>,
}

impl GamePlayer {
    pub const fn contribution(&self) -> u32 {
        self.goals + self.assists
    }
}

/// Skaters before goalies, then by goals plus assists, highest first.
/// Ties keep their feed order.
pub fn sort_players(players: &mut [GamePlayer]) {
    players.sort_by_key(|player| {
        (
            player.kind == PlayerKind::Goalie,
            Reverse(player.contribution()),
        )
    });
}
