use std::fmt::{Display, Formatter};

use puckline_warehouse::PlayerRecord;
use serde::{Deserialize, Serialize};

/// Coarse player classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerKind {
    #[default]
    Skater,
    Goalie,
}

impl PlayerKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skater => "skater",
            Self::Goalie => "goalie",
        }
    }

    /// Goalie when the position code starts with `G`, skater otherwise.
    pub fn from_position_code(code: Option<&str>) -> Self {
        match code.map(str::trim) {
            Some(code) if code.starts_with('G') || code.starts_with('g') => Self::Goalie,
            _ => Self::Skater,
        }
    }

    /// Inverse of [`PlayerKind::as_str`]; unknown values are skaters.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("goalie") {
            Self::Goalie
        } else {
            Self::Skater
        }
    }
}

impl Display for PlayerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical player record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub full_name: Option<String>,
    pub last_name: Option<String>,
    pub nationality: Option<String>,
    pub link: Option<String>,
    pub kind: PlayerKind,
}

impl Player {
    pub fn to_record(&self, team_id: Option<i64>) -> PlayerRecord {
        PlayerRecord {
            id: self.id,
            team_id,
            full_name: self.full_name.clone(),
            last_name: self.last_name.clone(),
            nationality: self.nationality.clone(),
            link: self.link.clone(),
            player_kind: self.kind.as_str().to_string(),
        }
    }

    pub fn from_record(record: PlayerRecord) -> Self {
        Self {
            id: record.id,
            full_name: record.full_name,
            last_name: record.last_name,
            nationality: record.nationality,
            link: record.link,
            kind: PlayerKind::parse(&record.player_kind),
        }
    }
}

/// `"{first} {last}"` with blank parts skipped, `None` when both are blank.
pub fn synthesize_full_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
