use puckline_warehouse::TeamRecord;
use serde::{Deserialize, Serialize};

use super::player::Player;

/// Canonical team record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub abbreviation: Option<String>,
    pub link: Option<String>,
}

impl Team {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            name: None,
            short_name: None,
            abbreviation: None,
            link: None,
        }
    }

    /// Abbreviation used for roster lookups, when present and non-blank.
    pub fn roster_key(&self) -> Option<&str> {
        self.abbreviation
            .as_deref()
            .map(str::trim)
            .filter(|abbreviation| !abbreviation.is_empty())
    }

    pub fn to_record(&self) -> TeamRecord {
        TeamRecord {
            id: self.id,
            name: self.name.clone(),
            short_name: self.short_name.clone(),
            abbreviation: self.abbreviation.clone(),
            link: self.link.clone(),
        }
    }

    pub fn from_record(record: TeamRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            short_name: record.short_name,
            abbreviation: record.abbreviation,
            link: record.link,
        }
    }
}

/// A team paired with its ordered roster at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRoster {
    pub team: Team,
    pub players: Vec<Player>,
}

impl TeamRoster {
    pub fn new(team: Team, players: Vec<Player>) -> Self {
        Self { team, players }
    }

    pub fn find_player(&self, player_id: i64) -> Option<&Player> {
        self.players.iter().find(|player| player.id == player_id)
    }
}

/// Keep the first occurrence of every team id, preserving order.
pub fn dedupe_by_id(teams: Vec<Team>) -> Vec<Team> {
    let mut seen = std::collections::HashSet::with_capacity(teams.len());
    teams
        .into_iter()
        .filter(|team| seen.insert(team.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let mut first = Team::new(5);
        first.abbreviation = Some(String::from("PIT"));
        let mut duplicate = Team::new(5);
        duplicate.abbreviation = Some(String::from("XXX"));

        let teams = dedupe_by_id(vec![first, Team::new(17), duplicate]);

        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].roster_key(), Some("PIT"));
        assert_eq!(teams[1].id, 17);
    }

    #[test]
    fn blank_abbreviation_has_no_roster_key() {
        let mut team = Team::new(1);
        team.abbreviation = Some(String::from("  "));

        assert_eq!(team.roster_key(), None);
    }
}
