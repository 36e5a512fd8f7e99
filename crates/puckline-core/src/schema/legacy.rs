//! Collection-wrapper payloads of the oldest upstream generation.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::{decode, loose_f64, loose_i64, loose_u32, non_blank, null_list};
use crate::domain::{
    synthesize_full_name, FeedPlayer, FeedSide, LiveFeed, Player, PlayerKind, Team,
};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
struct LegacyTeam {
    #[serde(default, deserialize_with = "loose_i64")]
    id: i64,
    name: Option<String>,
    #[serde(rename = "teamName")]
    team_name: Option<String>,
    abbreviation: Option<String>,
    link: Option<String>,
}

impl LegacyTeam {
    fn into_team(self) -> Option<Team> {
        if self.id == 0 {
            return None;
        }
        Some(Team {
            id: self.id,
            name: non_blank(self.name),
            short_name: non_blank(self.team_name),
            abbreviation: non_blank(self.abbreviation),
            link: non_blank(self.link),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Standings {
    #[serde(default, deserialize_with = "null_list")]
    records: Vec<StandingsRecord>,
}

#[derive(Debug, Deserialize)]
struct StandingsRecord {
    #[serde(default, rename = "teamRecords", deserialize_with = "null_list")]
    team_records: Vec<TeamSlot>,
}

#[derive(Debug, Deserialize)]
struct TeamSlot {
    team: Option<LegacyTeam>,
}

pub(super) fn standings_teams(raw: Value) -> Result<Vec<Team>, ApiError> {
    let standings: Standings = decode(raw, "standings")?;
    Ok(standings
        .records
        .into_iter()
        .flat_map(|record| record.team_records)
        .filter_map(|slot| slot.team.and_then(LegacyTeam::into_team))
        .collect())
}

#[derive(Debug, Deserialize)]
struct Scoreboard {
    #[serde(default, deserialize_with = "null_list")]
    dates: Vec<ScoreboardDate>,
}

#[derive(Debug, Deserialize)]
struct ScoreboardDate {
    #[serde(default, deserialize_with = "null_list")]
    games: Vec<ScoreboardGame>,
}

#[derive(Debug, Deserialize)]
struct ScoreboardGame {
    teams: Option<Sides<TeamSlot>>,
}

#[derive(Debug, Deserialize)]
struct Sides<T> {
    home: Option<T>,
    away: Option<T>,
}

pub(super) fn scoreboard_teams(raw: Value) -> Result<Vec<Team>, ApiError> {
    let scoreboard: Scoreboard = decode(raw, "scoreboard")?;
    Ok(scoreboard
        .dates
        .into_iter()
        .flat_map(|date| date.games)
        .filter_map(|game| game.teams)
        .flat_map(|sides| [sides.home, sides.away])
        .flatten()
        .filter_map(|slot| slot.team.and_then(LegacyTeam::into_team))
        .collect())
}

#[derive(Debug, Deserialize)]
struct Person {
    #[serde(default, deserialize_with = "loose_i64")]
    id: i64,
    #[serde(rename = "fullName")]
    full_name: Option<String>,
    #[serde(rename = "firstName")]
    first_name: Option<String>,
    #[serde(rename = "lastName")]
    last_name: Option<String>,
    nationality: Option<String>,
    link: Option<String>,
}

impl Person {
    fn into_player(self, kind: PlayerKind) -> Player {
        let full_name = non_blank(self.full_name).or_else(|| {
            synthesize_full_name(self.first_name.as_deref(), self.last_name.as_deref())
        });
        Player {
            id: self.id,
            full_name,
            last_name: non_blank(self.last_name),
            nationality: non_blank(self.nationality),
            link: non_blank(self.link),
            kind,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Position {
    code: Option<String>,
    #[serde(rename = "type")]
    position_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Roster {
    #[serde(default, deserialize_with = "null_list")]
    roster: Vec<RosterEntry>,
}

#[derive(Debug, Deserialize)]
struct RosterEntry {
    person: Option<Person>,
    position: Option<Position>,
}

pub(super) fn roster(raw: Value) -> Result<Vec<Player>, ApiError> {
    let roster: Roster = decode(raw, "roster")?;
    Ok(roster
        .roster
        .into_iter()
        .filter_map(|entry| {
            let is_goalie = entry
                .position
                .as_ref()
                .and_then(|position| position.position_type.as_deref())
                == Some("Goalie");
            let kind = if is_goalie {
                PlayerKind::Goalie
            } else {
                PlayerKind::Skater
            };
            entry.person.map(|person| person.into_player(kind))
        })
        .filter(|player| player.id != 0)
        .collect())
}

#[derive(Debug, Deserialize)]
struct People {
    #[serde(default, deserialize_with = "null_list")]
    people: Vec<PersonWithPosition>,
}

#[derive(Debug, Deserialize)]
struct PersonWithPosition {
    #[serde(flatten)]
    person: Person,
    #[serde(rename = "primaryPosition")]
    primary_position: Option<Position>,
}

pub(super) fn player(raw: Value) -> Result<Option<Player>, ApiError> {
    let people: People = decode(raw, "player")?;
    let Some(entry) = people.people.into_iter().next() else {
        return Ok(None);
    };
    let kind = PlayerKind::from_position_code(
        entry
            .primary_position
            .as_ref()
            .and_then(|position| position.code.as_deref()),
    );
    let player = entry.person.into_player(kind);
    if player.id == 0 || player.full_name.is_none() {
        return Ok(None);
    }
    Ok(Some(player))
}

#[derive(Debug, Deserialize)]
struct Schedule {
    #[serde(default, deserialize_with = "null_list")]
    dates: Vec<ScheduleDate>,
}

#[derive(Debug, Deserialize)]
struct ScheduleDate {
    date: Option<String>,
    #[serde(default, deserialize_with = "null_list")]
    games: Vec<ScheduleGame>,
}

#[derive(Debug, Deserialize)]
struct ScheduleGame {
    #[serde(default, rename = "gamePk", deserialize_with = "loose_i64")]
    game_pk: i64,
    link: Option<String>,
}

pub(super) fn schedule(raw: Value, date: &str) -> Result<Vec<String>, ApiError> {
    let schedule: Schedule = decode(raw, "schedule")?;
    Ok(schedule
        .dates
        .into_iter()
        .filter(|day| day.date.as_deref() == Some(date))
        .flat_map(|day| day.games)
        .filter_map(|game| {
            if game.game_pk != 0 {
                Some(game.game_pk.to_string())
            } else {
                non_blank(game.link)
            }
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "gameData")]
    game_data: Option<GameData>,
    #[serde(rename = "liveData")]
    live_data: Option<LiveData>,
}

#[derive(Debug, Deserialize)]
struct GameData {
    status: Option<GameState>,
}

#[derive(Debug, Deserialize)]
struct GameState {
    #[serde(rename = "detailedState")]
    detailed_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LiveData {
    linescore: Option<Linescore>,
    boxscore: Option<Boxscore>,
}

#[derive(Debug, Deserialize)]
struct Linescore {
    #[serde(rename = "currentPeriodOrdinal")]
    current_period_ordinal: Option<String>,
    #[serde(rename = "currentPeriodTimeRemaining")]
    current_period_time_remaining: Option<String>,
    teams: Option<Sides<LinescoreTeam>>,
}

#[derive(Debug, Deserialize)]
struct LinescoreTeam {
    team: Option<LegacyTeam>,
    #[serde(default, deserialize_with = "loose_u32")]
    goals: u32,
}

#[derive(Debug, Deserialize)]
struct Boxscore {
    teams: Option<Sides<BoxscoreTeam>>,
}

#[derive(Debug, Deserialize)]
struct BoxscoreTeam {
    #[serde(default)]
    players: BTreeMap<String, BoxscorePlayer>,
}

#[derive(Debug, Deserialize)]
struct BoxscorePlayer {
    person: Option<Person>,
    position: Option<Position>,
    stats: Option<BoxscoreStats>,
}

#[derive(Debug, Default, Deserialize)]
struct BoxscoreStats {
    #[serde(rename = "skaterStats")]
    skater_stats: Option<SkaterStats>,
    #[serde(rename = "goalieStats")]
    goalie_stats: Option<GoalieStats>,
}

#[derive(Debug, Default, Deserialize)]
struct SkaterStats {
    #[serde(default, deserialize_with = "loose_u32")]
    goals: u32,
    #[serde(default, deserialize_with = "loose_u32")]
    assists: u32,
}

#[derive(Debug, Default, Deserialize)]
struct GoalieStats {
    #[serde(default, deserialize_with = "loose_u32")]
    goals: u32,
    #[serde(default, deserialize_with = "loose_u32")]
    assists: u32,
    #[serde(default, deserialize_with = "loose_u32")]
    saves: u32,
    #[serde(default, rename = "savePercentage", deserialize_with = "loose_f64")]
    save_percentage: f64,
}

pub(super) fn live_feed(raw: Value, game_id: i64) -> Result<Option<LiveFeed>, ApiError> {
    let feed: Feed = decode(raw, "live feed")?;
    let state = feed
        .game_data
        .and_then(|data| data.status)
        .and_then(|status| status.detailed_state)
        .unwrap_or_default();

    let (linescore, boxscore) = match feed.live_data {
        Some(live) => (live.linescore, live.boxscore),
        None => (None, None),
    };
    let Some(linescore) = linescore else {
        return Ok(None);
    };
    let Some(line_teams) = linescore.teams else {
        return Ok(None);
    };
    if line_teams.home.is_none() && line_teams.away.is_none() {
        return Ok(None);
    }

    let (box_home, box_away) = match boxscore.and_then(|boxscore| boxscore.teams) {
        Some(sides) => (sides.home, sides.away),
        None => (None, None),
    };

    Ok(Some(LiveFeed {
        game_id,
        state,
        period: non_blank(linescore.current_period_ordinal),
        time_remaining: non_blank(linescore.current_period_time_remaining),
        home: feed_side(line_teams.home, box_home),
        away: feed_side(line_teams.away, box_away),
    }))
}

fn feed_side(line: Option<LinescoreTeam>, boxscore: Option<BoxscoreTeam>) -> FeedSide {
    let (team, goals) = match line {
        Some(line) => (line.team, line.goals),
        None => (None, 0),
    };
    let team = team.and_then(LegacyTeam::into_team);
    let players = boxscore
        .map(|side| {
            side.players
                .into_values()
                .filter_map(feed_player)
                .collect()
        })
        .unwrap_or_default();

    match team {
        Some(team) => FeedSide {
            team_id: team.id,
            name: team.name,
            short_name: team.short_name,
            abbreviation: team.abbreviation,
            goals,
            players,
        },
        None => FeedSide {
            goals,
            players,
            ..FeedSide::default()
        },
    }
}

fn feed_player(entry: BoxscorePlayer) -> Option<FeedPlayer> {
    let person = entry.person?;
    if person.id == 0 {
        return None;
    }
    let stats = entry.stats.unwrap_or_default();
    let position_code = entry.position.and_then(|position| position.code);

    let mut line = FeedPlayer {
        id: person.id,
        full_name: non_blank(person.full_name),
        last_name: non_blank(person.last_name),
        position_code,
        ..FeedPlayer::default()
    };
    if let Some(goalie) = stats.goalie_stats {
        line.goals = goalie.goals;
        line.assists = goalie.assists;
        line.saves = goalie.saves;
        line.save_percentage = goalie.save_percentage;
    } else if let Some(skater) = stats.skater_stats {
        line.goals = skater.goals;
        line.assists = skater.assists;
    }
    line.points = line.goals + line.assists;
    Some(line)
}
