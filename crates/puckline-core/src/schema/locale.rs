//! Nested-locale payloads (`locale-v1` and `locale-v2`).

use serde::Deserialize;
use serde_json::Value;

use super::{
    decode, localized, loose_f64, loose_i64, loose_u32, non_blank, null_list, period_label,
    LocalizedText,
};
use crate::domain::{
    synthesize_full_name, FeedPlayer, FeedSide, LiveFeed, Player, PlayerKind, Team,
};
use crate::error::ApiError;

/// Differences between the two locale generations.
#[derive(Debug, Clone, Copy)]
pub(super) struct Options<'a> {
    /// `playerByGameStats` at the document root, `placeName` team names and
    /// numeric goalie saves.
    pub stats_at_root: bool,
    pub base_url: &'a str,
}

impl Options<'_> {
    fn team_link(&self, abbreviation: Option<&str>) -> Option<String> {
        abbreviation.map(|abbrev| format!("{}/roster/{abbrev}/current", self.base_url))
    }

    fn player_link(&self, id: i64) -> String {
        format!("{}/player/{id}/landing", self.base_url)
    }

    fn display_name(
        &self,
        name: Option<String>,
        place: Option<String>,
        common: Option<&str>,
    ) -> Option<String> {
        if self.stats_at_root {
            if let (Some(place), Some(common)) = (place, common) {
                return Some(format!("{place} {common}"));
            }
        }
        name
    }
}

#[derive(Debug, Deserialize)]
struct Standings {
    #[serde(default, deserialize_with = "null_list")]
    standings: Vec<StandingsRow>,
}

#[derive(Debug, Deserialize)]
struct StandingsRow {
    #[serde(default, rename = "teamId", deserialize_with = "loose_i64")]
    team_id: i64,
    #[serde(rename = "teamName")]
    team_name: Option<LocalizedText>,
    #[serde(rename = "teamCommonName")]
    team_common_name: Option<LocalizedText>,
    #[serde(rename = "teamAbbrev")]
    team_abbrev: Option<LocalizedText>,
    #[serde(rename = "placeName")]
    place_name: Option<LocalizedText>,
}

pub(super) fn standings_teams(raw: Value, options: Options<'_>) -> Result<Vec<Team>, ApiError> {
    let standings: Standings = decode(raw, "standings")?;
    Ok(standings
        .standings
        .into_iter()
        .filter(|row| row.team_id != 0)
        .map(|row| {
            let common = localized(&row.team_common_name);
            let abbreviation = localized(&row.team_abbrev);
            Team {
                id: row.team_id,
                name: options.display_name(
                    localized(&row.team_name),
                    localized(&row.place_name),
                    common.as_deref(),
                ),
                link: options.team_link(abbreviation.as_deref()),
                short_name: common,
                abbreviation,
            }
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct LocaleTeam {
    #[serde(default, deserialize_with = "loose_i64")]
    id: i64,
    name: Option<LocalizedText>,
    #[serde(rename = "commonName")]
    common_name: Option<LocalizedText>,
    #[serde(rename = "placeName")]
    place_name: Option<LocalizedText>,
    abbrev: Option<LocalizedText>,
    #[serde(default, deserialize_with = "loose_u32")]
    score: u32,
}

impl LocaleTeam {
    fn to_team(&self, options: Options<'_>) -> Team {
        let common = localized(&self.common_name);
        let abbreviation = localized(&self.abbrev);
        let name = localized(&self.name).or_else(|| common.clone());
        Team {
            id: self.id,
            name: options.display_name(name, localized(&self.place_name), common.as_deref()),
            link: options.team_link(abbreviation.as_deref()),
            short_name: common,
            abbreviation,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Scoreboard {
    #[serde(default, rename = "gamesByDate", deserialize_with = "null_list")]
    games_by_date: Vec<ScoreboardDate>,
}

#[derive(Debug, Deserialize)]
struct ScoreboardDate {
    #[serde(default, deserialize_with = "null_list")]
    games: Vec<ScoreboardGame>,
}

#[derive(Debug, Deserialize)]
struct ScoreboardGame {
    #[serde(rename = "homeTeam")]
    home_team: Option<LocaleTeam>,
    #[serde(rename = "awayTeam")]
    away_team: Option<LocaleTeam>,
}

pub(super) fn scoreboard_teams(raw: Value, options: Options<'_>) -> Result<Vec<Team>, ApiError> {
    let scoreboard: Scoreboard = decode(raw, "scoreboard")?;
    Ok(scoreboard
        .games_by_date
        .into_iter()
        .flat_map(|date| date.games)
        .flat_map(|game| [game.home_team, game.away_team])
        .flatten()
        .filter(|team| team.id != 0)
        .map(|team| team.to_team(options))
        .collect())
}

#[derive(Debug, Deserialize)]
struct Roster {
    #[serde(default, deserialize_with = "null_list")]
    forwards: Vec<RosterPlayer>,
    #[serde(default, deserialize_with = "null_list")]
    defensemen: Vec<RosterPlayer>,
    #[serde(default, deserialize_with = "null_list")]
    goalies: Vec<RosterPlayer>,
}

#[derive(Debug, Deserialize)]
struct RosterPlayer {
    #[serde(default, deserialize_with = "loose_i64")]
    id: i64,
    #[serde(rename = "firstName")]
    first_name: Option<LocalizedText>,
    #[serde(rename = "lastName")]
    last_name: Option<LocalizedText>,
    #[serde(rename = "birthCountry")]
    birth_country: Option<String>,
}

impl RosterPlayer {
    fn into_player(self, kind: PlayerKind, options: Options<'_>) -> Player {
        let first = localized(&self.first_name);
        let last = localized(&self.last_name);
        Player {
            id: self.id,
            full_name: synthesize_full_name(first.as_deref(), last.as_deref()),
            last_name: last,
            nationality: non_blank(self.birth_country),
            link: Some(options.player_link(self.id)),
            kind,
        }
    }
}

pub(super) fn roster(raw: Value, options: Options<'_>) -> Result<Vec<Player>, ApiError> {
    let roster: Roster = decode(raw, "roster")?;
    let skaters = roster
        .forwards
        .into_iter()
        .chain(roster.defensemen)
        .map(|entry| (entry, PlayerKind::Skater));
    let goalies = roster
        .goalies
        .into_iter()
        .map(|entry| (entry, PlayerKind::Goalie));

    Ok(skaters
        .chain(goalies)
        .filter(|(entry, _)| entry.id != 0)
        .map(|(entry, kind)| entry.into_player(kind, options))
        .collect())
}

#[derive(Debug, Deserialize)]
struct Landing {
    #[serde(default, rename = "playerId", deserialize_with = "loose_i64")]
    player_id: i64,
    #[serde(rename = "fullName")]
    full_name: Option<LocalizedText>,
    #[serde(rename = "firstName")]
    first_name: Option<LocalizedText>,
    #[serde(rename = "lastName")]
    last_name: Option<LocalizedText>,
    #[serde(rename = "birthCountry")]
    birth_country: Option<String>,
    position: Option<String>,
}

pub(super) fn player(raw: Value, options: Options<'_>) -> Result<Option<Player>, ApiError> {
    let landing: Landing = decode(raw, "player")?;
    if landing.player_id == 0 {
        return Ok(None);
    }
    let first = localized(&landing.first_name);
    let last = localized(&landing.last_name);
    let Some(full_name) = localized(&landing.full_name)
        .or_else(|| synthesize_full_name(first.as_deref(), last.as_deref()))
    else {
        return Ok(None);
    };

    Ok(Some(Player {
        id: landing.player_id,
        full_name: Some(full_name),
        last_name: last,
        nationality: non_blank(landing.birth_country),
        link: Some(options.player_link(landing.player_id)),
        kind: PlayerKind::from_position_code(landing.position.as_deref()),
    }))
}

#[derive(Debug, Deserialize)]
struct Schedule {
    #[serde(default, rename = "gameWeek", deserialize_with = "null_list")]
    game_week: Vec<ScheduleDay>,
}

#[derive(Debug, Deserialize)]
struct ScheduleDay {
    date: Option<String>,
    #[serde(default, deserialize_with = "null_list")]
    games: Vec<ScheduleGame>,
}

#[derive(Debug, Deserialize)]
struct ScheduleGame {
    #[serde(default, deserialize_with = "loose_i64")]
    id: i64,
    #[serde(rename = "gameCenterLink")]
    game_center_link: Option<String>,
}

pub(super) fn schedule(raw: Value, date: &str) -> Result<Vec<String>, ApiError> {
    let schedule: Schedule = decode(raw, "schedule")?;
    Ok(schedule
        .game_week
        .into_iter()
        .filter(|day| day.date.as_deref() == Some(date))
        .flat_map(|day| day.games)
        .filter_map(|game| {
            if game.id != 0 {
                Some(game.id.to_string())
            } else {
                non_blank(game.game_center_link)
            }
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct Boxscore {
    #[serde(default, deserialize_with = "loose_i64")]
    id: i64,
    #[serde(rename = "gameState")]
    game_state: Option<String>,
    #[serde(default, deserialize_with = "loose_u32")]
    period: u32,
    #[serde(rename = "periodDescriptor")]
    period_descriptor: Option<PeriodDescriptor>,
    clock: Option<Clock>,
    #[serde(rename = "homeTeam")]
    home_team: Option<LocaleTeam>,
    #[serde(rename = "awayTeam")]
    away_team: Option<LocaleTeam>,
    #[serde(rename = "playerByGameStats")]
    player_by_game_stats: Option<PlayerByGameStats>,
    boxscore: Option<NestedStats>,
}

#[derive(Debug, Deserialize)]
struct PeriodDescriptor {
    #[serde(default, deserialize_with = "loose_u32")]
    number: u32,
    #[serde(rename = "periodType")]
    period_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Clock {
    #[serde(rename = "timeRemaining")]
    time_remaining: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedStats {
    #[serde(rename = "playerByGameStats")]
    player_by_game_stats: Option<PlayerByGameStats>,
}

#[derive(Debug, Deserialize)]
struct PlayerByGameStats {
    #[serde(rename = "homeTeam")]
    home_team: Option<GroupStats>,
    #[serde(rename = "awayTeam")]
    away_team: Option<GroupStats>,
}

#[derive(Debug, Default, Deserialize)]
struct GroupStats {
    #[serde(default, deserialize_with = "null_list")]
    forwards: Vec<StatLine>,
    #[serde(default, deserialize_with = "null_list")]
    defense: Vec<StatLine>,
    #[serde(default, deserialize_with = "null_list")]
    goalies: Vec<StatLine>,
}

#[derive(Debug, Deserialize)]
struct StatLine {
    #[serde(default, rename = "playerId", deserialize_with = "loose_i64")]
    player_id: i64,
    name: Option<LocalizedText>,
    #[serde(rename = "firstName")]
    first_name: Option<LocalizedText>,
    #[serde(rename = "lastName")]
    last_name: Option<LocalizedText>,
    position: Option<String>,
    #[serde(default, deserialize_with = "loose_u32")]
    goals: u32,
    #[serde(default, deserialize_with = "loose_u32")]
    assists: u32,
    #[serde(default, deserialize_with = "loose_u32")]
    points: u32,
    #[serde(default, deserialize_with = "loose_u32")]
    saves: u32,
    #[serde(default, rename = "savePctg", deserialize_with = "loose_f64")]
    save_pctg: f64,
    #[serde(rename = "saveShotsAgainst")]
    save_shots_against: Option<String>,
}

impl StatLine {
    fn into_feed_player(self, default_position: &str, numeric_saves: bool) -> FeedPlayer {
        let first = localized(&self.first_name);
        let last = localized(&self.last_name);
        let display = localized(&self.name);
        let full_name = synthesize_full_name(first.as_deref(), last.as_deref())
            .or_else(|| display.clone());
        let last_name = last.or_else(|| {
            display
                .as_deref()
                .and_then(|name| name.split_whitespace().last())
                .map(str::to_string)
        });
        let save_shots_against = non_blank(self.save_shots_against);
        let saves = if numeric_saves {
            self.saves
        } else {
            save_shots_against
                .as_deref()
                .and_then(saves_from_ratio)
                .unwrap_or(self.saves)
        };
        let points = if self.points == 0 {
            self.goals + self.assists
        } else {
            self.points
        };

        FeedPlayer {
            id: self.player_id,
            full_name,
            last_name,
            position_code: non_blank(self.position).or_else(|| Some(default_position.to_string())),
            goals: self.goals,
            assists: self.assists,
            points,
            saves,
            save_percentage: self.save_pctg,
            save_shots_against,
        }
    }
}

/// `"28/30"` -> 28.
fn saves_from_ratio(ratio: &str) -> Option<u32> {
    ratio.split('/').next()?.trim().parse().ok()
}

pub(super) fn live_feed(
    raw: Value,
    game_id: i64,
    options: Options<'_>,
) -> Result<Option<LiveFeed>, ApiError> {
    let boxscore: Boxscore = decode(raw, "boxscore")?;
    if boxscore.home_team.is_none() && boxscore.away_team.is_none() {
        return Ok(None);
    }

    let stats = if options.stats_at_root {
        boxscore.player_by_game_stats
    } else {
        boxscore
            .boxscore
            .and_then(|nested| nested.player_by_game_stats)
    };
    let (home_stats, away_stats) = match stats {
        Some(stats) => (stats.home_team, stats.away_team),
        None => (None, None),
    };

    let (number, period_type) = match &boxscore.period_descriptor {
        Some(descriptor) => (descriptor.number, descriptor.period_type.as_deref()),
        None => (boxscore.period, None),
    };
    let number = if number == 0 { boxscore.period } else { number };
    let period = period_label((number != 0).then_some(number), period_type);

    Ok(Some(LiveFeed {
        game_id: if boxscore.id != 0 { boxscore.id } else { game_id },
        state: boxscore.game_state.unwrap_or_default(),
        period,
        time_remaining: boxscore
            .clock
            .and_then(|clock| non_blank(clock.time_remaining)),
        home: feed_side(boxscore.home_team, home_stats, options),
        away: feed_side(boxscore.away_team, away_stats, options),
    }))
}

fn feed_side(team: Option<LocaleTeam>, stats: Option<GroupStats>, options: Options<'_>) -> FeedSide {
    let stats = stats.unwrap_or_default();
    let numeric_saves = options.stats_at_root;
    let players = stats
        .forwards
        .into_iter()
        .map(|line| line.into_feed_player("F", numeric_saves))
        .chain(
            stats
                .defense
                .into_iter()
                .map(|line| line.into_feed_player("D", numeric_saves)),
        )
        .chain(
            stats
                .goalies
                .into_iter()
                .map(|line| line.into_feed_player("G", numeric_saves)),
        )
        .filter(|player| player.id != 0)
        .collect();

    let Some(team) = team else {
        return FeedSide {
            players,
            ..FeedSide::default()
        };
    };
    let goals = team.score;
    let canonical = team.to_team(options);
    FeedSide {
        team_id: canonical.id,
        name: canonical.name,
        short_name: canonical.short_name,
        abbreviation: canonical.abbreviation,
        goals,
        players,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://api.test/v1";

    fn v1() -> Options<'static> {
        Options {
            stats_at_root: false,
            base_url: BASE,
        }
    }

    fn v2() -> Options<'static> {
        Options {
            stats_at_root: true,
            base_url: BASE,
        }
    }

    #[test]
    fn scoreboard_teams_take_every_listed_game() {
        let raw = json!({"gamesByDate": [{"date": "2024-10-01", "games": [{
            "id": 2024010071,
            "homeTeam": {"id": 5, "name": {"default": "Pittsburgh Penguins"}, "commonName": {"default": "Penguins"}, "abbrev": "PIT"},
            "awayTeam": {"id": 17, "name": {"default": "Detroit Red Wings"}, "commonName": {"default": "Red Wings"}, "abbrev": "DET"}
        }]}]});

        let teams = scoreboard_teams(raw, v1()).expect("teams");

        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].name.as_deref(), Some("Pittsburgh Penguins"));
        assert_eq!(teams[0].short_name.as_deref(), Some("Penguins"));
        assert_eq!(
            teams[1].link.as_deref(),
            Some("https://api.test/v1/roster/DET/current")
        );
    }

    #[test]
    fn v2_builds_display_name_from_place_and_common_name() {
        let raw = json!({"standings": [
            {"teamId": 22, "teamName": {"default": "Edmonton Oilers"}, "teamCommonName": {"default": "Oilers"}, "placeName": {"default": "Edmonton"}, "teamAbbrev": {"default": "EDM"}},
            {"teamId": 10, "teamName": {"default": "Toronto Maple Leafs"}, "teamAbbrev": {"default": "TOR"}},
            {"teamName": {"default": "No Id"}}
        ]});

        let teams = standings_teams(raw, v2()).expect("teams");

        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].name.as_deref(), Some("Edmonton Oilers"));
        assert_eq!(teams[1].name.as_deref(), Some("Toronto Maple Leafs"));
        assert_eq!(teams[1].short_name, None);
    }

    #[test]
    fn roster_merges_groups_and_tolerates_missing_ones() {
        let raw = json!({
            "forwards": [{"id": 8478402, "firstName": {"default": "Connor"}, "lastName": {"default": "McDavid"}, "positionCode": "C", "birthCountry": "CAN"}],
            "goalies": [{"id": 8479973, "firstName": {"default": "Stuart"}, "lastName": {"default": "Skinner"}, "positionCode": "G"}]
        });

        let players = roster(raw, v1()).expect("roster");

        assert_eq!(players.len(), 2);
        assert_eq!(players[0].full_name.as_deref(), Some("Connor McDavid"));
        assert_eq!(players[0].kind, PlayerKind::Skater);
        assert_eq!(
            players[0].link.as_deref(),
            Some("https://api.test/v1/player/8478402/landing")
        );
        assert_eq!(players[1].kind, PlayerKind::Goalie);
    }

    #[test]
    fn roster_reads_null_groups_as_empty() {
        let raw = json!({
            "forwards": [{"id": 8478402, "firstName": {"default": "Connor"}, "lastName": {"default": "McDavid"}, "positionCode": "C"}],
            "defensemen": null,
            "goalies": null
        });

        let players = roster(raw, v2()).expect("roster");

        assert_eq!(players.len(), 1);
        assert_eq!(players[0].id, 8478402);
    }

    #[test]
    fn landing_synthesizes_full_name() {
        let raw = json!({"playerId": 8478402, "firstName": {"default": "Connor"}, "lastName": {"default": "McDavid"}, "birthCountry": "CAN"});

        let player = player(raw, v2()).expect("decoded").expect("present");

        assert_eq!(player.full_name.as_deref(), Some("Connor McDavid"));
        assert_eq!(player.last_name.as_deref(), Some("McDavid"));
        assert_eq!(player.nationality.as_deref(), Some("CAN"));
    }

    #[test]
    fn landing_without_id_or_name_is_absent() {
        assert!(player(json!({}), v2()).expect("decoded").is_none());
        assert!(player(json!({"playerId": 1}), v2()).expect("decoded").is_none());
    }

    #[test]
    fn schedule_matches_exact_day_and_falls_back_to_link() {
        let raw = json!({"gameWeek": [
            {"date": "2024-10-01", "games": [
                {"id": 2024010071, "gameCenterLink": "/gamecenter/det-vs-pit/2024/10/01/2024010071"},
                {"gameCenterLink": "/gamecenter/bos-vs-nyr/2024/10/01/2024010072"}
            ]},
            {"date": "2024-10-02", "games": [{"id": 2024010080}]}
        ]});

        let games = schedule(raw, "2024-10-01").expect("schedule");

        assert_eq!(
            games,
            vec![
                String::from("2024010071"),
                String::from("/gamecenter/bos-vs-nyr/2024/10/01/2024010072")
            ]
        );
    }

    #[test]
    fn v1_live_feed_reads_nested_stats_and_save_ratio() {
        let raw = json!({
            "id": 2024010071,
            "gameState": "LIVE",
            "periodDescriptor": {"number": 2, "periodType": "REG"},
            "clock": {"timeRemaining": "12:34"},
            "homeTeam": {"id": 5, "name": {"default": "Pittsburgh Penguins"}, "abbrev": "PIT", "score": 1},
            "awayTeam": {"id": 17, "name": {"default": "Detroit Red Wings"}, "abbrev": "DET", "score": 2},
            "boxscore": {"playerByGameStats": {
                "homeTeam": {
                    "forwards": [{"playerId": 8471675, "name": {"default": "S. Crosby"}, "position": "C", "goals": 1, "assists": 0, "points": 1}],
                    "goalies": [{"playerId": 8476899, "name": {"default": "T. Jarry"}, "saveShotsAgainst": "28/30", "savePctg": "0.933"}]
                }
            }}
        });

        let feed = live_feed(raw, 0, v1()).expect("decoded").expect("present");

        assert_eq!(feed.game_id, 2024010071);
        assert_eq!(feed.period.as_deref(), Some("2nd"));
        assert_eq!(feed.time_remaining.as_deref(), Some("12:34"));
        assert_eq!(feed.away.goals, 2);
        assert!(feed.away.players.is_empty());
        let goalie = &feed.home.players[1];
        assert_eq!(goalie.kind(), PlayerKind::Goalie);
        assert_eq!(goalie.saves, 28);
        assert!((goalie.save_percentage - 0.933).abs() < 1e-9);
        assert_eq!(feed.home.players[0].last_name.as_deref(), Some("Crosby"));
    }

    #[test]
    fn v2_live_feed_reads_root_stats() {
        let raw = json!({
            "gameState": "FINAL",
            "periodDescriptor": {"number": 4, "periodType": "OT"},
            "homeTeam": {"id": 22, "placeName": {"default": "Edmonton"}, "commonName": {"default": "Oilers"}, "abbrev": "EDM", "score": 3},
            "awayTeam": {"id": 10, "placeName": {"default": "Toronto"}, "commonName": {"default": "Maple Leafs"}, "abbrev": "TOR", "score": 2},
            "playerByGameStats": {"awayTeam": {
                "goalies": [{"playerId": 8479361, "name": {"default": "J. Woll"}, "position": "G", "saves": 31, "savePctg": 0.912}]
            }}
        });

        let feed = live_feed(raw, 2024020100, v2()).expect("decoded").expect("present");

        assert_eq!(feed.game_id, 2024020100);
        assert_eq!(feed.period.as_deref(), Some("OT"));
        assert_eq!(feed.home.name.as_deref(), Some("Edmonton Oilers"));
        assert_eq!(feed.away.players[0].saves, 31);
    }

    #[test]
    fn null_stat_groups_are_read_as_empty() {
        let raw = json!({
            "gameState": "LIVE",
            "homeTeam": {"id": 22, "abbrev": "EDM", "score": 1},
            "awayTeam": {"id": 10, "abbrev": "TOR", "score": 0},
            "playerByGameStats": {
                "homeTeam": {
                    "forwards": [{"playerId": 8478402, "name": {"default": "C. McDavid"}, "position": "C", "goals": 1}],
                    "defense": null,
                    "goalies": null
                },
                "awayTeam": {"forwards": null, "defense": null, "goalies": null}
            }
        });

        let feed = live_feed(raw, 2024020101, v2()).expect("decoded").expect("present");

        assert_eq!(feed.home.players.len(), 1);
        assert_eq!(feed.home.players[0].goals, 1);
        assert!(feed.away.players.is_empty());
    }

    #[test]
    fn boxscore_without_teams_is_absent() {
        assert!(live_feed(json!({"gameState": "FUT"}), 1, v2())
            .expect("decoded")
            .is_none());
    }
}
