use puckline_core::{FetchContext, Puckline, TeamRoster};
use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;

#[derive(Debug, Serialize)]
struct RostersResponseData {
    team_count: usize,
    player_count: usize,
    teams: Vec<TeamRoster>,
}

pub async fn run(puckline: &Puckline, ctx: &FetchContext) -> Result<Value, CliError> {
    let teams = puckline.get_teams_with_rosters(ctx).await?;
    let player_count = teams.iter().map(|roster| roster.players.len()).sum();
    Ok(serde_json::to_value(RostersResponseData {
        team_count: teams.len(),
        player_count,
        teams,
    })?)
}
