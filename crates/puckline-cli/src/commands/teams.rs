use puckline_core::{FetchContext, Puckline, Team};
use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;

#[derive(Debug, Serialize)]
struct TeamsResponseData {
    count: usize,
    teams: Vec<Team>,
}

pub async fn run(puckline: &Puckline, ctx: &FetchContext) -> Result<Value, CliError> {
    let teams = puckline.get_teams(ctx).await?;
    Ok(serde_json::to_value(TeamsResponseData {
        count: teams.len(),
        teams,
    })?)
}
