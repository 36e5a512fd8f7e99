use puckline_core::{FetchContext, Game, GameDate, Puckline};
use serde::Serialize;
use serde_json::Value;

use crate::cli::GamesArgs;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct GamesResponseData {
    date: String,
    games: Vec<Game>,
}

pub async fn run(
    args: &GamesArgs,
    puckline: &Puckline,
    ctx: &FetchContext,
) -> Result<Value, CliError> {
    let date = match &args.date {
        Some(date) => GameDate::parse(date)?,
        None => GameDate::today(),
    }
    .to_string();
    let games = puckline.get_games(ctx, &date).await?;
    Ok(serde_json::to_value(GamesResponseData { date, games })?)
}
