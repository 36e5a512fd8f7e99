mod games;
mod history;
mod player;
mod refresh;
mod rosters;
mod teams;

use puckline_core::{FetchContext, Puckline};
use serde_json::Value;

use crate::cli::Command;
use crate::error::CliError;

pub async fn run(
    command: &Command,
    puckline: &Puckline,
    ctx: &FetchContext,
) -> Result<Value, CliError> {
    match command {
        Command::Teams => teams::run(puckline, ctx).await,
        Command::Player(args) => player::run(args, puckline, ctx).await,
        Command::Rosters => rosters::run(puckline, ctx).await,
        Command::Refresh => refresh::run(puckline, ctx).await,
        Command::Games(args) => games::run(args, puckline, ctx).await,
        Command::History(args) => history::run(args, puckline).await,
    }
}
