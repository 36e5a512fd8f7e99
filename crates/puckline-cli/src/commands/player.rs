use puckline_core::{FetchContext, Puckline};
use serde_json::Value;

use crate::cli::PlayerArgs;
use crate::error::CliError;

pub async fn run(
    args: &PlayerArgs,
    puckline: &Puckline,
    ctx: &FetchContext,
) -> Result<Value, CliError> {
    let player = puckline.get_player(ctx, args.id).await?;
    Ok(serde_json::to_value(player)?)
}
