use puckline_core::Puckline;
use serde_json::Value;

use crate::cli::HistoryArgs;
use crate::error::CliError;

pub async fn run(args: &HistoryArgs, puckline: &Puckline) -> Result<Value, CliError> {
    let warehouse = puckline.warehouse().clone();
    let limit = args.limit;
    let entries = tokio::task::spawn_blocking(move || warehouse.recent_refreshes(limit))
        .await
        .map_err(std::io::Error::other)??;
    Ok(serde_json::to_value(entries)?)
}
