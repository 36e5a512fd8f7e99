use puckline_core::{FetchContext, Puckline};
use serde_json::Value;
use tracing::warn;

use crate::error::CliError;

pub async fn run(puckline: &Puckline, ctx: &FetchContext) -> Result<Value, CliError> {
    let report = puckline.refresh_teams_and_rosters(ctx).await?;
    if report.is_partial() {
        warn!(
            failed = ?report.failed_rosters,
            "refresh committed with empty rosters for some teams"
        );
    }
    Ok(serde_json::to_value(report)?)
}
