mod cli;
mod commands;
mod error;
mod output;

use std::process::ExitCode;

use clap::Parser;
use puckline_core::{FetchContext, Puckline, Settings, Warehouse};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

fn init_logging(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("puckline=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let settings = settings_for(&cli)?;
    let warehouse = Warehouse::open(settings.warehouse.config())?;
    info!(db_path = ?warehouse.db_path(), schema = %settings.upstream.schema, "puckline starting");
    let puckline = Puckline::with_reqwest(&settings, warehouse);

    let ctx = FetchContext::background();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling in-flight requests");
            canceller.cancel();
        }
    });

    let data = commands::run(&cli.command, &puckline, &ctx).await?;
    output::render(&data, cli.pretty)?;
    Ok(ExitCode::SUCCESS)
}

/// Environment settings with global flags layered on top.
fn settings_for(cli: &Cli) -> Result<Settings, CliError> {
    let mut settings = Settings::from_env()?;
    if let Some(base_url) = &cli.base_url {
        settings.upstream.base_url = base_url.clone();
    }
    if let Some(api_key) = &cli.api_key {
        settings.upstream.api_key = Some(api_key.clone());
    }
    if let Some(schema) = &cli.schema {
        settings.upstream.schema = schema.parse()?;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        settings.upstream.timeout_ms = timeout_ms;
    }
    if let Some(fan_out) = cli.fan_out {
        settings.reconcile.roster_fan_out = fan_out;
    }
    if let Some(db_path) = &cli.db_path {
        settings.warehouse.db_path = Some(db_path.clone());
    }
    settings.warehouse.in_memory |= cli.in_memory;
    settings.validate()?;
    Ok(settings)
}
