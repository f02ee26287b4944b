//! Anganwadi front-office CLI.
//!
//! Marks daily attendance, lists vaccination doses due and exports the
//! day's roster for the center configured in `~/.config/anganwadi`.

mod args;
mod commands;

use std::io;

use anganwadi_core::api::HistoryQuery;
use anganwadi_core::Config;
use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Command};
use commands::Context;

/// Directory for an optional rolling log file
const ENV_LOG_DIR: &str = "ANGANWADI_LOG_DIR";

const LOG_FILE_PREFIX: &str = "anganwadi.log";

/// Initialize the tracing subscriber for logging
///
/// Returns the file writer guard when `ANGANWADI_LOG_DIR` is set; dropping it
/// flushes the log.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(ENV_LOG_DIR) {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing();

    let config = Config::load()?;
    info!(api = %config.api_base_url(), center = %config.center(), "Anganwadi CLI starting");
    let mut ctx = Context::new(config)?;

    match cli.command {
        Command::Roster {
            center,
            status,
            search,
        } => ctx.roster(&center, status, search.as_deref()).await,
        Command::Mark { child_id, status } => ctx.mark(&child_id, status).await,
        Command::Bulk { status, child_ids } => ctx.bulk(status, child_ids).await,
        Command::Details {
            child_id,
            nutrition,
            health_check,
            notes,
        } => ctx.details(&child_id, args::details_patch(nutrition, health_check, notes)).await,
        Command::History {
            child_id,
            from,
            to,
            limit,
        } => {
            let query = HistoryQuery {
                start_date: from,
                end_date: to,
                limit,
            };
            ctx.history(&child_id, query).await
        }
        Command::Stats { center, from, to } => ctx.stats(&center, from, to).await,
        Command::Vaccines {
            center,
            include_scheduled,
        } => ctx.vaccines(&center, include_scheduled).await,
        Command::Export { format, center } => ctx.export(format, &center).await,
    }
}
