#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
//! rasmeta: inspect and edit raster dataset metadata.

mod calc;
mod cli;
mod commands;
mod native;
mod raster;
mod types;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, OutputCtx, write_error};
use types::ErrorOutput;

/// Log filter for a net verbosity; `RUST_LOG` takes precedence.
fn log_filter(verbosity: i8) -> EnvFilter {
    let level = match verbosity {
        i8::MIN..=-2 => "off",
        -1 => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_logging(verbosity: i8) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}

fn main() {
    let cli = Cli::parse();
    let verbosity = cli.verbosity();

    if let Err(e) = init_logging(verbosity) {
        eprintln!("Warning: {e:#}");
    }
    if let Err(e) = native::configure(verbosity) {
        tracing::warn!(error = %e, "GDAL configuration incomplete");
    }

    let ctx = OutputCtx::new(cli.output, cli.json, cli.no_header);

    match commands::dispatch(&cli.command, &ctx) {
        Ok(()) => {}
        Err(err) => {
            tracing::debug!(?err, "command failed");
            let error_output = ErrorOutput::from_raster_error(&err);
            write_error(&error_output, cli.output, cli.json);
            std::process::exit(err.exit_code());
        }
    }
}
