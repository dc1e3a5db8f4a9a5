//! HLS Relay
//!
//! Resolves a live or on-demand source to a direct media URL, repackages it
//! with ffmpeg into a rolling HLS playlist on disk, and serves that
//! directory over HTTP until interrupted.

mod cli;
mod config;
mod config_file;
mod error;
mod http;
mod orchestrator;
mod resolver;
mod segmenter;
mod signal;
mod workspace;

#[cfg(test)]
mod integration;

use clap::Parser;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::config::{LoggingConfig, RelayConfig};
use crate::error::RelayError;
use crate::orchestrator::Orchestrator;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "hls-relay";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(path) = &cli.init_config {
        return match config_file::generate_default_config(path) {
            Ok(()) => {
                println!("Wrote default configuration to {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to write {}: {}", path.display(), e);
                ExitCode::FAILURE
            }
        };
    }

    let loaded = cli.load_config();
    init_logging(
        loaded
            .as_ref()
            .map(|c| &c.logging)
            .unwrap_or(&LoggingConfig::default()),
    );

    let config = match loaded {
        Ok(config) => config,
        Err(e) => return fail(e),
    };

    if cli.print_config {
        return match config.to_toml() {
            Ok(toml) => {
                print!("{}", toml);
                ExitCode::SUCCESS
            }
            Err(e) => fail(RelayError::Config(e.to_string())),
        };
    }

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    print_disclaimer();

    let identifier = match source_identifier(cli.source, &config) {
        Ok(identifier) => identifier,
        Err(e) => return fail(e),
    };

    let cancel = CancellationToken::new();
    signal::listen(cancel.clone());

    let orchestrator = Orchestrator::new(config);
    let code = match orchestrator.run(&identifier, cancel).await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            tracing::error!("{}", e);
            e.exit_code()
        }
    };

    tracing::info!("Application finished.");
    to_exit_code(code)
}

/// Initialize logging with tracing
fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("hls_relay={0},tower_http={0}", logging.level).into()
    });
    let json = logging.format.eq_ignore_ascii_case("json");

    tracing_subscriber::registry()
        .with(filter)
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .init();
}

fn print_disclaimer() {
    tracing::warn!("********************************************************************");
    tracing::warn!("Relay only content you are entitled to redistribute. Streams from");
    tracing::warn!("third-party platforms may be covered by their terms of service and");
    tracing::warn!("by copyright law.");
    tracing::warn!("********************************************************************");
}

/// The positional source, or the configured placeholder
fn source_identifier(source: Option<String>, config: &RelayConfig) -> Result<String, RelayError> {
    match source {
        Some(source) => Ok(source),
        None if config.require_source => Err(RelayError::MissingSource),
        None => {
            tracing::warn!("No source given, using placeholder: {}", config.default_source);
            tracing::warn!("Pass a video or live stream URL as the first argument.");
            Ok(config.default_source.clone())
        }
    }
}

fn fail(e: RelayError) -> ExitCode {
    tracing::error!("{}", e);
    to_exit_code(e.exit_code())
}

/// Map a numeric exit code into the 8-bit process status, keeping failures
/// non-zero.
fn exit_status_byte(code: i32) -> u8 {
    match (code & 0xff) as u8 {
        0 if code != 0 => 1,
        byte => byte,
    }
}

fn to_exit_code(code: i32) -> ExitCode {
    ExitCode::from(exit_status_byte(code))
}
