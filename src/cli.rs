//! Command-line interface

use clap::Parser;
use std::path::{Path, PathBuf};

use crate::config::RelayConfig;
use crate::config_file::ConfigFile;
use crate::error::RelayError;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_PATH: &str = "hls-relay.toml";

/// Relay a live or on-demand source as rolling HLS segments over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "hls-relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source URL or identifier handed to the resolver
    pub source: Option<String>,

    /// TOML configuration file
    #[arg(short, long, env = "HLS_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind the file server to
    #[arg(long, env = "HLS_RELAY_HOST")]
    pub host: Option<String>,

    /// Port to serve segments on
    #[arg(short, long, env = "HLS_RELAY_PORT")]
    pub port: Option<u16>,

    /// Directory receiving segments and the index (wiped on start)
    #[arg(short, long, env = "HLS_RELAY_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Target segment duration in seconds
    #[arg(long)]
    pub segment_duration: Option<u32>,

    /// Number of segments kept in the index
    #[arg(long)]
    pub list_size: Option<u32>,

    /// Abort when no source is given instead of using the placeholder
    #[arg(long)]
    pub require_source: bool,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, env = "HLS_RELAY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Write a default configuration file to PATH and exit
    #[arg(long, value_name = "PATH")]
    pub init_config: Option<PathBuf>,
}

impl Cli {
    /// Defaults, then the config file, then flags and environment
    pub fn load_config(&self) -> Result<RelayConfig, RelayError> {
        let mut config = match &self.config {
            Some(path) => load_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => load_file(Path::new(DEFAULT_CONFIG_PATH))?,
            None => RelayConfig::default(),
        };
        self.apply(&mut config);
        config.validate().map_err(RelayError::Config)?;
        Ok(config)
    }

    fn apply(&self, config: &mut RelayConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(duration) = self.segment_duration {
            config.segment.duration_secs = duration;
        }
        if let Some(list_size) = self.list_size {
            config.segment.list_size = list_size;
        }
        if self.require_source {
            config.require_source = true;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

fn load_file(path: &Path) -> Result<RelayConfig, RelayError> {
    ConfigFile::from_file(path)
        .map(ConfigFile::into_relay_config)
        .map_err(|e| RelayError::Config(format!("failed to load {}: {}", path.display(), e)))
}
