//! Configuration file support
//!
//! Loads relay configuration from TOML files. Every section and field is
//! optional; anything left out keeps its built-in default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::RelayConfig;

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Source settings
    pub source: Option<SourceSettings>,
    /// Output directory settings
    pub output: Option<OutputSettings>,
    /// Server settings
    pub server: Option<ServerSettings>,
    /// Segment settings
    pub segment: Option<SegmentSettings>,
    /// Resolver settings
    pub resolver: Option<ResolverSettings>,
    /// Segmenter settings
    pub segmenter: Option<SegmenterSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Identifier used when none is passed on the command line
    pub default: Option<String>,
    /// Abort when no identifier is passed
    pub required: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Directory receiving segments and the index
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: Option<String>,
    /// Port to listen on
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSettings {
    /// Target segment duration in seconds
    pub duration_secs: Option<u32>,
    /// Segments kept in the index
    pub list_size: Option<u32>,
    /// Index file name
    pub index_name: Option<String>,
    /// Segment file name pattern
    pub segment_pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterSettings {
    pub program: Option<String>,
    pub grace_period_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let defaults = RelayConfig::default();
        Self {
            source: Some(SourceSettings {
                default: Some(defaults.default_source),
                required: Some(defaults.require_source),
            }),
            output: Some(OutputSettings {
                dir: Some(defaults.output_dir),
            }),
            server: Some(ServerSettings {
                host: Some(defaults.server.host),
                port: Some(defaults.server.port),
            }),
            segment: Some(SegmentSettings {
                duration_secs: Some(defaults.segment.duration_secs),
                list_size: Some(defaults.segment.list_size),
                index_name: Some(defaults.segment.index_name),
                segment_pattern: Some(defaults.segment.segment_pattern),
            }),
            resolver: Some(ResolverSettings {
                program: Some(defaults.resolver.program),
                args: Some(defaults.resolver.args),
                timeout_secs: Some(defaults.resolver.timeout_secs),
            }),
            segmenter: Some(SegmenterSettings {
                program: Some(defaults.segmenter.program),
                grace_period_secs: Some(defaults.segmenter.grace_period_secs),
            }),
            logging: Some(LoggingSettings {
                level: Some(defaults.logging.level),
                format: Some(defaults.logging.format),
            }),
        }
    }

    /// Merge over the built-in defaults
    pub fn into_relay_config(self) -> RelayConfig {
        let mut config = RelayConfig::default();

        if let Some(source) = self.source {
            if let Some(default) = source.default {
                config.default_source = default;
            }
            if let Some(required) = source.required {
                config.require_source = required;
            }
        }
        if let Some(dir) = self.output.and_then(|o| o.dir) {
            config.output_dir = dir;
        }
        if let Some(server) = self.server {
            if let Some(host) = server.host {
                config.server.host = host;
            }
            if let Some(port) = server.port {
                config.server.port = port;
            }
        }
        if let Some(segment) = self.segment {
            if let Some(duration) = segment.duration_secs {
                config.segment.duration_secs = duration;
            }
            if let Some(list_size) = segment.list_size {
                config.segment.list_size = list_size;
            }
            if let Some(index_name) = segment.index_name {
                config.segment.index_name = index_name;
            }
            if let Some(pattern) = segment.segment_pattern {
                config.segment.segment_pattern = pattern;
            }
        }
        if let Some(resolver) = self.resolver {
            if let Some(program) = resolver.program {
                config.resolver.program = program;
            }
            if let Some(args) = resolver.args {
                config.resolver.args = args;
            }
            if let Some(timeout) = resolver.timeout_secs {
                config.resolver.timeout_secs = timeout;
            }
        }
        if let Some(segmenter) = self.segmenter {
            if let Some(program) = segmenter.program {
                config.segmenter.program = program;
            }
            if let Some(grace) = segmenter.grace_period_secs {
                config.segmenter.grace_period_secs = grace;
            }
        }
        if let Some(logging) = self.logging {
            if let Some(level) = logging.level {
                config.logging.level = level;
            }
            if let Some(format) = logging.format {
                config.logging.format = format;
            }
        }

        config
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}
