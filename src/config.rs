//! Relay configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Placeholder used when no source identifier is given on the command line
pub const PLACEHOLDER_SOURCE: &str = "https://www.youtube.com/watch?v=PLACEHOLDER";

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Rolling segment output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Target segment duration in seconds
    pub duration_secs: u32,

    /// Number of segments kept in the index
    pub list_size: u32,

    /// Index (playlist) file name
    pub index_name: String,

    /// Segment file name pattern, printf-style sequence number
    pub segment_pattern: String,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            duration_secs: 4,
            list_size: 5,
            index_name: "live.m3u8".to_string(),
            segment_pattern: "segment%03d.ts".to_string(),
        }
    }
}

/// Source resolution tool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Resolution executable
    pub program: String,

    /// Arguments placed before the source identifier
    pub args: Vec<String>,

    /// Maximum run time in seconds
    pub timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            args: vec!["-f".to_string(), "best".to_string(), "-g".to_string()],
            timeout_secs: 30,
        }
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Segmenting tool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Segmenter executable
    pub program: String,

    /// Wait after the graceful termination request before killing, in seconds
    pub grace_period_secs: u64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            grace_period_secs: 10,
        }
    }
}

impl SegmenterConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Relay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Source used when none is given on the command line
    pub default_source: String,

    /// Abort instead of falling back to `default_source`
    pub require_source: bool,

    /// Directory receiving segments and the index
    pub output_dir: PathBuf,

    pub server: ServerConfig,
    pub segment: SegmentConfig,
    pub resolver: ResolverConfig,
    pub segmenter: SegmenterConfig,
    pub logging: LoggingConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_source: PLACEHOLDER_SOURCE.to_string(),
            require_source: false,
            output_dir: PathBuf::from("hls_output"),
            server: ServerConfig::default(),
            segment: SegmentConfig::default(),
            resolver: ResolverConfig::default(),
            segmenter: SegmenterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Check values the external tools would otherwise reject at runtime
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be non-zero".to_string());
        }
        if self.segment.duration_secs == 0 {
            return Err("segment.duration_secs must be greater than zero".to_string());
        }
        if self.segment.list_size == 0 {
            return Err("segment.list_size must be at least 1".to_string());
        }
        for (key, name) in [
            ("segment.index_name", &self.segment.index_name),
            ("segment.segment_pattern", &self.segment.segment_pattern),
        ] {
            if !is_plain_file_name(name) {
                return Err(format!("{} must be a plain file name, got {:?}", key, name));
            }
        }
        if self.resolver.program.trim().is_empty() {
            return Err("resolver.program must not be empty".to_string());
        }
        if self.resolver.timeout_secs == 0 {
            return Err("resolver.timeout_secs must be greater than zero".to_string());
        }
        if self.segmenter.program.trim().is_empty() {
            return Err("segmenter.program must not be empty".to_string());
        }
        if self.segmenter.grace_period_secs == 0 {
            return Err("segmenter.grace_period_secs must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Playlist URL announced to operators
    pub fn playlist_url(&self) -> String {
        let host = if self.server.host == "0.0.0.0" {
            "<your-ip>"
        } else {
            self.server.host.as_str()
        };
        format!(
            "http://{}:{}/{}",
            host, self.server.port, self.segment.index_name
        )
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
