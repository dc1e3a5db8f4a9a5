//! Source resolution
//!
//! Runs the external resolution tool (yt-dlp by default) once, with a
//! bounded timeout, and turns its output into a direct stream URL.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::config::ResolverConfig;
use crate::error::ResolutionError;

/// A direct http(s) media URL returned by the resolution tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStreamUrl(String);

impl ResolvedStreamUrl {
    /// Accepts the first non-empty line of `output` if it is an http(s) URL
    pub fn parse(output: &str) -> Option<Self> {
        let candidate = output.lines().map(str::trim).find(|l| !l.is_empty())?;
        let rest = candidate
            .strip_prefix("https://")
            .or_else(|| candidate.strip_prefix("http://"))?;
        if rest.is_empty() || candidate.contains(char::is_whitespace) {
            return None;
        }
        Some(Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedStreamUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Invokes `<program> <args...> <identifier>` and validates the result
#[derive(Debug, Clone)]
pub struct SourceResolver {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl SourceResolver {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone(), config.timeout())
    }

    /// Resolve `identifier` to a direct stream URL. Single attempt, no retries.
    pub async fn resolve(&self, identifier: &str) -> Result<ResolvedStreamUrl, ResolutionError> {
        tracing::info!("Resolving stream URL for {}", identifier);

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(identifier)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| ResolutionError::LaunchFailed {
            program: self.program.clone(),
            source,
        })?;

        // On timeout the wait future is dropped, which kills the child.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(ResolutionError::LaunchFailed {
                    program: self.program.clone(),
                    source,
                })
            }
            Err(_elapsed) => {
                return Err(ResolutionError::Timeout {
                    program: self.program.clone(),
                    timeout: self.timeout,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(ResolutionError::ProcessFailed {
                program: self.program.clone(),
                status: output.status,
                stderr: stderr.trim().to_string(),
            });
        }

        let Some(url) = ResolvedStreamUrl::parse(&stdout) else {
            if !stderr.trim().is_empty() {
                tracing::error!("{} stderr: {}", self.program, stderr.trim());
            }
            return Err(ResolutionError::InvalidOutput {
                program: self.program.clone(),
                output: stdout.trim().to_string(),
            });
        };

        let extra = stdout.lines().filter(|l| !l.trim().is_empty()).count();
        if extra > 1 {
            tracing::warn!(
                "{} returned {} URLs, using the first one",
                self.program,
                extra
            );
        }

        tracing::info!("Successfully obtained stream URL");
        tracing::debug!("Stream URL: {}", url);
        Ok(url)
    }
}
