use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for the relay
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No source identifier given and require_source is set")]
    MissingSource,

    #[error("Source resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("File server error: {0}")]
    Server(#[from] ServerError),

    #[error("Segmenter error: {0}")]
    Supervisor(#[from] SupervisorError),
}

impl RelayError {
    /// Process exit code reported for a run aborted by this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RelayError::Config(_) | RelayError::MissingSource => 1,
            RelayError::Resolution(_) => 2,
            RelayError::Workspace(_) => 3,
            RelayError::Server(_) => 4,
            RelayError::Supervisor(_) => 5,
        }
    }
}

/// Failures of the external resolution tool
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("{program} exited with {status}: {stderr}")]
    ProcessFailed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} did not return a stream URL: {output:?}")]
    InvalidOutput { program: String, output: String },

    #[error("failed to launch {program}: {source}")]
    LaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Output directory errors
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// HTTP listener errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Segmenting process errors
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("a segmenter is already running (pid {0})")]
    AlreadyRunning(u32),

    #[error("failed to wait for segmenter: {0}")]
    Wait(#[source] std::io::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RelayError>;
