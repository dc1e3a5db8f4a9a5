//! Segmenter supervision
//!
//! This module owns the external segmenting process (ffmpeg):
//! - Launching it against a resolved stream URL
//! - Draining its output into the log
//! - Observing its exit
//! - Two-phase termination (SIGTERM, grace period, SIGKILL)
//!
//! A supervisor allows a single live process at a time. The process is
//! represented by an owned [`SegmenterHandle`]; dropping the handle kills
//! the process.

pub mod command;
pub mod drain;

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SegmentConfig;
use crate::error::SupervisorError;
use crate::resolver::ResolvedStreamUrl;
use crate::workspace::OutputWorkspace;

pub use command::SegmenterCommand;

/// How long the drain may keep reading after the process is gone
const DRAIN_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Reported when the exit status could not be collected
const UNKNOWN_EXIT_CODE: i32 = 1;

/// Lifecycle of a segmenter process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    Starting,
    Running,
    Terminating,
    Exited(i32),
}

/// Launches segmenter processes, one at a time
#[derive(Debug, Clone)]
pub struct SegmenterSupervisor {
    program: String,
    active: Arc<Mutex<Option<u32>>>,
}

impl SegmenterSupervisor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Pid of the process currently owned by this supervisor, if any
    pub fn active_pid(&self) -> Option<u32> {
        *self.active.lock()
    }

    /// Start segmenting `url` into `workspace`. The workspace must already
    /// exist.
    pub fn start(
        &self,
        url: &ResolvedStreamUrl,
        workspace: &OutputWorkspace,
        segment: &SegmentConfig,
    ) -> Result<SegmenterHandle, SupervisorError> {
        let command = SegmenterCommand::hls(&self.program, url, workspace, segment);
        self.spawn(command)
    }

    fn spawn(&self, command: SegmenterCommand) -> Result<SegmenterHandle, SupervisorError> {
        let mut active = self.active.lock();
        if let Some(pid) = *active {
            return Err(SupervisorError::AlreadyRunning(pid));
        }

        tracing::info!("Starting segmenter process...");
        tracing::debug!("Command: {}", command.display());

        let launch_error = |source| SupervisorError::Launch {
            program: command.program.clone(),
            source,
        };

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(launch_error)?;

        let pid = child.id().ok_or_else(|| {
            launch_error(std::io::Error::other("process exited before its pid was read"))
        })?;
        *active = Some(pid);
        drop(active);

        let mut handle = SegmenterHandle {
            pid,
            state: SegmenterState::Starting,
            drain_cancel: CancellationToken::new(),
            drain: None,
            slot: ActiveSlot {
                active: Arc::clone(&self.active),
                pid,
                released: false,
            },
            child,
        };

        let stdout = handle.child.stdout.take();
        let stderr = handle.child.stderr.take();
        handle.drain = Some(drain::spawn(stdout, stderr, handle.drain_cancel.child_token()));
        handle.state = SegmenterState::Running;

        tracing::info!("Segmenter process started with PID: {}", pid);
        Ok(handle)
    }
}

/// Releases the supervisor's single slot when the process is gone
#[derive(Debug)]
struct ActiveSlot {
    active: Arc<Mutex<Option<u32>>>,
    pid: u32,
    released: bool,
}

impl ActiveSlot {
    fn release(&mut self) {
        if self.released {
            return;
        }
        let mut active = self.active.lock();
        if *active == Some(self.pid) {
            *active = None;
        }
        self.released = true;
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.release();
    }
}

/// A running segmenter process
#[derive(Debug)]
pub struct SegmenterHandle {
    pid: u32,
    state: SegmenterState,
    child: Child,
    drain: Option<JoinHandle<()>>,
    drain_cancel: CancellationToken,
    slot: ActiveSlot,
}

impl SegmenterHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn state(&self) -> SegmenterState {
        self.state
    }

    /// Wait for the process to exit on its own. Cancel safe.
    pub async fn wait(&mut self) -> Result<i32, SupervisorError> {
        if let SegmenterState::Exited(code) = self.state {
            return Ok(code);
        }
        let status = self.child.wait().await.map_err(SupervisorError::Wait)?;
        let code = self.record_exit(status);
        self.join_drain().await;
        Ok(code)
    }

    /// Ask the process to stop, wait up to `grace`, then kill it.
    ///
    /// Runs the protocol at most once: on an exited handle it just returns
    /// the recorded exit code.
    pub async fn terminate(&mut self, grace: Duration) -> i32 {
        match self.state {
            SegmenterState::Exited(code) => return code,
            // An earlier call was cancelled after SIGTERM went out.
            SegmenterState::Terminating => {}
            SegmenterState::Starting | SegmenterState::Running => {
                if let Ok(Some(status)) = self.child.try_wait() {
                    let code = self.record_exit(status);
                    self.join_drain().await;
                    return code;
                }
                self.state = SegmenterState::Terminating;
                self.request_stop();
            }
        }

        let status = match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                tracing::warn!("Failed to wait for segmenter {}: {}", self.pid, e);
                self.force_kill().await
            }
            Err(_elapsed) => {
                tracing::warn!(
                    "Segmenter did not terminate within {:?}. Sending SIGKILL.",
                    grace
                );
                self.force_kill().await
            }
        };

        let code = match status {
            Some(status) => self.record_exit(status),
            None => {
                self.state = SegmenterState::Exited(UNKNOWN_EXIT_CODE);
                self.slot.release();
                UNKNOWN_EXIT_CODE
            }
        };
        self.join_drain().await;
        tracing::info!("Segmenter shutdown complete.");
        code
    }

    #[cfg(unix)]
    fn request_stop(&mut self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        tracing::info!("Sending SIGTERM to segmenter {}", self.pid);
        // The child has not been reaped yet, so the pid still belongs to it.
        if let Err(e) = kill(Pid::from_raw(self.pid as i32), Signal::SIGTERM) {
            tracing::debug!("SIGTERM to {} failed: {}", self.pid, e);
        }
    }

    #[cfg(not(unix))]
    fn request_stop(&mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!("Failed to stop segmenter {}: {}", self.pid, e);
        }
    }

    async fn force_kill(&mut self) -> Option<ExitStatus> {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!("SIGKILL to {} failed: {}", self.pid, e);
        }
        match self.child.wait().await {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::error!("Failed to reap segmenter {}: {}", self.pid, e);
                None
            }
        }
    }

    fn record_exit(&mut self, status: ExitStatus) -> i32 {
        let code = exit_code(status);
        self.state = SegmenterState::Exited(code);
        self.slot.release();
        tracing::info!("Segmenter process exited with code: {}", code);
        code
    }

    async fn join_drain(&mut self) {
        let Some(mut drain) = self.drain.take() else {
            return;
        };
        let joined = match tokio::time::timeout(DRAIN_JOIN_TIMEOUT, &mut drain).await {
            Ok(joined) => joined,
            Err(_elapsed) => {
                tracing::debug!("Segmenter output still open after exit, stopping log drain");
                self.drain_cancel.cancel();
                drain.await
            }
        };
        if let Err(e) = joined {
            tracing::debug!("Segmenter log drain ended abnormally: {}", e);
        }
    }
}

impl Drop for SegmenterHandle {
    fn drop(&mut self) {
        self.drain_cancel.cancel();
    }
}

/// Exit code of a finished process; signal deaths map to 128 + signal
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    UNKNOWN_EXIT_CODE
}
