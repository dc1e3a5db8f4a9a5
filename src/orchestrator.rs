//! Run sequencing
//!
//! resolve -> prepare workspace -> start file server -> start segmenter ->
//! wait for exit or interrupt -> shut down in reverse order.

use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::error::Result;
use crate::http;
use crate::resolver::SourceResolver;
use crate::segmenter::SegmenterSupervisor;
use crate::workspace::OutputWorkspace;

/// How a run that got past startup ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Stopped by an operator interrupt
    Interrupted,
    /// The segmenter exited on its own with this code
    SegmenterExited(i32),
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Interrupted => 0,
            RunOutcome::SegmenterExited(code) => *code,
        }
    }
}

pub struct Orchestrator {
    config: RelayConfig,
    resolver: SourceResolver,
    workspace: OutputWorkspace,
    supervisor: SegmenterSupervisor,
}

impl Orchestrator {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            resolver: SourceResolver::from_config(&config.resolver),
            workspace: OutputWorkspace::new(config.output_dir.clone()),
            supervisor: SegmenterSupervisor::new(config.segmenter.program.clone()),
            config,
        }
    }

    #[cfg(test)]
    pub fn workspace(&self) -> &OutputWorkspace {
        &self.workspace
    }

    /// Relay `identifier` until the segmenter exits or `cancel` fires.
    ///
    /// Startup failures abort the run before any later step has side
    /// effects.
    pub async fn run(&self, identifier: &str, cancel: CancellationToken) -> Result<RunOutcome> {
        let url = tokio::select! {
            result = self.resolver.resolve(identifier) => result?,
            _ = cancel.cancelled() => {
                tracing::info!("Interrupted while resolving the source");
                return Ok(RunOutcome::Interrupted);
            }
        };

        self.workspace.prepare().await?;

        let server = http::serve(
            self.workspace.path().to_path_buf(),
            &self.config.server.socket_addr(),
        )
        .await?;
        tracing::info!("Access the stream at: {}", self.config.playlist_url());

        let mut segmenter = match self.supervisor.start(&url, &self.workspace, &self.config.segment)
        {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!("Segmenter process failed to start: {}", e);
                server.shutdown().await;
                return Err(e.into());
            }
        };

        let grace = self.config.segmenter.grace_period();
        let outcome = tokio::select! {
            result = segmenter.wait() => match result {
                Ok(code) => RunOutcome::SegmenterExited(code),
                Err(e) => {
                    tracing::error!("Lost track of the segmenter: {}", e);
                    RunOutcome::SegmenterExited(segmenter.terminate(grace).await)
                }
            },
            _ = cancel.cancelled() => {
                tracing::info!("Interrupt received. Shutting down segmenter...");
                segmenter.terminate(grace).await;
                RunOutcome::Interrupted
            }
        };

        tracing::debug!(
            "Segmenter {} finished in state {:?}",
            segmenter.pid(),
            segmenter.state()
        );
        drop(segmenter);
        debug_assert!(self.supervisor.active_pid().is_none());

        tracing::debug!("Stopping file server on {}", server.local_addr());
        server.shutdown().await;
        Ok(outcome)
    }
}
