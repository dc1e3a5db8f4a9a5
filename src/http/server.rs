//! HTTP listener lifecycle

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ServerError;

use super::create_router;

/// How long shutdown waits for the serve loop before aborting it
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// A bound, running file server
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// Bind `addr` and serve `directory` from a background task.
///
/// Binding happens before this returns, so a port conflict is reported
/// here and never retried.
pub async fn serve(directory: impl Into<PathBuf>, addr: &str) -> Result<ServerHandle, ServerError> {
    let directory = directory.into();
    let bind_error = |source| ServerError::Bind {
        addr: addr.to_string(),
        source,
    };

    let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;

    let app = create_router(&directory);
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await;
        if let Err(e) = result {
            tracing::error!("File server stopped: {}", e);
        }
    });

    tracing::info!("Serving {:?} on {}", directory, local_addr);

    Ok(ServerHandle {
        local_addr,
        cancel,
        task: Some(task),
    })
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections. In-flight requests get a short window to
    /// finish and are dropped after that.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await.is_err() {
                tracing::debug!("File server did not drain in time, aborting");
                task.abort();
            }
        }
        tracing::info!("HTTP server shut down.");
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
