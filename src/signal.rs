//! Operator interrupts
//!
//! SIGINT (Ctrl+C) and SIGTERM cancel a shared token. Only the first signal
//! counts; later ones are logged and otherwise ignored.

use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Listen for interrupts in the background for the rest of the process
pub fn listen(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        let mut terminate = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sig) => Some(sig),
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                None
            }
        };

        loop {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    tracing::error!("Failed to install Ctrl+C handler: {}", e);
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let term = async {
                if let Some(sig) = terminate.as_mut() {
                    if sig.recv().await.is_some() {
                        return;
                    }
                }
                std::future::pending::<()>().await
            };

            #[cfg(not(unix))]
            let term = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {},
                _ = term => {},
            }

            interrupt(&cancel);
        }
    })
}

/// Record an interrupt. Returns true only for the first one.
pub fn interrupt(cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        tracing::warn!("Shutdown already in progress, ignoring signal");
        return false;
    }
    tracing::info!("Shutdown signal received");
    cancel.cancel();
    true
}
