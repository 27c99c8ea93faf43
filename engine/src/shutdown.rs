//! Stop signal for the engine's background tasks: the trigger dispatcher,
//! the retry sweep and, in the daemon, the metrics server.
//!
//! Executions still running when the signal arrives are aborted with the
//! dispatcher's join set. Their records stay in progress until the sweep of
//! the next run flags them.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;

/// Owned by the daemon; hands out one [`ShutdownSignal`] per task.
#[derive(Clone)]
pub struct ShutdownController {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait for SIGINT (or SIGTERM on unix), then stop every task.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cannot listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = signal::ctrl_c() => tracing::info!("SIGINT, stopping engine tasks"),
            _ = terminate => tracing::info!("SIGTERM, stopping engine tasks"),
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// One task's view of the stop signal.
///
/// Taken after [`ShutdownController::shutdown`] it resolves at once, so a
/// task spawned late (the metrics server starts after the engine) cannot
/// miss it.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolves once shutdown is requested. A dropped controller counts.
    pub async fn recv(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}
