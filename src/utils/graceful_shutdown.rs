use std::sync::{Arc, OnceLock};

use eyre::{Result, WrapErr};
use tokio::{signal, sync::broadcast};

/// Why the server is stopping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT (Ctrl+C)
    Interrupt,
    /// SIGTERM
    Terminate,
    /// Requested from inside the process
    Requested,
}

/// Fans a single shutdown decision out to the server and background tasks.
#[derive(Clone)]
pub struct GracefulShutdown {
    shutdown_tx: broadcast::Sender<ShutdownReason>,
    reason: Arc<OnceLock<ShutdownReason>>,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(4);
        Self {
            shutdown_tx,
            reason: Arc::new(OnceLock::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownReason> {
        self.shutdown_tx.subscribe()
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.reason.get().is_some()
    }

    /// The reason shutdown was triggered with, once it has been.
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    /// Start shutdown; only the first call has an effect.
    pub fn trigger_shutdown(&self, reason: ShutdownReason) {
        if self.reason.set(reason).is_ok() {
            tracing::info!(?reason, "Shutdown initiated");
            // no receivers just means nobody is waiting yet
            let _ = self.shutdown_tx.send(reason);
        } else {
            tracing::debug!(?reason, "Shutdown already initiated, ignoring");
        }
    }

    /// Listen for SIGINT and SIGTERM and trigger shutdown on the first one.
    pub async fn run_signal_handler(&self) -> Result<()> {
        tracing::debug!("Signal handler started");

        #[cfg(unix)]
        let terminate = async {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                .wrap_err("Failed to register SIGTERM handler")?;
            sigterm.recv().await;
            Ok::<(), eyre::Report>(())
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<Result<()>>();

        tokio::select! {
            result = signal::ctrl_c() => {
                result.wrap_err("Failed to listen for Ctrl+C")?;
                self.trigger_shutdown(ShutdownReason::Interrupt);
            }
            result = terminate => {
                result?;
                self.trigger_shutdown(ShutdownReason::Terminate);
            }
        }
        Ok(())
    }

    /// Resolve once shutdown has been triggered, even if that already happened.
    pub async fn wait_for_shutdown_signal(&self) -> ShutdownReason {
        // subscribe before checking so a trigger in between is still received
        let mut receiver = self.subscribe();
        if let Some(reason) = self.reason() {
            return reason;
        }
        receiver
            .recv()
            .await
            .unwrap_or_else(|_| self.reason().unwrap_or(ShutdownReason::Requested))
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}
