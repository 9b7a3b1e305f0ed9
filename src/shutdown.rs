//! Graceful shutdown coordination.
//!
//! The job runner drains in-flight work when shutdown is requested, so
//! the coordinator only has to flip a flag and wake the waiters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal;
use tokio::sync::Notify;
use tracing::{info, warn};

/// Coordinates graceful shutdown across workers.
///
/// Components can check whether shutdown has been requested, wait for it
/// asynchronously, or request it programmatically. Cloning shares the
/// underlying state.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    shutdown_requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            shutdown_requested: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Request shutdown. Safe to call multiple times.
    pub fn request_shutdown(&self) {
        let was_requested = self.shutdown_requested.swap(true, Ordering::SeqCst);
        if !was_requested {
            info!("Shutdown requested");
            self.notify.notify_waiters();
        }
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Resolves when shutdown is requested; immediately if it already
    /// was.
    pub async fn wait_for_shutdown(&self) {
        if self.is_shutdown_requested() {
            return;
        }
        self.notify.notified().await;
    }

    /// Spawn a signal listener. On Unix this watches SIGTERM and SIGINT;
    /// elsewhere it falls back to Ctrl+C.
    pub fn start_signal_listener(&self) {
        let coordinator = self.clone();

        tokio::spawn(async move {
            #[cfg(unix)]
            {
                let sigterm = signal::unix::signal(signal::unix::SignalKind::terminate());
                let sigint = signal::unix::signal(signal::unix::SignalKind::interrupt());
                match (sigterm, sigint) {
                    (Ok(mut sigterm), Ok(mut sigint)) => {
                        tokio::select! {
                            _ = sigterm.recv() => {
                                info!("Received SIGTERM, initiating graceful shutdown");
                            }
                            _ = sigint.recv() => {
                                info!("Received SIGINT, initiating graceful shutdown");
                            }
                        }
                    }
                    _ => {
                        warn!("Failed to install signal handlers, falling back to Ctrl+C");
                        signal::ctrl_c().await.ok();
                    }
                }
            }

            #[cfg(not(unix))]
            {
                if let Err(e) = signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                    return;
                }
                info!("Received Ctrl+C, initiating graceful shutdown");
            }

            coordinator.request_shutdown();
        });
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_starts_not_requested() {
        let coordinator = ShutdownCoordinator::new();
        assert!(!coordinator.is_shutdown_requested());
    }

    #[tokio::test]
    async fn test_request_sets_flag() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.request_shutdown();
        coordinator.request_shutdown();
        assert!(coordinator.is_shutdown_requested());
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_already_requested() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.request_shutdown();

        let result =
            tokio::time::timeout(Duration::from_millis(100), coordinator.wait_for_shutdown()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_wait_wakes_on_request() {
        let coordinator = ShutdownCoordinator::new();
        let remote = coordinator.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            remote.request_shutdown();
        });

        let result =
            tokio::time::timeout(Duration::from_secs(1), coordinator.wait_for_shutdown()).await;
        assert!(result.is_ok());
        assert!(coordinator.is_shutdown_requested());
    }
}
