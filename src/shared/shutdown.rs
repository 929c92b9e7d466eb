//! Graceful shutdown handling
//!
//! One `ShutdownSignal` is cloned into the accept loop, every connection
//! task, the heartbeat monitor and the pending-command reaper. The flag is
//! a watch channel, so late waiters still observe a shutdown that already
//! happened.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct ShutdownSignal {
    flag: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.flag.borrow()
    }

    /// Idempotent; only the first call logs.
    pub fn trigger(&self) {
        let first = self.flag.send_if_modified(|stopped| !std::mem::replace(stopped, true));
        if first {
            info!("Shutdown signal triggered");
        }
    }

    pub async fn wait(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves on SIGTERM or SIGINT (Ctrl+C elsewhere). Returns `None` when
/// the handlers could not be installed.
async fn os_signal() -> Option<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                return None;
            }
        };
        let mut int = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Failed to install SIGINT handler");
                return None;
            }
        };
        tokio::select! {
            _ = term.recv() => Some("SIGTERM"),
            _ = int.recv() => Some("SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Some("Ctrl+C"),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                None
            }
        }
    }
}

/// Owns the signal and bounds how long teardown may take.
pub struct ShutdownCoordinator {
    signal: ShutdownSignal,
    grace: Duration,
}

impl ShutdownCoordinator {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            signal: ShutdownSignal::new(),
            grace: Duration::from_secs(timeout_secs),
        }
    }

    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    /// Trigger the signal when the process is asked to stop.
    pub fn start_signal_listener(&self) {
        let signal = self.signal.clone();
        tokio::spawn(async move {
            if let Some(name) = os_signal().await {
                info!(signal = name, "Received OS signal");
                signal.trigger();
            }
        });
    }

    /// Wait for the signal, then give `teardown` the grace period to finish.
    /// `false` means it was cut off.
    pub async fn drain<Fut>(&self, teardown: Fut) -> bool
    where
        Fut: Future<Output = ()>,
    {
        self.signal.wait().await;
        info!(grace_secs = self.grace.as_secs(), "Draining tasks");

        let finished = tokio::time::timeout(self.grace, teardown).await.is_ok();
        if finished {
            info!("All tasks stopped");
        } else {
            warn!(grace_secs = self.grace.as_secs(), "Tasks did not stop within grace period");
        }
        finished
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn waiters_wake_on_trigger() {
        let signal = ShutdownSignal::new();
        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.wait().await }
        });

        signal.trigger();
        signal.trigger();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn late_waiter_returns_immediately() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        tokio::time::timeout(Duration::from_millis(100), signal.wait())
            .await
            .expect("already triggered");
    }

    #[tokio::test]
    async fn drain_reports_slow_teardown() {
        let coordinator = ShutdownCoordinator::new(0);
        coordinator.signal().trigger();

        let finished = coordinator
            .drain(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert!(!finished);
    }

    #[tokio::test]
    async fn drain_runs_teardown_after_trigger() {
        let coordinator = ShutdownCoordinator::new(5);
        let signal = coordinator.signal();
        tokio::spawn(async move { signal.trigger() });

        assert!(coordinator.drain(async {}).await);
    }
}
