//! Run-wide interrupt flag
//!
//! Set once by Ctrl-C (or by [`Interrupt::trigger`]) and never cleared. The
//! runner checks it between steps; executors race it against the running
//! step and its transcript.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Clones share the same flag
#[derive(Debug, Clone)]
pub struct Interrupt {
    token: CancellationToken,
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupt {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the flag is set; immediately if it already is
    pub async fn triggered(&self) {
        self.token.cancelled().await;
    }

    /// Set the flag on SIGINT until the returned guard is dropped.
    ///
    /// The handler is registered before this returns, so a signal arriving
    /// at any point afterwards is seen. Returns `None` if the handler cannot
    /// be installed.
    pub fn listen_for_ctrl_c(&self) -> Option<CtrlCListener> {
        let token = self.token.clone();

        #[cfg(unix)]
        let task = {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigint = match signal(SignalKind::interrupt()) {
                Ok(sigint) => sigint,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install Ctrl-C handler");
                    return None;
                }
            };
            tokio::spawn(async move {
                if sigint.recv().await.is_some() {
                    tracing::warn!("Interrupted");
                    token.cancel();
                }
            })
        };

        #[cfg(not(unix))]
        let task = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::warn!("Interrupted");
                    token.cancel();
                }
                Err(e) => tracing::warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
        });

        Some(CtrlCListener { task })
    }
}

/// Stops listening when dropped
#[derive(Debug)]
pub struct CtrlCListener {
    task: JoinHandle<()>,
}

impl Drop for CtrlCListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}
