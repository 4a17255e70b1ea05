//! Service lifecycle
//!
//! [`Runtime`] owns the background pieces of a running engine. Hosts supply
//! the reasoning service and transport, build an [`Engine`], then start a
//! runtime around it; the scheduler is spawned only when `[scheduler]` is
//! enabled.

use crate::config::SchedulerConfig;
use crate::engine::Engine;
use crate::scheduler::Scheduler;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Running engine with its optional scheduler
#[derive(Debug)]
pub struct Runtime {
    engine: Arc<Engine>,
    cancel: CancellationToken,
    scheduler: Option<JoinHandle<()>>,
}

impl Runtime {
    /// Start background work for an engine
    ///
    /// Must be called inside a tokio runtime. Cancelling `cancel` stops the
    /// scheduler and any run that shares the token.
    #[must_use]
    pub fn start(engine: Arc<Engine>, config: &SchedulerConfig, cancel: CancellationToken) -> Self {
        let scheduler = if config.enabled {
            let scheduler = Scheduler::new(engine.clone());
            let token = cancel.clone();
            Some(tokio::spawn(async move { scheduler.start(token).await }))
        } else {
            tracing::info!("scheduler disabled by configuration");
            None
        };
        Self {
            engine,
            cancel,
            scheduler,
        }
    }

    /// Engine handling inbound messages
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Token shared with the background work
    #[inline]
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Check if the scheduler task is alive
    #[must_use]
    pub fn scheduler_running(&self) -> bool {
        self.scheduler.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel background work and wait for the scheduler to stop
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Some(handle) = self.scheduler {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "scheduler task ended abnormally");
            }
        }
        tracing::info!("runtime stopped");
    }

    /// Run until ctrl-c or cancellation, then shut down
    pub async fn run_until_ctrl_c(self) {
        tokio::select! {
            () = self.cancel.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "failed to listen for ctrl-c");
                    self.cancel.cancelled().await;
                } else {
                    tracing::info!("ctrl-c received, shutting down");
                }
            }
        }
        self.shutdown().await;
    }
}
