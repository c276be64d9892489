//! Shutdown coordination — single-fire signal, capacity and timeout triggers,
//! bounded drain
//!
//! Two triggers race to stop the accept loop: reaching the admission maximum
//! (after a short grace delay) and a global deadline. Whichever fires first
//! wins; later fires have no effect. After the signal, in-flight stream tasks
//! get a bounded amount of time to finish.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::admission::Ticket;
use crate::dispatcher::StreamDispatcher;

/// Why shutdown was signalled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownReason {
    CapacityReached,
    Timeout,
    Interrupted,
}

impl ShutdownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CapacityReached => "capacity_reached",
            Self::Timeout => "timeout",
            Self::Interrupted => "interrupted",
        }
    }
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-fire shutdown token
///
/// Any number of signalers may call [`fire`](Self::fire); exactly one call
/// takes effect and every waiter observes its reason.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the signal; returns `true` only for the call that took effect
    pub fn fire(&self, reason: ShutdownReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    /// Reason of the winning fire, if any
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.tx.borrow()
    }

    pub fn is_fired(&self) -> bool {
        self.reason().is_some()
    }

    /// Resolve once the signal has fired (immediately if it already has)
    pub async fn wait(&self) -> ShutdownReason {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        // The watch guard must be released in this statement, before `rx` drops.
        let fired = rx.wait_for(Option::is_some).await.ok().and_then(|reason| *reason);
        fired.unwrap_or(ShutdownReason::Interrupted)
    }
}

/// Result of the post-shutdown drain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DrainOutcome {
    Drained,
    TimedOut { stragglers: usize },
}

/// Arms the shutdown triggers and drains in-flight work
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    signal: ShutdownSignal,
    capacity_grace: Duration,
    global_timeout: Duration,
    drain_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(
        signal: ShutdownSignal,
        capacity_grace: Duration,
        global_timeout: Duration,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            signal,
            capacity_grace,
            global_timeout,
            drain_timeout,
        }
    }

    pub fn signal(&self) -> &ShutdownSignal {
        &self.signal
    }

    /// Start the global deadline timer
    pub fn arm_timeout(&self) -> JoinHandle<()> {
        let signal = self.signal.clone();
        let timeout = self.global_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if signal.fire(ShutdownReason::Timeout) {
                info!(timeout_secs = timeout.as_secs(), "Global timeout reached, shutting down");
            }
        })
    }

    /// Capacity trigger: called after every admission
    ///
    /// When `ticket` used the last slot, fires after the grace delay.
    pub fn on_admitted(&self, ticket: Ticket) -> Option<JoinHandle<()>> {
        if !ticket.is_last() {
            return None;
        }
        let signal = self.signal.clone();
        let grace = self.capacity_grace;
        Some(tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if signal.fire(ShutdownReason::CapacityReached) {
                info!(max = ticket.max, "Stream limit reached, shutting down");
            }
        }))
    }

    /// Wait for in-flight stream tasks, at most the drain bound
    pub async fn drain(&self, dispatcher: &StreamDispatcher) -> DrainOutcome {
        match tokio::time::timeout(self.drain_timeout, dispatcher.wait_idle()).await {
            Ok(()) => {
                info!(completed = dispatcher.completed(), "All stream tasks finished");
                DrainOutcome::Drained
            }
            Err(_) => {
                let stragglers = dispatcher.in_flight();
                warn!(
                    stragglers,
                    drain_secs = self.drain_timeout.as_secs_f64(),
                    "Drain timed out, abandoning in-flight streams"
                );
                DrainOutcome::TimedOut { stragglers }
            }
        }
    }
}
