//! Stream dispatcher — one concurrent task per admitted stream
//!
//! Tasks are detached from the submitter: [`StreamDispatcher::dispatch`]
//! returns immediately and the shutdown drain uses the in-flight counter to
//! know when every task has finished.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::audit::AuditSink;
use crate::model::Stream;
use crate::registry::UserRegistry;
use crate::session::{Session, SessionReport};

#[derive(Default)]
struct Counters {
    in_flight: AtomicUsize,
    completed: AtomicUsize,
    /// Sum of per-stream processing time
    busy_micros: AtomicU64,
    idle: Notify,
}

/// Decrements the in-flight counter even if the session task panics
struct InFlightGuard(Arc<Counters>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.completed.fetch_add(1, Ordering::SeqCst);
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Spawns a session task for each admitted stream
#[derive(Clone)]
pub struct StreamDispatcher {
    registry: Arc<UserRegistry>,
    sink: Arc<dyn AuditSink>,
    counters: Arc<Counters>,
}

impl StreamDispatcher {
    pub fn new(registry: Arc<UserRegistry>, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            registry,
            sink,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn registry(&self) -> &Arc<UserRegistry> {
        &self.registry
    }

    /// Start processing `stream` on its own task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, stream: Stream) -> JoinHandle<SessionReport> {
        self.counters.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard(Arc::clone(&self.counters));
        let registry = Arc::clone(&self.registry);
        let sink = Arc::clone(&self.sink);
        let counters = Arc::clone(&self.counters);

        debug!(stream_id = %stream.stream_id, events = stream.len(), "Dispatching stream");
        tokio::spawn(async move {
            let _guard = guard;
            let report = Session::process(&stream, registry, sink);
            counters
                .busy_micros
                .fetch_add(report.elapsed.as_micros() as u64, Ordering::SeqCst);
            info!(
                stream_id = %report.stream_id,
                events = report.events_applied,
                final_user = report.final_user.as_deref().unwrap_or("-"),
                elapsed_us = report.elapsed.as_micros() as u64,
                "Stream processed"
            );
            report
        })
    }

    /// Streams currently being processed
    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    /// Streams whose task has finished
    pub fn completed(&self) -> usize {
        self.counters.completed.load(Ordering::SeqCst)
    }

    /// Total time spent inside session tasks, excluding scheduling
    pub fn processing_time(&self) -> Duration {
        Duration::from_micros(self.counters.busy_micros.load(Ordering::SeqCst))
    }

    /// Resolve once no stream task is in flight
    pub async fn wait_idle(&self) {
        loop {
            // Registered before the check so a concurrent notify is not lost
            let notified = self.counters.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}
