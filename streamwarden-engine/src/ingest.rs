//! Ingest service — the single entry point for submitted streams
//!
//! Composes, in order: admission gate, dispatcher, shutdown coordinator.
//! Transports (HTTP, tests) only ever talk to [`IngestService`].

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::admission::{AdmissionGate, Ticket};
use crate::audit::AuditSink;
use crate::config::EngineConfig;
use crate::dispatcher::StreamDispatcher;
use crate::error::{EngineError, Result};
use crate::model::Stream;
use crate::registry::UserRegistry;
use crate::shutdown::{DrainOutcome, ShutdownCoordinator, ShutdownReason, ShutdownSignal};

/// Accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admission {
    pub stream_id: String,
    pub count: usize,
    pub max: usize,
}

impl Admission {
    fn new(stream_id: String, ticket: Ticket) -> Self {
        Self {
            stream_id,
            count: ticket.count,
            max: ticket.max,
        }
    }

    /// Admission count as `"<n>/<max>"`
    pub fn progress(&self) -> String {
        format!("{}/{}", self.count, self.max)
    }
}

/// Point-in-time service counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub admitted: usize,
    pub max_streams: usize,
    pub in_flight: usize,
    pub completed: usize,
    /// Summed processing time of finished streams, in microseconds
    pub processing_micros: u64,
    pub shutdown: Option<ShutdownReason>,
}

pub struct IngestService {
    config: EngineConfig,
    gate: Arc<AdmissionGate>,
    dispatcher: StreamDispatcher,
    coordinator: ShutdownCoordinator,
}

impl IngestService {
    /// Build the service; rejects a config that could never admit a stream
    pub fn new(config: EngineConfig, registry: Arc<UserRegistry>, sink: Arc<dyn AuditSink>) -> Result<Self> {
        config.validate()?;
        let coordinator = ShutdownCoordinator::new(
            ShutdownSignal::new(),
            config.capacity_grace,
            config.global_timeout,
            config.drain_timeout,
        );
        Ok(Self {
            gate: Arc::new(AdmissionGate::new(config.max_streams)),
            dispatcher: StreamDispatcher::new(registry, sink),
            coordinator,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn signal(&self) -> &ShutdownSignal {
        self.coordinator.signal()
    }

    pub fn registry(&self) -> &Arc<UserRegistry> {
        self.dispatcher.registry()
    }

    /// Arm the global timeout and close the gate once shutdown fires
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm(&self) -> JoinHandle<()> {
        let timer = self.coordinator.arm_timeout();
        let gate = Arc::clone(&self.gate);
        let signal = self.signal().clone();
        tokio::spawn(async move {
            let reason = signal.wait().await;
            gate.close();
            timer.abort();
            info!(%reason, admitted = gate.admitted(), "Admission closed");
        })
    }

    /// Admit `stream` and start processing it in the background
    pub fn submit(&self, stream: Stream) -> Result<Admission> {
        if self.signal().is_fired() {
            self.gate.close();
            return Err(EngineError::ShuttingDown);
        }

        let ticket = match self.gate.submit() {
            Ok(ticket) => ticket,
            Err(e) => {
                warn!(stream_id = %stream.stream_id, error = %e, "Stream rejected");
                return Err(e);
            }
        };

        let admission = Admission::new(stream.stream_id.clone(), ticket);
        info!(
            stream_id = %admission.stream_id,
            count = %admission.progress(),
            events = stream.len(),
            "Stream admitted"
        );

        // Detached; the drain tracks it through the dispatcher counters
        drop(self.dispatcher.dispatch(stream));
        // Fire-and-forget capacity trigger
        drop(self.coordinator.on_admitted(ticket));

        Ok(admission)
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats {
            admitted: self.gate.admitted(),
            max_streams: self.gate.max(),
            in_flight: self.dispatcher.in_flight(),
            completed: self.dispatcher.completed(),
            processing_micros: self.dispatcher.processing_time().as_micros() as u64,
            shutdown: self.signal().reason(),
        }
    }

    /// Resolve once shutdown has been signalled
    pub async fn wait_shutdown(&self) -> ShutdownReason {
        self.signal().wait().await
    }

    /// Close admission and wait for in-flight streams, bounded by the drain timeout
    pub async fn drain(&self) -> DrainOutcome {
        self.gate.close();
        self.coordinator.drain(&self.dispatcher).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemorySink;
    use crate::model::Event;
    use std::time::Duration;

    fn service(max: usize) -> IngestService {
        let config = EngineConfig::new(max).with_capacity_grace(Duration::from_millis(10));
        IngestService::new(config, Arc::new(UserRegistry::seeded()), Arc::new(MemorySink::new())).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = IngestService::new(
            EngineConfig::new(0),
            Arc::new(UserRegistry::seeded()),
            Arc::new(MemorySink::new()),
        );
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[tokio::test]
    async fn test_submit_reports_progress() {
        let svc = service(3);
        let admission = svc.submit(Stream::new("1", vec![Event::Dir])).unwrap();
        assert_eq!(admission.stream_id, "1");
        assert_eq!(admission.progress(), "1/3");

        assert_eq!(svc.drain().await, DrainOutcome::Drained);
        let stats = svc.stats();
        assert_eq!(stats.admitted, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn test_rejected_after_signal() {
        let svc = service(3);
        assert!(svc.signal().fire(ShutdownReason::Interrupted));
        let err = svc.submit(Stream::new("1", vec![])).unwrap_err();
        assert!(matches!(err, EngineError::ShuttingDown));
        assert_eq!(svc.stats().admitted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_slot_fires_capacity_shutdown() {
        let svc = service(1);
        let _armed = svc.arm();
        svc.submit(Stream::new("1", vec![])).unwrap();

        assert_eq!(svc.wait_shutdown().await, ShutdownReason::CapacityReached);
        assert!(svc.submit(Stream::new("2", vec![])).is_err());
    }
}
