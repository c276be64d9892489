//! # Streamwarden Engine
//!
//! Concurrent authentication-event processor: streams of `ssh`/`sudo`/`dir`
//! events are folded, one task per stream, against a shared user registry
//! that grants each account to at most one stream at a time.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                IngestService                  │
//! ├───────────────┬───────────────┬───────────────┤
//! │ AdmissionGate │  Dispatcher   │   Shutdown    │
//! │ (n/max, once  │ (task per     │ (capacity +   │
//! │  per stream)  │  stream)      │  timeout,     │
//! │               │               │  drain)       │
//! ├───────────────┴───────┬───────┴───────────────┤
//! │   Session (auth state │ machine per stream)   │
//! ├───────────────────────┼───────────────────────┤
//! │     UserRegistry      │   AuditSink           │
//! │ (per-account lock)    │ (tracing / actor)     │
//! └───────────────────────┴───────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use streamwarden_engine::{parser, AuditActor, EngineConfig, IngestService, UserRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let audit = AuditActor::spawn(1024);
//!     let service = IngestService::new(
//!         EngineConfig::from_env()?,
//!         Arc::new(UserRegistry::seeded()),
//!         Arc::new(audit.clone()),
//!     )?;
//!     let _armed = service.arm();
//!
//!     for stream in parser::parse_file("events.txt")? {
//!         let admission = service.submit(stream)?;
//!         println!("{} admitted ({})", admission.stream_id, admission.progress());
//!     }
//!
//!     service.drain().await;
//!     println!("{:?}", audit.summary().await?);
//!     Ok(())
//! }
//! ```

pub mod admission;
pub mod audit;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod ingest;
pub mod model;
pub mod parser;
pub mod registry;
pub mod session;
pub mod shutdown;

// Re-exports for convenience
pub use admission::{AdmissionGate, Ticket};
pub use audit::{AuditAction, AuditActor, AuditEntry, AuditHandle, AuditSink, AuditSummary, MemorySink, TracingSink};
pub use config::EngineConfig;
pub use dispatcher::StreamDispatcher;
pub use error::{EngineError, Result};
pub use ingest::{Admission, IngestService, IngestStats};
pub use model::{Event, Stream};
pub use registry::{AuthOutcome, UserAccount, UserIndex, UserRegistry, UserSnapshot};
pub use session::{Session, SessionReport};
pub use shutdown::{DrainOutcome, ShutdownCoordinator, ShutdownReason, ShutdownSignal};
