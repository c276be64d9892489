//! Audit module — the observable effects of every processed event
//!
//! The state machine never returns auth decisions to its caller; it records
//! them as [`AuditEntry`] values into an [`AuditSink`].

pub mod actor;
pub mod sink;
pub mod types;

pub use actor::{AuditActor, AuditHandle};
pub use sink::{AuditSink, MemorySink, TracingSink};
pub use types::{AuditAction, AuditEntry, AuditSummary};
