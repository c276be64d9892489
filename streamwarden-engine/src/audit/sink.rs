//! Audit sinks — where state-machine effects go

use parking_lot::Mutex;
use tracing::{info, warn};

use super::types::{AuditAction, AuditEntry};

/// Destination for audit entries
///
/// `record` is synchronous and must not block: it is called from inside the
/// per-stream fold.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Emit one entry as a structured tracing event
pub(crate) fn trace_entry(entry: &AuditEntry) {
    let user = entry.username.as_deref().unwrap_or("-");
    if entry.action.is_denial() {
        warn!(
            stream_id = %entry.stream_id,
            user,
            action = %entry.action,
            detail = entry.detail.as_deref(),
            "{}",
            describe(entry.action)
        );
    } else {
        info!(
            stream_id = %entry.stream_id,
            user,
            action = %entry.action,
            "{}",
            describe(entry.action)
        );
    }
}

fn describe(action: AuditAction) -> &'static str {
    match action {
        AuditAction::UserNotFound => "User not found",
        AuditAction::AlreadyAuthenticated => "Already authenticated",
        AuditAction::HeldElsewhere => "User already authenticated elsewhere",
        AuditAction::UserBlocked => "User is blocked",
        AuditAction::WrongPassword => "Wrong password",
        AuditAction::Authenticated => "User authenticated",
        AuditAction::SudoAccepted => "Sudo accepted",
        AuditAction::SudoRejected => "Sudo rejected",
        AuditAction::DirAccepted => "Directory access accepted",
    }
}

/// Sink that only logs through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: AuditEntry) {
        trace_entry(&entry);
    }
}

/// Sink that keeps every entry in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    /// Actions recorded for one stream, in order
    pub fn actions_for(&self, stream_id: &str) -> Vec<AuditAction> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.stream_id == stream_id)
            .map(|e| e.action)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl AuditSink for MemorySink {
    fn record(&self, entry: AuditEntry) {
        self.entries.lock().push(entry);
    }
}
