//! AuditActor — append-only audit trail with summary queries
//!
//! Entries are processed sequentially via an mpsc channel: every entry is
//! emitted through `tracing`, counted per action, and kept in a bounded ring
//! of recent entries.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use streamwarden_engine::audit::{AuditActor, AuditAction, AuditEntry, AuditSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handle = AuditActor::spawn(1024);
//!
//!     // Fire-and-forget, callable from synchronous code
//!     handle.record(AuditEntry::new("s1", Some("admin".into()), AuditAction::Authenticated));
//!
//!     let summary = handle.summary().await?;
//!     assert_eq!(summary.count(AuditAction::Authenticated), 1);
//!
//!     let sink: Arc<dyn AuditSink> = Arc::new(handle);
//!     # let _ = sink;
//!     Ok(())
//! }
//! ```

use std::collections::VecDeque;

use tokio::sync::{mpsc, oneshot};
use tracing::info;

use crate::error::{EngineError, Result};

use super::sink::{trace_entry, AuditSink};
use super::types::*;

// ─── Messages ───

enum AuditMsg {
    Log(AuditEntry),
    Summary {
        reply: oneshot::Sender<AuditSummary>,
    },
    Recent {
        limit: usize,
        reply: oneshot::Sender<Vec<AuditEntry>>,
    },
}

// ─── Actor ───

/// Audit actor — consumes entries and answers summary queries
pub struct AuditActor {
    rx: mpsc::UnboundedReceiver<AuditMsg>,
    summary: AuditSummary,
    recent: VecDeque<AuditEntry>,
    capacity: usize,
}

impl AuditActor {
    /// Spawn the audit actor, keeping at most `recent_capacity` recent entries
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(recent_capacity: usize) -> AuditHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Self {
            rx,
            summary: AuditSummary::default(),
            recent: VecDeque::with_capacity(recent_capacity.min(4096)),
            capacity: recent_capacity,
        };
        tokio::spawn(actor.run());
        info!(recent_capacity, "AuditActor spawned");
        AuditHandle { tx }
    }

    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                AuditMsg::Log(entry) => self.handle_log(entry),
                AuditMsg::Summary { reply } => {
                    let _ = reply.send(self.summary.clone());
                }
                AuditMsg::Recent { limit, reply } => {
                    let _ = reply.send(self.handle_recent(limit));
                }
            }
        }
        info!(total = self.summary.total, "AuditActor stopped");
    }

    fn handle_log(&mut self, entry: AuditEntry) {
        trace_entry(&entry);
        self.summary.record(entry.action);
        if self.capacity == 0 {
            return;
        }
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(entry);
    }

    /// Newest first
    fn handle_recent(&self, limit: usize) -> Vec<AuditEntry> {
        self.recent.iter().rev().take(limit).cloned().collect()
    }
}

// ─── Handle ───

/// Thread-safe handle to communicate with the AuditActor
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::UnboundedSender<AuditMsg>,
}

impl AuditHandle {
    /// Counters over every entry seen so far
    pub async fn summary(&self) -> Result<AuditSummary> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AuditMsg::Summary { reply })
            .map_err(|_| EngineError::ActorUnavailable("AuditActor".into()))?;
        rx.await
            .map_err(|_| EngineError::ActorUnavailable("AuditActor dropped".into()))
    }

    /// Up to `limit` most recent entries, newest first
    pub async fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(AuditMsg::Recent { limit, reply }).is_err() {
            return vec![];
        }
        rx.await.unwrap_or_default()
    }
}

impl AuditSink for AuditHandle {
    /// Fire-and-forget; entries sent after the actor stopped are dropped
    fn record(&self, entry: AuditEntry) {
        let _ = self.tx.send(AuditMsg::Log(entry));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_summary_and_recent() {
        let handle = AuditActor::spawn(2);
        handle.record(AuditEntry::new("s1", Some("admin".into()), AuditAction::WrongPassword));
        handle.record(AuditEntry::new("s1", Some("admin".into()), AuditAction::Authenticated));
        handle.record(AuditEntry::new("s1", Some("admin".into()), AuditAction::DirAccepted));

        // Channel is FIFO, so the query observes all three entries
        let summary = handle.summary().await.unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.denials, 1);

        let recent = handle.recent(10).await;
        let actions: Vec<_> = recent.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::DirAccepted, AuditAction::Authenticated]);
    }

    #[tokio::test]
    async fn test_zero_capacity_keeps_counts_only() {
        let handle = AuditActor::spawn(0);
        handle.record(AuditEntry::new("s1", None, AuditAction::UserNotFound));
        assert_eq!(handle.summary().await.unwrap().total, 1);
        assert!(handle.recent(5).await.is_empty());
    }
}
