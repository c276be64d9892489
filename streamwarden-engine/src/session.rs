//! Auth state machine — folds one stream's events against the shared registry
//!
//! A [`Session`] starts unauthenticated and moves between "no user" and "user
//! at index i" as `ssh` events are resolved. `sudo` and `dir` events only read
//! the current session and never touch the registry's mutable state. Every
//! decision is reported to the [`AuditSink`]; nothing is returned to the
//! caller apart from a [`SessionReport`] for bookkeeping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::audit::{AuditAction, AuditEntry, AuditSink};
use crate::model::{Event, Stream};
use crate::registry::{AuthOutcome, UserIndex, UserRegistry};

/// Bookkeeping for one completed stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub stream_id: String,
    pub events_applied: usize,
    /// Account the session ended authenticated as
    pub final_user: Option<String>,
    #[serde(with = "duration_micros")]
    pub elapsed: Duration,
}

/// Per-stream session state
pub struct Session {
    stream_id: String,
    current: Option<UserIndex>,
    registry: Arc<UserRegistry>,
    sink: Arc<dyn AuditSink>,
}

impl Session {
    pub fn new(stream_id: impl Into<String>, registry: Arc<UserRegistry>, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            stream_id: stream_id.into(),
            current: None,
            registry,
            sink,
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Index the session is currently authenticated as
    pub fn current_user(&self) -> Option<UserIndex> {
        self.current
    }

    /// Apply one event
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::Ssh { name, passwd } => self.handle_ssh(name, passwd),
            Event::Sudo { passwd } => self.handle_sudo(passwd),
            Event::Dir => self.handle_dir(),
        }
    }

    /// Fold a whole event sequence strictly in order
    pub fn run(mut self, events: &[Event]) -> SessionReport {
        let start = Instant::now();
        for event in events {
            self.apply(event);
        }
        SessionReport {
            final_user: self.current.map(|i| self.registry.name_of(i).to_string()),
            stream_id: self.stream_id,
            events_applied: events.len(),
            elapsed: start.elapsed(),
        }
    }

    /// Convenience: build a session for `stream` and run it to completion
    pub fn process(stream: &Stream, registry: Arc<UserRegistry>, sink: Arc<dyn AuditSink>) -> SessionReport {
        Session::new(stream.stream_id.clone(), registry, sink).run(&stream.events)
    }

    // ─── Handlers ───

    fn handle_ssh(&mut self, name: &str, passwd: &str) {
        let Some(index) = self.registry.lookup_by_name(name) else {
            self.current = None;
            self.emit(Some(name), AuditAction::UserNotFound);
            return;
        };

        let user = self.registry.name_of(index);
        match self.registry.try_authenticate(index, &self.stream_id, passwd) {
            AuthOutcome::AlreadyHeldBySameStream => {
                self.emit(Some(user), AuditAction::AlreadyAuthenticated);
            }
            AuthOutcome::HeldByOtherStream { holder } => {
                self.current = None;
                self.sink.record(
                    AuditEntry::new(&self.stream_id, Some(user.to_string()), AuditAction::HeldElsewhere)
                        .with_detail(holder),
                );
            }
            AuthOutcome::Blocked => {
                self.current = None;
                self.emit(Some(user), AuditAction::UserBlocked);
            }
            AuthOutcome::WrongPassword => {
                self.current = None;
                self.emit(Some(user), AuditAction::WrongPassword);
            }
            AuthOutcome::Granted => {
                if let Some(prev) = self.current.filter(|prev| *prev != index) {
                    self.registry.release(prev, &self.stream_id);
                }
                self.current = Some(index);
                self.emit(Some(user), AuditAction::Authenticated);
            }
        }
    }

    fn handle_sudo(&self, passwd: &str) {
        let Some(index) = self.current else {
            return;
        };
        let action = if self.registry.check_password(index, passwd) {
            AuditAction::SudoAccepted
        } else {
            AuditAction::SudoRejected
        };
        self.emit(Some(self.registry.name_of(index)), action);
    }

    fn handle_dir(&self) {
        if let Some(index) = self.current {
            self.emit(Some(self.registry.name_of(index)), AuditAction::DirAccepted);
        }
    }

    fn emit(&self, user: Option<&str>, action: AuditAction) {
        self.sink.record(AuditEntry::new(
            &self.stream_id,
            user.map(str::to_string),
            action,
        ));
    }
}

mod duration_micros {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u128(d.as_micros())
    }
}
