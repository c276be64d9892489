//! Admission gate — bounds how many streams are ever admitted
//!
//! The check and the increment happen inside one critical section, so
//! concurrent submissions can never both take the last slot.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::error::{EngineError, Result};

/// Proof of admission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ticket {
    /// Admission count including this stream
    pub count: usize,
    pub max: usize,
}

impl Ticket {
    /// Whether this admission used the last slot
    pub fn is_last(&self) -> bool {
        self.count == self.max
    }
}

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.count, self.max)
    }
}

#[derive(Debug, Default)]
struct GateState {
    admitted: usize,
    closed: bool,
}

/// Shared admission counter with a fixed maximum
#[derive(Debug)]
pub struct AdmissionGate {
    max: usize,
    state: Mutex<GateState>,
}

impl AdmissionGate {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            state: Mutex::new(GateState::default()),
        }
    }

    /// Admit one stream if a slot is left
    pub fn submit(&self) -> Result<Ticket> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(EngineError::ShuttingDown);
        }
        if state.admitted >= self.max {
            debug!(max = self.max, "Admission rejected, capacity reached");
            return Err(EngineError::CapacityExceeded { max: self.max });
        }
        state.admitted += 1;
        Ok(Ticket {
            count: state.admitted,
            max: self.max,
        })
    }

    /// Stop admitting; later submissions fail with `ShuttingDown`
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn admitted(&self) -> usize {
        self.state.lock().admitted
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn is_full(&self) -> bool {
        self.admitted() >= self.max
    }
}
