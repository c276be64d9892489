//! Audit domain types — AuditAction, AuditEntry, AuditSummary

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Observable effect of folding one event into a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // ssh outcomes
    UserNotFound,
    AlreadyAuthenticated,
    HeldElsewhere,
    UserBlocked,
    WrongPassword,
    Authenticated,
    // sudo outcomes
    SudoAccepted,
    SudoRejected,
    // dir outcomes
    DirAccepted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserNotFound => "user_not_found",
            Self::AlreadyAuthenticated => "already_authenticated",
            Self::HeldElsewhere => "held_elsewhere",
            Self::UserBlocked => "user_blocked",
            Self::WrongPassword => "wrong_password",
            Self::Authenticated => "authenticated",
            Self::SudoAccepted => "sudo_accepted",
            Self::SudoRejected => "sudo_rejected",
            Self::DirAccepted => "dir_accepted",
        }
    }

    /// Whether the action denies the session something it asked for
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound
                | Self::HeldElsewhere
                | Self::UserBlocked
                | Self::WrongPassword
                | Self::SudoRejected
        )
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit entry — one record of the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub stream_id: String,
    /// Account the action concerns (the requested name for `user_not_found`)
    pub username: Option<String>,
    pub action: AuditAction,
    /// Holding stream for `held_elsewhere`
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(stream_id: impl Into<String>, username: Option<String>, action: AuditAction) -> Self {
        Self {
            stream_id: stream_id.into(),
            username,
            action,
            detail: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Per-action counters over everything an audit actor has seen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total: u64,
    pub denials: u64,
    pub by_action: BTreeMap<AuditAction, u64>,
}

impl AuditSummary {
    pub fn record(&mut self, action: AuditAction) {
        self.total += 1;
        if action.is_denial() {
            self.denials += 1;
        }
        *self.by_action.entry(action).or_insert(0) += 1;
    }

    pub fn count(&self, action: AuditAction) -> u64 {
        self.by_action.get(&action).copied().unwrap_or(0)
    }
}
