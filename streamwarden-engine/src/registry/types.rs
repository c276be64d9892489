//! Registry domain types — UserAccount, UserIndex, AuthOutcome, UserSnapshot

use serde::{Deserialize, Serialize};

/// Failed attempts after which an account is permanently blocked
pub const MAX_AUTH_FAILURES: u32 = 3;

/// Seed data for one registry account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub name: String,
    pub password: String,
    /// Advisory only; no code path consults it
    pub sudo_allowed: bool,
}

impl UserAccount {
    pub fn new(name: impl Into<String>, password: impl Into<String>, sudo_allowed: bool) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            sudo_allowed,
        }
    }
}

/// Position of an account in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserIndex(pub(crate) usize);

impl UserIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for UserIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of the atomic auth-attempt transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthOutcome {
    /// The slot was free and the password matched; the stream now holds it
    Granted,
    /// The requesting stream already holds the slot
    AlreadyHeldBySameStream,
    /// Another stream holds the slot
    HeldByOtherStream { holder: String },
    /// Failure limit reached
    Blocked,
    /// Password mismatch; the failure counter was incremented
    WrongPassword,
}

impl AuthOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::AlreadyHeldBySameStream => "already_held_by_same_stream",
            Self::HeldByOtherStream { .. } => "held_by_other_stream",
            Self::Blocked => "blocked",
            Self::WrongPassword => "wrong_password",
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

impl std::fmt::Display for AuthOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of an account's mutable state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub name: String,
    pub sudo_allowed: bool,
    pub auth_holder: Option<String>,
    pub failure_count: u32,
}

impl UserSnapshot {
    pub fn is_blocked(&self) -> bool {
        self.failure_count >= MAX_AUTH_FAILURES
    }
}

/// Fixed account list loaded at process start
pub fn seed_accounts() -> Vec<UserAccount> {
    vec![
        UserAccount::new("superadmin", "P@ssw0rd!", true),
        UserAccount::new("auditor", "Secur3!2023", true),
        UserAccount::new("dev_user", "d3v3l0p3r", true),
        UserAccount::new("tester", "t3st3r!123", false),
        UserAccount::new("analyst", "Data2023!", false),
        UserAccount::new("support", "HelpDesk!", false),
        UserAccount::new("reports", "R3port$", false),
        UserAccount::new("backup", "B@ckUp123", true),
        UserAccount::new("api_user", "Ap1K3y!2023", true),
        UserAccount::new("guest", "T3mpPass!", false),
    ]
}
