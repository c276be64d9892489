//! UserRegistry — fixed account list with per-account locks
//!
//! Constructed once at startup and shared as `Arc<UserRegistry>`. Callers only
//! get the three atomic operations below (plus read-only snapshots); account
//! fields are never exposed for direct mutation.
//!
//! Name resolution ([`UserRegistry::lookup_by_name`]) and the locked auth
//! transaction ([`UserRegistry::try_authenticate`]) are separate steps. Two
//! concurrent `ssh` events for the same name can both resolve before either
//! takes the lock; the holder invariant is enforced once each has passed
//! through the lock.

use parking_lot::Mutex;
use tracing::debug;

use super::types::*;

/// Mutable per-account state, guarded by the account lock
#[derive(Debug, Default)]
struct AuthSlot {
    holder: Option<String>,
    failures: u32,
}

#[derive(Debug)]
struct UserEntry {
    name: String,
    password: String,
    sudo_allowed: bool,
    slot: Mutex<AuthSlot>,
}

/// Shared user registry
#[derive(Debug)]
pub struct UserRegistry {
    users: Vec<UserEntry>,
}

impl UserRegistry {
    /// Build a registry from an arbitrary account list
    pub fn new(accounts: impl IntoIterator<Item = UserAccount>) -> Self {
        let users = accounts
            .into_iter()
            .map(|a| UserEntry {
                name: a.name,
                password: a.password,
                sudo_allowed: a.sudo_allowed,
                slot: Mutex::new(AuthSlot::default()),
            })
            .collect();
        Self { users }
    }

    /// Registry holding the fixed seed accounts
    pub fn seeded() -> Self {
        Self::new(seed_accounts())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Resolve a (case-sensitive) name; the last matching entry wins
    pub fn lookup_by_name(&self, name: &str) -> Option<UserIndex> {
        self.users
            .iter()
            .rposition(|u| u.name == name)
            .map(UserIndex)
    }

    /// Account name for an index obtained from this registry
    pub fn name_of(&self, index: UserIndex) -> &str {
        &self.users[index.0].name
    }

    /// Atomic auth attempt, holding the account lock for its full duration
    pub fn try_authenticate(&self, index: UserIndex, stream_id: &str, password: &str) -> AuthOutcome {
        let user = &self.users[index.0];
        let mut guard = user.slot.lock();
        let slot = &mut *guard;

        let outcome = match slot.holder.as_deref() {
            Some(holder) if holder == stream_id => AuthOutcome::AlreadyHeldBySameStream,
            Some(holder) => AuthOutcome::HeldByOtherStream {
                holder: holder.to_string(),
            },
            None if slot.failures >= MAX_AUTH_FAILURES => AuthOutcome::Blocked,
            None if password != user.password => {
                slot.failures += 1;
                AuthOutcome::WrongPassword
            }
            None => {
                slot.holder = Some(stream_id.to_string());
                slot.failures = 0;
                AuthOutcome::Granted
            }
        };

        debug!(
            user = %user.name,
            stream_id,
            outcome = %outcome,
            failures = slot.failures,
            "Auth attempt"
        );
        outcome
    }

    /// Clear the account's holder if it is still `stream_id`
    ///
    /// Returns whether the slot was released.
    pub fn release(&self, index: UserIndex, stream_id: &str) -> bool {
        let mut slot = self.users[index.0].slot.lock();
        if slot.holder.as_deref() == Some(stream_id) {
            slot.holder = None;
            true
        } else {
            false
        }
    }

    /// Plain password comparison used by `sudo`; takes no lock
    pub fn check_password(&self, index: UserIndex, password: &str) -> bool {
        self.users[index.0].password == password
    }

    /// Read-only copy of one account's state
    pub fn snapshot(&self, index: UserIndex) -> UserSnapshot {
        let user = &self.users[index.0];
        let slot = user.slot.lock();
        UserSnapshot {
            name: user.name.clone(),
            sudo_allowed: user.sudo_allowed,
            auth_holder: slot.holder.clone(),
            failure_count: slot.failures,
        }
    }

    /// Snapshots of every account, in registry order
    pub fn snapshot_all(&self) -> Vec<UserSnapshot> {
        (0..self.users.len())
            .map(|i| self.snapshot(UserIndex(i)))
            .collect()
    }
}

impl Default for UserRegistry {
    fn default() -> Self {
        Self::seeded()
    }
}
