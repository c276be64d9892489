//! User registry module — accounts, auth slots, and the auth-attempt transaction

pub mod types;
pub mod user_registry;

pub use types::{seed_accounts, AuthOutcome, UserAccount, UserIndex, UserSnapshot, MAX_AUTH_FAILURES};
pub use user_registry::UserRegistry;
