//! Authentication module: the session gate and its collaborators.
//!
//! This module provides:
//! - `CredentialDirectory`: the fixed demo account table
//! - `SessionStore`: two-tier (durable/ephemeral) session storage
//! - `SessionGate`: login, session check, and logout decisions
//!
//! Sessions expire 24 hours after issuance and are lazily cleaned up
//! when an expired record is read.

pub mod directory;
pub mod gate;
pub mod session;
pub mod store;

pub use directory::CredentialDirectory;
pub use gate::{Field, LoginOutcome, RoundTrip, SessionGate, SessionStatus};
pub use session::{SessionRecord, UserInfo};
pub use store::{Durability, SessionStore};
