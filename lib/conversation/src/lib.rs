//! Employee verification conversation for staffcheck.
//!
//! This crate provides:
//!
//! - **Verification flow**: the `/start` → ID → phone conversation and its
//!   replies
//! - **Session manager**: live conversation state, keyed by transport session
//! - **Reply catalog**: configurable user-facing texts and the record summary

pub mod error;
pub mod event;
pub mod flow;
pub mod messages;
pub mod record;
pub mod session;
pub mod settings;

#[cfg(test)]
mod proptests;

pub use error::{SessionError, VerificationError};
pub use event::Event;
pub use flow::{Outcome, Reply, VerificationFlow};
pub use messages::Messages;
pub use record::EmployeeRecord;
pub use session::{InMemorySessionManager, Session, SessionManager, SessionState};
pub use settings::VerificationSettings;
