//! Error types for the conversation crate.
//!
//! - `SessionError`: Errors from session storage
//! - `VerificationError`: Why a verification conversation ended early

use staffcheck_core::SessionKey;
use staffcheck_integration::StoreError;
use std::fmt;

/// Errors from session operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Storage operation failed.
    StorageFailed { key: SessionKey, reason: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageFailed { key, reason } => {
                write!(f, "session storage failed for {key}: {reason}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Ways a verification can fail. Every one of them ends the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// No record has the supplied employee ID.
    RecordNotFound,
    /// The supplied phone number differs from the stored one.
    FieldMismatch,
    /// The record's status does not grant access.
    AccessDenied,
    /// The record store failed or answered unexpectedly.
    SystemError { reason: String },
}

impl VerificationError {
    /// Returns true for failures caused by the system rather than the user.
    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self, Self::SystemError { .. })
    }
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecordNotFound => write!(f, "employee record not found"),
            Self::FieldMismatch => write!(f, "phone number does not match"),
            Self::AccessDenied => write!(f, "employee status does not grant access"),
            Self::SystemError { reason } => write!(f, "system error: {reason}"),
        }
    }
}

impl std::error::Error for VerificationError {}

impl From<StoreError> for VerificationError {
    fn from(err: StoreError) -> Self {
        Self::SystemError {
            reason: err.to_string(),
        }
    }
}

impl From<SessionError> for VerificationError {
    fn from(err: SessionError) -> Self {
        Self::SystemError {
            reason: err.to_string(),
        }
    }
}
