//! Error types for the integration crate.
//!
//! - `StoreError`: Errors from record store connection and lookups
//! - `CredentialError`: Errors from service account credential handling

use crate::store::RowRef;
use std::fmt;

/// Errors from record store operations.
///
/// A missing key is not an error: lookups report it as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection to the store failed.
    ConnectionFailed { reason: String },
    /// Authentication with the store failed.
    AuthenticationFailed { reason: String },
    /// The store rejected a request.
    RequestFailed { status: u16, reason: String },
    /// A row reference does not point into this store.
    InvalidReference { row: RowRef },
    /// The store answered with something we could not interpret.
    ProtocolError { reason: String },
    /// Credentials could not be turned into an access token.
    Credential(CredentialError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed { reason } => {
                write!(f, "record store connection failed: {reason}")
            }
            Self::AuthenticationFailed { reason } => {
                write!(f, "record store authentication failed: {reason}")
            }
            Self::RequestFailed { status, reason } => {
                write!(f, "record store request failed with status {status}: {reason}")
            }
            Self::InvalidReference { row } => {
                write!(f, "invalid row reference: {row}")
            }
            Self::ProtocolError { reason } => {
                write!(f, "record store protocol error: {reason}")
            }
            Self::Credential(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<CredentialError> for StoreError {
    fn from(err: CredentialError) -> Self {
        Self::Credential(err)
    }
}

/// Errors from credential operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// A required credential field is empty.
    MissingField { field: &'static str },
    /// The private key could not be parsed.
    InvalidKey { reason: String },
    /// Signing the token assertion failed.
    SigningFailed { reason: String },
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { field } => {
                write!(f, "service account credential is missing '{field}'")
            }
            Self::InvalidKey { reason } => {
                write!(f, "invalid service account private key: {reason}")
            }
            Self::SigningFailed { reason } => {
                write!(f, "failed to sign token assertion: {reason}")
            }
        }
    }
}

impl std::error::Error for CredentialError {}
