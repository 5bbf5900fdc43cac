//! Domain error types for the messaging transport.

use std::fmt;

/// Errors talking to the Telegram Bot API.
#[derive(Debug)]
pub enum TransportError {
    /// The HTTP client could not be built.
    Setup { details: String },
    /// The request never got an answer.
    RequestFailed { method: &'static str, details: String },
    /// Telegram answered with `ok: false`.
    Rejected {
        method: &'static str,
        code: Option<i64>,
        description: String,
    },
    /// The answer could not be decoded.
    InvalidResponse { method: &'static str, details: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup { details } => write!(f, "failed to set up Telegram client: {}", details),
            Self::RequestFailed { method, details } => {
                write!(f, "Telegram '{}' request failed: {}", method, details)
            }
            Self::Rejected {
                method,
                code: Some(code),
                description,
            } => {
                write!(f, "Telegram rejected '{}' ({}): {}", method, code, description)
            }
            Self::Rejected {
                method,
                code: None,
                description,
            } => {
                write!(f, "Telegram rejected '{}': {}", method, description)
            }
            Self::InvalidResponse { method, details } => {
                write!(f, "invalid Telegram '{}' response: {}", method, details)
            }
        }
    }
}

impl std::error::Error for TransportError {}
