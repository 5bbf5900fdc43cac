//! Events that drive a verification conversation

/// Inbound events, already scoped to one session by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The user asked to begin (`/start`).
    Start,
    /// The user asked to stop (`/cancel`).
    Cancel,
    /// Free text that is not a command.
    Text(String),
}

impl Event {
    /// Creates a text event.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}
