//! Conversation session management.
//!
//! A session exists only while a verification conversation is in progress.
//! It is created on `/start` and removed as soon as the conversation reaches
//! a terminal outcome, so nothing about a finished conversation survives.

use crate::error::SessionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use staffcheck_core::{ConversationId, SessionKey};
use staffcheck_integration::RowRef;
use std::collections::HashMap;
use std::sync::RwLock;

/// Where a live conversation stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the employee ID.
    AwaitingId,
    /// ID matched a record; waiting for the phone number.
    AwaitingPhone {
        /// The ID the user supplied.
        employee_id: String,
        /// Where the matching record lives.
        row: RowRef,
    },
}

impl SessionState {
    /// Short label for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AwaitingId => "awaiting_id",
            Self::AwaitingPhone { .. } => "awaiting_phone",
        }
    }
}

/// A conversation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Unique conversation identifier.
    pub id: ConversationId,
    /// The transport session this conversation belongs to.
    pub key: SessionKey,
    /// Current state.
    pub state: SessionState,
    /// When the conversation started.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Starts a new conversation waiting for an employee ID.
    #[must_use]
    pub fn new(key: SessionKey) -> Self {
        Self {
            id: ConversationId::new(),
            key,
            state: SessionState::AwaitingId,
            created_at: Utc::now(),
        }
    }

    /// Records a matched ID and moves on to phone verification.
    pub fn await_phone(&mut self, employee_id: impl Into<String>, row: RowRef) {
        self.state = SessionState::AwaitingPhone {
            employee_id: employee_id.into(),
            row,
        };
    }
}

/// Trait for session storage.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Gets the live session for a key, if any.
    async fn get(&self, key: SessionKey) -> Result<Option<Session>, SessionError>;

    /// Inserts or replaces the session for its key.
    async fn put(&self, session: Session) -> Result<(), SessionError>;

    /// Removes a session, returning it if it existed.
    async fn remove(&self, key: SessionKey) -> Result<Option<Session>, SessionError>;

    /// Number of live sessions.
    async fn len(&self) -> Result<usize, SessionError>;
}

/// Sessions held in process memory.
#[derive(Debug, Default)]
pub struct InMemorySessionManager {
    sessions: RwLock<HashMap<SessionKey, Session>>,
}

impl InMemorySessionManager {
    /// Creates an empty session manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(key: SessionKey) -> SessionError {
    SessionError::StorageFailed {
        key,
        reason: "session table lock poisoned".to_string(),
    }
}

#[async_trait]
impl SessionManager for InMemorySessionManager {
    async fn get(&self, key: SessionKey) -> Result<Option<Session>, SessionError> {
        let sessions = self.sessions.read().map_err(|_| poisoned(key))?;
        Ok(sessions.get(&key).cloned())
    }

    async fn put(&self, session: Session) -> Result<(), SessionError> {
        let key = session.key;
        let mut sessions = self.sessions.write().map_err(|_| poisoned(key))?;
        sessions.insert(key, session);
        Ok(())
    }

    async fn remove(&self, key: SessionKey) -> Result<Option<Session>, SessionError> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned(key))?;
        Ok(sessions.remove(&key))
    }

    async fn len(&self) -> Result<usize, SessionError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| poisoned(SessionKey::new(0, 0)))?;
        Ok(sessions.len())
    }
}
