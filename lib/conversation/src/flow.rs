//! The verification conversation.
//!
//! ```text
//! (none) --Start--> AwaitingId --found--> AwaitingPhone --verified--> Done
//!                       |                      |
//!                       +--not found/error-----+--mismatch/denied/error--> Done
//!                       +--Cancel--------------+--Cancel---------------> Cancelled
//! ```
//!
//! Every step opens its own store connection, performs its lookups and
//! replies exactly once. Nothing is retried; a failed lookup ends the
//! conversation.

use crate::error::VerificationError;
use crate::event::Event;
use crate::messages::Messages;
use crate::record::EmployeeRecord;
use crate::session::{InMemorySessionManager, Session, SessionManager, SessionState};
use crate::settings::VerificationSettings;
use staffcheck_core::SessionKey;
use staffcheck_integration::{RecordStore, RowRef, StoreConnector};
use tracing::{debug, error, info, instrument};

/// How a handled event left the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Conversation started; waiting for the ID.
    AwaitingId,
    /// ID matched; waiting for the phone number.
    AwaitingPhone,
    /// Identity confirmed and access granted. Terminal.
    Verified(EmployeeRecord),
    /// Verification failed. Terminal.
    Failed(VerificationError),
    /// The user cancelled. Terminal.
    Cancelled,
}

impl Outcome {
    /// Returns true if the conversation is over.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::AwaitingId | Self::AwaitingPhone)
    }
}

/// A reply to send back on the session, with the outcome that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub outcome: Outcome,
}

/// Drives verification conversations for any number of sessions.
pub struct VerificationFlow<C, S = InMemorySessionManager> {
    connector: C,
    sessions: S,
    settings: VerificationSettings,
    messages: Messages,
}

impl<C: StoreConnector> VerificationFlow<C> {
    /// Creates a flow with in-memory sessions, default layout and texts.
    #[must_use]
    pub fn new(connector: C) -> Self {
        Self::with_sessions(connector, InMemorySessionManager::new())
    }
}

impl<C: StoreConnector, S: SessionManager> VerificationFlow<C, S> {
    /// Creates a flow backed by the given session manager.
    #[must_use]
    pub fn with_sessions(connector: C, sessions: S) -> Self {
        Self {
            connector,
            sessions,
            settings: VerificationSettings::default(),
            messages: Messages::default(),
        }
    }

    /// Sets the sheet layout and allowed status.
    #[must_use]
    pub fn with_settings(mut self, settings: VerificationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the reply catalog.
    #[must_use]
    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    /// The session manager holding live conversations.
    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    /// Handles one inbound event for a session.
    ///
    /// Returns `None` when the event does not apply to the session's state
    /// (text outside a conversation, `/start` during one, `/cancel` with
    /// nothing to cancel); the transport sends nothing in that case.
    #[instrument(skip(self, key, event), fields(session = %key))]
    pub async fn handle(&self, key: SessionKey, event: Event) -> Option<Reply> {
        let session = match self.sessions.get(key).await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "failed to load session");
                return Some(self.finish(key, None, Outcome::Failed(e.into())).await);
            }
        };

        match (session, event) {
            (None, Event::Start) => Some(self.start(key).await),
            (Some(session), Event::Start) => {
                debug!(conversation = %session.id, state = session.state.name(), "ignoring start during conversation");
                None
            }
            (None, Event::Cancel | Event::Text(_)) => {
                debug!("ignoring event without a conversation");
                None
            }
            (Some(session), Event::Cancel) => {
                Some(self.finish(key, Some(&session), Outcome::Cancelled).await)
            }
            (Some(session), Event::Text(text)) => Some(self.step(session, text.trim()).await),
        }
    }

    async fn start(&self, key: SessionKey) -> Reply {
        let session = Session::new(key);
        info!(conversation = %session.id, "conversation started");

        if let Err(e) = self.sessions.put(session.clone()).await {
            error!(error = %e, "failed to store session");
            return self
                .finish(key, Some(&session), Outcome::Failed(e.into()))
                .await;
        }

        self.reply(Outcome::AwaitingId)
    }

    async fn step(&self, mut session: Session, input: &str) -> Reply {
        let outcome = match session.state.clone() {
            SessionState::AwaitingId => match self.lookup_id(input).await {
                Ok(row) => {
                    session.await_phone(input, row);
                    match self.sessions.put(session.clone()).await {
                        Ok(()) => {
                            debug!(conversation = %session.id, %row, "employee id matched");
                            return self.reply(Outcome::AwaitingPhone);
                        }
                        Err(e) => Outcome::Failed(e.into()),
                    }
                }
                Err(e) => Outcome::Failed(e),
            },
            SessionState::AwaitingPhone { row, .. } => match self.verify_phone(row, input).await {
                Ok(record) => Outcome::Verified(record),
                Err(e) => Outcome::Failed(e),
            },
        };

        self.finish(session.key, Some(&session), outcome).await
    }

    /// Looks up the employee ID in a fresh store connection.
    async fn lookup_id(&self, employee_id: &str) -> Result<RowRef, VerificationError> {
        let store = self.connector.connect().await?;
        store
            .find_row_by_key(self.settings.id_column, employee_id)
            .await?
            .ok_or(VerificationError::RecordNotFound)
    }

    /// Checks phone and status, then reads the whole record.
    async fn verify_phone(
        &self,
        row: RowRef,
        phone: &str,
    ) -> Result<EmployeeRecord, VerificationError> {
        let store = self.connector.connect().await?;

        let stored_phone = store.get_cell(row, self.settings.phone_column).await?;
        if stored_phone.as_deref() != Some(phone) {
            return Err(VerificationError::FieldMismatch);
        }

        let status = store.get_cell(row, self.settings.status_column).await?;
        if !status.is_some_and(|s| self.settings.is_allowed(&s)) {
            return Err(VerificationError::AccessDenied);
        }

        let cells = store.get_row(row).await?;
        EmployeeRecord::from_row(cells, &self.settings).ok_or_else(|| {
            VerificationError::SystemError {
                reason: format!("{row} is shorter than the sheet layout"),
            }
        })
    }

    /// Ends the conversation and builds its final reply.
    async fn finish(&self, key: SessionKey, session: Option<&Session>, outcome: Outcome) -> Reply {
        if let Err(e) = self.sessions.remove(key).await {
            error!(error = %e, "failed to discard session");
        }

        let conversation = session.map(|s| s.id.to_string()).unwrap_or_default();
        match &outcome {
            Outcome::Failed(e) if e.is_system() => {
                error!(%conversation, store = self.connector.name(), error = %e, "verification aborted");
            }
            Outcome::Failed(e) => {
                info!(%conversation, reason = %e, "verification refused");
            }
            Outcome::Verified(_) => info!(%conversation, "employee verified"),
            Outcome::Cancelled => info!(%conversation, "conversation cancelled"),
            Outcome::AwaitingId | Outcome::AwaitingPhone => {}
        }

        self.reply(outcome)
    }

    fn reply(&self, outcome: Outcome) -> Reply {
        let text = match &outcome {
            Outcome::AwaitingId => self.messages.ask_for_id.clone(),
            Outcome::AwaitingPhone => self.messages.ask_for_phone.clone(),
            Outcome::Verified(record) => self.messages.summary(record),
            Outcome::Failed(e) => self.messages.failure(e).to_string(),
            Outcome::Cancelled => self.messages.cancelled.clone(),
        };
        Reply { text, outcome }
    }
}
