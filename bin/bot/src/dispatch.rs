//! Update dispatch.
//!
//! Polls the transport, routes each update to its session's conversation
//! and sends back whatever the conversation replies. Updates for one
//! session are handled in arrival order; different sessions in the same
//! batch run concurrently.

use crate::error::TransportError;
use crate::telegram::Update;
use async_trait::async_trait;
use staffcheck_conversation::{Event, InMemorySessionManager, SessionManager, VerificationFlow};
use staffcheck_core::{Result, SessionKey};
use staffcheck_integration::StoreConnector;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A messaging transport the dispatcher can poll and reply through.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The bot's own username, used to filter `/command@bot` addressing.
    async fn identify(&self) -> Result<Option<String>, TransportError>;

    /// Fetches updates newer than `offset`, waiting for some to arrive.
    async fn poll(&self, offset: Option<i64>) -> Result<Vec<Update>, TransportError>;

    /// Sends a text message to a chat.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TransportError>;
}

/// Feeds transport updates into verification conversations.
pub struct Dispatcher<T, C, S = InMemorySessionManager> {
    transport: T,
    flow: VerificationFlow<C, S>,
    backoff: Duration,
    bot_username: Option<String>,
}

impl<T, C, S> Dispatcher<T, C, S>
where
    T: Transport,
    C: StoreConnector,
    S: SessionManager,
{
    /// Creates a dispatcher that pauses for `backoff` after a failed poll.
    pub fn new(transport: T, flow: VerificationFlow<C, S>, backoff: Duration) -> Self {
        Self {
            transport,
            flow,
            backoff,
            bot_username: None,
        }
    }

    /// Polls until `shutdown` resolves.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        match self.transport.identify().await {
            Ok(username) => {
                info!(username = username.as_deref().unwrap_or(""), "bot identified");
                self.bot_username = username;
            }
            Err(e) => warn!(error = %e, "failed to identify bot; accepting all addressed commands"),
        }

        let mut offset = None;
        loop {
            let polled = tokio::select! {
                biased;
                () = &mut shutdown => break,
                polled = self.transport.poll(offset) => polled,
            };

            match polled {
                Ok(updates) => {
                    if let Some(next) = self.process(updates).await {
                        offset = Some(next);
                    }
                }
                Err(e) => {
                    warn!(error = %e, backoff_seconds = self.backoff.as_secs(), "polling failed");
                    tokio::select! {
                        biased;
                        () = &mut shutdown => break,
                        () = tokio::time::sleep(self.backoff) => {}
                    }
                }
            }
        }

        info!("dispatcher stopped");
    }

    /// Handles one batch of updates and returns the offset that
    /// acknowledges it, or `None` for an empty batch.
    pub async fn process(&self, updates: Vec<Update>) -> Option<i64> {
        let next_offset = updates.iter().map(|u| u.update_id + 1).max();

        let mut groups: HashMap<SessionKey, Vec<Event>> = HashMap::new();
        for update in &updates {
            match update.to_event(self.bot_username.as_deref()) {
                Some((key, event)) => groups.entry(key).or_default().push(event),
                None => debug!(update_id = update.update_id, "skipping update"),
            }
        }

        futures::future::join_all(
            groups
                .into_iter()
                .map(|(key, events)| self.converse(key, events)),
        )
        .await;

        next_offset
    }

    async fn converse(&self, key: SessionKey, events: Vec<Event>) {
        for event in events {
            let Some(reply) = self.flow.handle(key, event).await else {
                continue;
            };
            if let Err(e) = self.transport.send_message(key.chat_id, &reply.text).await {
                warn!(session = %key, error = %e, "failed to send reply");
            }
        }
    }
}
