//! Telegram Bot API transport.
//!
//! Long-polls `getUpdates` and answers with `sendMessage`. Only private or
//! group text messages from users are turned into conversation events.

use crate::config::TelegramConfig;
use crate::dispatch::Transport;
use crate::error::TransportError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use staffcheck_conversation::Event;
use staffcheck_core::{Result, SessionKey};
use std::time::Duration;
use tracing::{debug, instrument};

/// Extra time granted to a long poll beyond its server-side timeout.
const POLL_GRACE_SECONDS: u64 = 10;

/// An incoming update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

/// A Telegram message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

impl Update {
    /// Maps the update to the session it belongs to and the event it carries.
    ///
    /// Updates without a text message or a sender yield `None`, as do
    /// commands the bot does not know or that address another bot.
    #[must_use]
    pub fn to_event(&self, bot_username: Option<&str>) -> Option<(SessionKey, Event)> {
        let message = self.message.as_ref()?;
        let from = message.from.as_ref()?;
        let text = message.text.as_deref()?;
        let event = parse_event(text, bot_username)?;
        Some((SessionKey::new(message.chat.id, from.id), event))
    }
}

/// Parses message text into an event.
///
/// `/start` and `/cancel` (optionally suffixed with `@botname`) are
/// commands; anything not starting with `/` is free text.
#[must_use]
pub fn parse_event(text: &str, bot_username: Option<&str>) -> Option<Event> {
    let Some(command) = text.strip_prefix('/') else {
        return Some(Event::text(text));
    };

    let word = command.split_whitespace().next().unwrap_or_default();
    let (name, target) = match word.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (word, None),
    };

    if let (Some(target), Some(username)) = (target, bot_username)
        && !target.eq_ignore_ascii_case(username)
    {
        return None;
    }

    match name.to_ascii_lowercase().as_str() {
        "start" => Some(Event::Start),
        "cancel" => Some(Event::Cancel),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &'static str) -> std::result::Result<T, TransportError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(TransportError::InvalidResponse {
                method,
                details: "response has no result".to_string(),
            }),
            (false, _) => Err(TransportError::Rejected {
                method,
                code: self.error_code,
                description: self.description.unwrap_or_default(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GetMe {}

/// Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    poll_timeout_seconds: u64,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // base_url embeds the bot token
        f.debug_struct("TelegramClient")
            .field("poll_timeout_seconds", &self.poll_timeout_seconds)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Creates a client for the given bot token.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(token: &str, config: &TelegramConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config.poll_timeout_seconds + POLL_GRACE_SECONDS,
            ))
            .build()
            .map_err(|e| TransportError::Setup {
                details: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{}", config.api_base.trim_end_matches('/'), token),
            poll_timeout_seconds: config.poll_timeout_seconds,
        })
    }

    async fn call<B, T>(&self, method: &'static str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed {
                method,
                // Request URLs carry the bot token
                details: e.without_url().to_string(),
            })?;

        let answer: ApiResponse<T> =
            response
                .json()
                .await
                .map_err(|e| TransportError::InvalidResponse {
                    method,
                    details: e.without_url().to_string(),
                })?;

        Ok(answer.into_result(method)?)
    }

    /// Fetches the bot's own account.
    #[instrument(skip(self))]
    pub async fn get_me(&self) -> Result<User, TransportError> {
        self.call("getMe", &GetMe {}).await
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn identify(&self) -> Result<Option<String>, TransportError> {
        Ok(self.get_me().await?.username)
    }

    async fn poll(&self, offset: Option<i64>) -> Result<Vec<Update>, TransportError> {
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                &GetUpdates {
                    offset,
                    timeout: self.poll_timeout_seconds,
                    allowed_updates: ["message"],
                },
            )
            .await?;
        debug!(count = updates.len(), "polled updates");
        Ok(updates)
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        let _sent: Message = self
            .call("sendMessage", &SendMessage { chat_id, text })
            .await?;
        Ok(())
    }
}
