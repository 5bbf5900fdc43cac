//! Core domain types and utilities for staffcheck.
//!
//! This crate provides the foundational types and error handling shared by
//! the record store integration, the verification conversation and the bot
//! binary.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ConversationId, SessionKey};
