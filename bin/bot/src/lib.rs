//! Telegram front end for staff verification.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod telegram;
