//! Liveness endpoint for the hosting platform.

use axum::{Router, routing::get};

/// Body returned while the process is up.
pub const RUNNING: &str = "Bot is running!";

/// Routes served on the HTTP port.
pub fn router() -> Router {
    Router::new().route("/", get(home))
}

async fn home() -> &'static str {
    RUNNING
}
