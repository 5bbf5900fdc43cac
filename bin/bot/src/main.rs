use staffcheck_bot::{
    config::BotConfig, dispatch::Dispatcher, health, telegram::TelegramClient,
};
use staffcheck_conversation::VerificationFlow;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = BotConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    let connector = config
        .connector()
        .expect("failed to set up spreadsheet access");
    let telegram = TelegramClient::new(&config.telegram_bot_token, &config.telegram)
        .expect("failed to set up Telegram client");

    let flow = VerificationFlow::new(connector)
        .with_settings(config.verification.clone())
        .with_messages(config.messages.clone());
    let mut dispatcher = Dispatcher::new(
        telegram,
        flow,
        Duration::from_secs(config.telegram.poll_backoff_seconds),
    );

    let listener = tokio::net::TcpListener::bind((config.http.bind.as_str(), config.http.port))
        .await
        .expect("failed to bind to address");
    tracing::info!(
        "listening on http://{}:{}",
        config.http.bind,
        config.http.port
    );

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health::router()).await {
            tracing::error!(error = %e, "liveness server stopped");
        }
    });

    tracing::info!(sheet_id = %config.sheet_id, "polling for updates");
    dispatcher
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;
}
