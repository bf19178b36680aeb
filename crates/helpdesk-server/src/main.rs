mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use helpdesk_db::Database;
use helpdesk_gateway::{Dispatcher, DispatcherConfig, TelegramClient, polling};
use helpdesk_relay::{Relay, RelaySettings};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "helpdesk=debug,helpdesk_relay=debug,helpdesk_gateway=info,helpdesk_db=info".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    let db = Arc::new(
        Database::open(&config.db_path)
            .with_context(|| format!("opening {}", config.db_path.display()))?,
    );

    let client = TelegramClient::new(&config.api_url, &config.bot_token)?;
    let me = client.get_me().await.context("getMe failed, check HELPDESK_BOT_TOKEN")?;
    info!(
        "Connected as @{} ({}), support chat {}",
        me.username.as_deref().unwrap_or("?"),
        me.id,
        config.support_chat.id
    );

    let relay = Relay::new(
        db,
        Arc::new(client.clone()),
        RelaySettings {
            support_chat: config.support_chat,
            bot_user_id: me.id,
            bot_username: me.username,
            welcome_text: config.welcome_text,
        },
    );

    let dispatcher = Dispatcher::new(
        Arc::new(relay),
        DispatcherConfig {
            support_chat_id: config.support_chat.id,
            max_concurrency: config.max_concurrency,
            queue_capacity: config.queue_capacity,
            worker_idle: config.worker_idle,
        },
    );

    info!("Polling for updates");
    dispatcher
        .run(polling::updates(client, config.poll_timeout_secs), shutdown_signal())
        .await;

    info!("Helpdesk relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
