use std::{sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{error, info};
use veilchat::{
    bot::{Bot, Command},
    chat::{Chat, Relay},
    config::Config,
    init_tracing, status,
    store::SqliteStore,
    transport::telegram::{TelegramClient, Updates},
    AppState,
};

const POLL_RETRY_DELAY: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = run().await {
        error!(error = ?err, "failed to start");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(&config.database_url)
        .await
        .context("connecting to the database")?;
    let store = SqliteStore::new(db_pool);
    store.init().await.context("creating tables")?;
    info!("database ready");

    let telegram = TelegramClient::new(&config.api_url, &config.bot_token, config.request_timeout())?;
    let commands: Vec<(&str, &str)> = Command::ALL
        .iter()
        .map(|command| (command.name(), command.description()))
        .collect();
    telegram.set_my_commands(&commands).await.context("registering bot commands")?;
    info!("bot commands registered");

    let chat = Chat::new();
    let bot = Bot::new(Relay::new(chat.clone(), Arc::new(telegram.clone()), Arc::new(store)));

    let app = status::router().with_state(AppState { chat });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("binding port {}", config.port))?;
    info!(port = config.port, "status endpoint listening");
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(error = %err, "status endpoint stopped");
        }
    });

    let mut updates = Updates::new(telegram, config.poll_timeout_secs);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    info!("bot started");
    loop {
        tokio::select! {
            batch = updates.next_batch() => match batch {
                Ok(events) => {
                    for event in events {
                        bot.dispatch(event).await;
                    }
                }
                Err(err) => {
                    error!(error = %err, "polling for updates failed, retrying");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            },
            _ = &mut shutdown => {
                info!("shutting down");
                return Ok(());
            }
        }
    }
}
