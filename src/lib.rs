pub mod bot;
pub mod chat;
pub mod config;
pub mod status;
pub mod store;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

use axum::extract::FromRef;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chat::Chat;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub chat: Chat,
}

/// Logs to stdout, filtered by `VEILCHAT_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("VEILCHAT_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
