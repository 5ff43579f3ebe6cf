use std::time::Duration;

use anyhow::{anyhow, Context};

use crate::transport::telegram::DEFAULT_API_URL;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://veilchat.db?mode=rwc";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

/// Slack on top of the long-poll timeout before a request is abandoned.
pub const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bot_token: String,
    pub database_url: String,
    pub port: u16,
    pub api_url: String,
    pub poll_timeout_secs: u64,
}

impl Config {
    /// Reads the process environment, including a `.env` file if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bot_token = lookup("BOT_TOKEN")
            .filter(|token| !token.is_empty())
            .ok_or(anyhow!("BOT_TOKEN is not set"))?;

        let port = match lookup("PORT") {
            Some(port) => port.parse().with_context(|| format!("PORT={port} is not a port number"))?,
            None => DEFAULT_PORT,
        };

        let poll_timeout_secs = match lookup("POLL_TIMEOUT_SECS") {
            Some(secs) => secs
                .parse()
                .with_context(|| format!("POLL_TIMEOUT_SECS={secs} is not a number of seconds"))?,
            None => DEFAULT_POLL_TIMEOUT_SECS,
        };

        Ok(Self {
            bot_token,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            port,
            api_url: lookup("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_owned()),
            poll_timeout_secs,
        })
    }

    /// Upper bound for any Bot API request, long polls included.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs) + REQUEST_TIMEOUT_MARGIN
    }
}
