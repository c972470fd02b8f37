//! Runtime configuration, loaded once from the environment at startup.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot API token used by the outbound client.
    pub bot_token: String,
    /// Chat id of the administrator who creates tasks and approves submissions.
    pub admin_id: i64,
    /// Public bot username, embedded in referral links.
    pub bot_username: String,
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Webhook server bind address.
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Required: `BOT_TOKEN`, `ADMIN_ID`, `BOT_USERNAME`.
    /// Optional: `DATABASE_PATH` (default `earnbot.db`) and
    /// `BIND_ADDR` (default `0.0.0.0:8080`).
    pub fn from_env() -> anyhow::Result<Self> {
        let bot_token = env::var("BOT_TOKEN").context("BOT_TOKEN is not set")?;
        let admin_id = env::var("ADMIN_ID")
            .context("ADMIN_ID is not set")?
            .parse()
            .context("ADMIN_ID must be an integer chat id")?;
        let bot_username = env::var("BOT_USERNAME").context("BOT_USERNAME is not set")?;
        let database_path = env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("earnbot.db"));
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address")?;

        Ok(Self {
            bot_token,
            admin_id,
            bot_username,
            database_path,
            bind_addr,
        })
    }
}
