//! Binary entrypoint: configuration, store, transport, webhook server.

use std::sync::Arc;

use earnbot::config::Config;
use earnbot::dispatch::Dispatcher;
use earnbot::ledger::LedgerStore;
use earnbot::server::{self, AppState};
use earnbot::telegram::BotClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let ledger = Arc::new(LedgerStore::open(&config.database_path)?);
    let outbox = Arc::new(BotClient::new(&config.bot_token, config.admin_id));

    tracing::info!(
        admin_id = config.admin_id,
        db = %config.database_path.display(),
        "starting earnbot"
    );

    let addr = config.bind_addr;
    let dispatcher = Dispatcher::new(config, ledger, outbox);
    let state = Arc::new(AppState { dispatcher });
    server::serve(state, addr).await
}
