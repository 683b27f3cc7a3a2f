use std::sync::Arc;

use dispatch_types::InboundMessage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dispatchd::config::Config;
use dispatchd::store::{ProviderStore, SessionStore, TicketStore};
use dispatchd::transport::StdioTransport;
use dispatchd::{db, Engine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "dispatchd=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(database_url = %config.database_url, "dispatchd starting");

    let pool = db::connect(&config.database_url).await?;

    let sessions = SessionStore::new(pool.clone());
    sessions.migrate().await?;
    let tickets = TicketStore::new(pool.clone());
    tickets.migrate().await?;
    let providers = ProviderStore::new(pool.clone());
    providers.migrate().await?;

    let engine = Engine::new(sessions, tickets, providers, Arc::new(StdioTransport), config);

    // Dev transport loop. The real message channel lives in another process;
    // here each stdin line is one inbound event: `<identity> <text>`.
    info!("reading inbound events from stdin (`<identity> <text>` per line)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let (sender, body) = match line.split_once(' ') {
            Some((sender, body)) => (sender.to_string(), body.to_string()),
            None => (line, String::new()),
        };
        if sender.is_empty() {
            continue;
        }
        engine
            .handle(InboundMessage {
                sender,
                body,
                is_group_or_status: false,
            })
            .await;
    }

    info!("stdin closed, shutting down");
    Ok(())
}
