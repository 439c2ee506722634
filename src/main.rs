//! Relentless fishing bot - Entry Point
//!
//! Loads the settings, wires the client, orchestrator and watchdog
//! together, and runs the connection loop forever.

use std::env;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::error;
use tracing_subscriber::EnvFilter;

use fisher_bot::{
    BotEvent, ChatClient, ClientHandle, Fisher, Settings, Watchdog, WATCHDOG_POLL,
    WATCHDOG_TIMEOUT,
};

/// Default settings file path
const DEFAULT_SETTINGS: &str = "settings.cfg";

/// Channel buffer size for outbound lines and bot events
const CHANNEL_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=fisher_bot=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fisher_bot=info")),
        )
        .init();

    // Get the settings path from the command line or use the default
    let path = env::args().nth(1).unwrap_or_else(|| DEFAULT_SETTINGS.to_string());
    let settings = Settings::load(&path)?;

    let (out_tx, out_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    let (event_tx, event_rx) = mpsc::channel::<BotEvent>(CHANNEL_BUFFER_SIZE);

    // All listeners funnel into the fisher's event channel; registration
    // happens here, before the read loop starts.
    let mut client = ChatClient::new(settings, out_rx);
    {
        let tx = event_tx.clone();
        client.on_connection(Box::new(move || {
            let _ = tx.try_send(BotEvent::Connected);
        }));
    }
    {
        let tx = event_tx.clone();
        client.on_join(Box::new(move |channel| {
            let _ = tx.try_send(BotEvent::Joined(channel.to_string()));
        }));
    }
    {
        let tx = event_tx.clone();
        client.on_whisper(Box::new(move |whisper| {
            let _ = tx.try_send(BotEvent::Whisper(whisper));
        }));
    }

    let watchdog = Arc::new(Watchdog::new(WATCHDOG_TIMEOUT, WATCHDOG_POLL));
    {
        let tx = event_tx.clone();
        watchdog.add(Box::new(move |elapsed| {
            let _ = tx.try_send(BotEvent::Timeout(elapsed));
        }));
    }

    let fisher = Fisher::new(ClientHandle::new(out_tx), watchdog, event_rx);
    tokio::spawn(fisher.run());

    // Runs forever; only a failed token refresh makes it return.
    if let Err(e) = client.run().await {
        error!("client stopped: {}", e);
        return Err(e.into());
    }

    Ok(())
}
