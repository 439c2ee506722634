//! Relentless fishing bot for Twitch chat
//!
//! A long-running bot that logs onto Twitch's IRC interface and plays the
//! fishing mini-game offered by the "lobotjr" bot, entirely over whispers.
//!
//! # Features
//! - IRC login handshake and channel join over raw TCP
//! - Classification of inbound lines into semantic events
//! - A tiny state machine over the bot's free-text replies
//! - Transparent heartbeat handling
//! - Exponential backoff while connecting
//! - A watchdog that restarts the conversation when the bot goes silent
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Fisher` is the orchestrator actor owning all game state
//! - `ChatClient` owns the socket; classified events flow to the actor
//!   through registered listener callbacks, outbound lines flow back over
//!   a channel
//! - No locks on game state - all mutation goes through message passing
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use fisher_bot::{
//!     BotEvent, ChatClient, ClientHandle, Fisher, Settings, Watchdog,
//!     WATCHDOG_POLL, WATCHDOG_TIMEOUT,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = Settings::load("settings.cfg").unwrap();
//!     let (out_tx, out_rx) = mpsc::channel(256);
//!     let (event_tx, event_rx) = mpsc::channel(256);
//!
//!     let watchdog = Arc::new(Watchdog::new(WATCHDOG_TIMEOUT, WATCHDOG_POLL));
//!     let mut client = ChatClient::new(settings, out_rx);
//!     let tx = event_tx.clone();
//!     client.on_connection(Box::new(move || {
//!         let _ = tx.try_send(BotEvent::Connected);
//!     }));
//!
//!     let fisher = Fisher::new(ClientHandle::new(out_tx), watchdog, event_rx);
//!     tokio::spawn(fisher.run());
//!     client.run().await.unwrap();
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod fisher;
pub mod game;
pub mod protocol;
pub mod session;
pub mod watchdog;

// Re-export main types for convenience
pub use client::{ChatClient, ClientHandle};
pub use config::Settings;
pub use error::{AppError, SendError};
pub use fisher::{BotEvent, Fisher, WATCHDOG_POLL, WATCHDOG_TIMEOUT};
pub use game::FishingState;
pub use protocol::{Classifier, ServerEvent, WhisperEvent};
pub use session::IrcSession;
pub use watchdog::{ListenerId, Watchdog};
