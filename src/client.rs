//! Twitch chat client
//!
//! Ties the session to the rest of the bot: refreshes the access token,
//! connects with exponential backoff, then runs the poll loop that drains
//! inbound lines, classifies them and fans the resulting events out to the
//! registered listeners. Outbound lines arrive over a channel so other
//! tasks never touch the socket directly.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::auth;
use crate::config::Settings;
use crate::error::{AppError, SendError};
use crate::protocol::{commands, Classifier, ServerEvent, WhisperEvent};
use crate::session::IrcSession;

/// How long the read loop idles between inbound drains
const READ_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Caps the backoff delay at 2^10 seconds; the retry count itself is
/// unbounded.
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Callback fired when the server confirms the login
pub type ConnectionListener = Box<dyn Fn() + Send>;
/// Callback fired when the server confirms a channel join
pub type JoinListener = Box<dyn Fn(&str) + Send>;
/// Callback fired when the user receives a whisper
pub type WhisperListener = Box<dyn Fn(WhisperEvent) + Send>;

/// Cheap clonable sending side of the client
///
/// Formats outbound protocol lines and queues them for the client's run
/// loop to write to the socket.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    outbound: mpsc::Sender<String>,
}

impl ClientHandle {
    /// Create a handle over the given outbound line channel
    pub fn new(outbound: mpsc::Sender<String>) -> Self {
        Self { outbound }
    }

    /// Queue one raw protocol line
    pub async fn send_raw(&self, line: impl Into<String>) -> Result<(), SendError> {
        self.outbound
            .send(line.into())
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Join a channel
    pub async fn join(&self, channel: &str) -> Result<(), SendError> {
        self.send_raw(commands::join(channel)).await
    }

    /// Whisper a user on a channel
    pub async fn whisper(
        &self,
        channel: &str,
        receiver: &str,
        text: &str,
    ) -> Result<(), SendError> {
        self.send_raw(commands::whisper(channel, receiver, text)).await
    }
}

/// The connection-owning half of the bot
///
/// Listeners must be registered before [`ChatClient::run`]; the sets are
/// append-only and consulted in registration order.
pub struct ChatClient {
    session: IrcSession,
    classifier: Classifier,
    settings: Settings,
    http: reqwest::Client,
    outbound: mpsc::Receiver<String>,
    connection_listeners: Vec<ConnectionListener>,
    join_listeners: Vec<JoinListener>,
    whisper_listeners: Vec<WhisperListener>,
}

impl ChatClient {
    /// Create a client for the configured user
    ///
    /// `outbound` is the receiving end of the line channel that
    /// [`ClientHandle`]s send into.
    pub fn new(settings: Settings, outbound: mpsc::Receiver<String>) -> Self {
        Self {
            session: IrcSession::twitch(settings.user.clone()),
            classifier: Classifier::new(&settings.user),
            settings,
            http: reqwest::Client::new(),
            outbound,
            connection_listeners: Vec::new(),
            join_listeners: Vec::new(),
            whisper_listeners: Vec::new(),
        }
    }

    /// Register a connection-confirmed listener
    pub fn on_connection(&mut self, listener: ConnectionListener) {
        self.connection_listeners.push(listener);
    }

    /// Register a channel-joined listener
    pub fn on_join(&mut self, listener: JoinListener) {
        self.join_listeners.push(listener);
    }

    /// Register a whisper-received listener
    pub fn on_whisper(&mut self, listener: WhisperListener) {
        self.whisper_listeners.push(listener);
    }

    /// Run the client forever
    ///
    /// Refreshes the access token (the only fatal failure), connects with
    /// exponential backoff, then alternates between writing queued
    /// outbound lines and draining inbound ones on a fixed poll interval.
    pub async fn run(mut self) -> Result<(), AppError> {
        let token = auth::refresh_access_token(
            &self.http,
            &self.settings.client_id,
            &self.settings.client_secret,
            &self.settings.refresh_token,
        )
        .await?;

        self.connect_with_backoff(&token).await;

        let mut poll = interval(READ_POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(line) = self.outbound.recv() => {
                    self.session.send_raw(&line).await;
                }
                _ = poll.tick() => {
                    let lines = self.session.read_available().await;
                    for line in lines {
                        self.dispatch(&line);
                    }
                }
            }
        }
    }

    /// Retry connecting until it succeeds
    ///
    /// Waits 2^attempt seconds between attempts, as to not over-strain
    /// the server. The attempt counter starts fresh on every call.
    async fn connect_with_backoff(&mut self, token: &str) {
        let mut attempt = 0u32;
        while !self.session.connect(token).await {
            let delay = backoff_delay(attempt);
            warn!("connect failed, retrying in {:?}", delay);
            sleep(delay).await;
            attempt += 1;
        }
    }

    /// Classify one inbound line and fan it out
    ///
    /// Lines matching none of the known event shapes are ordinary server
    /// traffic: logged and otherwise ignored.
    fn dispatch(&self, line: &str) {
        match self.classifier.classify(line) {
            Some(ServerEvent::Connected) => {
                info!("got successful connection confirmation");
                for listener in &self.connection_listeners {
                    listener();
                }
            }
            Some(ServerEvent::Joined(channel)) => {
                info!("got channel confirmation for: {}", channel);
                for listener in &self.join_listeners {
                    listener(&channel);
                }
            }
            Some(ServerEvent::Whisper(whisper)) => {
                debug!("whisper from {}: {}", whisper.sender, whisper.body);
                for listener in &self.whisper_listeners {
                    listener(whisper.clone());
                }
            }
            None => {
                debug!("<- {}", line);
            }
        }
    }
}

/// Delay before the given (0-based) reconnect attempt
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(MAX_BACKOFF_EXPONENT))
}
