//! The fishing orchestrator
//!
//! Plays the fishing mini-game offered by the "lobotjr" bot on the
//! "lobosjr" channel, driven by classified events from the chat client.
//! Runs as a single actor task: every piece of game state is owned here
//! and mutated only from this task, so no locks are needed.
//!
//! The watchdog is the self-healing path: if the remote bot goes silent
//! for the whole timeout, the conversation is assumed desynced and is
//! restarted from a fresh cast.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::ClientHandle;
use crate::game::{self, FishingState};
use crate::protocol::{commands, WhisperEvent};
use crate::watchdog::Watchdog;

/// The channel the bot operates on
pub const CHANNEL_NAME: &str = "lobosjr";

/// The name of the bot providing the fishing mini-game
pub const BOT_NAME: &str = "lobotjr";

/// Whisper silence tolerated before the conversation is restarted
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(300);

/// How often the watchdog re-checks its countdown
pub const WATCHDOG_POLL: Duration = Duration::from_secs(30);

const CAST_COMMAND: &str = "!cast";
const CATCH_COMMAND: &str = "!catch";

/// Delay before responding to a whisper; Twitch will not allow rapid
/// whisper conversations.
const WHISPER_DELAY: Duration = Duration::from_secs(2);

/// Events delivered to the orchestrator
#[derive(Debug, Clone)]
pub enum BotEvent {
    /// Login confirmed by the server
    Connected,
    /// Channel join confirmed
    Joined(String),
    /// A whisper arrived for the user
    Whisper(WhisperEvent),
    /// The watchdog expired after the given silence
    Timeout(Duration),
}

/// Drives the fishing conversation
pub struct Fisher {
    state: FishingState,
    client: ClientHandle,
    watchdog: Arc<Watchdog>,
    events: mpsc::Receiver<BotEvent>,
}

impl Fisher {
    /// Create the orchestrator in its initial state
    pub fn new(
        client: ClientHandle,
        watchdog: Arc<Watchdog>,
        events: mpsc::Receiver<BotEvent>,
    ) -> Self {
        Self {
            state: FishingState::CanCast,
            client,
            watchdog,
            events,
        }
    }

    /// Run the actor loop until all event senders are gone
    pub async fn run(mut self) {
        info!("fisher started");

        while let Some(event) = self.events.recv().await {
            self.handle_event(event).await;
        }

        info!("fisher shutting down");
    }

    async fn handle_event(&mut self, event: BotEvent) {
        match event {
            BotEvent::Connected => self.on_connection().await,
            BotEvent::Joined(channel) => self.on_join(&channel).await,
            BotEvent::Whisper(whisper) => self.on_whisper(whisper).await,
            BotEvent::Timeout(elapsed) => self.on_timeout(elapsed).await,
        }
    }

    /// Request the extended capability set, join the channel and start
    /// watching for silence.
    async fn on_connection(&mut self) {
        info!("got connection");
        let _ = self.client.send_raw(commands::CAP_REQUEST).await;
        let _ = self.client.join(CHANNEL_NAME).await;
        self.arm_watchdog();
    }

    /// Seed the conversation; the remote bot never greets first.
    async fn on_join(&mut self, _channel: &str) {
        let _ = self.cast().await;
    }

    /// Advance the game by one whisper
    ///
    /// Any whisper proves the link is alive, so the watchdog is reset
    /// before the sender is even looked at. Whispers from anyone but the
    /// game bot are otherwise ignored.
    async fn on_whisper(&mut self, whisper: WhisperEvent) {
        self.watchdog.reset();

        if whisper.sender != BOT_NAME {
            debug!("ignoring whisper from {}", whisper.sender);
            return;
        }

        sleep(WHISPER_DELAY).await;

        self.state = game::next(self.state, &whisper.body);
        debug!("state is now {:?}", self.state);

        match self.state {
            FishingState::CanCast => {
                let _ = self.cast().await;
            }
            FishingState::CanCatch => {
                let _ = self
                    .client
                    .whisper(CHANNEL_NAME, BOT_NAME, CATCH_COMMAND)
                    .await;
            }
            // Waiting on the next whisper.
            FishingState::IsCast | FishingState::OptionalRecord => {}
        }
    }

    /// The remote bot went silent; restart the conversation
    async fn on_timeout(&mut self, elapsed: Duration) {
        warn!("no whisper for {:?}, recasting", elapsed);
        self.state = FishingState::CanCast;
        let _ = self.cast().await;
        self.arm_watchdog();
    }

    async fn cast(&self) -> Result<(), crate::error::SendError> {
        self.client.whisper(CHANNEL_NAME, BOT_NAME, CAST_COMMAND).await
    }

    /// Submit one watchdog countdown cycle
    ///
    /// The watchdog does not rearm itself; a fresh cycle is submitted
    /// here and after every expiry.
    fn arm_watchdog(&self) {
        let watchdog = Arc::clone(&self.watchdog);
        tokio::spawn(async move { watchdog.run().await });
    }
}
