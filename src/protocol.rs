//! Twitch IRC line classification and wire formats
//!
//! The server talks in raw IRC lines; only three inbound shapes matter to
//! the bot: the connection confirmation, the channel-join confirmation and
//! incoming whispers. Everything else is plain server traffic.

use regex::Regex;

/// An incoming whisper, extracted from a raw server line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhisperEvent {
    /// Who sent the whisper
    pub sender: String,
    /// The whisper text
    pub body: String,
}

/// A semantically classified inbound line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Login succeeded (end of the message of the day)
    Connected,
    /// A channel join was confirmed; carries the channel name
    Joined(String),
    /// The user received a whisper
    Whisper(WhisperEvent),
}

/// Classifies raw server lines for one authenticated user
///
/// The join and whisper patterns embed the user name, so they are compiled
/// once per identity and reused for every line. Classification itself is
/// pure: the same line always yields the same result.
#[derive(Debug)]
pub struct Classifier {
    connect_line: String,
    join_pattern: Regex,
    whisper_pattern: Regex,
}

impl Classifier {
    /// Build the classifier for the given user identity
    pub fn new(user: &str) -> Self {
        let escaped = regex::escape(user);

        let join_pattern = Regex::new(&format!(
            r"^:{user}\.tmi\.twitch\.tv\s366\s{user}\s#(\w+)\s:End\sof\s/NAMES\slist$",
            user = escaped
        ))
        .expect("join pattern");

        let whisper_pattern = Regex::new(&format!(
            r"^.*?:(\w+)!\w+@\w+\.tmi\.twitch\.tv\sWHISPER\s{user}\s:(.*)$",
            user = escaped
        ))
        .expect("whisper pattern");

        Self {
            connect_line: format!(":tmi.twitch.tv 376 {} :>", user),
            join_pattern,
            whisper_pattern,
        }
    }

    /// Classify one raw line
    ///
    /// The three checks run in a fixed order and the first match wins; a
    /// line cannot be two event kinds at once in this protocol subset.
    /// Returns `None` for ordinary server traffic.
    pub fn classify(&self, line: &str) -> Option<ServerEvent> {
        if self.is_connect(line) {
            return Some(ServerEvent::Connected);
        }
        if let Some(channel) = self.channel_joined(line) {
            return Some(ServerEvent::Joined(channel));
        }
        if let Some(whisper) = self.whisper(line) {
            return Some(ServerEvent::Whisper(whisper));
        }
        None
    }

    /// Whether the line is the successful-connection confirmation
    pub fn is_connect(&self, line: &str) -> bool {
        line == self.connect_line
    }

    /// The joined channel name, if the line is a join confirmation
    pub fn channel_joined(&self, line: &str) -> Option<String> {
        self.join_pattern
            .captures(line)
            .map(|caps| caps[1].to_string())
    }

    /// Sender and body, if the line is a whisper addressed to the user
    pub fn whisper(&self, line: &str) -> Option<WhisperEvent> {
        self.whisper_pattern.captures(line).map(|caps| WhisperEvent {
            sender: caps[1].to_string(),
            body: caps[2].to_string(),
        })
    }
}

/// Outbound line construction
///
/// Exact wire formats expected by Twitch's IRC interface.
pub mod commands {
    /// Capability request issued right after the connection confirmation
    pub const CAP_REQUEST: &str = "CAP REQ :twitch.tv/tags twitch.tv/commands";

    /// Heartbeat token; any inbound line containing it must be answered
    pub const PING_TOKEN: &str = "PING";

    /// Heartbeat reply
    pub const PONG: &str = "PONG";

    /// Credential line of the login handshake
    pub fn pass(token: &str) -> String {
        format!("PASS oauth:{}", token)
    }

    /// Identity line of the login handshake
    pub fn nick(user: &str) -> String {
        format!("NICK {}", user)
    }

    /// Join a channel
    pub fn join(channel: &str) -> String {
        format!("JOIN #{}", channel)
    }

    /// Send a message to a channel
    pub fn privmsg(channel: &str, text: &str) -> String {
        format!("PRIVMSG #{} :{}", channel, text)
    }

    /// Whisper a user; routed through a channel message with `/w`
    pub fn whisper(channel: &str, receiver: &str, text: &str) -> String {
        privmsg(channel, &format!("/w {} {}", receiver, text))
    }
}
