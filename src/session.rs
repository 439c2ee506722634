//! IRC connection session
//!
//! Owns the TCP stream to Twitch's IRC endpoint and exposes the narrow
//! set of primitives the bot needs: connect (with the login handshake),
//! raw line send, non-blocking inbound drain, and disconnect. Heartbeats
//! are answered here, transparently to the rest of the bot.
//!
//! All I/O failures are caught at this boundary and converted to boolean
//! or log outcomes; nothing propagates past the run-loop.

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, trace, warn};

use crate::protocol::commands;

/// Twitch's IRC endpoint
pub const TWITCH_IRC_HOST: &str = "irc.chat.twitch.tv";

/// The plaintext IRC port
pub const TWITCH_IRC_PORT: u16 = 6667;

/// IRC line terminator
const CRLF: &str = "\r\n";

struct Conn {
    stream: TcpStream,
    /// Bytes read but not yet terminated by CR-LF
    pending: Vec<u8>,
}

/// A (re)connectable session to the IRC server
///
/// Created unconnected; [`IrcSession::connect`] makes it live. Reconnecting
/// replaces the underlying stream, the session identity stays the same.
pub struct IrcSession {
    host: String,
    port: u16,
    user: String,
    conn: Option<Conn>,
}

impl IrcSession {
    /// Create an unconnected session to the given endpoint
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            conn: None,
        }
    }

    /// Create an unconnected session to Twitch's IRC endpoint
    pub fn twitch(user: impl Into<String>) -> Self {
        Self::new(TWITCH_IRC_HOST, TWITCH_IRC_PORT, user)
    }

    /// Whether the session currently holds a live stream
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Open the transport and perform the login handshake
    ///
    /// Sends the credential and identity lines. Returns true on
    /// transport-level success; the protocol-level confirmation arrives
    /// later on the read loop. On failure the stream is released and
    /// false is returned.
    pub async fn connect(&mut self, token: &str) -> bool {
        let stream = match TcpStream::connect((self.host.as_str(), self.port)).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("couldn't establish a connection to {}:{}: {}", self.host, self.port, e);
                self.conn = None;
                return false;
            }
        };

        self.conn = Some(Conn {
            stream,
            pending: Vec::new(),
        });

        // Login as specified by https://dev.twitch.tv/docs/irc/guide/
        // (this session uses the non-SSL port).
        let pass = commands::pass(token);
        let nick = commands::nick(&self.user);
        if !self.write_line(&pass).await || !self.write_line(&nick).await {
            warn!("couldn't complete the login handshake with {}:{}", self.host, self.port);
            self.conn = None;
            return false;
        }

        info!("connected to {}:{}", self.host, self.port);
        true
    }

    /// Write one raw line plus the line terminator and flush
    ///
    /// Write failures are logged and swallowed.
    pub async fn send_raw(&mut self, line: &str) {
        if !self.write_line(line).await {
            warn!("couldn't send line: '{}'", line);
        }
    }

    /// Drain all currently buffered inbound lines
    ///
    /// Non-blocking: reads until the socket has no more buffered data,
    /// returning every complete CR-LF terminated line. Partial lines are
    /// carried over to the next drain. Lines containing the heartbeat
    /// token are answered with the heartbeat reply before being returned;
    /// that happens for every such line, even if several arrive at once.
    /// A peer close or a hard read failure releases the stream.
    pub async fn read_available(&mut self) -> Vec<String> {
        let (lines, dead) = {
            let Some(conn) = self.conn.as_mut() else {
                return Vec::new();
            };

            let mut buf = [0u8; 4096];
            let mut dead = false;
            loop {
                match conn.stream.try_read(&mut buf) {
                    Ok(0) => {
                        warn!("server closed the connection");
                        dead = true;
                        break;
                    }
                    Ok(n) => conn.pending.extend_from_slice(&buf[..n]),
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                    Err(e) => {
                        warn!("I/O issue while reading from the server: {}", e);
                        dead = true;
                        break;
                    }
                }
            }

            (split_lines(&mut conn.pending), dead)
        };

        if dead {
            self.conn = None;
        }

        for line in &lines {
            if line.contains(commands::PING_TOKEN) {
                self.send_raw(commands::PONG).await;
            }
            trace!("<- {}", line);
        }

        lines
    }

    /// Close the transport
    ///
    /// Returns false (and logs) if closing fails. Safe to call when the
    /// session never connected or a prior connect failed.
    pub async fn disconnect(&mut self) -> bool {
        let Some(mut conn) = self.conn.take() else {
            return true;
        };

        if let Err(e) = conn.stream.shutdown().await {
            warn!("couldn't properly disconnect: {}", e);
            return false;
        }
        true
    }

    async fn write_line(&mut self, line: &str) -> bool {
        let Some(conn) = self.conn.as_mut() else {
            warn!("not connected, dropping line: '{}'", line);
            return false;
        };

        let framed = format!("{}{}", line, CRLF);
        match conn.stream.write_all(framed.as_bytes()).await {
            Ok(()) => match conn.stream.flush().await {
                Ok(()) => {
                    info!("-> {}", line);
                    true
                }
                Err(e) => {
                    warn!("couldn't flush to the server: {}", e);
                    false
                }
            },
            Err(e) => {
                warn!("couldn't write to the server: {}", e);
                false
            }
        }
    }
}

/// Split complete lines off the front of the carry-over buffer
///
/// Lines are terminated by CR-LF; a trailing fragment stays in the buffer.
fn split_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
        let mut raw: Vec<u8> = pending.drain(..=pos).collect();
        raw.pop(); // '\n'
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        lines.push(String::from_utf8_lossy(&raw).into_owned());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    async fn session_pair() -> (IrcSession, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut session = IrcSession::new(addr.ip().to_string(), addr.port(), "alice");
        assert!(session.connect("s3cret").await);
        let (server, _) = listener.accept().await.unwrap();
        (session, server)
    }

    /// Poll the session until it has produced `want` lines.
    async fn drain(session: &mut IrcSession, want: usize) -> Vec<String> {
        let mut lines = Vec::new();
        for _ in 0..100 {
            lines.extend(session.read_available().await);
            if lines.len() >= want {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        lines
    }

    #[test]
    fn test_split_lines_handles_partials() {
        let mut pending = b"first\r\nsecond\r\npar".to_vec();
        assert_eq!(split_lines(&mut pending), vec!["first", "second"]);
        assert_eq!(pending, b"par");

        pending.extend_from_slice(b"tial\r\n");
        assert_eq!(split_lines(&mut pending), vec!["partial"]);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_connect_sends_login_handshake() {
        let (_session, server) = session_pair().await;

        let mut reader = BufReader::new(server);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "PASS oauth:s3cret\r\n");

        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "NICK alice\r\n");
    }

    #[tokio::test]
    async fn test_connect_failure_returns_false() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut session = IrcSession::new(addr.ip().to_string(), addr.port(), "alice");
        assert!(!session.connect("s3cret").await);
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_read_available_answers_heartbeat() {
        let (mut session, mut server) = session_pair().await;

        server
            .write_all(b"PING :tmi.twitch.tv\r\n:hello world\r\n")
            .await
            .unwrap();

        let lines = drain(&mut session, 2).await;
        assert_eq!(lines, vec!["PING :tmi.twitch.tv", ":hello world"]);

        // Skip past the handshake, then expect the heartbeat reply.
        let mut reader = BufReader::new(server);
        let mut line = String::new();
        for _ in 0..2 {
            line.clear();
            reader.read_line(&mut line).await.unwrap();
        }
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "PONG\r\n");
    }

    #[tokio::test]
    async fn test_read_available_carries_partial_lines() {
        let (mut session, mut server) = session_pair().await;

        server.write_all(b"one\r\ntwo par").await.unwrap();
        let lines = drain(&mut session, 1).await;
        assert_eq!(lines, vec!["one"]);

        server.write_all(b"ts\r\n").await.unwrap();
        let lines = drain(&mut session, 1).await;
        assert_eq!(lines, vec!["two parts"]);
    }

    #[tokio::test]
    async fn test_send_raw_frames_with_crlf() {
        let (mut session, server) = session_pair().await;
        session.send_raw("JOIN #lobosjr").await;

        let mut reader = BufReader::new(server);
        let mut line = String::new();
        for _ in 0..2 {
            line.clear();
            reader.read_line(&mut line).await.unwrap();
        }
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "JOIN #lobosjr\r\n");
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent_safe() {
        let (mut session, _server) = session_pair().await;
        assert!(session.disconnect().await);
        assert!(!session.is_connected());
        // After a disconnect (or a failed connect) there is nothing to close.
        assert!(session.disconnect().await);

        let mut never_connected = IrcSession::new("127.0.0.1", 1, "alice");
        assert!(never_connected.disconnect().await);
    }

    #[tokio::test]
    async fn test_peer_close_drops_the_stream() {
        let (mut session, server) = session_pair().await;
        drop(server);

        // Eventually observes the close and releases the stream.
        for _ in 0..100 {
            session.read_available().await;
            if !session.is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!session.is_connected());
        assert!(session.read_available().await.is_empty());
    }
}
