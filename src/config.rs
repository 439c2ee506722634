//! Configuration file access
//!
//! Parses a flat `key=value` settings file into typed credentials.

use std::collections::HashMap;
use std::path::Path;

use crate::error::AppError;

/// Settings required to authenticate against Twitch
///
/// Loaded from a flat `key=value` file, one pair per line.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Application id assigned by Twitch
    pub client_id: String,
    /// Application secret, used when refreshing access tokens
    pub client_secret: String,
    /// Long-lived token exchanged for fresh access tokens
    pub refresh_token: String,
    /// The user who granted authorization to be driven by this bot
    pub user: String,
}

impl Settings {
    /// Load settings from the given file path
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse settings from `key=value` lines
    ///
    /// Blank lines are skipped. A non-blank line without `=` is an error;
    /// values may themselves contain `=`.
    pub fn parse(contents: &str) -> Result<Self, AppError> {
        let mut map = HashMap::new();

        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(AppError::Config(format!("malformed line: '{}'", line)));
            };
            map.insert(key.trim().to_string(), value.trim().to_string());
        }

        Ok(Self {
            client_id: take(&mut map, "client_id")?,
            client_secret: take(&mut map, "client_secret")?,
            refresh_token: take(&mut map, "refresh_token")?,
            user: take(&mut map, "user")?,
        })
    }
}

fn take(map: &mut HashMap<String, String>, key: &'static str) -> Result<String, AppError> {
    map.remove(key).ok_or(AppError::MissingKey(key))
}
