//! Environment configuration

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PLAYERS_PATH: &str = "players.csv";
const DEFAULT_API_URL: &str = "https://api.telegram.org";
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;
/// Longest long-poll wait the Bot API honours
const MAX_POLL_TIMEOUT_SECS: u64 = 50;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} must be a whole number of seconds, got {value:?}")]
    InvalidSeconds { var: &'static str, value: String },
    #[error("{var} must be at most {max} seconds, got {value}")]
    TooManySeconds { var: &'static str, value: u64, max: u64 },
}

#[derive(Clone)]
pub struct BotConfig {
    pub token: String,
    pub players_path: PathBuf,
    pub api_url: String,
    pub poll_timeout: Duration,
    /// Reset abandoned sessions after this long. Off unless configured.
    pub session_timeout: Option<Duration>,
}

// Keeps the token out of logs
impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("players_path", &self.players_path)
            .field("api_url", &self.api_url)
            .field("poll_timeout", &self.poll_timeout)
            .field("session_timeout", &self.session_timeout)
            .finish()
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let seconds = |var: &'static str| -> Result<Option<Duration>, ConfigError> {
            lookup(var)
                .map(|value| {
                    value
                        .trim()
                        .parse::<u64>()
                        .map(Duration::from_secs)
                        .map_err(|_| ConfigError::InvalidSeconds { var, value })
                })
                .transpose()
        };

        let poll_timeout = seconds("RELAY_POLL_TIMEOUT_SECS")?
            .unwrap_or(Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS));
        if poll_timeout.as_secs() > MAX_POLL_TIMEOUT_SECS {
            return Err(ConfigError::TooManySeconds {
                var: "RELAY_POLL_TIMEOUT_SECS",
                value: poll_timeout.as_secs(),
                max: MAX_POLL_TIMEOUT_SECS,
            });
        }

        Ok(Self {
            token,
            players_path: lookup("RELAY_PLAYERS_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_PLAYERS_PATH), PathBuf::from),
            api_url: lookup("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            poll_timeout,
            session_timeout: seconds("RELAY_SESSION_TIMEOUT_SECS")?.filter(|d| !d.is_zero()),
        })
    }
}
