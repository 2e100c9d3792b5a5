//! In-memory player directory
//!
//! Maps usernames to players and their angel/mortal links. The table is built
//! once at startup from the players file; afterwards only chat ids change.

mod loader;

pub use loader::LoadError;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Platform identifier of a private chat with the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a player record within one directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(usize);

/// Relationship role a message can be relayed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Angel,
    Mortal,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Angel, Role::Mortal];

    /// Lowercase form, used in notices and as button callback data
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Angel => "angel",
            Role::Mortal => "mortal",
        }
    }

    /// Button label
    pub fn label(self) -> &'static str {
        match self {
            Role::Angel => "Angel",
            Role::Mortal => "Mortal",
        }
    }

    pub fn from_callback_data(data: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == data)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a player record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub chat_id: Option<ChatId>,
    pub angel: Option<PlayerId>,
    pub mortal: Option<PlayerId>,
}

impl Player {
    pub fn link(&self, role: Role) -> Option<PlayerId> {
        match role {
            Role::Angel => self.angel,
            Role::Mortal => self.mortal,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Chat has no username")]
    NoUsername,
    #[error("Unknown player: {0}")]
    UnknownUser(String),
    #[error("Player {username} has no {role}")]
    NoRelationship { username: String, role: Role },
    #[error("The {role} of {username} has not started the bot")]
    UnresolvedRecipient { username: String, role: Role },
}

#[derive(Debug)]
struct PlayerRecord {
    username: String,
    angel: Option<PlayerId>,
    mortal: Option<PlayerId>,
    chat_id: Mutex<Option<ChatId>>,
}

impl PlayerRecord {
    fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            angel: None,
            mortal: None,
            chat_id: Mutex::new(None),
        }
    }

    fn chat_id(&self) -> Option<ChatId> {
        *self.chat_id.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Player table shared by every chat session
///
/// Relationships are fixed after loading. Chat ids sit behind a per-record
/// lock so `/start` from different chats can record them concurrently.
#[derive(Debug, Default)]
pub struct PlayerDirectory {
    records: Vec<PlayerRecord>,
    index: HashMap<String, PlayerId>,
}

impl PlayerDirectory {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Usernames in load order
    #[allow(dead_code)] // Used in tests
    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.username.as_str())
    }

    /// Look up a player by username. Unknown usernames are `None`.
    pub fn resolve(&self, username: &str) -> Option<Player> {
        self.index.get(username).and_then(|&id| self.player(id))
    }

    pub fn player(&self, id: PlayerId) -> Option<Player> {
        self.records.get(id.0).map(|record| Player {
            id,
            username: record.username.clone(),
            chat_id: record.chat_id(),
            angel: record.angel,
            mortal: record.mortal,
        })
    }

    /// Record the chat a player talks to the bot from. Last write wins.
    pub fn set_chat_id(&self, username: &str, chat_id: ChatId) -> Result<(), DirectoryError> {
        let id = self
            .index
            .get(username)
            .ok_or_else(|| DirectoryError::UnknownUser(username.to_string()))?;
        let record = &self.records[id.0];
        let previous = record
            .chat_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(chat_id);
        if previous != Some(chat_id) {
            tracing::info!(username, chat_id = %chat_id, ?previous, "Recorded player chat");
        }
        Ok(())
    }

    /// Follow `role` from `username` to the chat the message should go to
    pub fn recipient_chat(&self, username: &str, role: Role) -> Result<ChatId, DirectoryError> {
        let player = self
            .resolve(username)
            .ok_or_else(|| DirectoryError::UnknownUser(username.to_string()))?;
        let target = player
            .link(role)
            .and_then(|id| self.player(id))
            .ok_or_else(|| DirectoryError::NoRelationship {
                username: username.to_string(),
                role,
            })?;
        tracing::debug!(username, %role, target = %target.username, "Resolving recipient");
        target
            .chat_id
            .ok_or_else(|| DirectoryError::UnresolvedRecipient {
                username: username.to_string(),
                role,
            })
    }

    /// Fetch or create the record for `username`.
    fn entry(&mut self, username: &str) -> PlayerId {
        if let Some(&id) = self.index.get(username) {
            return id;
        }
        let id = PlayerId(self.records.len());
        self.records.push(PlayerRecord::new(username));
        self.index.insert(username.to_string(), id);
        id
    }

    fn link(&mut self, player: &str, angel: &str, mortal: &str) {
        let player_id = self.entry(player);
        let angel_id = self.entry(angel);
        let mortal_id = self.entry(mortal);
        let record = &mut self.records[player_id.0];
        if record.angel.is_some() || record.mortal.is_some() {
            tracing::warn!(player, "Player listed more than once, keeping the later row");
        }
        record.angel = Some(angel_id);
        record.mortal = Some(mortal_id);
    }
}
