//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Unique identifier for a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of one monster, kept across clones and roster moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonsterId(pub Uuid);

impl MonsterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MonsterId {
    fn default() -> Self {
        Self::new()
    }
}

/// Account that owns a database-backed world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub i64);

/// Key of one backing world (locations, villages, quests, characters)
///
/// All sessions opened against the same world share one in-memory snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum WorldId {
    /// Single-player save identified by its save name
    Local(String),
    /// Multiplayer world owned by an account
    Account(AccountId),
}

impl WorldId {
    pub fn account(&self) -> Option<AccountId> {
        match self {
            WorldId::Account(id) => Some(*id),
            WorldId::Local(_) => None,
        }
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldId::Local(name) => write!(f, "local:{}", name),
            WorldId::Account(id) => write!(f, "account:{}", id.0),
        }
    }
}

/// Wall-clock seconds since the unix epoch
pub type UnixSeconds = i64;

/// Current wall-clock time in seconds
pub fn now_unix() -> UnixSeconds {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Category attached to every player-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageCategory {
    System,
    Combat,
    Damage,
    Heal,
    Loot,
    Buff,
    Debuff,
    Narrative,
    Error,
    Levelup,
}

/// One line of output shown to the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMessage {
    pub text: String,
    pub category: MessageCategory,
}

impl GameMessage {
    pub fn new(text: impl Into<String>, category: MessageCategory) -> Self {
        Self {
            text: text.into(),
            category,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(text, MessageCategory::System)
    }

    pub fn combat(text: impl Into<String>) -> Self {
        Self::new(text, MessageCategory::Combat)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, MessageCategory::Error)
    }
}
