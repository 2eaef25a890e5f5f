use thiserror::Error;

use crate::core::types::GameMessage;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not enough {resource} (need {needed}, have {available})")]
    ResourceInsufficient {
        resource: String,
        needed: i64,
        available: i64,
    },

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Combat timed out after {turns} turns")]
    Timeout { turns: u32 },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl GameError {
    pub fn not_found(what: &'static str, key: impl Into<String>) -> Self {
        GameError::NotFound {
            what,
            key: key.into(),
        }
    }

    pub fn insufficient(resource: impl Into<String>, needed: i64, available: i64) -> Self {
        GameError::ResourceInsufficient {
            resource: resource.into(),
            needed,
            available,
        }
    }

    /// Player-facing rendering of the error
    pub fn to_message(&self) -> GameMessage {
        GameMessage::error(self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
