pub mod config;
pub mod error;
pub mod types;

pub use config::EngineConfig;
pub use error::{GameError, Result};
pub use types::{now_unix, AccountId, GameMessage, MessageCategory, MonsterId, SessionId, UnixSeconds, WorldId};
