//! Non-interactive decision making: per-turn policies and autoplay batches

pub mod autoplay;
pub mod decision;

pub use autoplay::{run_batch, AutoplaySummary};
pub use decision::{choose_action, choose_monster_action, Actor, AiAction};
