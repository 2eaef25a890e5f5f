//! Tidebound - live-session backend for a turn-based RPG
//!
//! One [`session::Engine`] hosts every connected player's session, resolves
//! fights turn by turn, and shares each world's locations and villages with
//! the background sweeps in [`tick`].

pub mod ai;
pub mod broadcast;
pub mod combat;
pub mod content;
pub mod core;
pub mod persistence;
pub mod session;
pub mod tick;
pub mod world;
