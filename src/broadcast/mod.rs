//! Broadcast/subscription hub for asynchronous pushes

pub mod hub;

pub use hub::{Audience, BroadcastHub, Delivery};
