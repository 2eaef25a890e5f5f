//! Persistence collaborator
//!
//! The engine only needs at-least-once durability and read-your-writes
//! within one process. Calls are synchronous from the caller's side.

pub mod memory;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::Result;
use crate::core::types::WorldId;
use crate::world::arena::ArenaEntry;
use crate::world::character::Character;
use crate::world::location::Location;
use crate::world::quest::Quest;
use crate::world::town::Town;
use crate::world::village::Village;

pub use memory::MemoryStore;

/// One row of the global leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub world: WorldId,
    pub character_name: String,
    pub level: i32,
    pub experience: i32,
    pub monsters_killed: u32,
}

impl LeaderboardEntry {
    pub fn from_character(world: &WorldId, character: &Character) -> Self {
        Self {
            world: world.clone(),
            character_name: character.name().to_string(),
            level: character.level(),
            experience: character.experience,
            monsters_killed: character.stats.monsters_killed,
        }
    }
}

pub trait GameStore: Send + Sync {
    /// Every world with saved data
    fn list_worlds(&self) -> Result<Vec<WorldId>>;

    fn list_characters(&self, world: &WorldId) -> Result<Vec<String>>;

    fn load_character(&self, world: &WorldId, name: &str) -> Result<Character>;

    fn save_character(&self, world: &WorldId, character: &Character) -> Result<()>;

    /// `None` when the world has never been saved
    fn load_locations(&self, world: &WorldId) -> Result<Option<BTreeMap<String, Location>>>;

    fn save_locations(&self, world: &WorldId, locations: &BTreeMap<String, Location>) -> Result<()>;

    fn load_quests(&self, world: &WorldId) -> Result<BTreeMap<String, Quest>>;

    fn save_quests(&self, world: &WorldId, quests: &BTreeMap<String, Quest>) -> Result<()>;

    fn load_all_villages(&self, world: &WorldId) -> Result<BTreeMap<String, Village>>;

    fn save_village(&self, world: &WorldId, village: &Village) -> Result<()>;

    /// The shared town; `None` before the first save
    fn load_town(&self) -> Result<Option<Town>>;

    fn save_town(&self, town: &Town) -> Result<()>;

    fn update_leaderboard(&self, entry: LeaderboardEntry) -> Result<()>;

    fn arena_entry(&self, world: &WorldId, name: &str) -> Result<Option<ArenaEntry>>;

    fn upsert_arena_entry(&self, entry: &ArenaEntry) -> Result<()>;

    fn arena_entries(&self) -> Result<Vec<ArenaEntry>>;
}
