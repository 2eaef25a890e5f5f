//! Content generation collaborator
//!
//! The engine never builds combatants by hand. Characters, monsters, items,
//! guards, dungeons and fresh worlds all come from a `ContentGenerator`,
//! which the engine treats as a set of pure functions over its RNG.

pub mod standard;

use rand::RngCore;

use crate::combat::combatant::Skill;
use crate::combat::guards::Guard;
use crate::core::types::UnixSeconds;
use crate::world::character::Character;
use crate::world::dungeon::Dungeon;
use crate::world::item::Item;
use crate::world::monster::Monster;
use crate::world::snapshot::WorldSnapshot;
use crate::world::town::{InnGuest, Town};
use crate::world::village::{Villager, VillagerRole};

pub use standard::StandardContent;

/// Template generators invoked at fight setup and sweep time
pub trait ContentGenerator: Send + Sync {
    /// A level-1 character with the starter skill and starting locations
    fn character(&self, rng: &mut dyn RngCore, name: &str) -> Character;

    /// A random monster within a location's caps
    fn monster(&self, rng: &mut dyn RngCore, level_max: i32, rank_max: i32) -> Monster;

    /// A specific monster type at an exact level and rank
    fn named_monster(&self, rng: &mut dyn RngCore, name: &str, level: i32, rank: i32) -> Monster;

    /// A reinforced monster that teaches `skill` when beaten
    fn skill_guardian(&self, rng: &mut dyn RngCore, skill: Skill, level: i32, rank: i32) -> Monster;

    /// Every skill a player can learn, starter first
    fn learnable_skills(&self) -> &[Skill];

    fn item(&self, rng: &mut dyn RngCore, rarity: i32) -> Item;

    fn guard(&self, rng: &mut dyn RngCore, level: i32) -> Guard;

    fn villager(&self, rng: &mut dyn RngCore, role: VillagerRole) -> Villager;

    /// Crafting material dropped by a beaten monster, if any
    fn material_drop(&self, rng: &mut dyn RngCore, monster_type: &str) -> Option<String>;

    fn dungeon(&self, rng: &mut dyn RngCore, player_level: i32) -> Dungeon;

    fn inn_guest(&self, rng: &mut dyn RngCore, level: i32, now: UnixSeconds) -> InnGuest;

    fn town(&self, rng: &mut dyn RngCore, name: &str, now: UnixSeconds) -> Town;

    /// Locations with full rosters plus the quest catalog for a new world
    fn world(&self, rng: &mut dyn RngCore) -> WorldSnapshot;
}
