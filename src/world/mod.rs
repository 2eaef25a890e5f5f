//! World entities: characters, monsters, locations, villages and the town

pub mod arena;
pub mod character;
pub mod dungeon;
pub mod item;
pub mod location;
pub mod monster;
pub mod quest;
pub mod snapshot;
pub mod town;
pub mod village;

pub use arena::{rating_change, ArenaEntry};
pub use character::{scaled_xp, xp_to_next_level, Character, CharacterStats};
pub use dungeon::{Dungeon, DungeonRoom, RoomKind};
pub use item::{Equipment, Item, ItemKind, PotionSize};
pub use location::{Location, LocationKind};
pub use monster::{Monster, Rarity};
pub use quest::{Quest, QuestRequirement};
pub use snapshot::{SharedWorld, WorldSnapshot};
pub use town::{AttackLogEntry, InnGuest, Mayor, Town};
pub use village::{Defense, Trap, Village, Villager, VillagerRole};
