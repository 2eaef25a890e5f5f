//! Player characters: progression, inventory and resurrection

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::combatant::Combatant;
use crate::combat::damage::multi_roll;
use crate::combat::status::clear_effects;
use crate::core::error::{GameError, Result};
use crate::world::dungeon::Dungeon;
use crate::world::item::{Equipment, Item, ItemKind};

/// Lifetime counters shown on the character sheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStats {
    pub fights: u32,
    pub monsters_killed: u32,
    pub deaths: u32,
    pub fled: u32,
    pub dungeons_cleared: u32,
    pub pvp_wins: u32,
    pub arena_wins: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub fighter: Combatant,
    #[serde(default)]
    pub experience: i32,
    #[serde(default)]
    pub resurrections: u32,
    #[serde(default)]
    pub gold: i32,
    #[serde(default)]
    pub inventory: Vec<Item>,
    #[serde(default)]
    pub equipment: Equipment,
    #[serde(default)]
    pub known_locations: Vec<String>,
    #[serde(default)]
    pub locked_locations: Vec<String>,
    #[serde(default)]
    pub active_quests: Vec<String>,
    #[serde(default)]
    pub completed_quests: Vec<String>,
    pub village_name: String,
    #[serde(default)]
    pub active_dungeon: Option<Dungeon>,
    #[serde(default)]
    pub stats: CharacterStats,
}

/// Total XP needed to advance past `level`
pub fn xp_to_next_level(level: i32) -> i32 {
    level * (300 + level * 10)
}

/// XP for beating a monster, scaled by the level gap
///
/// Nothing for monsters 10+ levels below the player. Full XP plus 5 per
/// level for monsters at or above the player's level. Linear 90%..10% in
/// between.
pub fn scaled_xp(player_level: i32, monster_level: i32) -> i32 {
    let diff = player_level - monster_level;
    if diff >= 10 {
        return 0;
    }
    let base = monster_level * 10;
    if diff <= 0 {
        return base + (-diff) * 5;
    }
    base * (100 - diff * 10) / 100
}

impl Character {
    pub fn new(fighter: Combatant) -> Self {
        let village_name = format!("{}'s Village", fighter.name);
        Self {
            fighter,
            experience: 0,
            resurrections: 0,
            gold: 0,
            inventory: Vec::new(),
            equipment: Equipment::new(),
            known_locations: Vec::new(),
            locked_locations: Vec::new(),
            active_quests: Vec::new(),
            completed_quests: Vec::new(),
            village_name,
            active_dungeon: None,
            stats: CharacterStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.fighter.name
    }

    pub fn level(&self) -> i32 {
        self.fighter.level
    }

    pub fn recompute(&mut self) {
        self.fighter.recompute_totals(self.equipment.stat_mod());
    }

    /// Wear `item` if it is an upgrade; anything else lands in the pack
    pub fn equip(&mut self, item: Item) -> bool {
        let equipped = self.equipment.equip_best(item, &mut self.inventory);
        self.recompute();
        equipped
    }

    /// Add experience and apply level-ups; returns levels gained
    pub fn gain_experience<R: Rng + ?Sized>(&mut self, rng: &mut R, xp: i32) -> i32 {
        self.experience += xp.max(0);
        let mut gained = 0;
        while self.experience >= xp_to_next_level(self.fighter.level) {
            self.fighter.level += 1;
            self.fighter.hp.natural += multi_roll(rng, 1);
            self.fighter.mana.grow(multi_roll(rng, 1) + 5);
            self.fighter.stamina.grow(multi_roll(rng, 1) + 5);
            self.fighter.attack_rolls = self.fighter.level / 10 + 1;
            self.fighter.defense_rolls = self.fighter.level / 10 + 1;
            gained += 1;
        }
        if gained > 0 {
            self.recompute();
            self.fighter.restore();
        }
        gained
    }

    /// Bring a fallen character back with full pools and no effects
    pub fn resurrect(&mut self) {
        clear_effects(&mut self.fighter);
        self.fighter.restore();
        self.resurrections += 1;
        self.stats.deaths += 1;
    }

    /// Full heal without counting a death (arena, rest rooms)
    pub fn refresh(&mut self) {
        clear_effects(&mut self.fighter);
        self.fighter.restore();
    }

    /// Index of the first consumable in the pack
    pub fn first_consumable(&self) -> Option<usize> {
        self.inventory.iter().position(Item::is_consumable)
    }

    pub fn consumables(&self) -> impl Iterator<Item = (usize, &Item)> {
        self.inventory.iter().enumerate().filter(|(_, i)| i.is_consumable())
    }

    /// Use the consumable at `index`; returns HP restored
    pub fn use_item(&mut self, index: usize) -> Result<i32> {
        let heal = match self.inventory.get(index).map(|i| &i.kind) {
            Some(ItemKind::Consumable { heal }) => *heal,
            Some(_) => {
                return Err(GameError::InvalidInput(format!("item {} cannot be used", index)))
            }
            None => return Err(GameError::not_found("item", index.to_string())),
        };
        self.inventory.remove(index);
        Ok(self.fighter.heal(heal))
    }

    /// Move a location from locked to known; false if it was not locked
    pub fn discover_location(&mut self, name: &str) -> bool {
        let Some(pos) = self.locked_locations.iter().position(|l| l == name) else {
            return false;
        };
        let location = self.locked_locations.remove(pos);
        self.known_locations.push(location);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::item::PotionSize;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn hero() -> Character {
        Character::new(Combatant::new("Hero", 1, 20, 25, 25, 1))
    }

    #[test]
    fn test_xp_curve() {
        assert_eq!(xp_to_next_level(1), 310);
        assert_eq!(xp_to_next_level(10), 4000);
    }

    #[test]
    fn test_scaled_xp_bands() {
        assert_eq!(scaled_xp(20, 5), 0);
        assert_eq!(scaled_xp(10, 0), 0);
        assert_eq!(scaled_xp(5, 5), 50);
        assert_eq!(scaled_xp(5, 8), 95);
        assert_eq!(scaled_xp(6, 5), 45);
        assert_eq!(scaled_xp(14, 5), 5);
    }

    #[test]
    fn test_level_up_restores_pools() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut c = hero();
        c.fighter.hp.lose(10);
        let gained = c.gain_experience(&mut rng, 310);
        assert_eq!(gained, 1);
        assert_eq!(c.level(), 2);
        assert_eq!(c.fighter.hp.current, c.fighter.hp.total);
        assert!(c.fighter.mana.total >= 31);
    }

    #[test]
    fn test_use_item_heals_and_consumes() {
        let mut c = hero();
        c.inventory.push(Item::health_potion(PotionSize::Small));
        c.fighter.hp.lose(18);
        let healed = c.use_item(0).unwrap();
        assert_eq!(healed, 15);
        assert!(c.inventory.is_empty());
        assert!(matches!(c.use_item(0), Err(GameError::NotFound { .. })));
    }

    #[test]
    fn test_resurrect_counts_and_restores() {
        let mut c = hero();
        c.fighter.hp.lose(100);
        c.resurrect();
        assert_eq!(c.resurrections, 1);
        assert_eq!(c.fighter.hp.current, 20);
    }

    #[test]
    fn test_discover_location() {
        let mut c = hero();
        c.locked_locations.push("Caves".into());
        assert!(c.discover_location("Caves"));
        assert!(!c.discover_location("Caves"));
        assert_eq!(c.known_locations, vec!["Caves".to_string()]);
    }
}
