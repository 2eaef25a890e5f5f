//! Monsters and their rarity tiers

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::combatant::{Combatant, Skill};
use crate::combat::damage::multi_roll;
use crate::combat::status::clear_effects;
use crate::core::types::MonsterId;
use crate::world::item::{Equipment, Item};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    pub fn next(self) -> Option<Rarity> {
        match self {
            Rarity::Common => Some(Rarity::Uncommon),
            Rarity::Uncommon => Some(Rarity::Rare),
            Rarity::Rare => Some(Rarity::Epic),
            Rarity::Epic => Some(Rarity::Legendary),
            Rarity::Legendary => Some(Rarity::Mythic),
            Rarity::Mythic => None,
        }
    }

    /// HP multiplier relative to a common monster of the same level
    pub fn hp_multiplier(self) -> f64 {
        match self {
            Rarity::Common => 1.0,
            Rarity::Uncommon => 1.2,
            Rarity::Rare => 1.5,
            Rarity::Epic => 2.0,
            Rarity::Legendary => 3.0,
            Rarity::Mythic => 5.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
            Rarity::Mythic => "Mythic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monster {
    #[serde(default)]
    pub id: MonsterId,
    pub fighter: Combatant,
    pub monster_type: String,
    pub rank: i32,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub experience: i32,
    #[serde(default)]
    pub equipment: Equipment,
    #[serde(default)]
    pub inventory: Vec<Item>,
    #[serde(default)]
    pub is_boss: bool,
    /// Skill taught to whoever defeats this guardian
    #[serde(default)]
    pub guarded_skill: Option<Skill>,
    /// Locked location opened when this guardian falls
    #[serde(default)]
    pub unlocks_location: Option<String>,
    #[serde(default)]
    pub monster_kills: u32,
    #[serde(default)]
    pub player_kills: u32,
}

impl Monster {
    pub fn new(fighter: Combatant, monster_type: impl Into<String>, rank: i32) -> Self {
        Self {
            id: MonsterId::new(),
            fighter,
            monster_type: monster_type.into(),
            rank,
            rarity: Rarity::Common,
            experience: 0,
            equipment: Equipment::new(),
            inventory: Vec::new(),
            is_boss: false,
            guarded_skill: None,
            unlocks_location: None,
            monster_kills: 0,
            player_kills: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.fighter.name
    }

    pub fn level(&self) -> i32 {
        self.fighter.level
    }

    pub fn is_skill_guardian(&self) -> bool {
        self.guarded_skill.is_some()
    }

    /// Drop every status effect and refill the pools
    pub fn refresh(&mut self) {
        clear_effects(&mut self.fighter);
        self.fighter.restore();
    }

    pub fn recompute(&mut self) {
        self.fighter.recompute_totals(self.equipment.stat_mod());
    }

    /// Put on looted gear, keeping the best piece per slot
    pub fn equip_all(&mut self, items: Vec<Item>) {
        for item in items {
            self.equipment.equip_best(item, &mut self.inventory);
        }
        self.recompute();
    }

    /// Add experience and apply any level-ups; returns levels gained
    ///
    /// A monster needs `level * 100` XP per level.
    pub fn gain_experience<R: Rng + ?Sized>(&mut self, rng: &mut R, xp: i32) -> i32 {
        self.experience += xp.max(0);
        let mut gained = 0;
        while self.experience >= self.fighter.level * 100 {
            self.experience -= self.fighter.level * 100;
            self.fighter.level += 1;
            self.fighter.hp.natural += multi_roll(rng, 1);
            self.fighter.mana.grow(multi_roll(rng, 1) + 3);
            self.fighter.stamina.grow(multi_roll(rng, 1) + 3);
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

    /// Promote to the next rarity tier, scaling natural HP
    pub fn upgrade_rarity(&mut self) -> bool {
        let Some(next) = self.rarity.next() else {
            return false;
        };
        let ratio = next.hp_multiplier() / self.rarity.hp_multiplier();
        self.fighter.hp.natural = (self.fighter.hp.natural as f64 * ratio).round() as i32;
        self.rarity = next;
        self.recompute();
        self.fighter.hp.fill();
        true
    }
}
