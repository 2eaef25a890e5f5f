//! Player villages: villagers, defenses, traps, guards and the stockpile

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::combat::guards::Guard;
use crate::core::error::{GameError, Result};
use crate::core::types::UnixSeconds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VillagerRole {
    Harvester,
    Guard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Villager {
    pub name: String,
    pub role: VillagerRole,
    pub level: i32,
    pub efficiency: i32,
    /// Resource this villager gathers; idle when absent
    #[serde(default)]
    pub harvest_type: Option<String>,
}

impl Villager {
    pub fn harvest_yield(&self) -> i32 {
        self.efficiency + self.level / 2
    }
}

/// A built structure: walls add defense, towers add attack power
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defense {
    pub name: String,
    pub defense: i32,
    pub attack_power: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trap {
    pub name: String,
    pub damage: i32,
    /// Percent chance to trigger per passing monster
    pub trigger_rate: u32,
    /// Waves left before the trap is used up
    pub remaining: i32,
}

/// Crafting tiers unlocked by village level
const CRAFTING_UNLOCKS: [(i32, &str); 5] = [
    (3, "potions"),
    (5, "armor"),
    (7, "weapons"),
    (10, "skill_upgrades"),
    (10, "skill_scrolls"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Village {
    pub name: String,
    pub level: i32,
    #[serde(default)]
    pub experience: i32,
    #[serde(default)]
    pub villagers: Vec<Villager>,
    #[serde(default)]
    pub defenses: Vec<Defense>,
    #[serde(default)]
    pub traps: Vec<Trap>,
    #[serde(default)]
    pub active_guards: Vec<Guard>,
    #[serde(default)]
    pub stockpile: BTreeMap<String, i32>,
    #[serde(default)]
    pub unlocked_crafting: Vec<String>,
    pub defense_level: i32,
    pub last_harvest_time: UnixSeconds,
    pub last_tide_time: UnixSeconds,
    pub tide_interval: i64,
    #[serde(default)]
    pub last_upkeep_time: UnixSeconds,
}

impl Village {
    pub fn new(name: impl Into<String>, now: UnixSeconds, tide_interval: i64) -> Self {
        Self {
            name: name.into(),
            level: 1,
            experience: 0,
            villagers: Vec::new(),
            defenses: Vec::new(),
            traps: Vec::new(),
            active_guards: Vec::new(),
            stockpile: BTreeMap::new(),
            unlocked_crafting: Vec::new(),
            defense_level: 1,
            last_harvest_time: now,
            last_tide_time: now,
            tide_interval,
            last_upkeep_time: now,
        }
    }

    pub fn count_role(&self, role: VillagerRole) -> usize {
        self.villagers.iter().filter(|v| v.role == role).count()
    }

    pub fn has_harvesters(&self) -> bool {
        self.villagers
            .iter()
            .any(|v| v.role == VillagerRole::Harvester && v.harvest_type.is_some())
    }

    pub fn harvest_due(&self, now: UnixSeconds, min_interval: i64) -> bool {
        now - self.last_harvest_time >= min_interval
    }

    /// Collect from every assigned harvester, at most once per interval
    ///
    /// Returns `None` when the interval has not elapsed (or nobody is
    /// harvesting), leaving the village untouched.
    pub fn harvest(&mut self, now: UnixSeconds, min_interval: i64) -> Option<BTreeMap<String, i32>> {
        if !self.harvest_due(now, min_interval) || !self.has_harvesters() {
            return None;
        }

        let mut collected = BTreeMap::new();
        for villager in &self.villagers {
            if villager.role != VillagerRole::Harvester {
                continue;
            }
            if let Some(kind) = &villager.harvest_type {
                *collected.entry(kind.clone()).or_insert(0) += villager.harvest_yield();
            }
        }
        for (kind, amount) in &collected {
            *self.stockpile.entry(kind.clone()).or_insert(0) += amount;
        }
        self.last_harvest_time = now;
        Some(collected)
    }

    pub fn tide_due(&self, now: UnixSeconds) -> bool {
        now - self.last_tide_time >= self.tide_interval
    }

    pub fn add_resource(&mut self, kind: &str, amount: i32) {
        *self.stockpile.entry(kind.to_string()).or_insert(0) += amount;
    }

    pub fn resource(&self, kind: &str) -> i32 {
        self.stockpile.get(kind).copied().unwrap_or(0)
    }

    /// Remove exactly `amount` of a resource or fail untouched
    pub fn spend_resource(&mut self, kind: &str, amount: i32) -> Result<()> {
        let available = self.resource(kind);
        if available < amount {
            return Err(GameError::insufficient(kind, amount as i64, available as i64));
        }
        self.stockpile.insert(kind.to_string(), available - amount);
        Ok(())
    }

    /// Remove up to `amount` of every stockpiled resource
    pub fn drain_all(&mut self, amount: i32) {
        for stock in self.stockpile.values_mut() {
            *stock = (*stock - amount).max(0);
        }
    }

    pub fn total_defense(&self) -> i32 {
        self.defenses.iter().map(|d| d.defense).sum()
    }

    pub fn total_attack(&self) -> i32 {
        self.defenses.iter().map(|d| d.attack_power).sum()
    }

    /// Villager guards plus hired guards
    pub fn guard_count(&self) -> usize {
        self.count_role(VillagerRole::Guard) + self.active_guards.len()
    }

    /// Apply pending level-ups; returns newly unlocked crafting tiers
    pub fn upgrade(&mut self) -> Vec<String> {
        let mut unlocked = Vec::new();
        while self.experience >= self.level * 100 {
            self.experience -= self.level * 100;
            self.level += 1;
            for (level, tier) in CRAFTING_UNLOCKS {
                if self.level >= level && !self.unlocked_crafting.iter().any(|t| t == tier) {
                    self.unlocked_crafting.push(tier.to_string());
                    unlocked.push(tier.to_string());
                }
            }
        }
        unlocked
    }

    /// Remove traps with no uses left
    pub fn remove_spent_traps(&mut self) -> Vec<String> {
        let mut spent = Vec::new();
        self.traps.retain(|t| {
            if t.remaining > 0 {
                true
            } else {
                spent.push(t.name.clone());
                false
            }
        });
        spent
    }
}
