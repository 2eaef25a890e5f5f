//! Items, potions and the equipment slot table

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::combat::combatant::{Skill, StatMod};

/// Number of equipment slots a character, monster or guard has
pub const EQUIPMENT_SLOTS: u8 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "item_type", rename_all = "snake_case")]
pub enum ItemKind {
    Equipment { slot: u8, stats: StatMod },
    Consumable { heal: i32 },
    SkillScroll { skill: Skill, crafting_value: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub rarity: i32,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl Item {
    pub fn equipment(name: impl Into<String>, rarity: i32, slot: u8, stats: StatMod) -> Self {
        Self {
            name: name.into(),
            rarity,
            kind: ItemKind::Equipment { slot, stats },
        }
    }

    pub fn health_potion(size: PotionSize) -> Self {
        Self {
            name: format!("{} Health Potion", size.label()),
            rarity: 1,
            kind: ItemKind::Consumable { heal: size.heal() },
        }
    }

    pub fn skill_scroll(skill: Skill) -> Self {
        let mut crafting_value = 10 + skill.damage + skill.mana_cost + skill.stamina_cost;
        if let Some(effect) = skill.effect {
            crafting_value += effect.potency * effect.duration;
        }
        Self {
            name: format!("{} Scroll", skill.name),
            rarity: 3,
            kind: ItemKind::SkillScroll {
                skill,
                crafting_value,
            },
        }
    }

    /// Combat power used to decide which of two items to wear
    pub fn power(&self) -> i32 {
        match &self.kind {
            ItemKind::Equipment { stats, .. } => stats.power(),
            _ => 0,
        }
    }

    pub fn is_consumable(&self) -> bool {
        matches!(self.kind, ItemKind::Consumable { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PotionSize {
    Small,
    Medium,
    Large,
}

impl PotionSize {
    pub fn heal(self) -> i32 {
        match self {
            PotionSize::Small => 15,
            PotionSize::Medium => 30,
            PotionSize::Large => 50,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PotionSize::Small => "Small",
            PotionSize::Medium => "Medium",
            PotionSize::Large => "Large",
        }
    }

    /// 50% small, 35% medium, 15% large
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.gen_range(0..100) {
            0..=49 => PotionSize::Small,
            50..=84 => PotionSize::Medium,
            _ => PotionSize::Large,
        }
    }
}

/// Worn gear, one item per slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Equipment(BTreeMap<u8, Item>);

impl Equipment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wear `item` if it beats the current occupant of its slot
    ///
    /// Consumables and scrolls go to `inventory`. A displaced item also goes
    /// to `inventory`; a weaker new item is discarded.
    pub fn equip_best(&mut self, item: Item, inventory: &mut Vec<Item>) -> bool {
        let slot = match &item.kind {
            ItemKind::Equipment { slot, .. } => *slot,
            _ => {
                inventory.push(item);
                return false;
            }
        };

        match self.0.get(&slot) {
            Some(current) if current.power() >= item.power() => false,
            Some(_) => {
                if let Some(old) = self.0.insert(slot, item) {
                    inventory.push(old);
                }
                true
            }
            None => {
                self.0.insert(slot, item);
                true
            }
        }
    }

    pub fn stat_mod(&self) -> StatMod {
        self.0.values().fold(StatMod::default(), |acc, item| match &item.kind {
            ItemKind::Equipment { stats, .. } => acc + *stats,
            _ => acc,
        })
    }

    /// Strip every worn item
    pub fn take_all(&mut self) -> Vec<Item> {
        std::mem::take(&mut self.0).into_values().collect()
    }

    /// Strip up to `count` random worn items
    pub fn take_random<R: Rng + ?Sized>(&mut self, rng: &mut R, count: usize) -> Vec<Item> {
        let mut taken = Vec::new();
        for _ in 0..count {
            if self.0.is_empty() {
                break;
            }
            let slots: Vec<u8> = self.0.keys().copied().collect();
            let slot = slots[rng.gen_range(0..slots.len())];
            if let Some(item) = self.0.remove(&slot) {
                taken.push(item);
            }
        }
        taken
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.0.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sword(power: i32) -> Item {
        Item::equipment("Sword", 1, 0, StatMod::new(power, 0, 0))
    }

    #[test]
    fn test_equip_best_keeps_stronger_item() {
        let mut eq = Equipment::new();
        let mut inv = Vec::new();
        assert!(eq.equip_best(sword(3), &mut inv));
        assert!(!eq.equip_best(sword(2), &mut inv));
        assert!(inv.is_empty());
        assert!(eq.equip_best(sword(5), &mut inv));
        assert_eq!(inv.len(), 1);
        assert_eq!(eq.stat_mod().attack_mod, 5);
    }

    #[test]
    fn test_consumables_go_to_inventory() {
        let mut eq = Equipment::new();
        let mut inv = Vec::new();
        eq.equip_best(Item::health_potion(PotionSize::Small), &mut inv);
        assert!(eq.is_empty());
        assert!(inv[0].is_consumable());
    }

    #[test]
    fn test_take_random_is_bounded() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut eq = Equipment::new();
        let mut inv = Vec::new();
        eq.equip_best(Item::equipment("Helm", 1, 1, StatMod::new(0, 2, 0)), &mut inv);
        eq.equip_best(sword(2), &mut inv);
        let taken = eq.take_random(&mut rng, 3);
        assert_eq!(taken.len(), 2);
        assert!(eq.is_empty());
    }

    #[test]
    fn test_potion_sizes() {
        assert_eq!(Item::health_potion(PotionSize::Large).name, "Large Health Potion");
        assert_eq!(PotionSize::Medium.heal(), 30);
    }
}
