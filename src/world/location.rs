use serde::{Deserialize, Serialize};

use crate::core::types::{MonsterId, UnixSeconds};
use crate::world::monster::Monster;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    /// Safe home location; no monsters evolve here
    Base,
    #[default]
    Wilderness,
}

/// A huntable place with its monster roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub kind: LocationKind,
    pub level_max: i32,
    pub rarity_max: i32,
    #[serde(default)]
    pub monsters: Vec<Monster>,
    #[serde(default)]
    pub last_evolution_time: UnixSeconds,
}

impl Location {
    pub fn is_base(&self) -> bool {
        self.kind == LocationKind::Base
    }

    pub fn monster_mut(&mut self, id: MonsterId) -> Option<&mut Monster> {
        self.monsters.iter_mut().find(|m| m.id == id)
    }

    /// Swap the monster with `id` for a fresh one; false if it is gone
    pub fn replace_by_id(&mut self, id: MonsterId, replacement: Monster) -> bool {
        match self.monsters.iter().position(|m| m.id == id) {
            Some(index) => {
                self.monsters[index] = replacement;
                true
            }
            None => false,
        }
    }

    /// Swap the monster at `index` for a fresh one, keeping roster size
    pub fn replace_monster(&mut self, index: usize, replacement: Monster) {
        match self.monsters.get_mut(index) {
            Some(slot) => *slot = replacement,
            None => self.monsters.push(replacement),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::combatant::Combatant;

    fn mob(name: &str) -> Monster {
        Monster::new(Combatant::new(name, 1, 10, 0, 0, 1), name, 1)
    }

    #[test]
    fn test_replace_by_id_follows_the_monster() {
        let mut location = Location {
            name: "Marsh".into(),
            kind: LocationKind::Wilderness,
            level_max: 3,
            rarity_max: 1,
            monsters: vec![mob("Rat"), mob("Toad")],
            last_evolution_time: 0,
        };
        let toad = location.monsters[1].id;
        location.monsters.swap(0, 1);
        assert!(location.replace_by_id(toad, mob("Newt")));
        assert_eq!(location.monsters[0].name(), "Newt");
        assert_eq!(location.monsters[1].name(), "Rat");
        assert!(!location.replace_by_id(toad, mob("Eel")));
        assert!(location.monster_mut(toad).is_none());
    }
}
