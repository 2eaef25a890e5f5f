//! The shared town: inn guests for PvP, the mayor and the attack log

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::combat::combatant::Combatant;
use crate::combat::guards::Guard;
use crate::combat::status::clear_effects;
use crate::core::types::{AccountId, UnixSeconds};
use crate::world::character::Character;
use crate::world::item::Equipment;
use crate::world::monster::Monster;

/// Maximum attack log entries to keep
const MAX_LOG_ENTRIES: usize = 50;

/// Snapshot of a sleeping player (or an NPC lodger) that can be raided
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnGuest {
    /// `None` for NPC guests
    pub account: Option<AccountId>,
    pub fighter: Combatant,
    pub check_in_time: UnixSeconds,
    #[serde(default)]
    pub gold_carried: i32,
    #[serde(default)]
    pub equipment: Equipment,
}

impl InnGuest {
    pub fn from_character(character: &Character, account: Option<AccountId>, now: UnixSeconds) -> Self {
        let mut fighter = character.fighter.clone();
        clear_effects(&mut fighter);
        fighter.restore();
        Self {
            account,
            fighter,
            check_in_time: now,
            gold_carried: character.gold,
            equipment: character.equipment.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.fighter.name
    }

    pub fn is_npc(&self) -> bool {
        self.account.is_none()
    }

    /// Opponent used for a PvP raid
    pub fn to_monster(&self) -> Monster {
        let mut mob = Monster::new(self.fighter.clone(), "Adventurer", self.fighter.level / 3 + 1);
        mob.equipment = self.equipment.clone();
        mob.fighter.restore();
        mob
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mayor {
    /// `None` while an NPC holds the office
    pub account: Option<AccountId>,
    pub fighter: Combatant,
    #[serde(default)]
    pub equipment: Equipment,
    #[serde(default)]
    pub guards: Vec<Guard>,
    #[serde(default)]
    pub monsters: Vec<Monster>,
}

impl Mayor {
    pub fn from_character(character: &Character, account: Option<AccountId>) -> Self {
        let mut fighter = character.fighter.clone();
        clear_effects(&mut fighter);
        fighter.restore();
        Self {
            account,
            fighter,
            equipment: character.equipment.clone(),
            guards: Vec::new(),
            monsters: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.fighter.name
    }

    pub fn to_monster(&self) -> Monster {
        let mut mob = Monster::new(self.fighter.clone(), "Mayor", self.fighter.level / 3 + 1);
        mob.equipment = self.equipment.clone();
        mob.is_boss = true;
        mob.fighter.restore();
        mob
    }
}

/// A guard fought as an opponent (mayor duel, first phase)
pub fn guard_as_monster(guard: &Guard) -> Monster {
    let mut fighter = guard.fighter.clone();
    fighter.stats_mod.attack_mod += guard.attack_bonus;
    fighter.stats_mod.defense_mod += guard.defense_bonus;
    fighter.restore();
    let mut mob = Monster::new(fighter, "Guard", guard.fighter.level / 5 + 1);
    mob.equipment = guard.equipment.clone();
    mob
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackLogEntry {
    pub attacker: String,
    pub defender: String,
    pub attacker_won: bool,
    pub details: String,
    pub time: UnixSeconds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Town {
    pub name: String,
    #[serde(default)]
    pub inn_guests: Vec<InnGuest>,
    #[serde(default)]
    pub mayor: Option<Mayor>,
    #[serde(default)]
    pub treasury: i32,
    #[serde(default)]
    pub attack_log: VecDeque<AttackLogEntry>,
}

impl Town {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inn_guests: Vec::new(),
            mayor: None,
            treasury: 0,
            attack_log: VecDeque::with_capacity(MAX_LOG_ENTRIES),
        }
    }

    pub fn log_attack(&mut self, entry: AttackLogEntry) {
        if self.attack_log.len() >= MAX_LOG_ENTRIES {
            self.attack_log.pop_front();
        }
        self.attack_log.push_back(entry);
    }

    pub fn find_guest(&self, name: &str) -> Option<usize> {
        self.inn_guests.iter().position(|g| g.name() == name)
    }

    pub fn remove_guest(&mut self, name: &str) -> Option<InnGuest> {
        let index = self.find_guest(name)?;
        Some(self.inn_guests.remove(index))
    }

    /// Expel guests who checked in more than `max_age` seconds ago
    pub fn expel_stale_guests(&mut self, now: UnixSeconds, max_age: i64) -> usize {
        let before = self.inn_guests.len();
        self.inn_guests.retain(|g| now - g.check_in_time <= max_age);
        before - self.inn_guests.len()
    }

    pub fn npc_guest_count(&self) -> usize {
        self.inn_guests.iter().filter(|g| g.is_npc()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest(name: &str, time: UnixSeconds) -> InnGuest {
        InnGuest {
            account: None,
            fighter: Combatant::new(name, 3, 20, 10, 10, 1),
            check_in_time: time,
            gold_carried: 12,
            equipment: Equipment::new(),
        }
    }

    #[test]
    fn test_attack_log_is_bounded() {
        let mut town = Town::new("Harbor");
        for i in 0..(MAX_LOG_ENTRIES + 5) {
            town.log_attack(AttackLogEntry {
                attacker: format!("a{}", i),
                defender: "d".into(),
                attacker_won: true,
                details: String::new(),
                time: i as i64,
            });
        }
        assert_eq!(town.attack_log.len(), MAX_LOG_ENTRIES);
        assert_eq!(town.attack_log.front().map(|e| e.attacker.as_str()), Some("a5"));
    }

    #[test]
    fn test_expel_stale_guests() {
        let mut town = Town::new("Harbor");
        town.inn_guests.push(guest("Old", 0));
        town.inn_guests.push(guest("New", 90_000));
        assert_eq!(town.expel_stale_guests(100_000, 86_400), 1);
        assert_eq!(town.inn_guests[0].name(), "New");
    }

    #[test]
    fn test_guest_to_monster_restores() {
        let mut g = guest("Sleepy", 0);
        g.fighter.hp.lose(10);
        let mob = g.to_monster();
        assert_eq!(mob.fighter.hp.current, mob.fighter.hp.total);
        assert_eq!(mob.rank, 2);
    }
}
