//! Hired guards: pooled attacks and damage absorption

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::combatant::Combatant;
use crate::combat::damage::{resolve_strike, Strike};
use crate::core::config::EngineConfig;
use crate::core::types::{GameMessage, MessageCategory};
use crate::world::item::{Equipment, Item};

/// An ally combatant living in a village (or serving a mayor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guard {
    pub fighter: Combatant,
    pub attack_bonus: i32,
    pub defense_bonus: i32,
    pub hire_cost: i32,
    #[serde(default)]
    pub injured: bool,
    #[serde(default)]
    pub recovery_time: i32,
    #[serde(default)]
    pub equipment: Equipment,
    #[serde(default)]
    pub inventory: Vec<Item>,
}

impl Guard {
    pub fn name(&self) -> &str {
        &self.fighter.name
    }

    pub fn is_healthy(&self) -> bool {
        !self.injured && self.fighter.is_alive()
    }

    pub fn recompute(&mut self) {
        self.fighter.recompute_totals(self.equipment.stat_mod());
    }
}

/// Result of all healthy guards attacking once
#[derive(Debug, Clone, Default)]
pub struct GuardVolley {
    pub total: i32,
    pub messages: Vec<GameMessage>,
}

/// Every healthy guard strikes `opponent` once; damage is pooled
pub fn guard_attack<R: Rng + ?Sized>(
    rng: &mut R,
    guards: &[Guard],
    opponent: &mut Combatant,
    config: &EngineConfig,
) -> GuardVolley {
    let mut volley = GuardVolley::default();

    for guard in guards.iter().filter(|g| g.is_healthy()) {
        let strike = Strike::weapon(&guard.fighter, config.guard_crit_chance)
            .with_bonus(guard.attack_bonus)
            .against(opponent);
        let result = resolve_strike(rng, &strike, &opponent.resistances);

        if result.landed {
            let dealt = opponent.take_damage(result.damage);
            volley.total += dealt;
            let crit = if result.critical { " CRITICAL!" } else { "" };
            volley.messages.push(GameMessage::new(
                format!("{} deals {} damage to {}!{}", guard.name(), dealt, opponent.name, crit),
                MessageCategory::Damage,
            ));
        } else {
            volley.messages.push(GameMessage::combat(format!(
                "{}'s attack was blocked by {}.",
                guard.name(),
                opponent.name
            )));
        }

        if !opponent.is_alive() {
            break;
        }
    }

    volley
}

/// How incoming damage was split between guards and the player
#[derive(Debug, Clone, Default)]
pub struct Absorption {
    pub absorbed: i32,
    pub remaining: i32,
    pub messages: Vec<GameMessage>,
}

/// Let healthy guards soak part of `incoming`
///
/// Each healthy guard absorbs a fixed percent, capped overall. The absorbed
/// amount is split evenly with the remainder going to the first guards. A
/// guard pushed to or below the injury threshold is benched for recovery.
pub fn guard_absorb(guards: &mut [Guard], incoming: i32, config: &EngineConfig) -> Absorption {
    let healthy: Vec<usize> = guards
        .iter()
        .enumerate()
        .filter(|(_, g)| g.is_healthy())
        .map(|(i, _)| i)
        .collect();

    if healthy.is_empty() || incoming <= 0 {
        return Absorption {
            absorbed: 0,
            remaining: incoming.max(0),
            messages: Vec::new(),
        };
    }

    let percent = (healthy.len() as i32 * config.guard_absorb_per_guard).min(config.guard_absorb_cap);
    let absorbed = incoming * percent / 100;
    let per_guard = absorbed / healthy.len() as i32;
    let extra = absorbed % healthy.len() as i32;

    let mut messages = Vec::new();
    for (order, &index) in healthy.iter().enumerate() {
        let guard = &mut guards[index];
        let share = per_guard + if (order as i32) < extra { 1 } else { 0 };
        if share <= 0 {
            continue;
        }

        guard.fighter.take_damage(share);
        messages.push(GameMessage::combat(format!("{} absorbs {} damage!", guard.name(), share)));

        let threshold = guard.fighter.hp.total * config.guard_injury_threshold / 100;
        if guard.fighter.hp.current <= threshold {
            guard.injured = true;
            guard.recovery_time = config.guard_recovery_turns;
            messages.push(GameMessage::new(
                format!("{} has been seriously injured and needs recovery!", guard.name()),
                MessageCategory::Debuff,
            ));
        }
    }

    Absorption {
        absorbed,
        remaining: incoming - absorbed,
        messages,
    }
}

/// Advance recovery for injured guards by one step
pub fn process_guard_recovery(guards: &mut [Guard]) -> Vec<GameMessage> {
    let mut messages = Vec::new();
    for guard in guards.iter_mut().filter(|g| g.injured) {
        guard.recovery_time -= 1;
        if guard.recovery_time <= 0 {
            guard.injured = false;
            guard.recovery_time = 0;
            guard.fighter.hp.fill();
            messages.push(GameMessage::new(
                format!("{} has fully recovered and is ready for duty!", guard.name()),
                MessageCategory::Heal,
            ));
        }
    }
    messages
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    pub(crate) fn test_guard(name: &str, hp: i32) -> Guard {
        Guard {
            fighter: Combatant::new(name, 5, hp, 0, 0, 2),
            attack_bonus: 7,
            defense_bonus: 7,
            hire_cost: 175,
            injured: false,
            recovery_time: 0,
            equipment: Equipment::new(),
            inventory: Vec::new(),
        }
    }

    #[test]
    fn test_absorb_twenty_percent_per_guard() {
        let config = EngineConfig::default();
        let mut guards = vec![test_guard("Ada", 100)];
        let result = guard_absorb(&mut guards, 50, &config);
        assert_eq!(result.absorbed, 10);
        assert_eq!(result.remaining, 40);
        assert_eq!(guards[0].fighter.hp.current, 90);
    }

    #[test]
    fn test_absorb_capped_and_split_with_remainder() {
        let config = EngineConfig::default();
        let mut guards: Vec<Guard> = (0..4).map(|i| test_guard(&format!("G{}", i), 100)).collect();
        let result = guard_absorb(&mut guards, 11, &config);
        // 4 guards would be 80%, capped at 60%: 11 * 60 / 100 = 6
        assert_eq!(result.absorbed, 6);
        assert_eq!(result.remaining, 5);
        let hps: Vec<i32> = guards.iter().map(|g| g.fighter.hp.current).collect();
        assert_eq!(hps, vec![98, 98, 99, 99]);
    }

    #[test]
    fn test_injured_guards_do_not_absorb() {
        let config = EngineConfig::default();
        let mut guards = vec![test_guard("Ada", 100)];
        guards[0].injured = true;
        let result = guard_absorb(&mut guards, 50, &config);
        assert_eq!(result.absorbed, 0);
        assert_eq!(result.remaining, 50);
    }

    #[test]
    fn test_guard_injury_and_recovery() {
        let config = EngineConfig::default();
        let mut guards = vec![test_guard("Ada", 10)];
        guard_absorb(&mut guards, 40, &config);
        assert!(guards[0].injured);
        assert_eq!(guards[0].recovery_time, 3);

        process_guard_recovery(&mut guards);
        process_guard_recovery(&mut guards);
        assert!(guards[0].injured);
        let msgs = process_guard_recovery(&mut guards);
        assert!(!guards[0].injured);
        assert_eq!(guards[0].fighter.hp.current, 10);
        assert_eq!(msgs.len(), 1);
    }

    #[test]
    fn test_guard_attack_pools_damage() {
        let config = EngineConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let guards = vec![test_guard("Ada", 30), test_guard("Bo", 30)];
        let mut target = Combatant::new("Rat", 1, 500, 0, 0, 0);
        let volley = guard_attack(&mut rng, &guards, &mut target, &config);
        // Unopposed by rolls and +7 bonus: both guards always land
        assert!(volley.total > 0);
        assert_eq!(target.hp.current, 500 - volley.total);
        assert_eq!(volley.messages.len(), 2);
    }
}
