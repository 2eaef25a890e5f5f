//! Status effect resolution
//!
//! Effects are ticked once per combat turn for each combatant. Buff
//! contributions are added when the effect is applied and subtracted
//! exactly once when it expires, so a buff never leaves stat drift behind.
//! `process_status_effects` is the only place durations change.

use serde::{Deserialize, Serialize};

use crate::combat::combatant::Combatant;
use crate::core::types::{GameMessage, MessageCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Poison,
    Burn,
    Regen,
    Stun,
    BuffAttack,
    BuffDefense,
}

impl EffectKind {
    /// Buffs and heal-over-time land on the caster; everything else on the target
    pub fn is_beneficial(self) -> bool {
        matches!(self, EffectKind::Regen | EffectKind::BuffAttack | EffectKind::BuffDefense)
    }

    pub fn label(self) -> &'static str {
        match self {
            EffectKind::Poison => "poison",
            EffectKind::Burn => "burn",
            EffectKind::Regen => "regen",
            EffectKind::Stun => "stun",
            EffectKind::BuffAttack => "buff_attack",
            EffectKind::BuffDefense => "buff_defense",
        }
    }
}

/// A timed modifier attached to a combatant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: EffectKind,
    pub potency: i32,
    /// Remaining turns
    pub duration: i32,
}

impl StatusEffect {
    pub fn new(kind: EffectKind, potency: i32, duration: i32) -> Self {
        Self {
            kind,
            potency,
            duration,
        }
    }
}

/// What one effect did during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectEvent {
    Damaged { kind: EffectKind, amount: i32 },
    Healed { amount: i32 },
    Expired { kind: EffectKind },
}

impl EffectEvent {
    pub fn describe(&self, owner: &str) -> GameMessage {
        match self {
            EffectEvent::Damaged { kind, amount } => GameMessage::new(
                format!("{} takes {} {} damage!", owner, amount, kind.label()),
                MessageCategory::Damage,
            ),
            EffectEvent::Healed { amount } => GameMessage::new(
                format!("{} regenerates {} HP.", owner, amount),
                MessageCategory::Heal,
            ),
            EffectEvent::Expired { kind } => GameMessage::new(
                format!("{}'s {} wore off.", owner, kind.label()),
                MessageCategory::System,
            ),
        }
    }
}

/// Attach an effect, granting any buff contribution immediately
pub fn apply_effect(target: &mut Combatant, effect: StatusEffect) {
    match effect.kind {
        EffectKind::BuffAttack => target.stats_mod.attack_mod += effect.potency,
        EffectKind::BuffDefense => target.stats_mod.defense_mod += effect.potency,
        _ => {}
    }
    target.status_effects.push(effect);
}

/// Tick every active effect once, in insertion order
///
/// Damage-over-time cannot push HP below zero and regeneration cannot
/// push it above the total. Expired effects are dropped in the same pass.
pub fn process_status_effects(target: &mut Combatant) -> Vec<EffectEvent> {
    let mut effects = std::mem::take(&mut target.status_effects);
    let mut events = Vec::new();

    effects.retain_mut(|effect| {
        match effect.kind {
            EffectKind::Poison | EffectKind::Burn => {
                let amount = target.hp.lose(effect.potency);
                events.push(EffectEvent::Damaged {
                    kind: effect.kind,
                    amount,
                });
            }
            EffectKind::Regen => {
                let amount = target.hp.gain(effect.potency);
                events.push(EffectEvent::Healed { amount });
            }
            EffectKind::Stun | EffectKind::BuffAttack | EffectKind::BuffDefense => {}
        }

        effect.duration -= 1;
        if effect.duration > 0 {
            return true;
        }

        match effect.kind {
            EffectKind::BuffAttack => target.stats_mod.attack_mod -= effect.potency,
            EffectKind::BuffDefense => target.stats_mod.defense_mod -= effect.potency,
            _ => {}
        }
        events.push(EffectEvent::Expired { kind: effect.kind });
        false
    });

    target.status_effects = effects;
    events
}

pub fn is_stunned(target: &Combatant) -> bool {
    target
        .status_effects
        .iter()
        .any(|e| e.kind == EffectKind::Stun)
}

/// Drop every effect, reversing buff contributions
pub fn clear_effects(target: &mut Combatant) {
    for effect in std::mem::take(&mut target.status_effects) {
        match effect.kind {
            EffectKind::BuffAttack => target.stats_mod.attack_mod -= effect.potency,
            EffectKind::BuffDefense => target.stats_mod.defense_mod -= effect.potency,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy(hp: i32) -> Combatant {
        Combatant::new("Dummy", 1, hp, 10, 10, 1)
    }

    #[test]
    fn test_poison_runs_exactly_its_duration() {
        let mut c = dummy(20);
        apply_effect(&mut c, StatusEffect::new(EffectKind::Poison, 5, 3));

        process_status_effects(&mut c);
        process_status_effects(&mut c);
        assert_eq!(c.status_effects.len(), 1);
        process_status_effects(&mut c);

        assert_eq!(c.hp.current, 5);
        assert!(c.status_effects.is_empty());

        // Fourth tick: nothing left to do
        let events = process_status_effects(&mut c);
        assert!(events.is_empty());
        assert_eq!(c.hp.current, 5);
    }

    #[test]
    fn test_regen_clamped_to_total() {
        let mut c = dummy(20);
        c.hp.lose(3);
        apply_effect(&mut c, StatusEffect::new(EffectKind::Regen, 10, 2));
        let events = process_status_effects(&mut c);
        assert_eq!(c.hp.current, 20);
        assert_eq!(events[0], EffectEvent::Healed { amount: 3 });
    }

    #[test]
    fn test_buff_round_trip() {
        let mut c = dummy(20);
        c.stats_mod.attack_mod = 3;
        apply_effect(&mut c, StatusEffect::new(EffectKind::BuffAttack, 5, 2));
        assert_eq!(c.stats_mod.attack_mod, 8);

        process_status_effects(&mut c);
        assert_eq!(c.stats_mod.attack_mod, 8);
        process_status_effects(&mut c);
        assert_eq!(c.stats_mod.attack_mod, 3);
        assert!(c.status_effects.is_empty());
    }

    #[test]
    fn test_mixed_expiry_does_not_skip_neighbours() {
        let mut c = dummy(40);
        apply_effect(&mut c, StatusEffect::new(EffectKind::Burn, 2, 1));
        apply_effect(&mut c, StatusEffect::new(EffectKind::Poison, 3, 2));
        apply_effect(&mut c, StatusEffect::new(EffectKind::Stun, 0, 1));

        let events = process_status_effects(&mut c);
        assert_eq!(c.hp.current, 35);
        assert_eq!(c.status_effects.len(), 1);
        assert_eq!(c.status_effects[0].kind, EffectKind::Poison);
        assert_eq!(
            events.iter().filter(|e| matches!(e, EffectEvent::Expired { .. })).count(),
            2
        );
    }

    #[test]
    fn test_damage_over_time_never_negative() {
        let mut c = dummy(4);
        apply_effect(&mut c, StatusEffect::new(EffectKind::Poison, 10, 2));
        process_status_effects(&mut c);
        assert_eq!(c.hp.current, 0);
    }

    #[test]
    fn test_stun_detection_and_clear() {
        let mut c = dummy(10);
        apply_effect(&mut c, StatusEffect::new(EffectKind::Stun, 0, 2));
        apply_effect(&mut c, StatusEffect::new(EffectKind::BuffDefense, 4, 5));
        assert!(is_stunned(&c));
        assert_eq!(c.stats_mod.defense_mod, 4);

        clear_effects(&mut c);
        assert!(!is_stunned(&c));
        assert_eq!(c.stats_mod.defense_mod, 0);
    }
}
