//! Property tests for the combat arithmetic

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tidebound::combat::status::{apply_effect, process_status_effects};
use tidebound::combat::{
    flee_chance, resolve_strike, Combatant, DamageType, EffectKind, Pool, Resistance, Resistances, StatusEffect,
    Strike,
};
use tidebound::core::EngineConfig;

fn resistance() -> impl Strategy<Value = Resistance> {
    prop_oneof![
        Just(Resistance::VeryResistant),
        Just(Resistance::Resistant),
        Just(Resistance::Normal),
        Just(Resistance::Weak),
    ]
}

#[derive(Debug, Clone, Copy)]
enum PoolOp {
    Gain(i32),
    Lose(i32),
    Spend(i32),
    SetTotal(i32),
}

fn pool_op() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        (-50..200i32).prop_map(PoolOp::Gain),
        (-50..200i32).prop_map(PoolOp::Lose),
        (0..200i32).prop_map(PoolOp::Spend),
        (-10..300i32).prop_map(PoolOp::SetTotal),
    ]
}

proptest! {
    #[test]
    fn flee_chance_is_clamped_and_monotone(actor in 1..200i32, opponent in 1..200i32) {
        let config = EngineConfig::default();
        let chance = flee_chance(actor, opponent, &config);
        prop_assert!(chance >= config.flee_min_chance);
        prop_assert!(chance <= config.flee_max_chance);
        prop_assert!(flee_chance(actor + 1, opponent, &config) >= chance);
    }

    #[test]
    fn missed_strikes_deal_nothing(
        seed in any::<u64>(),
        rolls in 1..6i32,
        attack_mod in -20..40i32,
        defense_mod in -20..40i32,
        res in resistance(),
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut attacker = Combatant::new("A", 1, 10, 0, 0, rolls);
        attacker.stats_mod.attack_mod = attack_mod;
        let mut defender = Combatant::new("D", 1, 10, 0, 0, rolls);
        defender.stats_mod.defense_mod = defense_mod;
        let resistances = Resistances::default().with(DamageType::Physical, res);

        let result = resolve_strike(&mut rng, &Strike::weapon(&attacker, 10).against(&defender), &resistances);
        prop_assert!(result.damage >= 0);
        if result.attack <= result.defense {
            prop_assert!(!result.landed);
            prop_assert_eq!(result.damage, 0);
        }
    }

    #[test]
    fn pools_stay_within_bounds(start in 0..200i32, ops in prop::collection::vec(pool_op(), 0..40)) {
        let mut pool = Pool::new(start);
        for op in ops {
            match op {
                PoolOp::Gain(n) => { pool.gain(n); }
                PoolOp::Lose(n) => { pool.lose(n); }
                PoolOp::Spend(n) => { pool.spend(n); }
                PoolOp::SetTotal(n) => pool.set_total(n),
            }
            prop_assert!(pool.current >= 0);
            prop_assert!(pool.current <= pool.total);
        }
    }

    #[test]
    fn buffs_are_reversed_on_expiry(
        base_attack in -10..30i32,
        base_defense in -10..30i32,
        potency in 1..20i32,
        duration in 1..6i32,
        defensive in any::<bool>(),
    ) {
        let mut fighter = Combatant::new("B", 1, 30, 0, 0, 1);
        fighter.stats_mod.attack_mod = base_attack;
        fighter.stats_mod.defense_mod = base_defense;
        let kind = if defensive { EffectKind::BuffDefense } else { EffectKind::BuffAttack };

        apply_effect(&mut fighter, StatusEffect::new(kind, potency, duration));
        let (boosted, base) = if defensive {
            (fighter.stats_mod.defense_mod, base_defense)
        } else {
            (fighter.stats_mod.attack_mod, base_attack)
        };
        prop_assert_eq!(boosted, base + potency);

        for _ in 0..duration {
            process_status_effects(&mut fighter);
        }
        prop_assert!(fighter.status_effects.is_empty());
        prop_assert_eq!(fighter.stats_mod.attack_mod, base_attack);
        prop_assert_eq!(fighter.stats_mod.defense_mod, base_defense);
    }
}
