//! Combat integration tests
//!
//! Drives whole fights through `CombatContext` the way a session does:
//! picker round trips, flee, timeouts and the status-effect pipeline.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tidebound::combat::{
    flee_chance, resolve_strike, Combatant, CombatContext, CombatPhase, DamageType, EffectKind, FightOutcome,
    FightVariant, PlayerAction, Resistance, Resistances, Skill, StatusEffect, Strike,
};
use tidebound::combat::status::{apply_effect, process_status_effects};
use tidebound::core::EngineConfig;
use tidebound::world::{Character, Monster};

fn hero() -> Character {
    let mut hero = Character::new(Combatant::new("Hero", 5, 120, 40, 40, 3));
    hero.fighter.skills.push(Skill {
        name: "Fireball".into(),
        mana_cost: 10,
        stamina_cost: 0,
        damage: 25,
        damage_type: DamageType::Fire,
        effect: None,
        description: String::new(),
    });
    hero
}

fn slime(hp: i32) -> Monster {
    Monster::new(Combatant::new("Slime", 1, hp, 0, 0, 1), "plant", 1)
}

#[test]
fn test_picker_round_trip_keeps_turn() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let config = EngineConfig::default();
    let mut player = hero();
    let mut ctx = CombatContext::new(slime(500), FightVariant::Hunt { remaining: 0 });

    ctx.handle(&mut rng, &mut player, PlayerAction::OpenSkills, &config).unwrap();
    assert!(matches!(ctx.phase, CombatPhase::AwaitingSelection(_)));
    ctx.handle(&mut rng, &mut player, PlayerAction::Cancel, &config).unwrap();
    assert_eq!(ctx.phase, CombatPhase::AwaitingAction);
    assert_eq!(ctx.turn, 0);

    // No consumables: the item picker refuses to open and nothing changes
    assert!(ctx.handle(&mut rng, &mut player, PlayerAction::OpenItems, &config).is_err());
    assert_eq!(ctx.phase, CombatPhase::AwaitingAction);
    assert_eq!(ctx.turn, 0);
}

#[test]
fn test_skill_without_mana_is_rejected() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let config = EngineConfig::default();
    let mut player = hero();
    player.fighter.mana.current = 3;
    let mut ctx = CombatContext::new(slime(500), FightVariant::Hunt { remaining: 0 });

    let err = ctx
        .handle(&mut rng, &mut player, PlayerAction::CastSkill(0), &config)
        .unwrap_err();
    assert!(err.to_string().contains("mana"));
    assert_eq!(ctx.turn, 0);
    assert_eq!(player.fighter.mana.current, 3);
}

#[test]
fn test_fight_against_weak_opponent_is_won() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let config = EngineConfig::default();
    let mut player = hero();
    player.fighter.stats_mod.attack_mod = 30;
    let mut ctx = CombatContext::new(slime(5), FightVariant::Hunt { remaining: 0 });

    let mut outcome = FightOutcome::Ongoing;
    for _ in 0..10 {
        outcome = ctx.handle(&mut rng, &mut player, PlayerAction::Attack, &config).unwrap().outcome;
        if outcome != FightOutcome::Ongoing {
            break;
        }
    }
    assert_eq!(outcome, FightOutcome::Won);
    assert_eq!(ctx.phase, CombatPhase::Won);
    assert!(ctx.handle(&mut rng, &mut player, PlayerAction::Attack, &config).is_err());
}

#[test]
fn test_auto_resolve_ends_at_turn_ceiling() {
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let config = EngineConfig {
        combat_turn_ceiling: 5,
        ..EngineConfig::default()
    };
    let mut player = Character::new(Combatant::new("Wall", 1, 10_000, 0, 0, 1));
    player.fighter.stats_mod.defense_mod = 1_000;
    let mut wall = slime(10_000);
    wall.fighter.stats_mod.defense_mod = 1_000;
    let mut ctx = CombatContext::new(wall, FightVariant::Hunt { remaining: 0 });

    let report = ctx.auto_resolve(&mut rng, &mut player, &config).unwrap();
    assert_eq!(report.outcome, FightOutcome::TimedOut);
    assert!(ctx.is_over());
    assert!(ctx.turn <= 5);
}

#[test]
fn test_flee_chance_bounds() {
    let config = EngineConfig::default();
    assert_eq!(flee_chance(1, 100, &config), config.flee_min_chance);
    assert_eq!(flee_chance(100, 1, &config), config.flee_max_chance);
    assert_eq!(flee_chance(5, 5, &config), config.flee_base_chance);
}

#[test]
fn test_resistance_scales_fixed_damage() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let resistances = Resistances::default()
        .with(DamageType::Fire, Resistance::VeryResistant)
        .with(DamageType::Ice, Resistance::Weak);

    let fire = resolve_strike(&mut rng, &Strike::fixed(20, DamageType::Fire), &resistances);
    assert_eq!(fire.damage, 5);
    let ice = resolve_strike(&mut rng, &Strike::fixed(20, DamageType::Ice), &resistances);
    assert_eq!(ice.damage, 40);
    let physical = resolve_strike(&mut rng, &Strike::fixed(20, DamageType::Physical), &resistances);
    assert_eq!(physical.damage, 20);
}

#[test]
fn test_poison_ticks_then_expires() {
    let mut target = Combatant::new("Target", 1, 50, 0, 0, 1);
    apply_effect(&mut target, StatusEffect::new(EffectKind::Poison, 4, 2));

    process_status_effects(&mut target);
    assert_eq!(target.hp.current, 46);
    assert_eq!(target.status_effects.len(), 1);
    process_status_effects(&mut target);
    assert_eq!(target.hp.current, 42);
    assert!(target.status_effects.is_empty());
    process_status_effects(&mut target);
    assert_eq!(target.hp.current, 42);
}
