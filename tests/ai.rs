//! AI policy and autoplay tests
//!
//! The policies are checked against many randomly stocked fighters; the
//! autoplay path is driven end to end through a session.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tidebound::ai::{choose_action, choose_monster_action, run_batch, Actor, AiAction};
use tidebound::combat::{Combatant, CombatContext, DamageType, FightOutcome, FightVariant, Skill};
use tidebound::content::{ContentGenerator, StandardContent};
use tidebound::core::EngineConfig;
use tidebound::session::{Engine, GameCommand};
use tidebound::world::{Character, Item, PotionSize};

fn random_skill<R: Rng>(rng: &mut R, i: usize) -> Skill {
    Skill {
        name: format!("Skill {}", i),
        mana_cost: rng.gen_range(0..30),
        stamina_cost: rng.gen_range(0..30),
        damage: rng.gen_range(-20..30),
        damage_type: DamageType::Physical,
        effect: None,
        description: String::new(),
    }
}

#[test]
fn test_policies_never_pick_unaffordable_skills() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let config = EngineConfig::default();
    let target = Combatant::new("Dummy", 1, 10, 0, 0, 1);

    for round in 0..500 {
        let mut fighter = Combatant::new("Subject", 3, 50, 20, 20, 1);
        fighter.skills = (0..4).map(|i| random_skill(&mut rng, i)).collect();
        fighter.hp.current = rng.gen_range(1..=50);
        fighter.mana.current = rng.gen_range(0..=20);
        fighter.stamina.current = rng.gen_range(0..=20);
        let inventory: Vec<Item> = if round % 2 == 0 {
            vec![Item::health_potion(PotionSize::Small)]
        } else {
            Vec::new()
        };

        let actor = Actor {
            fighter: &fighter,
            inventory: &inventory,
        };
        match choose_action(&mut rng, actor, &target, (round % 4) as u32 + 1, &config) {
            AiAction::CastSkill(index) => assert!(fighter.can_afford(&fighter.skills[index])),
            AiAction::UseItem(index) => assert!(inventory[index].is_consumable()),
            AiAction::Attack => {}
        }
        if let AiAction::CastSkill(index) = choose_monster_action(&mut rng, &fighter, &config) {
            assert!(fighter.can_afford(&fighter.skills[index]));
        }
    }
}

#[test]
fn test_low_hp_without_heals_drinks_a_potion() {
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    let config = EngineConfig::default();
    let mut fighter = Combatant::new("Subject", 3, 100, 0, 0, 1);
    fighter.hp.current = 10;
    let inventory = vec![Item::health_potion(PotionSize::Medium)];
    let actor = Actor {
        fighter: &fighter,
        inventory: &inventory,
    };
    let target = Combatant::new("Dummy", 1, 10, 0, 0, 1);
    assert_eq!(choose_action(&mut rng, actor, &target, 5, &config), AiAction::UseItem(0));
}

#[test]
fn test_seeded_batches_repeat() {
    let content = StandardContent::builtin().unwrap();
    let config = EngineConfig::default();
    let run = |seed: u64| {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut player: Character = content.character(&mut rng, "Twin");
        run_batch(
            &mut rng,
            &mut player,
            20,
            &config,
            |rng, _| Some(CombatContext::new(content.monster(rng, 3, 1), FightVariant::Hunt { remaining: 0 })),
            |_, player, _, outcome| {
                if outcome != FightOutcome::Won {
                    player.resurrect();
                }
                player.refresh();
                0
            },
        )
    };
    assert_eq!(run(5), run(5));
}

#[test]
fn test_autoplay_through_a_session() {
    let config = EngineConfig {
        rng_seed: Some(21),
        ..EngineConfig::default()
    };
    let engine = Engine::in_memory(config).unwrap();
    let id = engine.create_local_session("auto").unwrap();
    engine.process_command(id, GameCommand::init());
    engine.process_command(id, GameCommand::select("n"));
    engine.process_command(id, GameCommand::input("Yara"));

    assert_eq!(engine.process_command(id, GameCommand::select("2")).screen(), "autoplay_location");
    let prompt = engine.process_command(id, GameCommand::select("2"));
    assert_eq!(prompt.screen(), "autoplay_location");
    assert!(prompt.prompt.as_deref().unwrap_or_default().contains("How many fights"));

    let too_many = engine.process_command(id, GameCommand::input("100000"));
    assert_eq!(too_many.kind, tidebound::session::ResponseKind::Error);

    let done = engine.process_command(id, GameCommand::input("5"));
    assert_eq!(done.screen(), "main_menu");
    assert!(done.messages.iter().any(|m| m.text.starts_with("Autoplay finished: 5 fights")));
    let fights = engine
        .inspect(&id, |s| s.character.as_ref().map(|c| c.stats.fights))
        .unwrap();
    assert_eq!(fights, Some(5));
}
