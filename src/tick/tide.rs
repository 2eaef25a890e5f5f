//! Monster tides against a village
//!
//! One resolver serves both the interactive wave-by-wave defense and the
//! automatic sweep. Each monster passes four phases in order: traps,
//! towers, guards, then breaches the walls with whatever HP it has left.

use rand::{Rng, RngCore};
use serde::Serialize;

use tracing::{info, info_span};

use crate::broadcast::Audience;
use crate::content::ContentGenerator;
use crate::core::types::{GameMessage, MessageCategory, UnixSeconds};
use crate::session::engine::Engine;
use crate::session::protocol::GameResponse;
use crate::tick::{for_each_world, save_villages, SweepReport};
use crate::world::village::Village;

/// Running totals across the waves of one tide
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TideTally {
    pub monsters: u32,
    pub monsters_killed: u32,
    pub damage_dealt: i32,
    pub damage_taken: i32,
    pub traps_triggered: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TideOutcome {
    pub victory: bool,
    pub village_xp: i32,
    pub bonus_gold: i32,
    pub resources_lost: i32,
    pub guards_lost: Vec<String>,
    pub unlocked: Vec<String>,
    pub tally: TideTally,
    pub messages: Vec<GameMessage>,
}

pub fn wave_count(village_level: i32) -> u32 {
    (3 + village_level.max(0) / 5) as u32
}

/// Damage ceiling below which the village holds
pub fn damage_threshold(village: &Village) -> i32 {
    village.defense_level * 50
}

fn wave_size<R: Rng + ?Sized>(rng: &mut R, village_level: i32) -> u32 {
    (5 + village_level / 3 + rng.gen_range(0..3) - 1).max(1) as u32
}

/// Send one wave at the village, updating traps and the tally
pub fn resolve_wave<R: RngCore>(
    rng: &mut R,
    content: &dyn ContentGenerator,
    village: &mut Village,
    wave: u32,
    waves_total: u32,
    tally: &mut TideTally,
) -> Vec<GameMessage> {
    let size = wave_size(rng, village.level);
    let mut messages = vec![GameMessage::new(
        format!("Wave {}/{}: {} monsters approach {}!", wave, waves_total, size, village.name),
        MessageCategory::Combat,
    )];

    let towers = village.total_attack();
    let guards = village.guard_count() as i32;
    let walls = village.total_defense();
    let (killed_before, taken_before) = (tally.monsters_killed, tally.damage_taken);

    for _ in 0..size {
        let level = (village.level + rng.gen_range(0..5) - 2).max(1);
        let rank = rng.gen_range(1..=3);
        let mut mob = content.monster(rng, level, rank);
        mob.fighter.level = level;
        tally.monsters += 1;

        let mut hp = mob.fighter.hp.current;
        for trap in village.traps.iter().filter(|t| t.remaining > 0) {
            if rng.gen_range(0..100) < trap.trigger_rate {
                hp -= trap.damage;
                tally.traps_triggered += 1;
                tally.damage_dealt += trap.damage;
                if hp <= 0 {
                    break;
                }
            }
        }

        if hp > 0 && towers > 0 {
            let volley = towers + rng.gen_range(0..5);
            hp -= volley;
            tally.damage_dealt += volley;
        }

        if hp > 0 && guards > 0 {
            let volley = guards * (5 + rng.gen_range(0..8));
            hp -= volley;
            tally.damage_dealt += volley;
        }

        if hp > 0 {
            let breach = (mob.fighter.attack_rolls * 6 - walls).max(1);
            tally.damage_taken += breach;
        } else {
            tally.monsters_killed += 1;
        }
    }

    for trap in &mut village.traps {
        trap.remaining -= 1;
    }
    for spent in village.remove_spent_traps() {
        messages.push(GameMessage::system(format!("The {} is used up.", spent)));
    }

    messages.push(GameMessage::combat(format!(
        "Killed {} of {}; the village took {} damage.",
        tally.monsters_killed - killed_before,
        size,
        tally.damage_taken - taken_before
    )));
    messages
}

/// Settle a finished tide: rewards or losses, the timestamp and the upgrade check
pub fn conclude<R: Rng + ?Sized>(
    rng: &mut R,
    village: &mut Village,
    waves_total: u32,
    tally: TideTally,
    now: UnixSeconds,
) -> TideOutcome {
    let threshold = damage_threshold(village);
    let victory = tally.damage_taken < threshold;
    let mut outcome = TideOutcome {
        victory,
        village_xp: 0,
        bonus_gold: 0,
        resources_lost: 0,
        guards_lost: Vec::new(),
        unlocked: Vec::new(),
        tally,
        messages: Vec::new(),
    };

    if victory {
        outcome.village_xp = 100 * waves_total as i32;
        village.experience += outcome.village_xp;
        outcome.messages.push(GameMessage::new(
            format!(
                "{} held against the tide! Killed {} of {} monsters. +{} village XP.",
                village.name, tally.monsters_killed, tally.monsters, outcome.village_xp
            ),
            MessageCategory::Levelup,
        ));
        if tally.damage_taken < threshold / 2 {
            outcome.bonus_gold = 50 + village.level * 10;
            village.add_resource("Gold", outcome.bonus_gold);
            outcome.messages.push(GameMessage::new(
                format!("Flawless defense! {} bonus gold added to the stockpile.", outcome.bonus_gold),
                MessageCategory::Loot,
            ));
        }
    } else {
        outcome.resources_lost = village.level * 5;
        village.drain_all(outcome.resources_lost);
        outcome.messages.push(GameMessage::new(
            format!(
                "The tide overran {}! {} damage taken. Up to {} of each resource was lost.",
                village.name, tally.damage_taken, outcome.resources_lost
            ),
            MessageCategory::Damage,
        ));

        let hired = village.active_guards.len();
        if hired > 0 {
            let losses = rng.gen_range(1..=hired / 2 + 1).min(hired);
            for _ in 0..losses {
                let index = rng.gen_range(0..village.active_guards.len());
                let guard = village.active_guards.remove(index);
                outcome.guards_lost.push(guard.name().to_string());
            }
            outcome.messages.push(GameMessage::new(
                format!("Guards lost: {}", outcome.guards_lost.join(", ")),
                MessageCategory::Damage,
            ));
        }
    }

    village.last_tide_time = now;
    outcome.unlocked = village.upgrade();
    for tier in &outcome.unlocked {
        outcome.messages.push(GameMessage::new(
            format!("{} reached level {}! Unlocked crafting: {}", village.name, village.level, tier),
            MessageCategory::Levelup,
        ));
    }
    outcome
}

/// Resolve a whole tide in one go
pub fn resolve_tide<R: RngCore>(
    rng: &mut R,
    content: &dyn ContentGenerator,
    village: &mut Village,
    now: UnixSeconds,
) -> TideOutcome {
    let waves = wave_count(village.level);
    let mut tally = TideTally::default();
    let mut messages = Vec::new();
    for wave in 1..=waves {
        messages.extend(resolve_wave(rng, content, village, wave, waves, &mut tally));
    }
    let mut outcome = conclude(rng, village, waves, tally, now);
    messages.append(&mut outcome.messages);
    outcome.messages = messages;
    outcome
}

/// Resolve every tide that has come due, one village at a time
///
/// All waves of one village run under a single write lock, so a session
/// reading that village sees it either before or after the whole tide.
pub fn tide_sweep(engine: &Engine, now: UnixSeconds) -> SweepReport {
    let span = info_span!("tide_sweep");
    let _guard = span.enter();
    let mut rng = engine.next_rng();

    let report = for_each_world(engine, "tide", |world, report| {
        let due: Vec<String> = world
            .read()
            .villages
            .values()
            .filter(|v| v.tide_due(now))
            .map(|v| v.name.clone())
            .collect();

        for name in due {
            let resolved = {
                let mut snapshot = world.write();
                match snapshot.villages.get_mut(&name) {
                    // Re-checked under the write lock: a player may have started the tide.
                    Some(village) if village.tide_due(now) => {
                        let outcome = resolve_tide(&mut rng, engine.content(), village, now);
                        Some((village.clone(), outcome))
                    }
                    _ => None,
                }
            };
            let Some((village, outcome)) = resolved else {
                continue;
            };

            report.touched += 1;
            info!(
                village = %village.name,
                victory = outcome.victory,
                killed = outcome.tally.monsters_killed,
                damage = outcome.tally.damage_taken,
                "tide resolved"
            );
            save_villages(engine, world.id(), std::slice::from_ref(&village), report);
            engine.hub().publish(
                Audience::World(world.id().clone()),
                GameResponse::broadcast("tide_resolved", outcome.messages).village(&village),
            );
        }
        Ok(())
    });

    info!(
        worlds = report.worlds,
        villages = report.touched,
        failures = report.failures,
        "tide sweep finished"
    );
    report
}
