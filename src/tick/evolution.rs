//! Evolution sweep: monsters sharing a location fight each other
//!
//! The winner keeps the loser's gear and experience and may climb a rarity
//! tier; the loser's slot is refilled by the content generator.

use rand::{Rng, RngCore};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::ai::decision::{choose_monster_action, AiAction};
use crate::combat::combatant::Combatant;
use crate::combat::damage::{chance, resolve_strike, Strike};
use crate::combat::status::{apply_effect, is_stunned, process_status_effects};
use crate::content::ContentGenerator;
use crate::core::config::EngineConfig;
use crate::core::types::UnixSeconds;
use crate::session::engine::Engine;
use crate::tick::{for_each_world, SweepReport};
use crate::world::location::Location;
use crate::world::monster::Monster;

/// XP a winner takes per level of the monster it beat
const XP_PER_LOSER_LEVEL: i32 = 100;
/// Ceiling on the rarity-upgrade chance, in percent
const MAX_UPGRADE_CHANCE: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bout {
    pub location: String,
    pub winner: String,
    pub loser: String,
    pub turns: u32,
    pub upgraded: bool,
}

/// One action by `actor` against `target`
fn act<R: Rng + ?Sized>(rng: &mut R, actor: &mut Combatant, target: &mut Combatant, config: &EngineConfig) {
    if is_stunned(actor) {
        return;
    }
    if let AiAction::CastSkill(index) = choose_monster_action(rng, actor, config) {
        let skill = actor.skills[index].clone();
        if actor.pay_for(&skill).is_ok() {
            if skill.is_heal() {
                actor.heal(-skill.damage);
            } else if skill.damage > 0 {
                let result = resolve_strike(rng, &Strike::fixed(skill.damage, skill.damage_type), &target.resistances);
                target.take_damage(result.damage);
            }
            if let Some(effect) = skill.effect {
                if skill.effect_targets_self() {
                    apply_effect(actor, effect);
                } else {
                    apply_effect(target, effect);
                }
            }
            return;
        }
    }
    let strike = Strike::weapon(actor, config.monster_crit_chance).against(target);
    let result = resolve_strike(rng, &strike, &target.resistances);
    target.take_damage(result.damage);
}

/// Fight two monsters to the end or the turn ceiling
///
/// Both start fully restored. At the ceiling the higher HP fraction wins,
/// ties going to `a`. Returns whether `a` won and the turns taken.
pub fn monster_duel<R: Rng + ?Sized>(
    rng: &mut R,
    a: &mut Monster,
    b: &mut Monster,
    config: &EngineConfig,
) -> (bool, u32) {
    a.refresh();
    b.refresh();
    for turn in 1..=config.combat_turn_ceiling {
        process_status_effects(&mut a.fighter);
        process_status_effects(&mut b.fighter);
        if !a.fighter.is_alive() || !b.fighter.is_alive() {
            return (a.fighter.is_alive(), turn);
        }
        act(rng, &mut a.fighter, &mut b.fighter, config);
        if !b.fighter.is_alive() {
            return (true, turn);
        }
        act(rng, &mut b.fighter, &mut a.fighter, config);
        if !a.fighter.is_alive() {
            return (false, turn);
        }
    }
    (a.fighter.hp.fraction() >= b.fighter.hp.fraction(), config.combat_turn_ceiling)
}

/// Run one bout at `location` and refill the loser's slot
pub fn evolve_location<R: RngCore>(
    rng: &mut R,
    content: &dyn ContentGenerator,
    config: &EngineConfig,
    location: &mut Location,
    now: UnixSeconds,
) -> Option<Bout> {
    let count = location.monsters.len();
    if location.is_base() || count < 2 {
        return None;
    }
    let first = rng.gen_range(0..count);
    let mut second = rng.gen_range(0..count - 1);
    if second >= first {
        second += 1;
    }

    let mut a = location.monsters[first].clone();
    let mut b = location.monsters[second].clone();
    let (a_won, turns) = monster_duel(rng, &mut a, &mut b, config);
    let (mut winner, mut loser, winner_slot, loser_slot) = if a_won {
        (a, b, first, second)
    } else {
        (b, a, second, first)
    };

    winner.monster_kills += 1;
    winner.equip_all(loser.equipment.take_all());
    winner.gain_experience(rng, loser.level() * XP_PER_LOSER_LEVEL);
    winner.refresh();
    let upgrade_chance = (winner.monster_kills * 2).min(MAX_UPGRADE_CHANCE);
    let upgraded = chance(rng, upgrade_chance) && winner.upgrade_rarity();

    let bout = Bout {
        location: location.name.clone(),
        winner: winner.name().to_string(),
        loser: loser.name().to_string(),
        turns,
        upgraded,
    };
    location.monsters[winner_slot] = winner;
    let replacement = content.monster(rng, location.level_max, location.rarity_max);
    location.replace_monster(loser_slot, replacement);
    location.last_evolution_time = now;
    Some(bout)
}

pub fn evolution_sweep(engine: &Engine, now: UnixSeconds) -> SweepReport {
    let span = info_span!("evolution_sweep");
    let _guard = span.enter();
    let interval = engine.config().evolution_interval_secs as i64;
    let mut rng = engine.next_rng();

    let report = for_each_world(engine, "evolution", |world, report| {
        let (bouts, locations) = {
            let mut snapshot = world.write();
            let bouts: Vec<Bout> = snapshot
                .locations
                .values_mut()
                .filter(|loc| now - loc.last_evolution_time >= interval)
                .filter_map(|loc| evolve_location(&mut rng, engine.content(), engine.config(), loc, now))
                .collect();
            if bouts.is_empty() {
                return Ok(());
            }
            (bouts, snapshot.locations.clone())
        };

        for bout in &bouts {
            debug!(
                location = %bout.location,
                winner = %bout.winner,
                loser = %bout.loser,
                turns = bout.turns,
                upgraded = bout.upgraded,
                "evolution bout"
            );
        }
        report.touched += bouts.len();
        if let Err(err) = engine.store().save_locations(world.id(), &locations) {
            warn!(world = %world.id(), %err, "failed to save locations");
            report.failures += 1;
        }
        Ok(())
    });

    info!(
        worlds = report.worlds,
        bouts = report.touched,
        failures = report.failures,
        "evolution sweep finished"
    );
    report
}
