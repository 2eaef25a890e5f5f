//! Action policies for non-interactive combatants
//!
//! `choose_action` drives the player during autoplay and auto-fight.
//! `choose_monster_action` drives every monster. Neither policy ever picks
//! an unaffordable skill or an item that is not in the pack.

use rand::Rng;

use crate::combat::combatant::{Combatant, Skill};
use crate::combat::damage::chance;
use crate::combat::status::EffectKind;
use crate::core::config::EngineConfig;
use crate::world::item::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiAction {
    Attack,
    /// Inventory index of a consumable
    UseItem(usize),
    /// Index into the actor's skill list
    CastSkill(usize),
}

/// The acting side as the policy sees it
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub fighter: &'a Combatant,
    pub inventory: &'a [Item],
}

fn is_healing(skill: &Skill) -> bool {
    skill.is_heal() || matches!(skill.effect, Some(e) if e.kind == EffectKind::Regen)
}

fn is_opening_buff(skill: &Skill) -> bool {
    skill.damage == 0
        && matches!(skill.effect, Some(e) if matches!(e.kind, EffectKind::BuffAttack | EffectKind::BuffDefense))
}

fn first_affordable(fighter: &Combatant, pred: impl Fn(&Skill) -> bool) -> Option<usize> {
    fighter
        .skills
        .iter()
        .position(|s| pred(s) && fighter.can_afford(s))
}

/// Pick the player's action for `turn` (1-based)
///
/// Priorities, first match wins:
/// 1. Below the heal threshold: direct heal skill, then regeneration, then the first consumable
/// 2. Opening turns: an attack or defense buff
/// 3. Coin flip: the first affordable damage skill
/// 4. Basic attack
pub fn choose_action<R: Rng + ?Sized>(
    rng: &mut R,
    actor: Actor<'_>,
    _opponent: &Combatant,
    turn: u32,
    config: &EngineConfig,
) -> AiAction {
    let fighter = actor.fighter;

    if fighter.hp.fraction() < config.ai_heal_threshold {
        if let Some(index) = first_affordable(fighter, Skill::is_heal) {
            return AiAction::CastSkill(index);
        }
        if let Some(index) = first_affordable(fighter, is_healing) {
            return AiAction::CastSkill(index);
        }
        if let Some(index) = actor.inventory.iter().position(Item::is_consumable) {
            return AiAction::UseItem(index);
        }
    }

    if turn <= config.ai_opening_turns {
        if let Some(index) = first_affordable(fighter, is_opening_buff) {
            return AiAction::CastSkill(index);
        }
    }

    if chance(rng, config.ai_offensive_skill_chance) {
        if let Some(index) = first_affordable(fighter, |s| s.damage > 0) {
            return AiAction::CastSkill(index);
        }
    }

    AiAction::Attack
}

/// Pick a monster's action: sometimes a random skill, if it can pay for it
pub fn choose_monster_action<R: Rng + ?Sized>(
    rng: &mut R,
    monster: &Combatant,
    config: &EngineConfig,
) -> AiAction {
    if monster.skills.is_empty() || !chance(rng, config.monster_skill_chance) {
        return AiAction::Attack;
    }
    let index = rng.gen_range(0..monster.skills.len());
    if monster.can_afford(&monster.skills[index]) {
        AiAction::CastSkill(index)
    } else {
        AiAction::Attack
    }
}
