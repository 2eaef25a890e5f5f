//! Combat state machine
//!
//! One algorithm resolves every fight. Each turn runs, in order:
//!
//! 1. Turn counter increments
//! 2. Status effects tick on both sides
//! 3. Death check: a side at zero HP ends the fight before anyone acts
//! 4. A stunned player skips straight to the opponent phase
//! 5. The player's action (attack, defend, item, skill, flee)
//! 6. Guard volley, when guards joined and the opponent still stands
//! 7. The opponent's action, chosen by the monster policy
//! 8. Death check on the player
//!
//! Opening a picker or cancelling out of one never touches the turn counter.
//! The `FightVariant` is carried along for the outcome layer and is never
//! consulted here.

use rand::Rng;
use tracing::debug;

use crate::ai::decision::{choose_action, choose_monster_action, Actor, AiAction};
use crate::combat::combatant::Combatant;
use crate::combat::damage::{resolve_strike, Strike};
use crate::combat::guards::{guard_absorb, guard_attack, Guard};
use crate::combat::status::{apply_effect, is_stunned, process_status_effects};
use crate::combat::variant::FightVariant;
use crate::core::config::EngineConfig;
use crate::core::error::{GameError, Result};
use crate::core::types::{GameMessage, MessageCategory, MonsterId};
use crate::world::character::Character;
use crate::world::monster::Monster;

/// Which sub-menu is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Picker {
    Item,
    Skill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatPhase {
    AwaitingAction,
    AwaitingSelection(Picker),
    Resolving,
    Won,
    Lost,
    Fled,
}

impl CombatPhase {
    pub fn is_over(self) -> bool {
        matches!(self, CombatPhase::Won | CombatPhase::Lost | CombatPhase::Fled)
    }
}

/// A player command inside a fight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Attack,
    Defend,
    OpenItems,
    OpenSkills,
    /// Inventory index of a consumable
    UseItem(usize),
    /// Index into the player's skill list
    CastSkill(usize),
    Flee,
    /// Let the AI play the rest of the fight
    AutoResolve,
    /// Close the open picker
    Cancel,
}

impl PlayerAction {
    /// Parse the main combat menu
    pub fn from_menu(value: &str) -> Result<Self> {
        match value.trim() {
            "1" => Ok(PlayerAction::Attack),
            "2" => Ok(PlayerAction::Defend),
            "3" => Ok(PlayerAction::OpenItems),
            "4" => Ok(PlayerAction::OpenSkills),
            "5" => Ok(PlayerAction::Flee),
            "6" => Ok(PlayerAction::AutoResolve),
            other => Err(GameError::InvalidInput(format!("'{}' is not a combat action", other))),
        }
    }

    /// Parse a picker selection; entries are numbered from 1 and `0` cancels
    ///
    /// Item numbers count consumables only and map back to inventory indices.
    pub fn from_picker(picker: Picker, value: &str, player: &Character) -> Result<Self> {
        let value = value.trim();
        if value == "0" || value.eq_ignore_ascii_case("back") {
            return Ok(PlayerAction::Cancel);
        }
        let choice: usize = value
            .parse()
            .map_err(|_| GameError::InvalidInput(format!("'{}' is not a number", value)))?;
        let out_of_range = || GameError::InvalidInput(format!("no entry {}", choice));

        match picker {
            Picker::Item => player
                .consumables()
                .nth(choice.checked_sub(1).ok_or_else(out_of_range)?)
                .map(|(index, _)| PlayerAction::UseItem(index))
                .ok_or_else(out_of_range),
            Picker::Skill => {
                let index = choice.checked_sub(1).ok_or_else(out_of_range)?;
                if index < player.fighter.skills.len() {
                    Ok(PlayerAction::CastSkill(index))
                } else {
                    Err(out_of_range())
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FightOutcome {
    #[default]
    Ongoing,
    Won,
    Lost,
    Fled,
    /// The turn ceiling was reached with both sides standing
    TimedOut,
}

#[derive(Debug, Clone, Default)]
pub struct TurnReport {
    pub messages: Vec<GameMessage>,
    pub outcome: FightOutcome,
}

impl TurnReport {
    fn ongoing(messages: Vec<GameMessage>) -> Self {
        Self {
            messages,
            outcome: FightOutcome::Ongoing,
        }
    }
}

/// Action that consumes a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnAction {
    Attack,
    Defend,
    UseItem(usize),
    CastSkill(usize),
    Flee,
}

impl From<AiAction> for TurnAction {
    fn from(action: AiAction) -> Self {
        match action {
            AiAction::Attack => TurnAction::Attack,
            AiAction::UseItem(index) => TurnAction::UseItem(index),
            AiAction::CastSkill(index) => TurnAction::CastSkill(index),
        }
    }
}

/// Flee chance in percent for an actor of `actor_level` against `opponent_level`
pub fn flee_chance(actor_level: i32, opponent_level: i32, config: &EngineConfig) -> i32 {
    let raw = config.flee_base_chance + (actor_level - opponent_level) * config.flee_level_step;
    raw.clamp(config.flee_min_chance, config.flee_max_chance)
}

/// Mutable state of one fight
#[derive(Debug, Clone)]
pub struct CombatContext {
    pub turn: u32,
    pub phase: CombatPhase,
    pub opponent: Monster,
    /// Location name and roster id for wild opponents
    pub origin: Option<(String, MonsterId)>,
    pub guards: Vec<Guard>,
    pub guards_joined: bool,
    pub variant: FightVariant,
}

impl CombatContext {
    pub fn new(opponent: Monster, variant: FightVariant) -> Self {
        Self {
            turn: 0,
            phase: CombatPhase::AwaitingAction,
            opponent,
            origin: None,
            guards: Vec::new(),
            guards_joined: false,
            variant,
        }
    }

    pub fn from_location(mut self, location: impl Into<String>) -> Self {
        self.origin = Some((location.into(), self.opponent.id));
        self
    }

    pub fn with_guards(mut self, guards: Vec<Guard>) -> Self {
        self.guards_joined = !guards.is_empty();
        self.guards = guards;
        self
    }

    pub fn is_over(&self) -> bool {
        self.phase.is_over()
    }

    /// Hand the guard roster back, e.g. to write it to the village
    pub fn take_guards(&mut self) -> Vec<Guard> {
        self.guards_joined = false;
        std::mem::take(&mut self.guards)
    }

    /// Apply one player command
    ///
    /// Errors leave the fight exactly as it was: same phase, same turn.
    pub fn handle<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        player: &mut Character,
        action: PlayerAction,
        config: &EngineConfig,
    ) -> Result<TurnReport> {
        if self.is_over() {
            return Err(GameError::InvalidInput("the fight is already over".into()));
        }

        match action {
            PlayerAction::Cancel => {
                self.phase = CombatPhase::AwaitingAction;
                Ok(TurnReport::default())
            }
            PlayerAction::OpenItems => {
                if player.first_consumable().is_none() {
                    return Err(GameError::InvalidInput("You have no usable items!".into()));
                }
                self.phase = CombatPhase::AwaitingSelection(Picker::Item);
                Ok(TurnReport::default())
            }
            PlayerAction::OpenSkills => {
                if player.fighter.skills.is_empty() {
                    return Err(GameError::InvalidInput("You don't know any skills!".into()));
                }
                self.phase = CombatPhase::AwaitingSelection(Picker::Skill);
                Ok(TurnReport::default())
            }
            PlayerAction::UseItem(index) => {
                if !player.inventory.get(index).map(|i| i.is_consumable()).unwrap_or(false) {
                    return Err(GameError::InvalidInput(format!("no usable item at {}", index)));
                }
                self.resolve_turn(rng, player, TurnAction::UseItem(index), config)
            }
            PlayerAction::CastSkill(index) => {
                let skill = player
                    .fighter
                    .skills
                    .get(index)
                    .ok_or_else(|| GameError::InvalidInput(format!("no skill at {}", index)))?;
                if skill.mana_cost > player.fighter.mana.current {
                    return Err(GameError::insufficient(
                        "mana",
                        skill.mana_cost as i64,
                        player.fighter.mana.current as i64,
                    ));
                }
                if skill.stamina_cost > player.fighter.stamina.current {
                    return Err(GameError::insufficient(
                        "stamina",
                        skill.stamina_cost as i64,
                        player.fighter.stamina.current as i64,
                    ));
                }
                self.resolve_turn(rng, player, TurnAction::CastSkill(index), config)
            }
            PlayerAction::Attack => self.resolve_turn(rng, player, TurnAction::Attack, config),
            PlayerAction::Defend => self.resolve_turn(rng, player, TurnAction::Defend, config),
            PlayerAction::Flee => self.resolve_turn(rng, player, TurnAction::Flee, config),
            PlayerAction::AutoResolve => self.auto_resolve(rng, player, config),
        }
    }

    /// Let the AI pick every remaining action until the fight ends
    ///
    /// Always terminates: the turn ceiling ends the fight as `TimedOut`.
    pub fn auto_resolve<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        player: &mut Character,
        config: &EngineConfig,
    ) -> Result<TurnReport> {
        let mut messages = Vec::new();
        while !self.is_over() {
            let actor = Actor {
                fighter: &player.fighter,
                inventory: &player.inventory,
            };
            let action = choose_action(rng, actor, &self.opponent.fighter, self.turn + 1, config);
            let report = self.resolve_turn(rng, player, action.into(), config)?;
            messages.extend(report.messages);
            if report.outcome != FightOutcome::Ongoing {
                return Ok(TurnReport {
                    messages,
                    outcome: report.outcome,
                });
            }
        }
        Err(GameError::InvalidInput("the fight is already over".into()))
    }

    fn finish(&mut self, phase: CombatPhase, outcome: FightOutcome, messages: Vec<GameMessage>) -> TurnReport {
        self.phase = phase;
        debug!(turn = self.turn, ?outcome, opponent = %self.opponent.name(), "fight decided");
        TurnReport { messages, outcome }
    }

    fn resolve_turn<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        player: &mut Character,
        action: TurnAction,
        config: &EngineConfig,
    ) -> Result<TurnReport> {
        self.phase = CombatPhase::Resolving;
        self.turn += 1;
        let mut messages = Vec::new();

        for event in process_status_effects(&mut player.fighter) {
            messages.push(event.describe("You"));
        }
        let foe_name = self.opponent.name().to_string();
        for event in process_status_effects(&mut self.opponent.fighter) {
            messages.push(event.describe(&foe_name));
        }

        if !self.opponent.fighter.is_alive() {
            messages.push(victory_message(&foe_name));
            return Ok(self.finish(CombatPhase::Won, FightOutcome::Won, messages));
        }
        if !player.fighter.is_alive() {
            messages.push(defeat_message());
            return Ok(self.finish(CombatPhase::Lost, FightOutcome::Lost, messages));
        }

        let mut defense_multiplier = 1.0;
        let stunned = is_stunned(&player.fighter);
        if stunned {
            messages.push(GameMessage::new("You are stunned and cannot act!", MessageCategory::Debuff));
        } else {
            match action {
                TurnAction::Attack => {
                    self.player_strike(rng, &player.fighter, 1.0, config, &mut messages);
                }
                TurnAction::Defend => {
                    messages.push(GameMessage::combat("You take a defensive stance."));
                    defense_multiplier = config.defend_defense_multiplier;
                    self.player_strike(
                        rng,
                        &player.fighter,
                        config.defend_attack_multiplier,
                        config,
                        &mut messages,
                    );
                }
                TurnAction::UseItem(index) => {
                    let name = player
                        .inventory
                        .get(index)
                        .map(|i| i.name.clone())
                        .unwrap_or_default();
                    let healed = player.use_item(index)?;
                    messages.push(GameMessage::new(
                        format!("You use {} and recover {} HP.", name, healed),
                        MessageCategory::Heal,
                    ));
                }
                TurnAction::CastSkill(index) => {
                    self.player_skill(rng, &mut player.fighter, index, &mut messages)?;
                }
                TurnAction::Flee => {
                    let odds = flee_chance(player.level(), self.opponent.level(), config);
                    if rng.gen_range(0..100) < odds {
                        messages.push(GameMessage::system("You escaped!"));
                        return Ok(self.finish(CombatPhase::Fled, FightOutcome::Fled, messages));
                    }
                    messages.push(GameMessage::combat("You failed to escape!"));
                }
            }

            if !self.opponent.fighter.is_alive() {
                messages.push(victory_message(&foe_name));
                return Ok(self.finish(CombatPhase::Won, FightOutcome::Won, messages));
            }

            if self.guards_joined {
                let volley = guard_attack(rng, &self.guards, &mut self.opponent.fighter, config);
                messages.extend(volley.messages);
                if !self.opponent.fighter.is_alive() {
                    messages.push(victory_message(&foe_name));
                    return Ok(self.finish(CombatPhase::Won, FightOutcome::Won, messages));
                }
            }
        }

        self.opponent_turn(rng, &mut player.fighter, defense_multiplier, config, &mut messages);

        if !player.fighter.is_alive() {
            messages.push(defeat_message());
            return Ok(self.finish(CombatPhase::Lost, FightOutcome::Lost, messages));
        }

        if self.turn >= config.combat_turn_ceiling {
            messages.push(GameMessage::system(format!(
                "The fight drags on for {} turns and both sides withdraw.",
                self.turn
            )));
            return Ok(self.finish(CombatPhase::Lost, FightOutcome::TimedOut, messages));
        }

        self.phase = CombatPhase::AwaitingAction;
        Ok(TurnReport::ongoing(messages))
    }

    fn player_strike<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        attacker: &Combatant,
        attack_multiplier: f64,
        config: &EngineConfig,
        messages: &mut Vec<GameMessage>,
    ) {
        let foe = &mut self.opponent.fighter;
        let strike = Strike::weapon(attacker, config.player_crit_chance)
            .against(foe)
            .scale_attack(attack_multiplier);
        let result = resolve_strike(rng, &strike, &foe.resistances);
        if result.landed {
            let dealt = foe.take_damage(result.damage);
            let crit = if result.critical { " CRITICAL HIT!" } else { "" };
            messages.push(GameMessage::new(
                format!("You deal {} damage to {}!{}", dealt, foe.name, crit),
                MessageCategory::Damage,
            ));
        } else {
            messages.push(GameMessage::combat(format!("Your attack was blocked by {}.", foe.name)));
        }
    }

    fn player_skill<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        caster: &mut Combatant,
        index: usize,
        messages: &mut Vec<GameMessage>,
    ) -> Result<()> {
        let skill = caster
            .skills
            .get(index)
            .cloned()
            .ok_or_else(|| GameError::InvalidInput(format!("no skill at {}", index)))?;
        caster.pay_for(&skill)?;

        let foe = &mut self.opponent.fighter;
        if skill.is_heal() {
            let healed = caster.heal(-skill.damage);
            messages.push(GameMessage::new(
                format!("You cast {} and recover {} HP.", skill.name, healed),
                MessageCategory::Heal,
            ));
        } else if skill.damage > 0 {
            let result = resolve_strike(rng, &Strike::fixed(skill.damage, skill.damage_type), &foe.resistances);
            let dealt = foe.take_damage(result.damage);
            messages.push(GameMessage::new(
                format!("You cast {} on {} for {} damage!", skill.name, foe.name, dealt),
                MessageCategory::Damage,
            ));
        } else {
            messages.push(GameMessage::combat(format!("You use {}.", skill.name)));
        }

        if let Some(effect) = skill.effect {
            if skill.effect_targets_self() {
                apply_effect(caster, effect);
                messages.push(GameMessage::new(
                    format!("You gain {} for {} turns.", effect.kind.label(), effect.duration),
                    MessageCategory::Buff,
                ));
            } else {
                apply_effect(foe, effect);
                messages.push(GameMessage::new(
                    format!("{} is afflicted with {}!", foe.name, effect.kind.label()),
                    MessageCategory::Debuff,
                ));
            }
        }
        Ok(())
    }

    fn opponent_turn<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        player: &mut Combatant,
        defense_multiplier: f64,
        config: &EngineConfig,
        messages: &mut Vec<GameMessage>,
    ) {
        let Self {
            opponent,
            guards,
            guards_joined,
            ..
        } = self;
        let foe = &mut opponent.fighter;

        if is_stunned(foe) {
            messages.push(GameMessage::new(
                format!("{} is stunned and cannot act!", foe.name),
                MessageCategory::Debuff,
            ));
            return;
        }

        if let AiAction::CastSkill(index) = choose_monster_action(rng, foe, config) {
            let skill = foe.skills[index].clone();
            if foe.pay_for(&skill).is_ok() {
                if skill.is_heal() {
                    let healed = foe.heal(-skill.damage);
                    messages.push(GameMessage::new(
                        format!("{} uses {} and recovers {} HP.", foe.name, skill.name, healed),
                        MessageCategory::Heal,
                    ));
                } else if skill.damage > 0 {
                    let result = resolve_strike(
                        rng,
                        &Strike::fixed(skill.damage, skill.damage_type),
                        &player.resistances,
                    );
                    let taken = shield_player(guards, *guards_joined, result.damage, config, messages);
                    let dealt = player.take_damage(taken);
                    messages.push(GameMessage::new(
                        format!("{} uses {} for {} damage!", foe.name, skill.name, dealt),
                        MessageCategory::Damage,
                    ));
                } else {
                    messages.push(GameMessage::combat(format!("{} uses {}.", foe.name, skill.name)));
                }

                if let Some(effect) = skill.effect {
                    if skill.effect_targets_self() {
                        apply_effect(foe, effect);
                    } else {
                        apply_effect(player, effect);
                        messages.push(GameMessage::new(
                            format!("You are afflicted with {}!", effect.kind.label()),
                            MessageCategory::Debuff,
                        ));
                    }
                }
                return;
            }
        }

        let strike = Strike::weapon(foe, config.monster_crit_chance)
            .against(player)
            .scale_defense(defense_multiplier);
        let result = resolve_strike(rng, &strike, &player.resistances);
        if !result.landed {
            messages.push(GameMessage::combat(format!("You block {}'s attack.", foe.name)));
            return;
        }
        let taken = shield_player(guards, *guards_joined, result.damage, config, messages);
        let dealt = player.take_damage(taken);
        let crit = if result.critical { " CRITICAL HIT!" } else { "" };
        messages.push(GameMessage::new(
            format!("{} deals {} damage to you!{}", foe.name, dealt, crit),
            MessageCategory::Damage,
        ));
    }
}

/// Route incoming damage through participating guards; returns what reaches the player
fn shield_player(
    guards: &mut [Guard],
    joined: bool,
    incoming: i32,
    config: &EngineConfig,
    messages: &mut Vec<GameMessage>,
) -> i32 {
    if !joined {
        return incoming;
    }
    let absorption = guard_absorb(guards, incoming, config);
    messages.extend(absorption.messages);
    absorption.remaining
}

fn victory_message(foe: &str) -> GameMessage {
    GameMessage::system(format!("You defeated {}!", foe))
}

fn defeat_message() -> GameMessage {
    GameMessage::system("You have been defeated!")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::combatant::{DamageType, Skill};
    use crate::combat::guards::tests::test_guard;
    use crate::combat::status::{EffectKind, StatusEffect};
    use crate::world::item::{Item, PotionSize};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn hero(hp: i32) -> Character {
        Character::new(Combatant::new("Hero", 5, hp, 30, 30, 2))
    }

    fn mob(hp: i32, level: i32) -> Monster {
        Monster::new(Combatant::new("Orc", level, hp, 0, 0, 1), "Orc", 1)
    }

    fn hunt(opponent: Monster) -> CombatContext {
        CombatContext::new(opponent, FightVariant::Hunt { remaining: 0 })
    }

    #[test]
    fn test_flee_chance_clamped_and_monotone() {
        let config = EngineConfig::default();
        assert_eq!(flee_chance(1, 20, &config), 20);
        assert_eq!(flee_chance(5, 5, &config), 50);
        assert_eq!(flee_chance(7, 5, &config), 60);
        assert_eq!(flee_chance(40, 1, &config), 90);
    }

    #[test]
    fn test_picker_open_and_cancel_keep_turn() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let config = EngineConfig::default();
        let mut player = hero(30);
        player.inventory.push(Item::health_potion(PotionSize::Small));
        let mut ctx = hunt(mob(30, 5));

        ctx.handle(&mut rng, &mut player, PlayerAction::OpenItems, &config).unwrap();
        assert_eq!(ctx.phase, CombatPhase::AwaitingSelection(Picker::Item));
        ctx.handle(&mut rng, &mut player, PlayerAction::Cancel, &config).unwrap();
        assert_eq!(ctx.phase, CombatPhase::AwaitingAction);
        assert_eq!(ctx.turn, 0);
        assert_eq!(player.inventory.len(), 1);
    }

    #[test]
    fn test_empty_pack_cannot_open_items() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let config = EngineConfig::default();
        let mut player = hero(30);
        let mut ctx = hunt(mob(30, 5));
        let err = ctx.handle(&mut rng, &mut player, PlayerAction::OpenItems, &config).unwrap_err();
        assert!(matches!(err, GameError::InvalidInput(_)));
        assert_eq!(ctx.phase, CombatPhase::AwaitingAction);
    }

    #[test]
    fn test_unaffordable_skill_does_not_advance() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let config = EngineConfig::default();
        let mut player = hero(30);
        player.fighter.skills.push(Skill {
            name: "Meteor".into(),
            mana_cost: 99,
            stamina_cost: 0,
            damage: 50,
            damage_type: DamageType::Fire,
            effect: None,
            description: String::new(),
        });
        let mut ctx = hunt(mob(30, 5));
        let err = ctx
            .handle(&mut rng, &mut player, PlayerAction::CastSkill(0), &config)
            .unwrap_err();
        assert!(matches!(err, GameError::ResourceInsufficient { .. }));
        assert_eq!(ctx.turn, 0);
        assert_eq!(player.fighter.mana.current, 30);
    }

    #[test]
    fn test_effect_death_ends_turn_before_actions() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let config = EngineConfig::default();
        let mut player = hero(30);
        let mut foe = mob(3, 5);
        apply_effect(&mut foe.fighter, StatusEffect::new(EffectKind::Poison, 5, 2));
        let mut ctx = hunt(foe);

        let report = ctx.handle(&mut rng, &mut player, PlayerAction::Attack, &config).unwrap();
        assert_eq!(report.outcome, FightOutcome::Won);
        assert_eq!(ctx.phase, CombatPhase::Won);
        assert_eq!(ctx.turn, 1);
        assert_eq!(player.fighter.hp.current, 30);
    }

    #[test]
    fn test_stunned_player_skips_to_opponent() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let config = EngineConfig::default();
        let mut player = hero(500);
        apply_effect(&mut player.fighter, StatusEffect::new(EffectKind::Stun, 0, 2));
        let mut ctx = hunt(mob(40, 5));

        let report = ctx.handle(&mut rng, &mut player, PlayerAction::Attack, &config).unwrap();
        assert_eq!(report.outcome, FightOutcome::Ongoing);
        assert_eq!(ctx.opponent.fighter.hp.current, 40);
        assert!(report.messages.iter().any(|m| m.text.contains("stunned")));
    }

    #[test]
    fn test_hopeless_attacker_never_scratches_wall() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let config = EngineConfig::default();
        let mut player = Character::new(Combatant::new("Novice", 1, 10_000, 0, 0, 1));
        let mut wall = mob(500, 20);
        wall.fighter.defense_rolls = 4;
        wall.fighter.stats_mod.defense_mod = 20;
        let mut ctx = hunt(wall);

        for _ in 0..50 {
            ctx.handle(&mut rng, &mut player, PlayerAction::Attack, &config).unwrap();
        }
        assert_eq!(ctx.opponent.fighter.hp.current, 500);
    }

    #[test]
    fn test_guards_soak_and_strike() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let config = EngineConfig::default();
        let mut player = hero(10_000);
        let mut foe = mob(10_000, 5);
        foe.fighter.stats_mod.attack_mod = 30;
        let mut ctx = hunt(foe).with_guards(vec![test_guard("Ada", 10_000)]);

        for _ in 0..5 {
            ctx.handle(&mut rng, &mut player, PlayerAction::Attack, &config).unwrap();
        }
        assert!(ctx.guards[0].fighter.hp.current < 10_000);
        let guards = ctx.take_guards();
        assert_eq!(guards.len(), 1);
        assert!(!ctx.guards_joined);
    }

    #[test]
    fn test_auto_resolve_terminates_at_ceiling() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut config = EngineConfig::default();
        config.combat_turn_ceiling = 30;
        // Neither side can hurt the other
        let mut player = Character::new(Combatant::new("Pacifist", 1, 50, 0, 0, 0));
        player.fighter.stats_mod.defense_mod = 100;
        let mut foe = mob(50, 1);
        foe.fighter.attack_rolls = 0;
        foe.fighter.stats_mod.defense_mod = 100;
        let mut ctx = hunt(foe);

        let report = ctx.handle(&mut rng, &mut player, PlayerAction::AutoResolve, &config).unwrap();
        assert_eq!(report.outcome, FightOutcome::TimedOut);
        assert_eq!(ctx.turn, 30);
        assert!(ctx.is_over());
    }

    #[test]
    fn test_auto_resolve_finishes_easy_fight() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let config = EngineConfig::default();
        let mut player = hero(200);
        player.fighter.stats_mod.attack_mod = 10;
        let mut ctx = hunt(mob(20, 1));
        let report = ctx.handle(&mut rng, &mut player, PlayerAction::AutoResolve, &config).unwrap();
        assert_eq!(report.outcome, FightOutcome::Won);
        assert!(ctx
            .handle(&mut rng, &mut player, PlayerAction::Attack, &config)
            .is_err());
    }

    #[test]
    fn test_menu_parsing() {
        assert_eq!(PlayerAction::from_menu("2").unwrap(), PlayerAction::Defend);
        assert!(PlayerAction::from_menu("9").is_err());

        let mut player = hero(30);
        player.inventory.push(Item::equipment("Helm", 1, 2, Default::default()));
        player.inventory.push(Item::health_potion(PotionSize::Large));
        assert_eq!(
            PlayerAction::from_picker(Picker::Item, "1", &player).unwrap(),
            PlayerAction::UseItem(1)
        );
        assert_eq!(
            PlayerAction::from_picker(Picker::Item, "0", &player).unwrap(),
            PlayerAction::Cancel
        );
        assert!(PlayerAction::from_picker(Picker::Skill, "1", &player).is_err());
        assert!(PlayerAction::from_picker(Picker::Item, "x", &player).is_err());
    }
}
