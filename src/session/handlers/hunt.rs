//! Hunting: location and count selection, the guard prompt, encounters
//! and the skill-guardian reward

use rand::{Rng, RngCore};
use tracing::debug;

use crate::combat::damage::chance;
use crate::combat::machine::CombatContext;
use crate::combat::variant::FightVariant;
use crate::core::error::{GameError, Result};
use crate::core::types::{GameMessage, MessageCategory};
use crate::session::engine::Engine;
use crate::session::handlers::{menu_for, pick_index, respond, yes_no};
use crate::session::protocol::{GameCommand, GameResponse};
use crate::session::session::{PendingInteraction, Session, UiState};
use crate::world::character::Character;
use crate::world::item::Item;
use crate::world::snapshot::SharedWorld;

pub fn render_location(session: &Session) -> GameResponse {
    let mut response = menu_for(session, UiState::HuntLocation);
    if let Some(character) = &session.character {
        let world = session.world.read();
        for (i, name) in character.known_locations.iter().enumerate() {
            let label = match world.locations.get(name) {
                Some(loc) if loc.is_base() => format!("{} (safe)", name),
                Some(loc) => format!("{} (levels 1-{})", name, loc.level_max),
                None => name.clone(),
            };
            response = response.option((i + 1).to_string(), label);
        }
    }
    response.option("0", "Back").prompt("Where do you want to hunt?")
}

/// Name of the known location picked by `command`, checked against the world
pub(crate) fn pick_location(session: &Session, command: &GameCommand) -> Result<String> {
    let character = session.character()?;
    let index = pick_index(command, character.known_locations.len())?;
    let name = character.known_locations[index].clone();
    let world = session.world.read();
    let location = world
        .locations
        .get(&name)
        .ok_or_else(|| GameError::not_found("location", name.clone()))?;
    if location.is_base() || location.monsters.is_empty() {
        return Err(GameError::InvalidInput(format!("there is nothing to hunt in {}", name)));
    }
    Ok(name)
}

pub fn handle_location(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    if command.is_back() {
        session.go(UiState::MainMenu);
        return Ok(respond(engine, session, Vec::new()));
    }
    let location = pick_location(session, command)?;
    session.ui = UiState::HuntCount;
    session.pending = PendingInteraction::HuntCount { location };
    Ok(respond(engine, session, Vec::new()))
}

pub fn render_count(engine: &Engine, session: &Session) -> GameResponse {
    let response = menu_for(session, UiState::HuntCount).option("0", "Back");
    match &session.pending {
        PendingInteraction::HuntCount { location } => response.prompt(format!(
            "How many fights in {}? (1-{})",
            location,
            engine.config().autoplay_max_fights
        )),
        _ => response,
    }
}

fn pending_location(session: &Session) -> Result<String> {
    match &session.pending {
        PendingInteraction::HuntCount { location }
        | PendingInteraction::GuardPrompt { location, .. }
        | PendingInteraction::AutoplayCount { location } => Ok(location.clone()),
        _ => Err(GameError::InvalidInput("no location selected".into())),
    }
}

/// Parse a fight count between 1 and the batch ceiling
pub(crate) fn parse_count(engine: &Engine, command: &GameCommand) -> Result<u32> {
    let max = engine.config().autoplay_max_fights;
    let value = command.trimmed();
    let count: u32 = value
        .parse()
        .map_err(|_| GameError::InvalidInput(format!("'{}' is not a number", value)))?;
    if count == 0 || count > max {
        return Err(GameError::InvalidInput(format!("choose between 1 and {} fights", max)));
    }
    Ok(count)
}

pub fn handle_count(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    if command.is_back() {
        session.go(UiState::HuntLocation);
        return Ok(respond(engine, session, Vec::new()));
    }
    let location = pending_location(session)?;
    let fights = parse_count(engine, command)?;

    let has_guards = {
        let character = session.character()?;
        let world = session.world.read();
        world
            .villages
            .get(&character.village_name)
            .map(|v| v.active_guards.iter().any(|g| g.is_healthy()))
            .unwrap_or(false)
    };
    if has_guards {
        session.ui = UiState::GuardPrompt;
        session.pending = PendingInteraction::GuardPrompt { location, fights };
        return Ok(respond(engine, session, Vec::new()));
    }
    start_hunt(engine, session, &location, fights - 1, false)
}

pub fn render_guard_prompt(session: &Session) -> GameResponse {
    let guards = session
        .character
        .as_ref()
        .and_then(|c| session.world.read().villages.get(&c.village_name).map(|v| v.active_guards.len()))
        .unwrap_or(0);
    menu_for(session, UiState::GuardPrompt)
        .option("1", "Yes")
        .option("2", "No")
        .option("0", "Back")
        .prompt(format!("Bring your {} guards along?", guards))
}

pub fn handle_guard_prompt(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    if command.is_back() {
        session.go(UiState::MainMenu);
        return Ok(respond(engine, session, Vec::new()));
    }
    let bring = yes_no(command)?;
    let (location, fights) = match &session.pending {
        PendingInteraction::GuardPrompt { location, fights } => (location.clone(), *fights),
        _ => return Err(GameError::InvalidInput("no hunt is being prepared".into())),
    };
    start_hunt(engine, session, &location, fights - 1, bring)
}

/// Roll the next opponent at `location`
///
/// A small chance replaces the roster pick with a skill guardian guarding
/// a skill the player does not know yet.
pub(crate) fn encounter<R: RngCore>(
    engine: &Engine,
    world: &SharedWorld,
    rng: &mut R,
    player: &Character,
    location: &str,
    remaining: u32,
) -> Result<CombatContext> {
    let variant = FightVariant::Hunt { remaining };

    let rarity_max = {
        let snapshot = world.read();
        let loc = snapshot
            .locations
            .get(location)
            .ok_or_else(|| GameError::not_found("location", location))?;
        if loc.monsters.is_empty() {
            return Err(GameError::InvalidInput(format!("there is nothing to hunt in {}", location)));
        }
        loc.rarity_max
    };

    if chance(rng, engine.config().skill_guardian_chance) {
        let unknown: Vec<_> = engine
            .content()
            .learnable_skills()
            .iter()
            .filter(|s| !player.fighter.knows_skill(&s.name))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            let skill = unknown[rng.gen_range(0..unknown.len())].clone();
            let rank = rarity_max.clamp(1, 3);
            let guardian = engine.content().skill_guardian(rng, skill, player.level(), rank);
            debug!(location, guardian = %guardian.name(), "skill guardian encounter");
            return Ok(CombatContext::new(guardian, variant));
        }
    }

    let snapshot = world.read();
    let loc = snapshot
        .locations
        .get(location)
        .ok_or_else(|| GameError::not_found("location", location))?;
    if loc.monsters.is_empty() {
        return Err(GameError::InvalidInput(format!("there is nothing to hunt in {}", location)));
    }
    let index = rng.gen_range(0..loc.monsters.len());
    let mut opponent = loc.monsters[index].clone();
    opponent.refresh();
    Ok(CombatContext::new(opponent, variant).from_location(location))
}

/// Start a hunt fight; `remaining` counts the fights after this one
pub(crate) fn start_hunt(
    engine: &Engine,
    session: &mut Session,
    location: &str,
    remaining: u32,
    with_guards: bool,
) -> Result<GameResponse> {
    let messages = begin_fight(engine, session, location, remaining, with_guards)?;
    Ok(respond(engine, session, messages))
}

/// Set up the next hunt fight on the session and return its opening lines
pub(crate) fn begin_fight(
    engine: &Engine,
    session: &mut Session,
    location: &str,
    remaining: u32,
    with_guards: bool,
) -> Result<Vec<GameMessage>> {
    let Session {
        character, world, rng, ..
    } = &mut *session;
    let player = character
        .as_ref()
        .ok_or_else(|| GameError::not_found("character", "no character selected"))?;
    let mut ctx = encounter(engine, world, rng, player, location, remaining)?;

    let mut messages = Vec::new();
    let foe = &ctx.opponent;
    if foe.is_skill_guardian() {
        messages.push(GameMessage::new(
            format!("{} blocks your path, guarding ancient knowledge!", foe.name()),
            MessageCategory::Narrative,
        ));
    } else {
        messages.push(GameMessage::combat(format!(
            "A {} {} (Level {}) appears!",
            foe.rarity.label(),
            foe.name(),
            foe.level()
        )));
    }

    if with_guards {
        let guards = {
            let mut snapshot = world.write();
            snapshot
                .villages
                .get_mut(&player.village_name)
                .map(|v| std::mem::take(&mut v.active_guards))
                .unwrap_or_default()
        };
        if !guards.is_empty() {
            messages.push(GameMessage::system(format!("{} guards fight at your side.", guards.len())));
            ctx = ctx.with_guards(guards);
        }
    }

    session.combat = Some(ctx);
    session.location = Some(location.to_string());
    session.go(UiState::Combat);
    Ok(messages)
}

/// Put guards borrowed by an unfinished fight back in the village
pub(crate) fn return_guards(session: &mut Session) {
    let Some(ctx) = session.combat.as_mut() else {
        return;
    };
    let guards = ctx.take_guards();
    if guards.is_empty() {
        return;
    }
    let Some(character) = &session.character else {
        return;
    };
    if let Some(village) = session.world.write().villages.get_mut(&character.village_name) {
        village.active_guards.extend(guards);
    }
}

pub fn render_guardian_reward(session: &Session) -> GameResponse {
    let response = menu_for(session, UiState::GuardianReward);
    match &session.pending {
        PendingInteraction::GuardianReward { skill } => response
            .message(GameMessage::new(
                format!("The guardian offers to teach you {}: {}", skill.name, skill.description),
                MessageCategory::Narrative,
            ))
            .option("1", format!("Learn {} now", skill.name))
            .option("2", format!("Take a scroll of {}", skill.name)),
        _ => response,
    }
}

pub fn handle_guardian_reward(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    let learn = match command.trimmed() {
        "1" => true,
        "2" => false,
        other => return Err(GameError::InvalidInput(format!("'{}' is not an option", other))),
    };
    let skill = match &session.pending {
        PendingInteraction::GuardianReward { skill } => skill.clone(),
        _ => return Err(GameError::InvalidInput("no reward is waiting".into())),
    };

    let player = session.character_mut()?;
    let message = if learn {
        let text = format!("You learned {}!", skill.name);
        if !player.fighter.knows_skill(&skill.name) {
            player.fighter.skills.push(skill);
        }
        GameMessage::new(text, MessageCategory::Buff)
    } else {
        let text = format!("You receive a scroll of {}.", skill.name);
        player.inventory.push(Item::skill_scroll(skill));
        GameMessage::new(text, MessageCategory::Loot)
    };

    session.go(UiState::MainMenu);
    let mut messages = vec![message];
    messages.extend(engine.autosave(session));
    Ok(respond(engine, session, messages))
}
