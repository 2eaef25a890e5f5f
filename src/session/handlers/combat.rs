//! The fight screens: main action menu and the item/skill pickers

use crate::combat::machine::{CombatPhase, Picker, PlayerAction, TurnReport};
use crate::core::error::{GameError, Result};
use crate::session::engine::Engine;
use crate::session::handlers::respond;
use crate::session::outcomes;
use crate::session::protocol::{GameCommand, GameResponse, ResponseKind};
use crate::session::session::{Session, UiState};

fn combat_screen(session: &Session, ui: UiState) -> GameResponse {
    let mut response = GameResponse::new(ResponseKind::Combat, ui.screen());
    if let Some(character) = &session.character {
        response = response.player(character, session.location.as_deref());
    }
    if let Some(ctx) = &session.combat {
        response = response.combat(ctx);
    }
    response
}

pub fn render_action(session: &Session) -> GameResponse {
    let (has_items, has_skills) = session
        .character
        .as_ref()
        .map(|c| (c.first_consumable().is_some(), !c.fighter.skills.is_empty()))
        .unwrap_or((false, false));
    combat_screen(session, UiState::Combat)
        .option("1", "Attack")
        .option("2", "Defend")
        .option_if(has_items, "3", "Use item")
        .option_if(has_skills, "4", "Use skill")
        .option("5", "Flee")
        .option("6", "Auto-battle")
}

pub fn render_items(session: &Session) -> GameResponse {
    let mut response = combat_screen(session, UiState::CombatItemSelect);
    if let Some(character) = &session.character {
        for (n, (_, item)) in character.consumables().enumerate() {
            response = response.option((n + 1).to_string(), item.name.clone());
        }
    }
    response.option("0", "Cancel").prompt("Choose an item")
}

pub fn render_skills(session: &Session) -> GameResponse {
    let mut response = combat_screen(session, UiState::CombatSkillSelect);
    if let Some(character) = &session.character {
        for (i, skill) in character.fighter.skills.iter().enumerate() {
            response = response.option_if(
                character.fighter.can_afford(skill),
                (i + 1).to_string(),
                format!("{} ({} MP, {} SP)", skill.name, skill.mana_cost, skill.stamina_cost),
            );
        }
    }
    response.option("0", "Cancel").prompt("Choose a skill")
}

pub fn handle_action(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    let action = PlayerAction::from_menu(command.trimmed())?;
    apply(engine, session, action)
}

pub fn handle_picker(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    let picker = match session.ui {
        UiState::CombatItemSelect => Picker::Item,
        _ => Picker::Skill,
    };
    let action = PlayerAction::from_picker(picker, command.trimmed(), session.character()?)?;
    apply(engine, session, action)
}

/// Feed one action to the fight and move the session to the matching screen
fn apply(engine: &Engine, session: &mut Session, action: PlayerAction) -> Result<GameResponse> {
    let Session {
        combat,
        character,
        rng,
        ..
    } = &mut *session;
    let ctx = combat
        .as_mut()
        .ok_or_else(|| GameError::InvalidInput("you are not in a fight".into()))?;
    let player = character
        .as_mut()
        .ok_or_else(|| GameError::not_found("character", "no character selected"))?;

    let TurnReport { messages, outcome } = ctx.handle(rng, player, action, engine.config())?;
    let phase = ctx.phase;

    if phase.is_over() {
        return Ok(outcomes::settle(engine, session, outcome, messages));
    }
    session.ui = match phase {
        CombatPhase::AwaitingSelection(Picker::Item) => UiState::CombatItemSelect,
        CombatPhase::AwaitingSelection(Picker::Skill) => UiState::CombatSkillSelect,
        _ => UiState::Combat,
    };
    Ok(respond(engine, session, messages))
}
