//! Command routing: one handler per UI state
//!
//! Handlers validate before they mutate, so an `Err` leaves the session
//! exactly as it was. The error is then shown on top of the re-rendered
//! current screen.

pub mod arena;
pub mod autoplay;
pub mod combat;
pub mod dungeon;
pub mod hunt;
pub mod menu;
pub mod town;
pub mod village;

use tracing::debug;

use crate::core::error::{GameError, Result};
use crate::core::types::GameMessage;
use crate::session::engine::Engine;
use crate::session::protocol::{GameCommand, GameResponse};
use crate::session::session::{Session, UiState};

pub(crate) fn dispatch(engine: &Engine, session: &mut Session, command: &GameCommand) -> GameResponse {
    if command.is_init() {
        return render(engine, session);
    }
    let screen = session.ui.screen();
    match route(engine, session, command) {
        Ok(response) => response,
        Err(err) => {
            debug!(%err, screen, value = %command.value, "command rejected");
            err.to_response(Some(render(engine, session)))
        }
    }
}

fn route(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    match session.ui {
        UiState::CharacterSelect => menu::handle_character_select(engine, session, command),
        UiState::CharacterCreate => menu::handle_character_create(engine, session, command),
        UiState::MainMenu => menu::handle_main_menu(engine, session, command),
        UiState::Exit => Err(GameError::InvalidInput("this session has ended".into())),
        UiState::HuntLocation => hunt::handle_location(engine, session, command),
        UiState::HuntCount => hunt::handle_count(engine, session, command),
        UiState::GuardPrompt => hunt::handle_guard_prompt(engine, session, command),
        UiState::GuardianReward => hunt::handle_guardian_reward(engine, session, command),
        UiState::Combat => combat::handle_action(engine, session, command),
        UiState::CombatItemSelect | UiState::CombatSkillSelect => combat::handle_picker(engine, session, command),
        UiState::ArenaMain => arena::handle_main(engine, session, command),
        UiState::ArenaConfirm => arena::handle_confirm(engine, session, command),
        UiState::Inn => town::handle_inn(engine, session, command),
        UiState::MayorChallenge => town::handle_mayor(engine, session, command),
        UiState::DungeonSelect => dungeon::handle_select(engine, session, command),
        UiState::DungeonRoom => dungeon::handle_room(engine, session, command),
        UiState::VillageMain => village::handle_main(engine, session, command),
        UiState::VillageTideWave => village::handle_tide_wave(engine, session, command),
        UiState::AutoPlayLocation => autoplay::handle(engine, session, command),
    }
}

/// The current screen, with no side effects
pub(crate) fn render(engine: &Engine, session: &Session) -> GameResponse {
    match session.ui {
        UiState::CharacterSelect => menu::render_character_select(engine, session),
        UiState::CharacterCreate => menu::render_character_create(session),
        UiState::MainMenu => menu::render_main_menu(session),
        UiState::Exit => menu::render_exit(),
        UiState::HuntLocation => hunt::render_location(session),
        UiState::HuntCount => hunt::render_count(engine, session),
        UiState::GuardPrompt => hunt::render_guard_prompt(session),
        UiState::GuardianReward => hunt::render_guardian_reward(session),
        UiState::Combat => combat::render_action(session),
        UiState::CombatItemSelect => combat::render_items(session),
        UiState::CombatSkillSelect => combat::render_skills(session),
        UiState::ArenaMain => arena::render_main(engine, session),
        UiState::ArenaConfirm => arena::render_confirm(engine, session),
        UiState::Inn => town::render_inn(engine, session),
        UiState::MayorChallenge => town::render_mayor(engine, session),
        UiState::DungeonSelect => dungeon::render_select(session),
        UiState::DungeonRoom => dungeon::render_room(session),
        UiState::VillageMain => village::render_main(session),
        UiState::VillageTideWave => village::render_tide_wave(session),
        UiState::AutoPlayLocation => autoplay::render(engine, session),
    }
}

/// Render the current screen with `messages` shown first
pub(crate) fn respond(engine: &Engine, session: &Session, messages: Vec<GameMessage>) -> GameResponse {
    let mut response = render(engine, session);
    response.messages.splice(0..0, messages);
    response
}

/// A menu for `ui` with the player panel filled in
pub(crate) fn menu_for(session: &Session, ui: UiState) -> GameResponse {
    let response = GameResponse::menu(ui.screen());
    match &session.character {
        Some(character) => response.player(character, session.location.as_deref()),
        None => response,
    }
}

/// Parse a 1-based menu pick against a list of `len` entries
pub(crate) fn pick_index(command: &GameCommand, len: usize) -> Result<usize> {
    let value = command.trimmed();
    let choice: usize = value
        .parse()
        .map_err(|_| GameError::InvalidInput(format!("'{}' is not a valid choice", value)))?;
    if choice == 0 || choice > len {
        return Err(GameError::InvalidInput(format!("choose between 1 and {}", len)));
    }
    Ok(choice - 1)
}

/// Parse a yes/no answer
pub(crate) fn yes_no(command: &GameCommand) -> Result<bool> {
    match command.trimmed().to_ascii_lowercase().as_str() {
        "1" | "y" | "yes" => Ok(true),
        "2" | "n" | "no" => Ok(false),
        other => Err(GameError::InvalidInput(format!("'{}' is not yes or no", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_index_bounds() {
        assert_eq!(pick_index(&GameCommand::select("1"), 3).unwrap(), 0);
        assert_eq!(pick_index(&GameCommand::select(" 3 "), 3).unwrap(), 2);
        assert!(pick_index(&GameCommand::select("4"), 3).is_err());
        assert!(pick_index(&GameCommand::select("0"), 3).is_err());
        assert!(pick_index(&GameCommand::select("abc"), 3).is_err());
    }

    #[test]
    fn test_yes_no() {
        assert!(yes_no(&GameCommand::select("Y")).unwrap());
        assert!(!yes_no(&GameCommand::select("2")).unwrap());
        assert!(yes_no(&GameCommand::select("maybe")).is_err());
    }
}
