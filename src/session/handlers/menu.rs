//! Character selection, creation, the main menu and exit

use tracing::{info, warn};

use crate::core::error::{GameError, Result};
use crate::core::types::{now_unix, GameMessage, MessageCategory};
use crate::session::engine::Engine;
use crate::session::handlers::{menu_for, pick_index, respond};
use crate::session::protocol::{GameCommand, GameResponse, ResponseKind};
use crate::session::session::{Session, UiState};
use crate::world::arena::ArenaEntry;
use crate::world::character::Character;
use crate::world::village::Village;

const MAX_NAME_LEN: usize = 20;

fn saved_characters(engine: &Engine, session: &Session) -> Result<Vec<String>> {
    engine.store().list_characters(session.world_id())
}

pub fn render_character_select(engine: &Engine, session: &Session) -> GameResponse {
    let mut response = GameResponse::menu(UiState::CharacterSelect.screen());
    match saved_characters(engine, session) {
        Ok(names) => {
            for (i, name) in names.iter().enumerate() {
                response = response.option((i + 1).to_string(), name.clone());
            }
        }
        Err(err) => {
            warn!(%err, "could not list characters");
            response = response.message(err.to_message());
        }
    }
    response
        .option("n", "Create a new character")
        .option("0", "Exit")
        .prompt("Choose a character")
}

pub fn handle_character_select(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    let value = command.trimmed().to_ascii_lowercase();
    if value == "n" || value == "new" {
        session.go(UiState::CharacterCreate);
        return Ok(render_character_create(session));
    }
    if command.is_back() {
        session.go(UiState::Exit);
        return Ok(render_exit());
    }

    let names = saved_characters(engine, session)?;
    let index = pick_index(command, names.len())?;
    let character = engine.store().load_character(session.world_id(), &names[index])?;
    Ok(enter_game(engine, session, character, "Welcome back"))
}

pub fn render_character_create(_session: &Session) -> GameResponse {
    GameResponse::menu(UiState::CharacterCreate.screen())
        .option("0", "Back")
        .prompt("Enter a name for your character")
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(GameError::InvalidInput("name cannot be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(GameError::InvalidInput(format!(
            "name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == ' ' || c == '-') {
        return Err(GameError::InvalidInput(
            "name may only contain letters, digits, spaces and dashes".into(),
        ));
    }
    Ok(())
}

pub fn handle_character_create(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    if command.is_back() {
        session.go(UiState::CharacterSelect);
        return Ok(render_character_select(engine, session));
    }
    let name = command.trimmed();
    validate_name(name)?;
    if saved_characters(engine, session)?
        .iter()
        .any(|existing| existing.eq_ignore_ascii_case(name))
    {
        return Err(GameError::InvalidInput(format!("a character named {} already exists", name)));
    }

    let character = engine.content().character(&mut session.rng, name);
    if let Err(err) = engine.store().save_character(session.world_id(), &character) {
        warn!(%err, "could not save the new character");
    }
    info!(character = %name, world = %session.world_id(), "character created");
    Ok(enter_game(engine, session, character, "Welcome"))
}

/// Attach `character` to the session, wake it from the inn and announce it
fn enter_game(engine: &Engine, session: &mut Session, character: Character, greeting: &str) -> GameResponse {
    let now = now_unix();
    {
        let mut world = session.world.write();
        world
            .villages
            .entry(character.village_name.clone())
            .or_insert_with(|| Village::new(character.village_name.clone(), now, engine.config().tide_interval_secs));
    }
    let woke = engine.town().remove_guest(character.name()).is_some();

    let mut messages = vec![GameMessage::system(format!("{}, {}!", greeting, character.name()))];
    if woke {
        messages.push(GameMessage::new(
            "You wake up and check out of the inn.",
            MessageCategory::Narrative,
        ));
    }

    engine.announce_join(session.id, &character);
    session.character = Some(character);
    session.location = None;
    session.go(UiState::MainMenu);
    respond(engine, session, messages)
}

pub fn render_main_menu(session: &Session) -> GameResponse {
    let mut response = menu_for(session, UiState::MainMenu);
    if let Some(character) = &session.character {
        response = response.message(GameMessage::system(format!(
            "{} - Level {} ({} XP)",
            character.name(),
            character.level(),
            character.experience
        )));
    }
    response
        .option("1", "Hunt")
        .option("2", "Auto-hunt")
        .option("3", "Arena")
        .option("4", "Inn")
        .option("5", "Challenge the mayor")
        .option("6", "Dungeon")
        .option("7", "Village")
        .option("8", "Save")
        .option("0", "Save and exit")
}

pub fn handle_main_menu(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    let next = match command.trimmed() {
        "1" => UiState::HuntLocation,
        "2" => UiState::AutoPlayLocation,
        "3" => {
            ensure_arena_entry(engine, session)?;
            UiState::ArenaMain
        }
        "4" => UiState::Inn,
        "5" => UiState::MayorChallenge,
        "6" => UiState::DungeonSelect,
        "7" => UiState::VillageMain,
        "8" => {
            let message = match engine.autosave(session) {
                Some(warning) => warning,
                None => GameMessage::system("Game saved."),
            };
            return Ok(respond(engine, session, vec![message]));
        }
        "0" | "back" => {
            let warning = engine.autosave(session);
            session.go(UiState::Exit);
            return Ok(render_exit().with_messages(warning));
        }
        other => return Err(GameError::InvalidInput(format!("'{}' is not a menu option", other))),
    };
    session.go(next);
    Ok(respond(engine, session, Vec::new()))
}

fn ensure_arena_entry(engine: &Engine, session: &Session) -> Result<()> {
    let character = session.character()?;
    let world = session.world_id();
    let mut entry = match engine.store().arena_entry(world, character.name())? {
        Some(entry) => entry,
        None => ArenaEntry::register(world.clone(), character, engine.config(), now_unix()),
    };
    entry.refresh_snapshot(character);
    engine.store().upsert_arena_entry(&entry)
}

pub fn render_exit() -> GameResponse {
    GameResponse::new(ResponseKind::Exit, UiState::Exit.screen()).message(GameMessage::system("Farewell, adventurer."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation() {
        assert!(validate_name("Aria").is_ok());
        assert!(validate_name("Sir Lance-a-lot").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("x".repeat(21).as_str()).is_err());
        assert!(validate_name("bad/name").is_err());
    }
}
