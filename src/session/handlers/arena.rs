//! Arena ladder: opponent list and match confirmation

use crate::combat::machine::CombatContext;
use crate::combat::variant::FightVariant;
use crate::core::error::{GameError, Result};
use crate::core::types::{now_unix, GameMessage};
use crate::session::engine::Engine;
use crate::session::handlers::{menu_for, pick_index, respond};
use crate::session::protocol::{GameCommand, GameResponse};
use crate::session::session::{PendingInteraction, Session, UiState};
use crate::world::arena::ArenaEntry;

/// Opponents shown on the ladder
const LADDER_SIZE: usize = 10;

fn my_entry(engine: &Engine, session: &Session) -> Result<ArenaEntry> {
    let character = session.character()?;
    let world = session.world_id();
    let now = now_unix();
    let mut entry = match engine.store().arena_entry(world, character.name())? {
        Some(entry) => entry,
        None => ArenaEntry::register(world.clone(), character, engine.config(), now),
    };
    entry.roll_day(now);
    Ok(entry)
}

/// Highest rated entries other than the player's own
fn ladder(engine: &Engine, session: &Session) -> Result<Vec<ArenaEntry>> {
    let character = session.character()?;
    let world = session.world_id();
    let mut entries: Vec<ArenaEntry> = engine
        .store()
        .arena_entries()?
        .into_iter()
        .filter(|e| !(e.world == *world && e.character_name == character.name()))
        .collect();
    entries.sort_by(|a, b| b.rating.cmp(&a.rating).then_with(|| a.character_name.cmp(&b.character_name)));
    entries.truncate(LADDER_SIZE);
    Ok(entries)
}

pub fn render_main(engine: &Engine, session: &Session) -> GameResponse {
    let mut response = menu_for(session, UiState::ArenaMain);
    match (my_entry(engine, session), ladder(engine, session)) {
        (Ok(mine), Ok(opponents)) => {
            response = response.message(GameMessage::system(format!(
                "Rating {} ({}W/{}L), {} battles left today",
                mine.rating,
                mine.wins,
                mine.losses,
                mine.battles_remaining(engine.config())
            )));
            if opponents.is_empty() {
                response = response.message(GameMessage::system("Nobody else has entered the arena yet."));
            }
            for (i, entry) in opponents.iter().enumerate() {
                response = response.option(
                    (i + 1).to_string(),
                    format!(
                        "{} (Level {}, rating {})",
                        entry.character_name, entry.fighter.level, entry.rating
                    ),
                );
            }
        }
        (Err(err), _) | (_, Err(err)) => response = response.message(err.to_message()),
    }
    response.option("0", "Back").prompt("Choose an opponent")
}

pub fn handle_main(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    if command.is_back() {
        session.go(UiState::MainMenu);
        return Ok(respond(engine, session, Vec::new()));
    }
    let opponents = ladder(engine, session)?;
    let index = pick_index(command, opponents.len())?;
    let mine = my_entry(engine, session)?;
    let left = mine.battles_remaining(engine.config());
    if left == 0 {
        return Err(GameError::insufficient("arena battles", 1, 0));
    }

    let opponent = &opponents[index];
    session.ui = UiState::ArenaConfirm;
    session.pending = PendingInteraction::ArenaConfirm {
        world: opponent.world.clone(),
        opponent: opponent.character_name.clone(),
    };
    Ok(respond(engine, session, Vec::new()))
}

pub fn render_confirm(engine: &Engine, session: &Session) -> GameResponse {
    let response = menu_for(session, UiState::ArenaConfirm);
    let PendingInteraction::ArenaConfirm { world, opponent } = &session.pending else {
        return response.option("0", "Back");
    };
    let detail = match engine.store().arena_entry(world, opponent) {
        Ok(Some(entry)) => format!(
            "{} - Level {}, rating {} ({}W/{}L)",
            entry.character_name, entry.fighter.level, entry.rating, entry.wins, entry.losses
        ),
        Ok(None) => format!("{} has left the arena.", opponent),
        Err(err) => err.to_string(),
    };
    response
        .message(GameMessage::system(detail))
        .option("1", "Fight")
        .option("0", "Back")
        .prompt("Both fighters start at full health. Ready?")
}

pub fn handle_confirm(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    if command.is_back() {
        session.go(UiState::ArenaMain);
        return Ok(respond(engine, session, Vec::new()));
    }
    if command.trimmed() != "1" {
        return Err(GameError::InvalidInput(format!("'{}' is not an option", command.trimmed())));
    }
    let (world, opponent) = match &session.pending {
        PendingInteraction::ArenaConfirm { world, opponent } => (world.clone(), opponent.clone()),
        _ => return Err(GameError::InvalidInput("no arena match is being prepared".into())),
    };
    let entry = engine
        .store()
        .arena_entry(&world, &opponent)?
        .ok_or_else(|| GameError::not_found("arena entry", opponent.clone()))?;

    session.character_mut()?.refresh();
    let message = GameMessage::combat(format!("You step into the arena against {}!", entry.character_name));
    session.combat = Some(CombatContext::new(
        entry.to_monster(),
        FightVariant::Arena { world, opponent },
    ));
    session.go(UiState::Combat);
    Ok(respond(engine, session, vec![message]))
}
