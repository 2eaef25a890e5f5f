//! Auto-hunt: pick a location and a count, then let the AI fight

use tracing::{info, warn};

use crate::ai::autoplay::run_batch;
use crate::core::error::{GameError, Result};
use crate::core::types::{GameMessage, MessageCategory};
use crate::session::engine::Engine;
use crate::session::handlers::hunt::{encounter, parse_count, pick_location};
use crate::session::handlers::{menu_for, respond};
use crate::session::outcomes::resolve_hunt;
use crate::session::protocol::{GameCommand, GameResponse};
use crate::session::session::{PendingInteraction, Session, UiState};

pub fn render(engine: &Engine, session: &Session) -> GameResponse {
    let response = menu_for(session, UiState::AutoPlayLocation);
    if let PendingInteraction::AutoplayCount { location } = &session.pending {
        return response.option("0", "Back").prompt(format!(
            "How many fights in {}? (1-{})",
            location,
            engine.config().autoplay_max_fights
        ));
    }
    let mut response = response;
    if let Some(character) = &session.character {
        for (i, name) in character.known_locations.iter().enumerate() {
            response = response.option((i + 1).to_string(), name.clone());
        }
    }
    response.option("0", "Back").prompt("Where should the AI hunt?")
}

pub fn handle(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    let location = match &session.pending {
        PendingInteraction::AutoplayCount { location } => location.clone(),
        _ => {
            if command.is_back() {
                session.go(UiState::MainMenu);
                return Ok(respond(engine, session, Vec::new()));
            }
            let location = pick_location(session, command)?;
            session.pending = PendingInteraction::AutoplayCount { location };
            return Ok(respond(engine, session, Vec::new()));
        }
    };
    if command.is_back() {
        session.pending = PendingInteraction::None;
        return Ok(respond(engine, session, Vec::new()));
    }
    let fights = parse_count(engine, command)?;

    let (summary, learned, level) = {
        let Session {
            character, world, rng, ..
        } = &mut *session;
        let player = character
            .as_mut()
            .ok_or_else(|| GameError::not_found("character", "no character selected"))?;
        let world = &*world;
        let mut learned = Vec::new();
        let summary = run_batch(
            rng,
            player,
            fights,
            engine.config(),
            |rng, player| match encounter(engine, world, rng, player, &location, 0) {
                Ok(ctx) => Some(ctx),
                Err(err) => {
                    warn!(%err, location = %location, "autoplay could not find an opponent");
                    None
                }
            },
            |rng, player, ctx, outcome| {
                let settlement = resolve_hunt(engine, world, rng, player, ctx, outcome);
                if let Some(skill) = settlement.reward {
                    if !player.fighter.knows_skill(&skill.name) {
                        learned.push(skill.name.clone());
                        player.fighter.skills.push(skill);
                    }
                }
                settlement.xp
            },
        );
        (summary, learned, player.level())
    };
    info!(
        location = %location,
        fights = summary.fights,
        wins = summary.wins,
        win_rate = summary.win_rate(),
        "autoplay batch finished"
    );

    let mut messages = summary.to_messages();
    messages.push(GameMessage::system(format!("You are level {}.", level)));
    messages.extend(
        learned
            .into_iter()
            .map(|name| GameMessage::new(format!("A guardian taught you {}!", name), MessageCategory::Buff)),
    );
    session.go(UiState::MainMenu);
    messages.extend(engine.autosave(session));
    Ok(respond(engine, session, messages))
}
