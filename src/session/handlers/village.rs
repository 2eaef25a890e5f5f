//! The player's village: overview, manual harvest, hiring and tide defense

use tracing::info;

use crate::core::error::{GameError, Result};
use crate::core::types::{now_unix, GameMessage, MessageCategory};
use crate::session::engine::Engine;
use crate::session::handlers::{menu_for, respond};
use crate::session::protocol::{GameCommand, GameResponse};
use crate::session::session::{PendingInteraction, Session, UiState};
use crate::tick::tide::{conclude, resolve_wave, wave_count, TideTally};

pub fn render_main(session: &Session) -> GameResponse {
    let mut response = menu_for(session, UiState::VillageMain);
    let now = now_unix();
    let mut tide_due = false;
    if let Some(character) = &session.character {
        let world = session.world.read();
        if let Some(village) = world.villages.get(&character.village_name) {
            tide_due = village.tide_due(now);
            let next = (village.last_tide_time + village.tide_interval - now).max(0);
            response = response.village(village).message(GameMessage::system(format!(
                "{} - Level {}, {} villagers, {} guards. Next tide in {}s.",
                village.name,
                village.level,
                village.villagers.len(),
                village.guard_count(),
                next
            )));
        }
    }
    response
        .option_if(tide_due, "1", "Defend against the tide")
        .option("2", "Collect the harvest")
        .option("3", "Hire a guard")
        .option("0", "Back")
}

pub fn handle_main(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    if command.is_back() {
        session.go(UiState::MainMenu);
        return Ok(respond(engine, session, Vec::new()));
    }
    let now = now_unix();
    let Session {
        character, world, rng, ..
    } = &mut *session;
    let player = character
        .as_mut()
        .ok_or_else(|| GameError::not_found("character", "no character selected"))?;
    let mut snapshot = world.write();
    let village = snapshot
        .villages
        .get_mut(&player.village_name)
        .ok_or_else(|| GameError::not_found("village", player.village_name.clone()))?;

    let messages = match command.trimmed() {
        "1" => {
            if !village.tide_due(now) {
                let wait = village.last_tide_time + village.tide_interval - now;
                return Err(GameError::InvalidInput(format!("the next tide arrives in {}s", wait)));
            }
            // Claim the tide so the background sweep leaves this village alone.
            village.last_tide_time = now;
            let waves_total = wave_count(village.level);
            info!(village = %village.name, waves_total, "interactive tide started");
            drop(snapshot);
            session.ui = UiState::VillageTideWave;
            session.pending = PendingInteraction::TideDefense {
                wave: 1,
                waves_total,
                tally: TideTally::default(),
            };
            let message = GameMessage::new(
                format!("The tide rises! {} waves are coming.", waves_total),
                MessageCategory::Narrative,
            );
            return Ok(respond(engine, session, vec![message]));
        }
        "2" => {
            let collected = village
                .harvest(now, engine.config().harvest_min_interval_secs)
                .ok_or_else(|| GameError::InvalidInput("there is nothing to harvest yet".into()))?;
            collected
                .iter()
                .map(|(kind, amount)| GameMessage::new(format!("Harvested {} {}.", amount, kind), MessageCategory::Loot))
                .collect()
        }
        "3" => {
            let guard = engine.content().guard(rng, player.level());
            if player.gold < guard.hire_cost {
                return Err(GameError::insufficient("gold", guard.hire_cost as i64, player.gold as i64));
            }
            player.gold -= guard.hire_cost;
            let message = GameMessage::system(format!("{} joins your guard for {} gold.", guard.name(), guard.hire_cost));
            village.active_guards.push(guard);
            vec![message]
        }
        other => return Err(GameError::InvalidInput(format!("'{}' is not an option", other))),
    };
    drop(snapshot);
    Ok(respond(engine, session, messages))
}

pub fn render_tide_wave(session: &Session) -> GameResponse {
    let response = menu_for(session, UiState::VillageTideWave);
    let response = match &session.pending {
        PendingInteraction::TideDefense { wave, waves_total, tally } => response.message(GameMessage::system(format!(
            "Wave {} of {}. So far: {} of {} monsters killed, {} damage taken.",
            wave, waves_total, tally.monsters_killed, tally.monsters, tally.damage_taken
        ))),
        _ => response,
    };
    let response = match &session.character {
        Some(character) => match session.world.read().villages.get(&character.village_name) {
            Some(village) => response.village(village),
            None => response,
        },
        None => response,
    };
    response.option("1", "Face the next wave")
}

pub fn handle_tide_wave(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    if command.trimmed() != "1" {
        return Err(GameError::InvalidInput("the tide will not wait; face the next wave".into()));
    }
    let (wave, waves_total, mut tally) = match &session.pending {
        PendingInteraction::TideDefense { wave, waves_total, tally } => (*wave, *waves_total, *tally),
        _ => return Err(GameError::InvalidInput("no tide is underway".into())),
    };

    let now = now_unix();
    let (messages, finished) = {
        let Session {
            character, world, rng, ..
        } = &mut *session;
        let player = character
            .as_ref()
            .ok_or_else(|| GameError::not_found("character", "no character selected"))?;
        let mut snapshot = world.write();
        let village = snapshot
            .villages
            .get_mut(&player.village_name)
            .ok_or_else(|| GameError::not_found("village", player.village_name.clone()))?;
        let mut messages = resolve_wave(rng, engine.content(), village, wave, waves_total, &mut tally);
        let finished = wave >= waves_total;
        if finished {
            let outcome = conclude(rng, village, waves_total, tally, now);
            info!(village = %village.name, victory = outcome.victory, "interactive tide finished");
            messages.extend(outcome.messages);
        }
        (messages, finished)
    };

    if finished {
        session.go(UiState::VillageMain);
    } else {
        session.pending = PendingInteraction::TideDefense {
            wave: wave + 1,
            waves_total,
            tally,
        };
    }
    Ok(respond(engine, session, messages))
}
