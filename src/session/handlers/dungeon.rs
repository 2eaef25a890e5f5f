//! Dungeon runs: selection, room progression and the walk between fights

use rand::Rng;
use tracing::debug;

use crate::combat::machine::CombatContext;
use crate::combat::variant::FightVariant;
use crate::core::error::{GameError, Result};
use crate::core::types::{GameMessage, MessageCategory};
use crate::session::engine::Engine;
use crate::session::handlers::{menu_for, respond};
use crate::session::outcomes::{grant_xp, take_loot};
use crate::session::protocol::{GameCommand, GameResponse};
use crate::session::session::{Session, UiState};
use crate::world::character::Character;
use crate::world::dungeon::RoomKind;

/// Walk forward through treasure and rest rooms until a fight or the exit
///
/// Clearing the last room pays the completion bonus and ends the run.
pub(crate) fn enter_rooms<R: Rng + ?Sized>(rng: &mut R, player: &mut Character, messages: &mut Vec<GameMessage>) {
    loop {
        let Some(dungeon) = player.active_dungeon.as_mut() else {
            return;
        };
        if dungeon.is_complete() {
            let bonus = dungeon.completion_xp();
            let name = dungeon.name.clone();
            player.active_dungeon = None;
            player.stats.dungeons_cleared += 1;
            messages.push(GameMessage::new(format!("You cleared {}!", name), MessageCategory::Narrative));
            grant_xp(rng, player, bonus, messages);
            return;
        }

        let (kind, gold, treasure, has_monster) = match dungeon.current_mut() {
            Some(room) => (room.kind, room.gold, room.treasure.take(), room.monster.is_some()),
            None => return,
        };
        match kind {
            RoomKind::Combat | RoomKind::Boss if has_monster => return,
            RoomKind::Combat | RoomKind::Boss => dungeon.clear_current(),
            RoomKind::Treasure => {
                dungeon.clear_current();
                messages.push(GameMessage::new(
                    format!("You find a treasure chest with {} gold!", gold),
                    MessageCategory::Loot,
                ));
                player.gold += gold;
                take_loot(player, treasure.into_iter().collect(), messages);
            }
            RoomKind::Rest => {
                dungeon.clear_current();
                player.refresh();
                messages.push(GameMessage::new(
                    "You rest by a quiet spring and recover fully.",
                    MessageCategory::Heal,
                ));
            }
        }
    }
}

pub fn render_select(session: &Session) -> GameResponse {
    let response = menu_for(session, UiState::DungeonSelect);
    let active = session.character.as_ref().and_then(|c| c.active_dungeon.as_ref());
    let response = match active {
        Some(dungeon) => response
            .message(GameMessage::system(format!(
                "You are exploring {} (room {}/{}).",
                dungeon.name,
                dungeon.current_room + 1,
                dungeon.rooms.len()
            )))
            .option("1", format!("Continue {}", dungeon.name))
            .option("2", "Abandon it"),
        None => response.option("1", "Enter a new dungeon"),
    };
    response.option("0", "Back")
}

pub fn handle_select(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    if command.is_back() {
        session.go(UiState::MainMenu);
        return Ok(respond(engine, session, Vec::new()));
    }
    let Session { character, rng, .. } = &mut *session;
    let player = character
        .as_mut()
        .ok_or_else(|| GameError::not_found("character", "no character selected"))?;

    let mut messages = Vec::new();
    match (command.trimmed(), player.active_dungeon.is_some()) {
        ("1", true) => {}
        ("1", false) => {
            let dungeon = engine.content().dungeon(rng, player.level());
            debug!(dungeon = %dungeon.name, rooms = dungeon.rooms.len(), "dungeon generated");
            messages.push(GameMessage::new(
                format!("You descend into {} ({} rooms).", dungeon.name, dungeon.rooms.len()),
                MessageCategory::Narrative,
            ));
            player.active_dungeon = Some(dungeon);
            enter_rooms(rng, player, &mut messages);
        }
        ("2", true) => {
            player.active_dungeon = None;
            messages.push(GameMessage::system("You abandon the dungeon."));
            return Ok(respond(engine, session, messages));
        }
        (other, _) => return Err(GameError::InvalidInput(format!("'{}' is not an option", other))),
    }

    let next = if player.active_dungeon.is_some() {
        UiState::DungeonRoom
    } else {
        UiState::MainMenu
    };
    session.go(next);
    Ok(respond(engine, session, messages))
}

pub fn render_room(session: &Session) -> GameResponse {
    let response = menu_for(session, UiState::DungeonRoom);
    let room = session
        .character
        .as_ref()
        .and_then(|c| c.active_dungeon.as_ref())
        .and_then(|d| d.current().map(|room| (d, room)));
    let response = match room {
        Some((dungeon, room)) => {
            let foe = room
                .monster
                .as_ref()
                .map(|m| format!("{} (Level {})", m.name(), m.level()))
                .unwrap_or_else(|| "nothing".into());
            let label = match room.kind {
                RoomKind::Boss => format!("Face the boss, {}", foe),
                _ => format!("Fight {}", foe),
            };
            response
                .message(GameMessage::system(format!(
                    "{}: room {}/{}",
                    dungeon.name,
                    dungeon.current_room + 1,
                    dungeon.rooms.len()
                )))
                .option("1", label)
        }
        None => response,
    };
    response.option("2", "Leave (progress is kept)").option("0", "Back")
}

pub fn handle_room(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    if command.is_back() || command.trimmed() == "2" {
        session.go(UiState::MainMenu);
        return Ok(respond(engine, session, Vec::new()));
    }
    if command.trimmed() != "1" {
        return Err(GameError::InvalidInput(format!("'{}' is not an option", command.trimmed())));
    }
    let mut opponent = session
        .character()?
        .active_dungeon
        .as_ref()
        .and_then(|d| d.current())
        .and_then(|room| room.monster.clone())
        .ok_or_else(|| GameError::InvalidInput("there is nothing to fight here".into()))?;
    opponent.fighter.restore();

    let message = GameMessage::combat(format!("{} attacks!", opponent.name()));
    session.combat = Some(CombatContext::new(opponent, FightVariant::Dungeon));
    session.go(UiState::Combat);
    Ok(respond(engine, session, vec![message]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::combatant::Combatant;
    use crate::world::dungeon::{Dungeon, DungeonRoom};
    use crate::world::monster::Monster;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn room(kind: RoomKind, gold: i32) -> DungeonRoom {
        DungeonRoom {
            kind,
            monster: None,
            treasure: None,
            gold,
            cleared: false,
        }
    }

    #[test]
    fn test_walk_stops_at_fight_and_completes() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut player = Character::new(Combatant::new("Hero", 1, 20, 10, 10, 1));
        let bat = Monster::new(Combatant::new("Bat", 1, 5, 0, 0, 1), "bat", 1);
        player.active_dungeon = Some(Dungeon {
            name: "Crypt".into(),
            level: 1,
            rooms: vec![room(RoomKind::Treasure, 25), DungeonRoom::fight(bat, false), room(RoomKind::Rest, 0)],
            current_room: 0,
        });

        let mut messages = Vec::new();
        enter_rooms(&mut rng, &mut player, &mut messages);
        assert_eq!(player.gold, 25);
        assert_eq!(player.active_dungeon.as_ref().map(|d| d.current_room), Some(1));

        if let Some(d) = player.active_dungeon.as_mut() {
            d.clear_current();
        }
        player.fighter.hp.current = 1;
        enter_rooms(&mut rng, &mut player, &mut messages);
        assert!(player.active_dungeon.is_none());
        assert_eq!(player.stats.dungeons_cleared, 1);
        assert_eq!(player.experience, 150);
    }
}
