//! The shared town: inn raids and the mayor challenge

use tracing::{info, warn};

use crate::combat::machine::CombatContext;
use crate::combat::variant::{FightVariant, MayorPhase};
use crate::core::error::{GameError, Result};
use crate::core::types::{now_unix, GameMessage, MessageCategory};
use crate::session::engine::Engine;
use crate::session::handlers::{menu_for, pick_index, respond};
use crate::session::protocol::{GameCommand, GameResponse};
use crate::session::session::{Session, UiState};
use crate::world::monster::Monster;
use crate::world::town::{guard_as_monster, AttackLogEntry, Mayor, Town};

/// Guests the player may raid: everyone but themselves
fn raid_targets(town: &Town, session: &Session) -> Vec<String> {
    let own = session.character.as_ref().map(|c| c.name());
    town.inn_guests
        .iter()
        .filter(|g| Some(g.name()) != own)
        .map(|g| g.name().to_string())
        .collect()
}

pub fn render_inn(engine: &Engine, session: &Session) -> GameResponse {
    let mut response = menu_for(session, UiState::Inn);
    let town = engine.town();
    response = response.town(&town);
    let targets = raid_targets(&town, session);
    if targets.is_empty() {
        response = response.message(GameMessage::new("The inn is quiet tonight.", MessageCategory::Narrative));
    }
    for (i, name) in targets.iter().enumerate() {
        let label = match town.find_guest(name).map(|idx| &town.inn_guests[idx]) {
            Some(guest) => format!("Raid {} (Level {})", name, guest.fighter.level),
            None => name.clone(),
        };
        response = response.option((i + 1).to_string(), label);
    }
    response.option("0", "Back").prompt("Sleeping guests keep their valuables close...")
}

pub fn handle_inn(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    if command.is_back() {
        session.go(UiState::MainMenu);
        return Ok(respond(engine, session, Vec::new()));
    }
    let opponent = {
        let town = engine.town();
        let targets = raid_targets(&town, session);
        let index = pick_index(command, targets.len())?;
        let name = &targets[index];
        town.find_guest(name)
            .map(|idx| town.inn_guests[idx].to_monster())
            .ok_or_else(|| GameError::not_found("inn guest", name.clone()))?
    };
    session.character()?;

    let message = GameMessage::combat(format!("You sneak into {}'s room. They wake up!", opponent.name()));
    let guest = opponent.name().to_string();
    session.combat = Some(CombatContext::new(opponent, FightVariant::PvP { guest }));
    session.go(UiState::Combat);
    Ok(respond(engine, session, vec![message]))
}

/// First opponent of a challenge, starting at phase `from`
///
/// Empty phases are skipped; the mayor always closes the challenge.
pub(crate) fn duel_opponent(mayor: &Mayor, from: MayorPhase) -> (MayorPhase, Monster) {
    let mut phase = Some(from);
    while let Some(current) = phase {
        match current {
            MayorPhase::Guards => {
                if let Some(guard) = mayor.guards.first() {
                    return (current, guard_as_monster(guard));
                }
            }
            MayorPhase::Monsters => {
                if let Some(monster) = mayor.monsters.first() {
                    let mut monster = monster.clone();
                    monster.fighter.restore();
                    return (current, monster);
                }
            }
            MayorPhase::Mayor => break,
        }
        phase = current.next();
    }
    (MayorPhase::Mayor, mayor.to_monster())
}

fn holds_office(mayor: &Mayor, session: &Session) -> bool {
    session
        .character
        .as_ref()
        .map(|c| c.name() == mayor.name() && mayor.account == session.account)
        .unwrap_or(false)
}

pub fn render_mayor(engine: &Engine, session: &Session) -> GameResponse {
    let town = engine.town();
    let response = menu_for(session, UiState::MayorChallenge).town(&town);
    let response = match &town.mayor {
        None => response
            .message(GameMessage::system(format!("{} has no mayor.", town.name)))
            .option("1", "Claim the office"),
        Some(mayor) if holds_office(mayor, session) => response
            .message(GameMessage::system(format!("You are the mayor of {}.", town.name)))
            .option_if(false, "1", "Challenge the mayor"),
        Some(mayor) => response
            .message(GameMessage::system(format!(
                "Mayor {} (Level {}) is protected by {} guards and {} monsters.",
                mayor.name(),
                mayor.fighter.level,
                mayor.guards.len(),
                mayor.monsters.len()
            )))
            .option("1", format!("Challenge {}", mayor.name())),
    };
    response.option("0", "Back")
}

pub fn handle_mayor(engine: &Engine, session: &mut Session, command: &GameCommand) -> Result<GameResponse> {
    if command.is_back() {
        session.go(UiState::MainMenu);
        return Ok(respond(engine, session, Vec::new()));
    }
    if command.trimmed() != "1" {
        return Err(GameError::InvalidInput(format!("'{}' is not an option", command.trimmed())));
    }

    let first = {
        let mut town = engine.town();
        match &town.mayor {
            None => {
                let character = session.character()?;
                town.mayor = Some(Mayor::from_character(character, session.account));
                town.log_attack(AttackLogEntry {
                    attacker: character.name().to_string(),
                    defender: String::new(),
                    attacker_won: true,
                    details: "claimed the empty office".into(),
                    time: now_unix(),
                });
                info!(mayor = %character.name(), "office claimed");
                None
            }
            Some(mayor) if holds_office(mayor, session) => {
                return Err(GameError::InvalidInput("you cannot challenge yourself".into()));
            }
            Some(mayor) => Some(duel_opponent(mayor, MayorPhase::Guards)),
        }
    };

    let Some((phase, opponent)) = first else {
        if let Err(err) = engine.save_town() {
            warn!(%err, "failed to save the town");
        }
        let message = GameMessage::new("Nobody contests your claim. You are now the mayor!", MessageCategory::Levelup);
        return Ok(respond(engine, session, vec![message]));
    };

    session.character()?;
    let message = GameMessage::combat(format!("You challenge the mayor! {} steps forward.", opponent.name()));
    session.combat = Some(CombatContext::new(opponent, FightVariant::MayorDuel { phase }));
    session.go(UiState::Combat);
    Ok(respond(engine, session, vec![message]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::combatant::Combatant;
    use crate::combat::guards::tests::test_guard;
    use crate::world::character::Character;

    fn mayor() -> Mayor {
        Mayor::from_character(&Character::new(Combatant::new("Old Mayor", 10, 80, 20, 20, 2)), None)
    }

    #[test]
    fn test_duel_skips_empty_phases() {
        let mut office = mayor();
        let (phase, foe) = duel_opponent(&office, MayorPhase::Guards);
        assert_eq!(phase, MayorPhase::Mayor);
        assert_eq!(foe.name(), "Old Mayor");

        office.guards.push(test_guard("Bruno", 30));
        let (phase, foe) = duel_opponent(&office, MayorPhase::Guards);
        assert_eq!(phase, MayorPhase::Guards);
        assert_eq!(foe.name(), "Bruno");

        let (phase, _) = duel_opponent(&office, MayorPhase::Monsters);
        assert_eq!(phase, MayorPhase::Mayor);
    }
}
