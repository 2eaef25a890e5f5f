//! Autoplay batches: many AI-resolved fights in a row
//!
//! Each fight is capped by the turn ceiling and each batch by
//! `autoplay_max_fights`, so a batch always ends.

use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::combat::machine::{CombatContext, FightOutcome};
use crate::core::config::EngineConfig;
use crate::core::types::{GameMessage, MessageCategory};
use crate::world::character::Character;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutoplaySummary {
    pub fights: u32,
    pub wins: u32,
    pub deaths: u32,
    pub fled: u32,
    pub timeouts: u32,
    pub xp_gained: i32,
}

impl AutoplaySummary {
    pub fn record(&mut self, outcome: FightOutcome, xp: i32) {
        self.fights += 1;
        self.xp_gained += xp;
        match outcome {
            FightOutcome::Won => self.wins += 1,
            FightOutcome::Lost => self.deaths += 1,
            FightOutcome::Fled => self.fled += 1,
            FightOutcome::TimedOut => self.timeouts += 1,
            FightOutcome::Ongoing => {}
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.fights == 0 {
            return 0.0;
        }
        self.wins as f64 / self.fights as f64
    }

    pub fn to_messages(&self) -> Vec<GameMessage> {
        vec![
            GameMessage::system(format!("Autoplay finished: {} fights.", self.fights)),
            GameMessage::combat(format!(
                "Wins: {}  Deaths: {}  Timeouts: {}",
                self.wins, self.deaths, self.timeouts
            )),
            GameMessage::new(format!("Experience gained: {}", self.xp_gained), MessageCategory::Levelup),
        ]
    }
}

/// Run up to `fights` AI-driven fights
///
/// `next_fight` sets up each fight (returning `None` ends the batch early)
/// and `settle` applies its consequences, returning the XP it granted.
pub fn run_batch<R, N, S>(
    rng: &mut R,
    player: &mut Character,
    fights: u32,
    config: &EngineConfig,
    mut next_fight: N,
    mut settle: S,
) -> AutoplaySummary
where
    R: Rng + ?Sized,
    N: FnMut(&mut R, &Character) -> Option<CombatContext>,
    S: FnMut(&mut R, &mut Character, &mut CombatContext, FightOutcome) -> i32,
{
    let limit = fights.min(config.autoplay_max_fights);
    let mut summary = AutoplaySummary::default();

    for _ in 0..limit {
        let Some(mut ctx) = next_fight(rng, player) else {
            debug!(fought = summary.fights, "autoplay ran out of opponents");
            break;
        };
        let outcome = match ctx.auto_resolve(rng, player, config) {
            Ok(report) => report.outcome,
            Err(err) => {
                warn!(%err, "autoplay fight aborted");
                break;
            }
        };
        let xp = settle(rng, player, &mut ctx, outcome);
        summary.record(outcome, xp);
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::combatant::Combatant;
    use crate::combat::variant::FightVariant;
    use crate::world::character::scaled_xp;
    use crate::world::monster::Monster;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rat() -> Monster {
        Monster::new(Combatant::new("Rat", 1, 8, 0, 0, 1), "Rat", 1)
    }

    #[test]
    fn test_batch_respects_fight_ceiling() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let mut config = EngineConfig::default();
        config.autoplay_max_fights = 4;
        let mut player = Character::new(Combatant::new("Hero", 3, 200, 20, 20, 2));
        player.fighter.stats_mod.attack_mod = 5;

        let summary = run_batch(
            &mut rng,
            &mut player,
            50,
            &config,
            |_, _| Some(CombatContext::new(rat(), FightVariant::Hunt { remaining: 0 })),
            |rng, player, ctx, outcome| {
                if outcome == FightOutcome::Won {
                    let xp = scaled_xp(player.level(), ctx.opponent.level());
                    player.gain_experience(rng, xp);
                    xp
                } else {
                    player.resurrect();
                    0
                }
            },
        );

        assert_eq!(summary.fights, 4);
        assert_eq!(summary.wins + summary.deaths + summary.timeouts + summary.fled, 4);
        assert!(summary.wins > 0);
    }

    #[test]
    fn test_batch_stops_without_opponents() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let config = EngineConfig::default();
        let mut player = Character::new(Combatant::new("Hero", 3, 200, 20, 20, 2));
        let summary = run_batch(&mut rng, &mut player, 10, &config, |_, _| None, |_, _, _, _| 0);
        assert_eq!(summary, AutoplaySummary::default());
        assert_eq!(summary.win_rate(), 0.0);
    }
}
