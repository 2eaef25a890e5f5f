//! Fight variants
//!
//! The variant only changes what happens after a fight is decided. The
//! turn algorithm in `machine` never looks at it.

use serde::{Deserialize, Serialize};

use crate::combat::machine::FightOutcome;
use crate::core::types::WorldId;

/// Stage of a mayor challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MayorPhase {
    Guards,
    Monsters,
    Mayor,
}

impl MayorPhase {
    pub fn next(self) -> Option<MayorPhase> {
        match self {
            MayorPhase::Guards => Some(MayorPhase::Monsters),
            MayorPhase::Monsters => Some(MayorPhase::Mayor),
            MayorPhase::Mayor => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            MayorPhase::Guards => 0,
            MayorPhase::Monsters => 1,
            MayorPhase::Mayor => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FightVariant {
    /// Open-world hunt; `remaining` more fights follow this one
    Hunt { remaining: u32 },
    /// Ladder match against another registered character
    Arena { world: WorldId, opponent: String },
    /// Raid on a sleeping inn guest
    PvP { guest: String },
    MayorDuel { phase: MayorPhase },
    Dungeon,
}

impl FightVariant {
    /// Whether losing kills the player (arena matches only reset)
    pub fn is_lethal(&self) -> bool {
        !matches!(self, FightVariant::Arena { .. })
    }

    /// Whether hitting the turn ceiling is scored as a draw rather than a loss
    pub fn timeout_is_draw(&self) -> bool {
        matches!(self, FightVariant::Arena { .. } | FightVariant::PvP { .. })
    }

    /// Outcome as this variant scores it; a timeout is a draw or a loss
    pub fn score(&self, outcome: FightOutcome) -> FightOutcome {
        match outcome {
            FightOutcome::TimedOut if !self.timeout_is_draw() => FightOutcome::Lost,
            other => other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FightVariant::Hunt { .. } => "hunt",
            FightVariant::Arena { .. } => "arena",
            FightVariant::PvP { .. } => "pvp",
            FightVariant::MayorDuel { .. } => "mayor_duel",
            FightVariant::Dungeon => "dungeon",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_scoring() {
        assert!(FightVariant::PvP { guest: "x".into() }.timeout_is_draw());
        assert!(!FightVariant::Dungeon.timeout_is_draw());
        assert!(!FightVariant::Hunt { remaining: 0 }.timeout_is_draw());
    }

    #[test]
    fn test_score_maps_timeouts_per_variant() {
        let arena = FightVariant::Arena {
            world: WorldId::Local("w".into()),
            opponent: "Rival".into(),
        };
        assert_eq!(arena.score(FightOutcome::TimedOut), FightOutcome::TimedOut);
        assert_eq!(FightVariant::Dungeon.score(FightOutcome::TimedOut), FightOutcome::Lost);
        let duel = FightVariant::MayorDuel { phase: MayorPhase::Mayor };
        assert_eq!(duel.score(FightOutcome::TimedOut), FightOutcome::Lost);
        assert_eq!(duel.score(FightOutcome::Fled), FightOutcome::Fled);
        assert!(!arena.is_lethal());
        assert!(duel.is_lethal());
    }

    #[test]
    fn test_mayor_phases_advance() {
        assert_eq!(MayorPhase::Guards.next(), Some(MayorPhase::Monsters));
        assert_eq!(MayorPhase::Mayor.next(), None);
        assert_eq!(MayorPhase::Monsters.index(), 1);
    }

    #[test]
    fn test_variant_serializes_tagged() {
        let json = serde_json::to_string(&FightVariant::Hunt { remaining: 2 }).unwrap();
        assert_eq!(json, r#"{"kind":"hunt","remaining":2}"#);
    }
}
