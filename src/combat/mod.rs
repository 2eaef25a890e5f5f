//! Combat: the damage pipeline, status effects, guards and the fight state machine

pub mod combatant;
pub mod damage;
pub mod guards;
pub mod machine;
pub mod status;
pub mod variant;

pub use combatant::{Combatant, DamageType, Pool, Resistance, Resistances, Skill, StatMod};
pub use damage::{resolve_strike, Strike, StrikeResult};
pub use guards::Guard;
pub use machine::{flee_chance, CombatContext, CombatPhase, FightOutcome, Picker, PlayerAction, TurnReport};
pub use status::{EffectKind, StatusEffect};
pub use variant::{FightVariant, MayorPhase};
