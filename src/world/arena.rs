//! Arena ladder entries and ELO rating changes

use serde::{Deserialize, Serialize};

use crate::combat::combatant::Combatant;
use crate::combat::status::clear_effects;
use crate::core::config::EngineConfig;
use crate::core::types::{UnixSeconds, WorldId};
use crate::world::character::Character;
use crate::world::item::Equipment;
use crate::world::monster::Monster;

const SECONDS_PER_DAY: i64 = 86_400;

/// UTC day number used for the daily battle reset
pub fn arena_day(now: UnixSeconds) -> i64 {
    now.div_euclid(SECONDS_PER_DAY)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaEntry {
    pub world: WorldId,
    pub character_name: String,
    pub rating: i32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub battles_today: u32,
    #[serde(default)]
    pub last_reset_day: i64,
    /// Fighter snapshot used when someone challenges this entry
    pub fighter: Combatant,
    #[serde(default)]
    pub equipment: Equipment,
}

impl ArenaEntry {
    pub fn register(world: WorldId, character: &Character, config: &EngineConfig, now: UnixSeconds) -> Self {
        let mut entry = Self {
            world,
            character_name: character.name().to_string(),
            rating: config.arena_start_rating,
            wins: 0,
            losses: 0,
            battles_today: 0,
            last_reset_day: arena_day(now),
            fighter: character.fighter.clone(),
            equipment: Equipment::new(),
        };
        entry.refresh_snapshot(character);
        entry
    }

    /// Copy the character's current stats into the entry
    pub fn refresh_snapshot(&mut self, character: &Character) {
        self.fighter = character.fighter.clone();
        clear_effects(&mut self.fighter);
        self.fighter.restore();
        self.equipment = character.equipment.clone();
    }

    /// Zero the daily counter on a new UTC day
    pub fn roll_day(&mut self, now: UnixSeconds) {
        let today = arena_day(now);
        if self.last_reset_day != today {
            self.last_reset_day = today;
            self.battles_today = 0;
        }
    }

    pub fn battles_remaining(&self, config: &EngineConfig) -> u32 {
        config.arena_max_battles_per_day.saturating_sub(self.battles_today)
    }

    pub fn to_monster(&self) -> Monster {
        let mut mob = Monster::new(self.fighter.clone(), "Champion", self.fighter.level / 3 + 1);
        mob.equipment = self.equipment.clone();
        mob.fighter.restore();
        mob
    }

    pub fn record_win(&mut self, gain: i32) {
        self.rating += gain;
        self.wins += 1;
    }

    pub fn record_loss(&mut self, loss: i32) {
        self.rating = (self.rating - loss).max(0);
        self.losses += 1;
    }
}

/// ELO rating change for one result: (winner gain, loser loss)
///
/// Both values are rounded and clamped to the configured range.
pub fn rating_change(winner_rating: i32, loser_rating: i32, config: &EngineConfig) -> (i32, i32) {
    let expected = 1.0 / (1.0 + 10f64.powf((loser_rating - winner_rating) as f64 / 400.0));
    let gain = (config.arena_k_factor * (1.0 - expected)).round() as i32;
    let loss = (config.arena_k_factor * expected).round() as i32;
    (
        gain.clamp(config.arena_min_change, config.arena_max_change),
        loss.clamp(config.arena_min_change, config.arena_max_change),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_ratings_split_k() {
        let config = EngineConfig::default();
        assert_eq!(rating_change(1000, 1000, &config), (16, 16));
    }

    #[test]
    fn test_upset_pays_more() {
        let config = EngineConfig::default();
        let (gain, loss) = rating_change(800, 1200, &config);
        assert_eq!(gain, 29);
        assert_eq!(loss, 3);
    }

    #[test]
    fn test_changes_clamped_to_minimum() {
        let config = EngineConfig::default();
        let (gain, _) = rating_change(3000, 0, &config);
        assert_eq!(gain, 1);
    }

    #[test]
    fn test_daily_reset() {
        let config = EngineConfig::default();
        let character = Character::new(Combatant::new("Duelist", 4, 30, 20, 20, 1));
        let mut entry = ArenaEntry::register(WorldId::Local("x".into()), &character, &config, 0);
        entry.battles_today = 5;
        assert_eq!(entry.battles_remaining(&config), 0);
        entry.roll_day(10);
        assert_eq!(entry.battles_today, 5);
        entry.roll_day(SECONDS_PER_DAY + 1);
        assert_eq!(entry.battles_remaining(&config), 5);
    }

    #[test]
    fn test_rating_floor() {
        let config = EngineConfig::default();
        let character = Character::new(Combatant::new("Duelist", 4, 30, 20, 20, 1));
        let mut entry = ArenaEntry::register(WorldId::Local("x".into()), &character, &config, 0);
        entry.rating = 10;
        entry.record_loss(16);
        assert_eq!(entry.rating, 0);
        assert_eq!(entry.losses, 1);
    }
}
