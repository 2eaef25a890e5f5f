//! Engine configuration with documented constants
//!
//! Every tuning number used by combat, rewards, the arena and the
//! background sweeps is collected here. Values can be overridden from a
//! TOML file; missing keys fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{GameError, Result};

/// Configuration for the engine and its background sweeps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === DAMAGE PIPELINE ===
    /// Percent chance a player attack is a critical hit (attack doubled)
    pub player_crit_chance: u32,

    /// Percent chance a monster basic attack is a critical hit
    pub monster_crit_chance: u32,

    /// Percent chance a guard attack is a critical hit
    pub guard_crit_chance: u32,

    // === TURN ALGORITHM ===
    /// Percent chance a monster tries a skill before falling back to a basic attack
    ///
    /// The skill is only used if the monster can pay its mana and stamina cost.
    pub monster_skill_chance: u32,

    /// Flee chance at equal level (percent)
    pub flee_base_chance: i32,

    /// Flee chance gained per level the player is above the opponent
    pub flee_level_step: i32,

    /// Lower clamp of the flee chance
    pub flee_min_chance: i32,

    /// Upper clamp of the flee chance
    pub flee_max_chance: i32,

    /// Multiplier applied to the player's own attack while defending
    pub defend_attack_multiplier: f64,

    /// Multiplier applied to the player's defense roll while defending
    pub defend_defense_multiplier: f64,

    /// Hard ceiling on turns for any automatically resolved fight
    ///
    /// Guarantees termination under regeneration stalemates.
    pub combat_turn_ceiling: u32,

    // === AI POLICY ===
    /// HP fraction below which the AI tries to heal
    pub ai_heal_threshold: f64,

    /// Turns (from 1) during which the AI opens with buff skills
    pub ai_opening_turns: u32,

    /// Percent chance the AI picks an affordable damage skill over a basic attack
    pub ai_offensive_skill_chance: u32,

    // === GUARDS ===
    /// Percent of incoming damage absorbed per healthy guard
    pub guard_absorb_per_guard: i32,

    /// Maximum percent of incoming damage guards can absorb together
    pub guard_absorb_cap: i32,

    /// HP percent at or below which a guard becomes injured
    pub guard_injury_threshold: i32,

    /// Fight resolutions (or upkeep sweeps) an injured guard needs to recover
    pub guard_recovery_turns: i32,

    // === REWARDS ===
    /// Percent chance of a health potion drop after a hunt win
    pub potion_drop_chance: u32,

    /// Percent chance of rescuing a villager after a hunt win
    pub villager_rescue_chance: u32,

    /// Village XP granted per rescued villager
    pub villager_rescue_xp: i32,

    /// Percent chance of discovering a locked location after a hunt win
    pub location_discovery_chance: u32,

    /// Percent chance a hunt encounter is a skill guardian
    pub skill_guardian_chance: u32,

    /// XP a monster gains per player level when it kills the player
    pub monster_kill_xp_per_level: i32,

    // === ARENA ===
    /// ELO K-factor
    pub arena_k_factor: f64,

    /// Smallest rating change for a single arena result
    pub arena_min_change: i32,

    /// Largest rating change for a single arena result
    pub arena_max_change: i32,

    /// Rating given to a fresh arena entry
    pub arena_start_rating: i32,

    /// Arena battles allowed per UTC day
    pub arena_max_battles_per_day: u32,

    // === BACKGROUND SWEEPS ===
    /// How often the harvest sweep wakes up (seconds)
    pub harvest_check_secs: u64,

    /// Minimum real time between two harvests of one village (seconds)
    ///
    /// The sweep may wake up more often than this; villages that were
    /// harvested less than this long ago are skipped.
    pub harvest_min_interval_secs: i64,

    /// Interval between monster tides for a new village (seconds)
    pub tide_interval_secs: i64,

    /// How often the tide sweep wakes up (seconds)
    pub tide_check_secs: u64,

    /// How often the upkeep sweep runs (seconds)
    pub upkeep_interval_secs: u64,

    /// How often the evolution sweep runs (seconds)
    pub evolution_interval_secs: u64,

    /// Inn guests older than this are expelled by upkeep (seconds)
    pub inn_guest_max_age_secs: i64,

    /// Upkeep tops the inn back up to this many NPC guests
    pub inn_min_npc_guests: usize,

    // === AUTOPLAY ===
    /// Hard fight-count ceiling for a single autoplay batch
    pub autoplay_max_fights: u32,

    // === RANDOMNESS ===
    /// Seed for all session and sweep RNGs; entropy when absent
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Damage pipeline
            player_crit_chance: 15,
            monster_crit_chance: 10,
            guard_crit_chance: 10,

            // Turn algorithm
            monster_skill_chance: 40,
            flee_base_chance: 50,
            flee_level_step: 5,
            flee_min_chance: 20,
            flee_max_chance: 90,
            defend_attack_multiplier: 0.5,
            defend_defense_multiplier: 1.5,
            combat_turn_ceiling: 200,

            // AI policy
            ai_heal_threshold: 0.4,
            ai_opening_turns: 2,
            ai_offensive_skill_chance: 50,

            // Guards
            guard_absorb_per_guard: 20,
            guard_absorb_cap: 60,
            guard_injury_threshold: 30,
            guard_recovery_turns: 3,

            // Rewards
            potion_drop_chance: 30,
            villager_rescue_chance: 15,
            villager_rescue_xp: 25,
            location_discovery_chance: 15,
            skill_guardian_chance: 1,
            monster_kill_xp_per_level: 100,

            // Arena
            arena_k_factor: 32.0,
            arena_min_change: 1,
            arena_max_change: 50,
            arena_start_rating: 1000,
            arena_max_battles_per_day: 5,

            // Sweeps
            harvest_check_secs: 15,
            harvest_min_interval_secs: 60,
            tide_interval_secs: 3600,
            tide_check_secs: 60,
            upkeep_interval_secs: 60,
            evolution_interval_secs: 300,
            inn_guest_max_age_secs: 24 * 3600,
            inn_min_npc_guests: 3,

            // Autoplay
            autoplay_max_fights: 100,

            rng_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; absent keys keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate().map_err(GameError::Config)?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.flee_min_chance > self.flee_max_chance {
            return Err(format!(
                "flee_min_chance ({}) must be <= flee_max_chance ({})",
                self.flee_min_chance, self.flee_max_chance
            ));
        }

        if self.flee_min_chance < 0 || self.flee_max_chance > 100 {
            return Err("flee chance bounds must lie within 0..=100".into());
        }

        let percents = [
            ("player_crit_chance", self.player_crit_chance),
            ("monster_crit_chance", self.monster_crit_chance),
            ("guard_crit_chance", self.guard_crit_chance),
            ("monster_skill_chance", self.monster_skill_chance),
            ("ai_offensive_skill_chance", self.ai_offensive_skill_chance),
            ("potion_drop_chance", self.potion_drop_chance),
            ("villager_rescue_chance", self.villager_rescue_chance),
            ("location_discovery_chance", self.location_discovery_chance),
            ("skill_guardian_chance", self.skill_guardian_chance),
        ];
        for (name, value) in percents {
            if value > 100 {
                return Err(format!("{} ({}) must be <= 100", name, value));
            }
        }

        if self.combat_turn_ceiling == 0 {
            return Err("combat_turn_ceiling must be positive".into());
        }

        if self.guard_absorb_cap > 100 || self.guard_absorb_per_guard < 0 {
            return Err("guard absorption must lie within 0..=100 percent".into());
        }

        if self.arena_min_change > self.arena_max_change {
            return Err(format!(
                "arena_min_change ({}) must be <= arena_max_change ({})",
                self.arena_min_change, self.arena_max_change
            ));
        }

        if self.harvest_check_secs == 0
            || self.tide_check_secs == 0
            || self.upkeep_interval_secs == 0
            || self.evolution_interval_secs == 0
        {
            return Err("sweep intervals must be positive".into());
        }

        Ok(())
    }
}
