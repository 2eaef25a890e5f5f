//! Damage pipeline
//!
//! One function turns an attack and a defense into final damage. Weapon
//! attacks, skills, guard volleys and monster attacks all go through
//! `resolve_strike`; callers only differ in the `Strike` they build.
//!
//! 1. Attack = sum of N d6 + modifier (or a fixed skill value)
//! 2. A critical hit doubles the rolled attack
//! 3. Defense = sum of M d6 + modifier (skills are unopposed)
//! 4. Attack <= defense is a miss: zero damage
//! 5. Otherwise (attack - defense) x resistance multiplier, floored

use rand::Rng;

use crate::combat::combatant::{Combatant, DamageType, Resistance, Resistances};

pub const DIE_SIDES: i32 = 6;

pub fn roll_die<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    rng.gen_range(1..=DIE_SIDES)
}

/// Sum of `rolls` independent d6
pub fn multi_roll<R: Rng + ?Sized>(rng: &mut R, rolls: i32) -> i32 {
    (0..rolls.max(0)).map(|_| roll_die(rng)).sum()
}

/// Percent roll: true with probability `percent`/100
pub fn chance<R: Rng + ?Sized>(rng: &mut R, percent: u32) -> bool {
    rng.gen_range(0..100) < percent
}

/// Where the attack value of a strike comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttackSource {
    Rolled {
        rolls: i32,
        modifier: i32,
        crit_chance: u32,
    },
    /// Skill damage; never crits
    Fixed(i32),
}

/// Where the defense value of a strike comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefenseSource {
    Rolled { rolls: i32, modifier: i32 },
    Unopposed,
}

/// Everything the pipeline needs to resolve one hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strike {
    pub attack: AttackSource,
    pub defense: DefenseSource,
    pub damage_type: DamageType,
    pub attack_multiplier: f64,
    pub defense_multiplier: f64,
}

impl Strike {
    /// Basic weapon attack from `attacker`'s rolls and attack modifier
    pub fn weapon(attacker: &Combatant, crit_chance: u32) -> Self {
        Self {
            attack: AttackSource::Rolled {
                rolls: attacker.attack_rolls,
                modifier: attacker.stats_mod.attack_mod,
                crit_chance,
            },
            defense: DefenseSource::Unopposed,
            damage_type: DamageType::Physical,
            attack_multiplier: 1.0,
            defense_multiplier: 1.0,
        }
    }

    /// Skill damage that bypasses the defense roll
    pub fn fixed(amount: i32, damage_type: DamageType) -> Self {
        Self {
            attack: AttackSource::Fixed(amount),
            defense: DefenseSource::Unopposed,
            damage_type,
            attack_multiplier: 1.0,
            defense_multiplier: 1.0,
        }
    }

    /// Oppose the strike with `defender`'s defense roll
    pub fn against(mut self, defender: &Combatant) -> Self {
        self.defense = DefenseSource::Rolled {
            rolls: defender.defense_rolls,
            modifier: defender.stats_mod.defense_mod,
        };
        self
    }

    /// Flat bonus on a rolled attack
    pub fn with_bonus(mut self, bonus: i32) -> Self {
        if let AttackSource::Rolled { modifier, .. } = &mut self.attack {
            *modifier += bonus;
        }
        self
    }

    pub fn scale_attack(mut self, multiplier: f64) -> Self {
        self.attack_multiplier = multiplier;
        self
    }

    pub fn scale_defense(mut self, multiplier: f64) -> Self {
        self.defense_multiplier = multiplier;
        self
    }

    pub fn typed(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }
}

/// Outcome of one strike
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrikeResult {
    pub attack: i32,
    pub defense: i32,
    pub critical: bool,
    /// False when attack <= defense
    pub landed: bool,
    pub damage: i32,
}

/// Scale raw damage by a resistance category, floored and non-negative
pub fn apply_resistance(raw: i32, resistance: Resistance) -> i32 {
    (raw.max(0) as f64 * resistance.multiplier()).floor() as i32
}

/// Resolve one strike against a resistance table
pub fn resolve_strike<R: Rng + ?Sized>(
    rng: &mut R,
    strike: &Strike,
    resistances: &Resistances,
) -> StrikeResult {
    let (raw_attack, critical) = match strike.attack {
        AttackSource::Rolled {
            rolls,
            modifier,
            crit_chance,
        } => {
            let base = multi_roll(rng, rolls) + modifier;
            if chance(rng, crit_chance) {
                (base * 2, true)
            } else {
                (base, false)
            }
        }
        AttackSource::Fixed(amount) => (amount, false),
    };
    let attack = (raw_attack as f64 * strike.attack_multiplier) as i32;

    let defense = match strike.defense {
        DefenseSource::Rolled { rolls, modifier } => {
            ((multi_roll(rng, rolls) + modifier) as f64 * strike.defense_multiplier) as i32
        }
        DefenseSource::Unopposed => 0,
    };

    if attack <= defense {
        return StrikeResult {
            attack,
            defense,
            critical,
            landed: false,
            damage: 0,
        };
    }

    let damage = apply_resistance(attack - defense, resistances.get(strike.damage_type));
    StrikeResult {
        attack,
        defense,
        critical,
        landed: true,
        damage,
    }
}
