//! The shared combatant shape used by players, monsters and guards

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::ops::Add;

use crate::combat::status::{EffectKind, StatusEffect};
use crate::core::error::{GameError, Result};

/// Elemental damage categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    #[default]
    Physical,
    Fire,
    Ice,
    Lightning,
    Poison,
}

impl DamageType {
    pub const ALL: [DamageType; 5] = [
        DamageType::Physical,
        DamageType::Fire,
        DamageType::Ice,
        DamageType::Lightning,
        DamageType::Poison,
    ];
}

/// How strongly a combatant resists one damage type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resistance {
    VeryResistant,
    Resistant,
    #[default]
    Normal,
    Weak,
}

impl Resistance {
    pub fn multiplier(self) -> f64 {
        match self {
            Resistance::VeryResistant => 0.25,
            Resistance::Resistant => 0.5,
            Resistance::Normal => 1.0,
            Resistance::Weak => 2.0,
        }
    }
}

/// Resistance table keyed by damage type; unlisted types are `Normal`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resistances(AHashMap<DamageType, Resistance>);

impl Resistances {
    pub fn get(&self, damage_type: DamageType) -> Resistance {
        self.0.get(&damage_type).copied().unwrap_or_default()
    }

    pub fn set(&mut self, damage_type: DamageType, resistance: Resistance) {
        if resistance == Resistance::Normal {
            self.0.remove(&damage_type);
        } else {
            self.0.insert(damage_type, resistance);
        }
    }

    pub fn with(mut self, damage_type: DamageType, resistance: Resistance) -> Self {
        self.set(damage_type, resistance);
        self
    }
}

/// Additive stat bonuses from equipment and buffs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatMod {
    pub attack_mod: i32,
    pub defense_mod: i32,
    pub hit_point_mod: i32,
}

impl StatMod {
    pub fn new(attack_mod: i32, defense_mod: i32, hit_point_mod: i32) -> Self {
        Self {
            attack_mod,
            defense_mod,
            hit_point_mod,
        }
    }

    /// Combat power rating used to compare gear
    pub fn power(&self) -> i32 {
        self.attack_mod + self.defense_mod + self.hit_point_mod
    }
}

impl Add for StatMod {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            attack_mod: self.attack_mod + rhs.attack_mod,
            defense_mod: self.defense_mod + rhs.defense_mod,
            hit_point_mod: self.hit_point_mod + rhs.hit_point_mod,
        }
    }
}

/// A depletable resource (hit points, mana or stamina)
///
/// `current` never exceeds `total` and never drops below zero when
/// mutated through the methods below.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub current: i32,
    pub total: i32,
    pub natural: i32,
}

impl Pool {
    pub fn new(amount: i32) -> Self {
        let amount = amount.max(0);
        Self {
            current: amount,
            total: amount,
            natural: amount,
        }
    }

    pub fn fill(&mut self) {
        self.current = self.total;
    }

    pub fn is_empty(&self) -> bool {
        self.current <= 0
    }

    /// Add up to `amount`, clamped to total. Returns the amount actually gained.
    pub fn gain(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = (self.current + amount.max(0)).min(self.total);
        self.current - before
    }

    /// Remove up to `amount`, clamped at zero. Returns the amount actually lost.
    pub fn lose(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = (self.current - amount.max(0)).max(0);
        before - self.current
    }

    /// Spend exactly `amount` or nothing
    pub fn spend(&mut self, amount: i32) -> bool {
        if amount > self.current {
            return false;
        }
        self.current -= amount.max(0);
        true
    }

    /// Change the total and pull current down to it if needed
    pub fn set_total(&mut self, total: i32) {
        self.total = total.max(0);
        self.current = self.current.clamp(0, self.total);
    }

    /// Raise the natural value; total tracks natural for unmodified pools
    pub fn grow(&mut self, amount: i32) {
        self.natural += amount;
        self.set_total(self.natural);
    }

    pub fn fraction(&self) -> f64 {
        if self.total <= 0 {
            return 0.0;
        }
        self.current as f64 / self.total as f64
    }
}

/// A combat skill; negative damage heals the caster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(default)]
    pub mana_cost: i32,
    #[serde(default)]
    pub stamina_cost: i32,
    #[serde(default)]
    pub damage: i32,
    #[serde(default)]
    pub damage_type: DamageType,
    #[serde(default)]
    pub effect: Option<StatusEffect>,
    #[serde(default)]
    pub description: String,
}

impl Skill {
    pub fn is_heal(&self) -> bool {
        self.damage < 0
    }

    /// Whether the attached effect lands on the caster rather than the target
    pub fn effect_targets_self(&self) -> bool {
        self.effect.map(|e| e.kind.is_beneficial()).unwrap_or(false)
    }
}

/// Anything that can fight: the player, a monster or a guard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub name: String,
    pub level: i32,
    pub hp: Pool,
    pub mana: Pool,
    pub stamina: Pool,
    pub attack_rolls: i32,
    pub defense_rolls: i32,
    #[serde(default)]
    pub stats_mod: StatMod,
    #[serde(default)]
    pub status_effects: Vec<StatusEffect>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub resistances: Resistances,
}

impl Combatant {
    pub fn new(name: impl Into<String>, level: i32, hp: i32, mana: i32, stamina: i32, rolls: i32) -> Self {
        Self {
            name: name.into(),
            level,
            hp: Pool::new(hp),
            mana: Pool::new(mana),
            stamina: Pool::new(stamina),
            attack_rolls: rolls,
            defense_rolls: rolls,
            stats_mod: StatMod::default(),
            status_effects: Vec::new(),
            skills: Vec::new(),
            resistances: Resistances::default(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp.current > 0
    }

    /// Stat contribution of the buffs currently active on this combatant
    pub fn buff_contribution(&self) -> StatMod {
        self.status_effects
            .iter()
            .fold(StatMod::default(), |acc, effect| match effect.kind {
                EffectKind::BuffAttack => acc + StatMod::new(effect.potency, 0, 0),
                EffectKind::BuffDefense => acc + StatMod::new(0, effect.potency, 0),
                _ => acc,
            })
    }

    /// Recompute modifiers and HP total from equipment plus active buffs
    pub fn recompute_totals(&mut self, equipment: StatMod) {
        self.stats_mod = equipment + self.buff_contribution();
        self.hp.set_total(self.hp.natural + self.stats_mod.hit_point_mod);
    }

    /// Fill every pool back to its total
    pub fn restore(&mut self) {
        self.hp.fill();
        self.mana.fill();
        self.stamina.fill();
    }

    pub fn can_afford(&self, skill: &Skill) -> bool {
        skill.mana_cost <= self.mana.current && skill.stamina_cost <= self.stamina.current
    }

    /// Deduct a skill's costs, or fail without touching either pool
    pub fn pay_for(&mut self, skill: &Skill) -> Result<()> {
        if skill.mana_cost > self.mana.current {
            return Err(GameError::insufficient(
                "mana",
                skill.mana_cost as i64,
                self.mana.current as i64,
            ));
        }
        if skill.stamina_cost > self.stamina.current {
            return Err(GameError::insufficient(
                "stamina",
                skill.stamina_cost as i64,
                self.stamina.current as i64,
            ));
        }
        self.mana.spend(skill.mana_cost);
        self.stamina.spend(skill.stamina_cost);
        Ok(())
    }

    pub fn take_damage(&mut self, amount: i32) -> i32 {
        self.hp.lose(amount)
    }

    pub fn heal(&mut self, amount: i32) -> i32 {
        self.hp.gain(amount)
    }

    pub fn find_skill(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn knows_skill(&self, name: &str) -> bool {
        self.find_skill(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::status::apply_effect;

    #[test]
    fn test_pool_clamps() {
        let mut pool = Pool::new(20);
        assert_eq!(pool.lose(25), 20);
        assert_eq!(pool.current, 0);
        assert_eq!(pool.gain(50), 20);
        assert_eq!(pool.current, 20);
    }

    #[test]
    fn test_pool_spend_is_all_or_nothing() {
        let mut pool = Pool::new(5);
        assert!(!pool.spend(6));
        assert_eq!(pool.current, 5);
        assert!(pool.spend(5));
        assert_eq!(pool.current, 0);
    }

    #[test]
    fn test_set_total_pulls_current_down() {
        let mut pool = Pool::new(30);
        pool.set_total(10);
        assert_eq!(pool.current, 10);
    }

    #[test]
    fn test_resistance_multipliers() {
        let res = Resistances::default()
            .with(DamageType::Fire, Resistance::Weak)
            .with(DamageType::Ice, Resistance::VeryResistant);
        assert_eq!(res.get(DamageType::Fire).multiplier(), 2.0);
        assert_eq!(res.get(DamageType::Ice).multiplier(), 0.25);
        assert_eq!(res.get(DamageType::Physical).multiplier(), 1.0);
    }

    #[test]
    fn test_recompute_totals_keeps_buffs() {
        let mut c = Combatant::new("Tester", 1, 20, 10, 10, 1);
        apply_effect(&mut c, StatusEffect::new(EffectKind::BuffAttack, 4, 3));
        c.recompute_totals(StatMod::new(2, 1, 5));
        assert_eq!(c.stats_mod.attack_mod, 6);
        assert_eq!(c.stats_mod.defense_mod, 1);
        assert_eq!(c.hp.total, 25);
        assert!(c.hp.current <= c.hp.total);
    }

    #[test]
    fn test_pay_for_reports_missing_resource() {
        let mut c = Combatant::new("Tester", 1, 20, 3, 10, 1);
        let skill = Skill {
            name: "Fireball".into(),
            mana_cost: 8,
            stamina_cost: 0,
            damage: 12,
            damage_type: DamageType::Fire,
            effect: None,
            description: String::new(),
        };
        assert!(!c.can_afford(&skill));
        let err = c.pay_for(&skill).unwrap_err();
        assert!(matches!(err, GameError::ResourceInsufficient { .. }));
        assert_eq!(c.mana.current, 3);
    }
}
