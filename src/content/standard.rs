//! The stock content generator, driven by `data/content.toml`

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::combat::combatant::{Combatant, DamageType, Resistance, Resistances, Skill, StatMod};
use crate::combat::damage::{chance, multi_roll, roll_die};
use crate::combat::guards::Guard;
use crate::content::ContentGenerator;
use crate::core::error::{GameError, Result};
use crate::core::types::UnixSeconds;
use crate::world::character::Character;
use crate::world::dungeon::{Dungeon, DungeonRoom, RoomKind};
use crate::world::item::{Equipment, Item, EQUIPMENT_SLOTS};
use crate::world::location::{Location, LocationKind};
use crate::world::monster::{Monster, Rarity};
use crate::world::quest::Quest;
use crate::world::snapshot::WorldSnapshot;
use crate::world::town::{InnGuest, Mayor, Town};
use crate::world::village::{Villager, VillagerRole};

const BUILTIN_CATALOG: &str = include_str!("../../data/content.toml");

/// Monsters generated per wilderness location
pub const ROSTER_SIZE: usize = 20;

/// Levels of the NPC lodgers a fresh town opens with
const STARTING_GUEST_LEVELS: [i32; 4] = [3, 5, 8, 12];

const STARTING_TREASURY: i32 = 500;
const NPC_MAYOR_LEVEL: i32 = 10;

#[derive(Debug, Clone, Deserialize)]
struct ResistanceRow {
    damage_type: DamageType,
    level: Resistance,
}

#[derive(Debug, Clone, Deserialize)]
struct GatedSkill {
    min_level: i32,
    skill: Skill,
}

#[derive(Debug, Clone, Deserialize)]
struct Category {
    name: String,
    monsters: Vec<String>,
    #[serde(default)]
    materials: Vec<String>,
    #[serde(default)]
    drop_chance: u32,
    #[serde(default)]
    resistances: Vec<ResistanceRow>,
    #[serde(default)]
    skills: Vec<GatedSkill>,
}

impl Category {
    fn resistances(&self) -> Resistances {
        self.resistances
            .iter()
            .fold(Resistances::default(), |acc, row| acc.with(row.damage_type, row.level))
    }

    fn skills_for(&self, level: i32) -> Vec<Skill> {
        self.skills
            .iter()
            .filter(|gated| level >= gated.min_level)
            .map(|gated| gated.skill.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct LocationTemplate {
    name: String,
    #[serde(default)]
    kind: LocationKind,
    level_max: i32,
    rarity_max: i32,
    #[serde(default)]
    starting: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct DungeonTemplate {
    name: String,
    min_level: i32,
    max_level: i32,
    rank_max: i32,
    rooms: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct Catalog {
    guardian_names: Vec<String>,
    guard_names: Vec<String>,
    mayor_names: Vec<String>,
    first_names: Vec<String>,
    last_names: Vec<String>,
    item_prefixes: Vec<String>,
    slot_gear: Vec<Vec<String>>,
    harvest_types: Vec<String>,
    skills: Vec<Skill>,
    categories: Vec<Category>,
    locations: Vec<LocationTemplate>,
    dungeons: Vec<DungeonTemplate>,
    #[serde(default)]
    quests: Vec<Quest>,
}

impl Catalog {
    fn check(&self) -> Result<()> {
        let lists = [
            ("guardian_names", self.guardian_names.len()),
            ("guard_names", self.guard_names.len()),
            ("mayor_names", self.mayor_names.len()),
            ("first_names", self.first_names.len()),
            ("last_names", self.last_names.len()),
            ("item_prefixes", self.item_prefixes.len()),
            ("harvest_types", self.harvest_types.len()),
            ("skills", self.skills.len()),
            ("categories", self.categories.len()),
            ("dungeons", self.dungeons.len()),
        ];
        for (name, len) in lists {
            if len == 0 {
                return Err(GameError::Config(format!("content catalog: {} is empty", name)));
            }
        }
        if self.slot_gear.len() != EQUIPMENT_SLOTS as usize || self.slot_gear.iter().any(Vec::is_empty) {
            return Err(GameError::Config(format!(
                "content catalog: slot_gear needs {} non-empty lists",
                EQUIPMENT_SLOTS
            )));
        }
        if let Some(category) = self.categories.iter().find(|c| c.monsters.is_empty()) {
            return Err(GameError::Config(format!(
                "content catalog: category {} has no monsters",
                category.name
            )));
        }
        Ok(())
    }
}

/// Sum of d6 rolls, rolling again after every six
pub fn roll_until_six<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    let mut total = 0;
    loop {
        let roll = roll_die(rng);
        total += roll;
        if roll != 6 {
            return total;
        }
    }
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, list: &'a [String]) -> &'a str {
    list.choose(rng).map(String::as_str).unwrap_or_default()
}

/// "dire bear" -> "Dire Bear"
fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn scale(value: i32, factor: f64) -> i32 {
    (value as f64 * factor) as i32
}

/// Content generator backed by a parsed TOML catalog
#[derive(Debug, Clone)]
pub struct StandardContent {
    catalog: Catalog,
}

impl StandardContent {
    /// The catalog compiled into the crate
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let catalog: Catalog = toml::from_str(contents)?;
        catalog.check()?;
        Ok(Self { catalog })
    }

    fn category_of(&self, monster_type: &str) -> Option<&Category> {
        self.catalog.categories.iter().find(|c| {
            c.name.eq_ignore_ascii_case(monster_type) || c.monsters.iter().any(|m| m.eq_ignore_ascii_case(monster_type))
        })
    }

    fn starting_locations(&self) -> impl Iterator<Item = &LocationTemplate> {
        self.catalog.locations.iter().filter(|l| l.starting)
    }

    fn gear<R: Rng + ?Sized>(&self, rng: &mut R, count: i32, rarity: i32) -> Vec<Item> {
        (0..count.max(0)).map(|_| self.roll_item(rng, rarity)).collect()
    }

    fn roll_item<R: Rng + ?Sized>(&self, rng: &mut R, rarity: i32) -> Item {
        let slot = rng.gen_range(0..EQUIPMENT_SLOTS);
        let prefix = pick(rng, &self.catalog.item_prefixes);
        let base = pick(rng, &self.catalog.slot_gear[slot as usize]);

        let mut stats = StatMod::default();
        for _ in 0..rarity.max(0) {
            match rng.gen_range(0..3) {
                0 => stats.attack_mod += roll_until_six(rng),
                1 => stats.defense_mod += roll_until_six(rng),
                _ => stats.hit_point_mod += roll_until_six(rng),
            }
        }
        Item::equipment(format!("{} {}", prefix, base), rarity, slot, stats)
    }

    fn spawn<R: Rng + ?Sized>(&self, rng: &mut R, species: &str, level: i32, rank: i32) -> Monster {
        let rank = rank.max(1);
        let level = level.max(1);
        let mut fighter = Combatant::new(
            title_case(species),
            level,
            multi_roll(rng, rank),
            multi_roll(rng, rank) + 10,
            multi_roll(rng, rank) + 10,
            rank,
        );
        if let Some(category) = self.category_of(species) {
            fighter.skills = category.skills_for(level);
            fighter.resistances = category.resistances();
        }

        let mut mob = Monster::new(fighter, species, rank);
        let items = self.gear(rng, level / 10 + rank - 2, rank);
        mob.equip_all(items);
        mob.fighter.restore();
        mob
    }

    fn random_monster<R: Rng + ?Sized>(&self, rng: &mut R, level_max: i32, rank_max: i32) -> Monster {
        let level = rng.gen_range(1..=level_max.max(1));
        let rank = rng.gen_range(1..=rank_max.max(1));
        let category = self.catalog.categories.choose(rng);
        let species = category.map(|c| pick(rng, &c.monsters)).unwrap_or("monster");
        self.spawn(rng, species, level, rank)
    }

    /// Boss that opens `location` for whoever beats it
    fn location_guardian<R: Rng + ?Sized>(&self, rng: &mut R, template: &LocationTemplate) -> Monster {
        let level_max = if template.level_max > 0 { template.level_max } else { 30 };
        let rank_max = if template.rarity_max > 0 { template.rarity_max } else { 3 };
        let mut mob = self.random_monster(rng, level_max, rank_max);
        mob.fighter.name = format!("Guardian of {}", template.name);
        mob.fighter.hp.natural = scale(mob.fighter.hp.natural, 1.5);
        mob.is_boss = true;
        mob.unlocks_location = Some(template.name.clone());
        mob.recompute();
        mob.fighter.restore();
        mob
    }

    fn dungeon_boss<R: Rng + ?Sized>(&self, rng: &mut R, template: &DungeonTemplate, level: i32) -> Monster {
        let mut mob = self.random_monster(rng, level, template.rank_max);
        mob.fighter.level = level;
        mob.fighter.name = format!("{} Overlord", mob.fighter.name);
        mob.fighter.hp.natural *= 5;
        mob.fighter.attack_rolls *= 3;
        mob.fighter.defense_rolls *= 3;
        mob.fighter.mana.grow(mob.fighter.mana.natural * 2);
        mob.fighter.stamina.grow(mob.fighter.stamina.natural * 2);
        mob.rarity = Rarity::Legendary;
        mob.is_boss = true;
        mob.recompute();
        mob.fighter.restore();
        mob
    }

    fn npc_mayor<R: Rng + ?Sized>(&self, rng: &mut R) -> Mayor {
        let level = NPC_MAYOR_LEVEL;
        let fighter = Combatant::new(
            pick(rng, &self.catalog.mayor_names),
            level,
            50 + 10 * level,
            30 + 2 * level,
            30 + 2 * level,
            level / 5 + 2,
        );
        let mut equipment = Equipment::new();
        let mut spare = Vec::new();
        for item in self.gear(rng, 3, (2 + level / 5).min(5)) {
            equipment.equip_best(item, &mut spare);
        }

        let guards = (0..2).map(|_| self.guard_at(rng, level / 2)).collect();
        let monsters = (0..2).map(|_| self.random_monster(rng, level, 2)).collect();

        let mut mayor = Mayor {
            account: None,
            fighter,
            equipment,
            guards,
            monsters,
        };
        mayor.fighter.recompute_totals(mayor.equipment.stat_mod());
        mayor.fighter.restore();
        mayor
    }

    fn guard_at<R: Rng + ?Sized>(&self, rng: &mut R, level: i32) -> Guard {
        let level = level.max(1);
        let fighter = Combatant::new(
            pick(rng, &self.catalog.guard_names),
            level,
            20 + 5 * level,
            10 + 2 * level,
            10 + 2 * level,
            level / 5 + 1,
        );
        let mut guard = Guard {
            fighter,
            attack_bonus: 2 + level,
            defense_bonus: 2 + level,
            hire_cost: 50 + 25 * level,
            injured: false,
            recovery_time: 0,
            equipment: Equipment::new(),
            inventory: Vec::new(),
        };
        for item in self.gear(rng, (1 + level / 3).min(3), (1 + level / 5).min(5)) {
            guard.equipment.equip_best(item, &mut guard.inventory);
        }
        guard.recompute();
        guard.fighter.restore();
        guard
    }

    fn lodger<R: Rng + ?Sized>(&self, rng: &mut R, level: i32, now: UnixSeconds) -> InnGuest {
        let level = level.max(1);
        let rank = level / 3 + 1;
        let name = format!("{} {}", pick(rng, &self.catalog.first_names), pick(rng, &self.catalog.last_names));
        let mut fighter = Combatant::new(
            name,
            level,
            multi_roll(rng, rank) + 20,
            multi_roll(rng, rank) + 10,
            multi_roll(rng, rank) + 10,
            level / 5 + 1,
        );
        let mut equipment = Equipment::new();
        let mut spare = Vec::new();
        for item in self.gear(rng, (2 + level / 5).min(4), rank) {
            equipment.equip_best(item, &mut spare);
        }
        fighter.recompute_totals(equipment.stat_mod());
        fighter.restore();

        InnGuest {
            account: None,
            fighter,
            check_in_time: now,
            gold_carried: rng.gen_range(10..=10 + level * 10),
            equipment,
        }
    }
}

impl ContentGenerator for StandardContent {
    fn character(&self, rng: &mut dyn RngCore, name: &str) -> Character {
        let fighter = Combatant::new(name, 1, multi_roll(rng, 1), multi_roll(rng, 1) + 20, multi_roll(rng, 1) + 20, 1);
        let mut character = Character::new(fighter);
        if let Some(starter) = self.catalog.skills.first() {
            character.fighter.skills.push(starter.clone());
        }
        for template in &self.catalog.locations {
            if template.starting {
                character.known_locations.push(template.name.clone());
            } else {
                character.locked_locations.push(template.name.clone());
            }
        }
        if let Some(quest) = self.catalog.quests.first() {
            character.active_quests.push(quest.id.clone());
        }
        character
    }

    fn monster(&self, rng: &mut dyn RngCore, level_max: i32, rank_max: i32) -> Monster {
        self.random_monster(rng, level_max, rank_max)
    }

    fn named_monster(&self, rng: &mut dyn RngCore, name: &str, level: i32, rank: i32) -> Monster {
        self.spawn(rng, name, level, rank)
    }

    fn skill_guardian(&self, rng: &mut dyn RngCore, skill: Skill, level: i32, rank: i32) -> Monster {
        let rank = rank.max(1);
        let name = pick(rng, &self.catalog.guardian_names).to_string();
        let fighter = Combatant::new(
            name,
            level.max(1),
            multi_roll(rng, rank) * 2,
            scale(multi_roll(rng, rank) + 10, 1.5),
            scale(multi_roll(rng, rank) + 10, 1.5),
            rank + 2,
        );
        let mut mob = Monster::new(fighter, "Guardian", rank);
        let items = self.gear(rng, rank + 2, rank + 1);
        mob.equip_all(items);
        mob.guarded_skill = Some(skill);
        mob.fighter.restore();
        mob
    }

    fn learnable_skills(&self) -> &[Skill] {
        &self.catalog.skills
    }

    fn item(&self, rng: &mut dyn RngCore, rarity: i32) -> Item {
        self.roll_item(rng, rarity)
    }

    fn guard(&self, rng: &mut dyn RngCore, level: i32) -> Guard {
        self.guard_at(rng, level)
    }

    fn villager(&self, rng: &mut dyn RngCore, role: VillagerRole) -> Villager {
        let name = format!("{} {}", pick(rng, &self.catalog.first_names), pick(rng, &self.catalog.last_names));
        let harvest_type = match role {
            VillagerRole::Harvester => Some(pick(rng, &self.catalog.harvest_types).to_string()),
            VillagerRole::Guard => None,
        };
        Villager {
            name,
            role,
            level: 1,
            efficiency: rng.gen_range(1..=3),
            harvest_type,
        }
    }

    fn material_drop(&self, rng: &mut dyn RngCore, monster_type: &str) -> Option<String> {
        let category = self.category_of(monster_type)?;
        if category.materials.is_empty() || !chance(rng, category.drop_chance) {
            return None;
        }
        Some(pick(rng, &category.materials).to_string())
    }

    fn dungeon(&self, rng: &mut dyn RngCore, player_level: i32) -> Dungeon {
        // Hardest template the player qualifies for, else the easiest one
        let template = self
            .catalog
            .dungeons
            .iter()
            .filter(|d| d.min_level <= player_level)
            .max_by_key(|d| d.min_level)
            .or_else(|| self.catalog.dungeons.iter().min_by_key(|d| d.min_level));
        let Some(template) = template else {
            return Dungeon {
                name: "Empty Cellar".into(),
                level: player_level,
                rooms: Vec::new(),
                current_room: 0,
            };
        };

        let level = player_level.clamp(template.min_level, template.max_level);
        let room_count = template.rooms.max(1);
        let mut rooms = Vec::with_capacity(room_count);
        for _ in 0..room_count - 1 {
            // combat 55, treasure 15, rest 10
            let room = match rng.gen_range(0..80) {
                0..=54 => DungeonRoom::fight(self.random_monster(rng, level, template.rank_max), false),
                55..=69 => DungeonRoom {
                    kind: RoomKind::Treasure,
                    monster: None,
                    treasure: Some(self.roll_item(rng, template.rank_max)),
                    gold: rng.gen_range(10..=30) * template.rank_max,
                    cleared: false,
                },
                _ => DungeonRoom {
                    kind: RoomKind::Rest,
                    monster: None,
                    treasure: None,
                    gold: 0,
                    cleared: false,
                },
            };
            rooms.push(room);
        }
        rooms.push(DungeonRoom::fight(self.dungeon_boss(rng, template, level), true));

        Dungeon {
            name: template.name.clone(),
            level,
            rooms,
            current_room: 0,
        }
    }

    fn inn_guest(&self, rng: &mut dyn RngCore, level: i32, now: UnixSeconds) -> InnGuest {
        self.lodger(rng, level, now)
    }

    fn town(&self, rng: &mut dyn RngCore, name: &str, now: UnixSeconds) -> Town {
        let mut town = Town::new(name);
        town.treasury = STARTING_TREASURY;
        for level in STARTING_GUEST_LEVELS {
            town.inn_guests.push(self.lodger(rng, level, now));
        }
        town.mayor = Some(self.npc_mayor(rng));
        town
    }

    fn world(&self, rng: &mut dyn RngCore) -> WorldSnapshot {
        let mut locations = BTreeMap::new();
        for template in &self.catalog.locations {
            let monsters = if template.kind == LocationKind::Base {
                Vec::new()
            } else {
                (0..ROSTER_SIZE)
                    .map(|_| self.random_monster(rng, template.level_max, template.rarity_max))
                    .collect()
            };
            locations.insert(
                template.name.clone(),
                Location {
                    name: template.name.clone(),
                    kind: template.kind,
                    level_max: template.level_max,
                    rarity_max: template.rarity_max,
                    monsters,
                    last_evolution_time: 0,
                },
            );
        }

        // Each locked location is gated by a guardian hiding in a starting area
        let hosts: Vec<String> = self
            .starting_locations()
            .filter(|l| l.kind != LocationKind::Base)
            .map(|l| l.name.clone())
            .collect();
        for template in self.catalog.locations.iter().filter(|l| !l.starting) {
            let Some(host) = hosts.choose(rng) else {
                break;
            };
            let guardian = self.location_guardian(rng, template);
            if let Some(location) = locations.get_mut(host) {
                let index = rng.gen_range(0..location.monsters.len().max(1));
                location.replace_monster(index, guardian);
            }
        }

        let quests = self
            .catalog
            .quests
            .iter()
            .map(|q| (q.id.clone(), q.clone()))
            .collect();

        WorldSnapshot {
            locations,
            villages: BTreeMap::new(),
            quests,
        }
    }
}
