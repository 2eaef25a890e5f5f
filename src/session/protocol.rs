//! Wire shapes for commands in and responses out

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::combat::machine::{CombatContext, CombatPhase};
use crate::combat::variant::FightVariant;
use crate::core::error::GameError;
use crate::core::types::GameMessage;
use crate::world::character::{xp_to_next_level, Character};
use crate::world::monster::Rarity;
use crate::world::town::Town;
use crate::world::village::{Village, VillagerRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Re-render the current screen
    Init,
    /// Pick a menu option by key
    Select,
    /// Free-form text (names, counts)
    Input,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameCommand {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(default)]
    pub value: String,
}

impl GameCommand {
    pub fn init() -> Self {
        Self {
            kind: CommandKind::Init,
            value: String::new(),
        }
    }

    pub fn select(value: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Select,
            value: value.into(),
        }
    }

    pub fn input(value: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Input,
            value: value.into(),
        }
    }

    pub fn is_init(&self) -> bool {
        self.kind == CommandKind::Init
    }

    /// `back` and `0` return to the parent menu
    pub fn is_back(&self) -> bool {
        let value = self.value.trim();
        value == "0" || value.eq_ignore_ascii_case("back")
    }

    pub fn trimmed(&self) -> &str {
        self.value.trim()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Menu,
    Combat,
    Narrative,
    Error,
    Exit,
    /// Pushed through the hub, never returned from a command
    Broadcast,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    pub key: String,
    pub label: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub name: String,
    pub level: i32,
    pub experience: i32,
    pub experience_to_next: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub stamina: i32,
    pub max_stamina: i32,
    pub gold: i32,
    pub resurrections: u32,
    pub location: Option<String>,
}

impl PlayerState {
    pub fn from_character(character: &Character, location: Option<&str>) -> Self {
        let fighter = &character.fighter;
        Self {
            name: fighter.name.clone(),
            level: fighter.level,
            experience: character.experience,
            experience_to_next: xp_to_next_level(fighter.level),
            hp: fighter.hp.current,
            max_hp: fighter.hp.total,
            mana: fighter.mana.current,
            max_mana: fighter.mana.total,
            stamina: fighter.stamina.current,
            max_stamina: fighter.stamina.total,
            gold: character.gold,
            resurrections: character.resurrections,
            location: location.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatView {
    pub turn: u32,
    pub variant: String,
    /// 0 guards, 1 monsters, 2 the mayor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duel_phase: Option<u8>,
    pub opponent: String,
    pub opponent_level: i32,
    pub opponent_hp: i32,
    pub opponent_max_hp: i32,
    pub opponent_rarity: Rarity,
    pub is_boss: bool,
    pub guards_joined: bool,
    pub picker_open: bool,
}

impl CombatView {
    pub fn from_context(ctx: &CombatContext) -> Self {
        let foe = &ctx.opponent;
        Self {
            turn: ctx.turn,
            variant: ctx.variant.label().to_string(),
            duel_phase: match ctx.variant {
                FightVariant::MayorDuel { phase } => Some(phase.index()),
                _ => None,
            },
            opponent: foe.name().to_string(),
            opponent_level: foe.level(),
            opponent_hp: foe.fighter.hp.current,
            opponent_max_hp: foe.fighter.hp.total,
            opponent_rarity: foe.rarity,
            is_boss: foe.is_boss,
            guards_joined: ctx.guards_joined,
            picker_open: matches!(ctx.phase, CombatPhase::AwaitingSelection(_)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VillageView {
    pub name: String,
    pub level: i32,
    pub experience: i32,
    pub harvesters: usize,
    pub guards: usize,
    pub defense: i32,
    pub traps: usize,
    pub stockpile: BTreeMap<String, i32>,
    pub last_tide_time: i64,
    pub tide_interval: i64,
}

impl VillageView {
    pub fn from_village(village: &Village) -> Self {
        Self {
            name: village.name.clone(),
            level: village.level,
            experience: village.experience,
            harvesters: village.count_role(VillagerRole::Harvester),
            guards: village.guard_count(),
            defense: village.total_defense(),
            traps: village.traps.len(),
            stockpile: village.stockpile.clone(),
            last_tide_time: village.last_tide_time,
            tide_interval: village.tide_interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TownView {
    pub name: String,
    pub mayor: Option<String>,
    pub treasury: i32,
    pub inn_guests: Vec<String>,
}

impl TownView {
    pub fn from_town(town: &Town) -> Self {
        Self {
            name: town.name.clone(),
            mayor: town.mayor.as_ref().map(|m| m.name().to_string()),
            treasury: town.treasury,
            inn_guests: town.inn_guests.iter().map(|g| g.name().to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateData {
    pub screen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat: Option<CombatView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub village: Option<VillageView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub town: Option<TownView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResponse {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    #[serde(default)]
    pub messages: Vec<GameMessage>,
    pub state: StateData,
    #[serde(default)]
    pub options: Vec<MenuOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl GameResponse {
    pub fn new(kind: ResponseKind, screen: impl Into<String>) -> Self {
        Self {
            kind,
            messages: Vec::new(),
            state: StateData {
                screen: screen.into(),
                ..StateData::default()
            },
            options: Vec::new(),
            prompt: None,
        }
    }

    pub fn menu(screen: impl Into<String>) -> Self {
        Self::new(ResponseKind::Menu, screen)
    }

    pub fn broadcast(screen: impl Into<String>, messages: Vec<GameMessage>) -> Self {
        Self::new(ResponseKind::Broadcast, screen).with_messages(messages)
    }

    pub fn message(mut self, message: GameMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_messages(mut self, messages: impl IntoIterator<Item = GameMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn option(mut self, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.options.push(MenuOption {
            key: key.into(),
            label: label.into(),
            enabled: true,
        });
        self
    }

    pub fn option_if(mut self, enabled: bool, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.options.push(MenuOption {
            key: key.into(),
            label: label.into(),
            enabled,
        });
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn player(mut self, character: &Character, location: Option<&str>) -> Self {
        self.state.player = Some(PlayerState::from_character(character, location));
        self
    }

    pub fn combat(mut self, ctx: &CombatContext) -> Self {
        self.state.combat = Some(CombatView::from_context(ctx));
        self
    }

    pub fn village(mut self, village: &Village) -> Self {
        self.state.village = Some(VillageView::from_village(village));
        self
    }

    pub fn town(mut self, town: &Town) -> Self {
        self.state.town = Some(TownView::from_town(town));
        self
    }

    pub fn screen(&self) -> &str {
        &self.state.screen
    }
}

impl GameError {
    /// Player-facing response for this error
    ///
    /// With `redisplay`, the error is prepended to the menu being shown
    /// again; without it, a bare error screen is returned.
    pub fn to_response(&self, redisplay: Option<GameResponse>) -> GameResponse {
        match redisplay {
            Some(mut menu) => {
                menu.kind = ResponseKind::Error;
                menu.messages.insert(0, self.to_message());
                menu
            }
            None => GameResponse::new(ResponseKind::Error, "error").message(self.to_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parses_from_json() {
        let cmd: GameCommand = serde_json::from_str(r#"{"type":"select","value":"2"}"#).unwrap();
        assert_eq!(cmd, GameCommand::select("2"));
        let init: GameCommand = serde_json::from_str(r#"{"type":"init"}"#).unwrap();
        assert!(init.is_init());
        assert!(GameCommand::select(" back ").is_back());
    }

    #[test]
    fn test_response_skips_empty_sections() {
        let response = GameResponse::menu("main_menu").option("1", "Hunt");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "menu");
        assert_eq!(json["state"]["screen"], "main_menu");
        assert!(json["state"].get("combat").is_none());
        assert!(json.get("prompt").is_none());
        assert_eq!(json["options"][0]["enabled"], true);
    }

    #[test]
    fn test_error_redisplays_menu() {
        let menu = GameResponse::menu("main_menu").option("1", "Hunt");
        let response = GameError::InvalidInput("nope".into()).to_response(Some(menu));
        assert_eq!(response.kind, ResponseKind::Error);
        assert_eq!(response.options.len(), 1);
        assert_eq!(response.messages[0].text, "Invalid input: nope");

        let bare = GameError::not_found("session", "x").to_response(None);
        assert_eq!(bare.screen(), "error");
    }
}
