//! Per-player session state

use rand_chacha::ChaCha8Rng;

use crate::combat::combatant::Skill;
use crate::combat::machine::CombatContext;
use crate::core::error::{GameError, Result};
use crate::core::types::{AccountId, SessionId, WorldId};
use crate::tick::tide::TideTally;
use crate::world::character::Character;
use crate::world::snapshot::SharedWorld;

/// RNG owned by each session (and each sweep)
pub type GameRng = ChaCha8Rng;

/// Which screen the session is on; every state has exactly one handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiState {
    CharacterSelect,
    CharacterCreate,
    MainMenu,
    HuntLocation,
    HuntCount,
    GuardPrompt,
    Combat,
    CombatItemSelect,
    CombatSkillSelect,
    GuardianReward,
    ArenaMain,
    ArenaConfirm,
    Inn,
    MayorChallenge,
    DungeonSelect,
    DungeonRoom,
    VillageMain,
    VillageTideWave,
    AutoPlayLocation,
    Exit,
}

impl UiState {
    /// Screen label sent in `state.screen`
    pub fn screen(self) -> &'static str {
        match self {
            UiState::CharacterSelect => "character_select",
            UiState::CharacterCreate => "character_create",
            UiState::MainMenu => "main_menu",
            UiState::HuntLocation => "hunt_location",
            UiState::HuntCount => "hunt_count",
            UiState::GuardPrompt => "guard_prompt",
            UiState::Combat => "combat",
            UiState::CombatItemSelect => "combat_item_select",
            UiState::CombatSkillSelect => "combat_skill_select",
            UiState::GuardianReward => "guardian_reward",
            UiState::ArenaMain => "arena_main",
            UiState::ArenaConfirm => "arena_confirm",
            UiState::Inn => "inn",
            UiState::MayorChallenge => "mayor_challenge",
            UiState::DungeonSelect => "dungeon_select",
            UiState::DungeonRoom => "dungeon_room",
            UiState::VillageMain => "village_main",
            UiState::VillageTideWave => "village_tide_wave",
            UiState::AutoPlayLocation => "autoplay_location",
            UiState::Exit => "exit",
        }
    }
}

/// The single multi-step interaction a session may have open
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PendingInteraction {
    #[default]
    None,
    /// Location chosen, waiting for the number of fights
    HuntCount { location: String },
    /// Waiting for yes/no on bringing the village guards
    GuardPrompt { location: String, fights: u32 },
    /// A beaten guardian offers this skill
    GuardianReward { skill: Skill },
    /// Interactive tide defense in progress
    TideDefense {
        wave: u32,
        waves_total: u32,
        tally: TideTally,
    },
    /// Arena opponent picked, waiting for confirmation
    ArenaConfirm { world: WorldId, opponent: String },
    /// Autoplay location chosen, waiting for the fight count
    AutoplayCount { location: String },
}

impl PendingInteraction {
    pub fn is_none(&self) -> bool {
        matches!(self, PendingInteraction::None)
    }

    /// Clear and return the pending value
    pub fn take(&mut self) -> PendingInteraction {
        std::mem::take(self)
    }
}

pub struct Session {
    pub id: SessionId,
    pub account: Option<AccountId>,
    pub world: SharedWorld,
    pub character: Option<Character>,
    pub combat: Option<CombatContext>,
    pub ui: UiState,
    pub pending: PendingInteraction,
    /// Location of the current hunt, shown in the player panel
    pub location: Option<String>,
    pub rng: GameRng,
}

impl Session {
    pub fn new(id: SessionId, account: Option<AccountId>, world: SharedWorld, rng: GameRng) -> Self {
        Self {
            id,
            account,
            world,
            character: None,
            combat: None,
            ui: UiState::CharacterSelect,
            pending: PendingInteraction::None,
            location: None,
            rng,
        }
    }

    pub fn world_id(&self) -> &WorldId {
        self.world.id()
    }

    pub fn character(&self) -> Result<&Character> {
        self.character
            .as_ref()
            .ok_or_else(|| GameError::not_found("character", "no character selected"))
    }

    pub fn character_mut(&mut self) -> Result<&mut Character> {
        self.character
            .as_mut()
            .ok_or_else(|| GameError::not_found("character", "no character selected"))
    }

    /// Move to `ui`, dropping any pending interaction
    pub fn go(&mut self, ui: UiState) {
        self.ui = ui;
        self.pending = PendingInteraction::None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::snapshot::WorldSnapshot;
    use rand::SeedableRng;

    #[test]
    fn test_go_clears_pending() {
        let world = SharedWorld::new(WorldId::Local("t".into()), WorldSnapshot::default());
        let mut session = Session::new(SessionId::new(), None, world, GameRng::seed_from_u64(1));
        assert_eq!(session.ui, UiState::CharacterSelect);
        session.pending = PendingInteraction::HuntCount {
            location: "Forest".into(),
        };
        session.go(UiState::MainMenu);
        assert!(session.pending.is_none());
        assert!(session.character().is_err());
    }

    #[test]
    fn test_screen_labels_are_unique() {
        let all = [
            UiState::CharacterSelect,
            UiState::CharacterCreate,
            UiState::MainMenu,
            UiState::HuntLocation,
            UiState::HuntCount,
            UiState::GuardPrompt,
            UiState::Combat,
            UiState::CombatItemSelect,
            UiState::CombatSkillSelect,
            UiState::GuardianReward,
            UiState::ArenaMain,
            UiState::ArenaConfirm,
            UiState::Inn,
            UiState::MayorChallenge,
            UiState::DungeonSelect,
            UiState::DungeonRoom,
            UiState::VillageMain,
            UiState::VillageTideWave,
            UiState::AutoPlayLocation,
            UiState::Exit,
        ];
        let labels: std::collections::BTreeSet<_> = all.iter().map(|s| s.screen()).collect();
        assert_eq!(labels.len(), all.len());
    }
}
