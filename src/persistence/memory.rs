//! In-process store used by the binaries and tests

use ahash::AHashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::error::{GameError, Result};
use crate::core::types::WorldId;
use crate::persistence::{GameStore, LeaderboardEntry};
use crate::world::arena::ArenaEntry;
use crate::world::character::Character;
use crate::world::location::Location;
use crate::world::quest::Quest;
use crate::world::town::Town;
use crate::world::village::Village;

#[derive(Debug, Default)]
struct WorldRecord {
    characters: BTreeMap<String, Character>,
    locations: Option<BTreeMap<String, Location>>,
    quests: BTreeMap<String, Quest>,
    villages: BTreeMap<String, Village>,
}

#[derive(Debug, Default)]
struct StoreState {
    worlds: AHashMap<WorldId, WorldRecord>,
    town: Option<Town>,
    arena: BTreeMap<(WorldId, String), ArenaEntry>,
    leaderboard: Vec<LeaderboardEntry>,
}

/// Clone-on-read, clone-on-write store behind one lock
///
/// `set_fail_writes(true)` makes every write return `PersistenceFailure`,
/// which lets tests drive the failure paths of handlers and sweeps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Leaderboard sorted by level, then experience
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.read().leaderboard.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GameError::PersistenceFailure("store is rejecting writes".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.write().unwrap_or_else(PoisonError::into_inner))
    }
}

impl GameStore for MemoryStore {
    fn list_worlds(&self) -> Result<Vec<WorldId>> {
        let mut worlds: Vec<WorldId> = self.read().worlds.keys().cloned().collect();
        worlds.sort();
        Ok(worlds)
    }

    fn list_characters(&self, world: &WorldId) -> Result<Vec<String>> {
        Ok(self
            .read()
            .worlds
            .get(world)
            .map(|w| w.characters.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn load_character(&self, world: &WorldId, name: &str) -> Result<Character> {
        self.read()
            .worlds
            .get(world)
            .and_then(|w| w.characters.get(name))
            .cloned()
            .ok_or_else(|| GameError::not_found("character", name))
    }

    fn save_character(&self, world: &WorldId, character: &Character) -> Result<()> {
        self.write()?
            .worlds
            .entry(world.clone())
            .or_default()
            .characters
            .insert(character.name().to_string(), character.clone());
        Ok(())
    }

    fn load_locations(&self, world: &WorldId) -> Result<Option<BTreeMap<String, Location>>> {
        Ok(self.read().worlds.get(world).and_then(|w| w.locations.clone()))
    }

    fn save_locations(&self, world: &WorldId, locations: &BTreeMap<String, Location>) -> Result<()> {
        self.write()?.worlds.entry(world.clone()).or_default().locations = Some(locations.clone());
        Ok(())
    }

    fn load_quests(&self, world: &WorldId) -> Result<BTreeMap<String, Quest>> {
        Ok(self
            .read()
            .worlds
            .get(world)
            .map(|w| w.quests.clone())
            .unwrap_or_default())
    }

    fn save_quests(&self, world: &WorldId, quests: &BTreeMap<String, Quest>) -> Result<()> {
        self.write()?.worlds.entry(world.clone()).or_default().quests = quests.clone();
        Ok(())
    }

    fn load_all_villages(&self, world: &WorldId) -> Result<BTreeMap<String, Village>> {
        Ok(self
            .read()
            .worlds
            .get(world)
            .map(|w| w.villages.clone())
            .unwrap_or_default())
    }

    fn save_village(&self, world: &WorldId, village: &Village) -> Result<()> {
        self.write()?
            .worlds
            .entry(world.clone())
            .or_default()
            .villages
            .insert(village.name.clone(), village.clone());
        Ok(())
    }

    fn load_town(&self) -> Result<Option<Town>> {
        Ok(self.read().town.clone())
    }

    fn save_town(&self, town: &Town) -> Result<()> {
        self.write()?.town = Some(town.clone());
        Ok(())
    }

    fn update_leaderboard(&self, entry: LeaderboardEntry) -> Result<()> {
        let mut state = self.write()?;
        let board = &mut state.leaderboard;
        match board
            .iter_mut()
            .find(|e| e.world == entry.world && e.character_name == entry.character_name)
        {
            Some(existing) => *existing = entry,
            None => board.push(entry),
        }
        board.sort_by(|a, b| b.level.cmp(&a.level).then(b.experience.cmp(&a.experience)));
        Ok(())
    }

    fn arena_entry(&self, world: &WorldId, name: &str) -> Result<Option<ArenaEntry>> {
        Ok(self.read().arena.get(&(world.clone(), name.to_string())).cloned())
    }

    fn upsert_arena_entry(&self, entry: &ArenaEntry) -> Result<()> {
        self.write()?
            .arena
            .insert((entry.world.clone(), entry.character_name.clone()), entry.clone());
        Ok(())
    }

    fn arena_entries(&self) -> Result<Vec<ArenaEntry>> {
        Ok(self.read().arena.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::combatant::Combatant;

    fn world() -> WorldId {
        WorldId::Local("save1".into())
    }

    fn hero(name: &str, level: i32) -> Character {
        Character::new(Combatant::new(name, level, 20, 20, 20, 1))
    }

    #[test]
    fn test_read_your_writes() {
        let store = MemoryStore::new();
        store.save_character(&world(), &hero("Aria", 1)).unwrap();
        assert_eq!(store.list_characters(&world()).unwrap(), vec!["Aria".to_string()]);
        assert_eq!(store.load_character(&world(), "Aria").unwrap().level(), 1);
        assert!(matches!(
            store.load_character(&world(), "Nobody"),
            Err(GameError::NotFound { .. })
        ));
        assert_eq!(store.list_worlds().unwrap(), vec![world()]);
    }

    #[test]
    fn test_unsaved_world_has_no_locations() {
        let store = MemoryStore::new();
        assert!(store.load_locations(&world()).unwrap().is_none());
        store.save_locations(&world(), &BTreeMap::new()).unwrap();
        assert!(store.load_locations(&world()).unwrap().is_some());
    }

    #[test]
    fn test_failed_writes_leave_state_untouched() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let err = store.save_character(&world(), &hero("Aria", 1)).unwrap_err();
        assert!(matches!(err, GameError::PersistenceFailure(_)));
        assert!(store.list_characters(&world()).unwrap().is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_leaderboard_upserts_and_sorts() {
        let store = MemoryStore::new();
        store
            .update_leaderboard(LeaderboardEntry::from_character(&world(), &hero("Low", 2)))
            .unwrap();
        store
            .update_leaderboard(LeaderboardEntry::from_character(&world(), &hero("High", 9)))
            .unwrap();
        store
            .update_leaderboard(LeaderboardEntry::from_character(&world(), &hero("Low", 12)))
            .unwrap();
        let board = store.leaderboard();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].character_name, "Low");
        assert_eq!(board[0].level, 12);
    }
}
