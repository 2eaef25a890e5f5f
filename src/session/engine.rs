//! The engine: one per process, shared by command dispatch and the sweeps
//!
//! Lock order, outermost first:
//!
//! 1. session table (`SessionRegistry`), released before anything below
//! 2. one session's mutex
//! 3. a world snapshot lock, or the town lock (never both at once)
//! 4. the broadcast table, held only to clone callbacks
//!
//! Sweeps never touch 1 or 2. They take a world snapshot lock (or the town
//! lock) for the duration of one mutation and release it before saving or
//! publishing.

use ahash::AHashMap;
use rand::SeedableRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{info, info_span, warn};

use crate::broadcast::{Audience, BroadcastHub, Delivery};
use crate::content::{ContentGenerator, StandardContent};
use crate::core::config::EngineConfig;
use crate::core::error::{GameError, Result};
use crate::core::types::{now_unix, AccountId, GameMessage, SessionId, WorldId};
use crate::persistence::{GameStore, LeaderboardEntry, MemoryStore};
use crate::session::handlers;
use crate::session::protocol::{GameCommand, GameResponse};
use crate::session::registry::{lock_session, SessionRegistry};
use crate::session::session::{GameRng, Session};
use crate::world::character::Character;
use crate::world::snapshot::{SharedWorld, WorldSnapshot};
use crate::world::town::{InnGuest, Town};

const TOWN_NAME: &str = "Millbrook";

pub struct Engine {
    config: EngineConfig,
    store: Arc<dyn GameStore>,
    content: Arc<dyn ContentGenerator>,
    sessions: SessionRegistry,
    hub: BroadcastHub,
    worlds: RwLock<AHashMap<WorldId, SharedWorld>>,
    town: Mutex<Town>,
    rng_counter: AtomicU64,
}

impl Engine {
    /// Build an engine, loading the town (or generating and saving a new one)
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn GameStore>,
        content: Arc<dyn ContentGenerator>,
    ) -> Result<Self> {
        config.validate().map_err(GameError::Config)?;
        let mut engine = Self {
            config,
            store,
            content,
            sessions: SessionRegistry::new(),
            hub: BroadcastHub::new(),
            worlds: RwLock::new(AHashMap::new()),
            town: Mutex::new(Town::new(TOWN_NAME)),
            rng_counter: AtomicU64::new(0),
        };

        let town = match engine.store.load_town()? {
            Some(town) => town,
            None => {
                let mut rng = engine.next_rng();
                let town = engine.content.town(&mut rng, TOWN_NAME, now_unix());
                if let Err(err) = engine.store.save_town(&town) {
                    warn!(%err, "could not save the new town");
                }
                town
            }
        };
        engine.town = Mutex::new(town);
        info!(
            sessions_seeded = engine.config.rng_seed.is_some(),
            "engine ready"
        );
        Ok(engine)
    }

    /// In-memory store and the built-in content catalog
    pub fn in_memory(config: EngineConfig) -> Result<Self> {
        Self::new(config, Arc::new(MemoryStore::new()), Arc::new(StandardContent::builtin()?))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn GameStore {
        self.store.as_ref()
    }

    pub fn content(&self) -> &dyn ContentGenerator {
        self.content.as_ref()
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn town(&self) -> MutexGuard<'_, Town> {
        self.town.lock().unwrap_or_else(|poisoned| {
            warn!("town lock poisoned; recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    /// A fresh RNG: `seed ^ n` for the n-th RNG when seeded, entropy otherwise
    pub fn next_rng(&self) -> GameRng {
        let n = self.rng_counter.fetch_add(1, Ordering::Relaxed);
        match self.config.rng_seed {
            Some(seed) => GameRng::seed_from_u64(seed ^ n),
            None => GameRng::from_entropy(),
        }
    }

    pub fn cached_world(&self, id: &WorldId) -> Option<SharedWorld> {
        self.worlds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Saved worlds plus any world only held in memory
    pub fn world_ids(&self) -> Result<Vec<WorldId>> {
        let mut ids = self.store.list_worlds()?;
        for id in self.worlds.read().unwrap_or_else(PoisonError::into_inner).keys() {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// The shared snapshot for `id`, loading or generating it on first use
    pub fn world(&self, id: &WorldId) -> Result<SharedWorld> {
        if let Some(world) = self.cached_world(id) {
            return Ok(world);
        }
        let mut worlds = self.worlds.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(world) = worlds.get(id) {
            return Ok(world.clone());
        }
        let world = SharedWorld::new(id.clone(), self.load_snapshot(id)?);
        worlds.insert(id.clone(), world.clone());
        Ok(world)
    }

    fn load_snapshot(&self, id: &WorldId) -> Result<WorldSnapshot> {
        if let Some(locations) = self.store.load_locations(id)? {
            return Ok(WorldSnapshot {
                locations,
                villages: self.store.load_all_villages(id)?,
                quests: self.store.load_quests(id)?,
            });
        }

        let mut rng = self.next_rng();
        let snapshot = self.content.world(&mut rng);
        info!(world = %id, locations = snapshot.locations.len(), "generated new world");
        let saved = self
            .store
            .save_locations(id, &snapshot.locations)
            .and_then(|()| self.store.save_quests(id, &snapshot.quests));
        if let Err(err) = saved {
            warn!(world = %id, %err, "could not save the new world");
        }
        Ok(snapshot)
    }

    /// Open a session on a single-player save
    pub fn create_local_session(&self, save_name: &str) -> Result<SessionId> {
        let save_name = save_name.trim();
        if save_name.is_empty() {
            return Err(GameError::InvalidInput("save name cannot be empty".into()));
        }
        self.open_session(WorldId::Local(save_name.to_string()), None)
    }

    /// Open a session on an account's world
    pub fn create_account_session(&self, account: AccountId) -> Result<SessionId> {
        self.open_session(WorldId::Account(account), Some(account))
    }

    fn open_session(&self, world_id: WorldId, account: Option<AccountId>) -> Result<SessionId> {
        let world = self.world(&world_id)?;
        let session = Session::new(SessionId::new(), account, world, self.next_rng());
        Ok(self.sessions.insert(session))
    }

    /// Run one command against one session; never fails
    pub fn process_command(&self, id: SessionId, command: GameCommand) -> GameResponse {
        let span = info_span!("session", session = %id);
        let _guard = span.enter();

        let handle = match self.sessions.get(&id) {
            Ok(handle) => handle,
            Err(err) => {
                warn!(%err, "command for unknown session");
                return err.to_response(None);
            }
        };
        let mut session = lock_session(&handle);
        handlers::dispatch(self, &mut session, &command)
    }

    /// Read-only view of one session
    pub fn inspect<T>(&self, id: &SessionId, f: impl FnOnce(&Session) -> T) -> Result<T> {
        self.sessions.with_session(id, |session| f(session))
    }

    pub fn save_session(&self, id: &SessionId) -> Result<()> {
        let handle = self.sessions.get(id)?;
        let session = lock_session(&handle);
        self.save_locked(&session)
    }

    /// Persist a session's character and its world; the first failure is returned
    pub(crate) fn save_locked(&self, session: &Session) -> Result<()> {
        let world_id = session.world_id().clone();
        let mut first_failure = None;
        let mut record = |result: Result<()>, what: &str| {
            if let Err(err) = result {
                warn!(world = %world_id, %err, "failed to save {}", what);
                first_failure.get_or_insert(err);
            }
        };

        if let Some(character) = &session.character {
            record(self.store.save_character(&world_id, character), "character");
            record(
                self.store
                    .update_leaderboard(LeaderboardEntry::from_character(&world_id, character)),
                "leaderboard",
            );
        }

        let (locations, quests, villages) = {
            let snapshot = session.world.read();
            (snapshot.locations.clone(), snapshot.quests.clone(), snapshot.villages.clone())
        };
        record(self.store.save_locations(&world_id, &locations), "locations");
        record(self.store.save_quests(&world_id, &quests), "quests");
        for village in villages.values() {
            record(self.store.save_village(&world_id, village), "village");
        }

        match first_failure {
            None => Ok(()),
            Some(GameError::PersistenceFailure(reason)) => Err(GameError::PersistenceFailure(reason)),
            Some(other) => Err(GameError::PersistenceFailure(other.to_string())),
        }
    }

    /// Save after a state change, turning a failure into a player-visible warning
    pub(crate) fn autosave(&self, session: &Session) -> Option<GameMessage> {
        self.save_locked(session)
            .err()
            .map(|err| GameMessage::error(format!("Warning: your progress was not saved ({})", err)))
    }

    pub fn save_town(&self) -> Result<()> {
        let town = self.town().clone();
        self.store.save_town(&town)
    }

    /// Close a session: hand back borrowed guards, check the character into
    /// the inn, save, and drop the subscription
    pub fn remove_session(&self, id: &SessionId) -> Result<()> {
        let handle = self.sessions.get(id)?;
        let saved = {
            let mut session = lock_session(&handle);
            handlers::hunt::return_guards(&mut session);
            session.combat = None;
            if let Some(character) = &session.character {
                self.check_into_inn(character, session.account);
            }
            self.save_locked(&session)
        };
        self.sessions.remove(id);
        self.hub.unsubscribe(id);
        saved
    }

    fn check_into_inn(&self, character: &Character, account: Option<AccountId>) {
        let guest = InnGuest::from_character(character, account, now_unix());
        let snapshot = {
            let mut town = self.town();
            town.remove_guest(guest.name());
            town.inn_guests.push(guest);
            town.clone()
        };
        if let Err(err) = self.store.save_town(&snapshot) {
            warn!(%err, "failed to save the town after check-in");
        }
    }

    pub fn subscribe(&self, id: SessionId, deliver: Delivery) -> Result<()> {
        let world = self.inspect(&id, |s| s.world_id().clone())?;
        self.hub.subscribe(id, world, deliver);
        Ok(())
    }

    pub fn unsubscribe(&self, id: &SessionId) -> bool {
        self.hub.unsubscribe(id)
    }

    /// Tell everyone else that `character` entered the game
    pub(crate) fn announce_join(&self, id: SessionId, character: &Character) -> usize {
        let text = format!("{} has entered the game! (Level {})", character.name(), character.level());
        info!(session = %id, character = %character.name(), "player joined");
        self.hub.publish(
            Audience::AllExcept(id),
            GameResponse::broadcast("player_joined", vec![GameMessage::system(text)]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Engine {
        let config = EngineConfig {
            rng_seed: Some(42),
            ..EngineConfig::default()
        };
        Engine::in_memory(config).unwrap()
    }

    #[test]
    fn test_sessions_share_one_world() {
        let engine = seeded();
        let a = engine.create_local_session("save").unwrap();
        let b = engine.create_local_session("save").unwrap();
        let wa = engine.inspect(&a, |s| s.world.clone()).unwrap();
        let wb = engine.inspect(&b, |s| s.world.clone()).unwrap();
        assert!(wa.same_as(&wb));
        assert!(!wa.read().locations.is_empty());
    }

    #[test]
    fn test_unknown_session_is_an_error_response() {
        let engine = seeded();
        let response = engine.process_command(SessionId::new(), GameCommand::init());
        assert_eq!(response.screen(), "error");
        assert!(response.messages[0].text.contains("session not found"));
    }

    #[test]
    fn test_seeded_rngs_repeat() {
        use rand::Rng;
        let mut a = seeded().next_rng();
        let mut b = seeded().next_rng();
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn test_empty_save_name_rejected() {
        let engine = seeded();
        assert!(matches!(
            engine.create_local_session("  "),
            Err(GameError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_town_generated_once() {
        let engine = seeded();
        assert!(engine.town().mayor.is_some());
        assert!(!engine.town().inn_guests.is_empty());
    }
}
