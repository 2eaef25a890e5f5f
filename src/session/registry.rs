//! The session table
//!
//! Lock order: the table lock is released before any session mutex is
//! taken. Lookups clone the session's `Arc` under a read lock and lock the
//! session afterwards, so dispatches to different sessions never wait on
//! each other and structural writes (insert, remove) are serialized.

use ahash::AHashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

use crate::core::error::{GameError, Result};
use crate::core::types::{SessionId, WorldId};
use crate::session::session::Session;

pub type SessionHandle = Arc<Mutex<Session>>;

/// Lock one session, recovering from a poisoned mutex
pub fn lock_session(handle: &SessionHandle) -> MutexGuard<'_, Session> {
    handle.lock().unwrap_or_else(|poisoned| {
        warn!("session lock poisoned; recovering");
        PoisonError::into_inner(poisoned)
    })
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<AHashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, AHashMap<SessionId, SessionHandle>> {
        self.sessions.read().unwrap_or_else(|poisoned| {
            warn!("session table lock poisoned; recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, AHashMap<SessionId, SessionHandle>> {
        self.sessions.write().unwrap_or_else(|poisoned| {
            warn!("session table lock poisoned; recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    pub fn insert(&self, session: Session) -> SessionId {
        let id = session.id;
        let world = session.world_id().clone();
        let previous = self.write().insert(id, Arc::new(Mutex::new(session)));
        debug_assert!(previous.is_none(), "session ids are never reused");
        info!(session = %id, %world, "session created");
        id
    }

    pub fn get(&self, id: &SessionId) -> Result<SessionHandle> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| GameError::not_found("session", id.to_string()))
    }

    pub fn remove(&self, id: &SessionId) -> Option<SessionHandle> {
        let removed = self.write().remove(id);
        if removed.is_some() {
            info!(session = %id, "session removed");
        }
        removed
    }

    /// Run `f` with exclusive access to one session
    pub fn with_session<T>(&self, id: &SessionId, f: impl FnOnce(&mut Session) -> T) -> Result<T> {
        let handle = self.get(id)?;
        let mut guard = lock_session(&handle);
        Ok(f(&mut guard))
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.read().keys().copied().collect()
    }

    /// Handles of every live session; the table lock is released on return
    pub fn handles(&self) -> Vec<(SessionId, SessionHandle)> {
        self.read().iter().map(|(id, h)| (*id, Arc::clone(h))).collect()
    }

    /// Live sessions attached to `world`
    pub fn in_world(&self, world: &WorldId) -> Vec<SessionId> {
        self.handles()
            .into_iter()
            .filter(|(_, handle)| lock_session(handle).world_id() == world)
            .map(|(id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::session::{GameRng, UiState};
    use crate::world::snapshot::{SharedWorld, WorldSnapshot};
    use rand::SeedableRng;

    fn session(world: &str) -> Session {
        let world = SharedWorld::new(WorldId::Local(world.into()), WorldSnapshot::default());
        Session::new(SessionId::new(), None, world, GameRng::seed_from_u64(0))
    }

    #[test]
    fn test_insert_lookup_remove() {
        let registry = SessionRegistry::new();
        let id = registry.insert(session("a"));
        assert!(registry.contains(&id));
        registry.with_session(&id, |s| s.go(UiState::MainMenu)).unwrap();
        let ui = registry.with_session(&id, |s| s.ui).unwrap();
        assert_eq!(ui, UiState::MainMenu);
        assert!(registry.remove(&id).is_some());
        assert!(matches!(registry.get(&id), Err(GameError::NotFound { .. })));
    }

    #[test]
    fn test_in_world_filters() {
        let registry = SessionRegistry::new();
        let a = registry.insert(session("a"));
        registry.insert(session("b"));
        assert_eq!(registry.in_world(&WorldId::Local("a".into())), vec![a]);
        assert_eq!(registry.len(), 2);
    }
}
