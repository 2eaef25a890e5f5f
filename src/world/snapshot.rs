//! The world snapshot shared by every session of one backing world
//!
//! Locations and villages are mutated both by player commands and by the
//! background sweeps. Every access goes through the snapshot's `RwLock`:
//! a sweep rewrites an entity under the write lock, so a reader sees the
//! entity either entirely before or entirely after the sweep.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::types::WorldId;
use crate::world::location::Location;
use crate::world::quest::Quest;
use crate::world::village::Village;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub locations: BTreeMap<String, Location>,
    pub villages: BTreeMap<String, Village>,
    pub quests: BTreeMap<String, Quest>,
}

/// Reference-counted handle to one world's snapshot
#[derive(Debug, Clone)]
pub struct SharedWorld {
    id: WorldId,
    inner: Arc<RwLock<WorldSnapshot>>,
}

impl SharedWorld {
    pub fn new(id: WorldId, snapshot: WorldSnapshot) -> Self {
        Self {
            id,
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    pub fn id(&self) -> &WorldId {
        &self.id
    }

    pub fn read(&self) -> RwLockReadGuard<'_, WorldSnapshot> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, WorldSnapshot> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether two handles point at the same snapshot
    pub fn same_as(&self, other: &SharedWorld) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let world = SharedWorld::new(WorldId::Local("a".into()), WorldSnapshot::default());
        let other = world.clone();
        world
            .write()
            .villages
            .insert("V".into(), Village::new("V", 0, 3600));
        assert!(other.read().villages.contains_key("V"));
        assert!(world.same_as(&other));
    }
}
