//! Dungeons: an ordered run of rooms ending in a boss

use serde::{Deserialize, Serialize};

use crate::world::item::Item;
use crate::world::monster::Monster;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Combat,
    Boss,
    Treasure,
    Rest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonRoom {
    pub kind: RoomKind,
    #[serde(default)]
    pub monster: Option<Monster>,
    #[serde(default)]
    pub treasure: Option<Item>,
    #[serde(default)]
    pub gold: i32,
    #[serde(default)]
    pub cleared: bool,
}

impl DungeonRoom {
    pub fn fight(monster: Monster, boss: bool) -> Self {
        Self {
            kind: if boss { RoomKind::Boss } else { RoomKind::Combat },
            monster: Some(monster),
            treasure: None,
            gold: 0,
            cleared: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dungeon {
    pub name: String,
    pub level: i32,
    pub rooms: Vec<DungeonRoom>,
    #[serde(default)]
    pub current_room: usize,
}

/// Bonus XP per room for clearing a whole dungeon
pub const DUNGEON_XP_PER_ROOM: i32 = 50;

impl Dungeon {
    pub fn current(&self) -> Option<&DungeonRoom> {
        self.rooms.get(self.current_room)
    }

    pub fn current_mut(&mut self) -> Option<&mut DungeonRoom> {
        self.rooms.get_mut(self.current_room)
    }

    /// Mark the current room cleared and move on
    pub fn clear_current(&mut self) {
        if let Some(room) = self.rooms.get_mut(self.current_room) {
            room.cleared = true;
        }
        self.current_room += 1;
    }

    pub fn is_complete(&self) -> bool {
        self.current_room >= self.rooms.len()
    }

    pub fn completion_xp(&self) -> i32 {
        self.rooms.len() as i32 * DUNGEON_XP_PER_ROOM
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::combatant::Combatant;

    #[test]
    fn test_dungeon_progression() {
        let mob = Monster::new(Combatant::new("Bat", 1, 5, 0, 0, 1), "Bat", 1);
        let mut dungeon = Dungeon {
            name: "Crypt".into(),
            level: 1,
            rooms: vec![
                DungeonRoom::fight(mob.clone(), false),
                DungeonRoom::fight(mob, true),
            ],
            current_room: 0,
        };
        assert_eq!(dungeon.current().map(|r| r.kind), Some(RoomKind::Combat));
        dungeon.clear_current();
        assert_eq!(dungeon.current().map(|r| r.kind), Some(RoomKind::Boss));
        dungeon.clear_current();
        assert!(dungeon.is_complete());
        assert!(dungeon.rooms.iter().all(|r| r.cleared));
        assert_eq!(dungeon.completion_xp(), 100);
    }
}
