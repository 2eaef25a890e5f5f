use serde::{Deserialize, Serialize};

/// What a quest asks for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestRequirement {
    /// Defeat `target` monsters of a type (any type when `monster_type` is empty)
    Kill { monster_type: String, target: u32, current: u32 },
    /// Reach a character level
    Level { target: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,
    pub name: String,
    pub requirement: QuestRequirement,
    pub reward_xp: i32,
    #[serde(default)]
    pub completed: bool,
}

impl Quest {
    /// Count a kill; returns true when this kill completes the quest
    pub fn record_kill(&mut self, monster_type: &str) -> bool {
        if self.completed {
            return false;
        }
        if let QuestRequirement::Kill {
            monster_type: wanted,
            target,
            current,
        } = &mut self.requirement
        {
            if wanted.is_empty() || wanted.eq_ignore_ascii_case(monster_type) {
                *current += 1;
                if *current >= *target {
                    self.completed = true;
                    return true;
                }
            }
        }
        false
    }

    /// Check a level requirement; returns true when newly completed
    pub fn check_level(&mut self, level: i32) -> bool {
        if self.completed {
            return false;
        }
        if let QuestRequirement::Level { target } = self.requirement {
            if level >= target {
                self.completed = true;
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_quest_completes_once() {
        let mut q = Quest {
            id: "q1".into(),
            name: "Rat Catcher".into(),
            requirement: QuestRequirement::Kill {
                monster_type: "Rat".into(),
                target: 2,
                current: 0,
            },
            reward_xp: 50,
            completed: false,
        };
        assert!(!q.record_kill("Goblin"));
        assert!(!q.record_kill("rat"));
        assert!(q.record_kill("Rat"));
        assert!(!q.record_kill("Rat"));
    }

    #[test]
    fn test_level_quest() {
        let mut q = Quest {
            id: "q2".into(),
            name: "Seasoned".into(),
            requirement: QuestRequirement::Level { target: 5 },
            reward_xp: 100,
            completed: false,
        };
        assert!(!q.check_level(4));
        assert!(q.check_level(5));
        assert!(!q.check_level(6));
    }
}
