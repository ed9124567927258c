use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StoreError;
use crate::metrics::MetricsSnapshot;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AchievementId {
    FirstRace,
    SpeedDemon,
    Perfectionist,
    LightningFast,
    ConsistencyKing,
    StreakMaster,
}

/// A static achievement: unlocks the first time `requirement` holds for a
/// snapshot.
#[derive(Debug)]
pub struct AchievementDefinition {
    pub id: AchievementId,
    pub title: &'static str,
    pub description: &'static str,
    pub requirement: fn(&MetricsSnapshot) -> bool,
}

/// Evaluated in this order every tick.
pub static ACHIEVEMENTS: [AchievementDefinition; 6] = [
    AchievementDefinition {
        id: AchievementId::FirstRace,
        title: "First Steps",
        description: "Complete your first typing race",
        requirement: |s: &MetricsSnapshot| s.completion >= 100.0,
    },
    AchievementDefinition {
        id: AchievementId::SpeedDemon,
        title: "Speed Demon",
        description: "Reach 80+ WPM",
        requirement: |s: &MetricsSnapshot| s.wpm >= 80,
    },
    AchievementDefinition {
        id: AchievementId::Perfectionist,
        title: "Perfectionist",
        description: "Achieve 100% accuracy",
        requirement: |s: &MetricsSnapshot| s.accuracy == 100 && s.total_chars > 50,
    },
    AchievementDefinition {
        id: AchievementId::LightningFast,
        title: "Lightning Fast",
        description: "Reach 100+ WPM",
        requirement: |s: &MetricsSnapshot| s.wpm >= 100,
    },
    AchievementDefinition {
        id: AchievementId::ConsistencyKing,
        title: "Consistency King",
        description: "Maintain consistent speed throughout",
        requirement: |s: &MetricsSnapshot| s.consistency >= 90,
    },
    AchievementDefinition {
        id: AchievementId::StreakMaster,
        title: "Streak Master",
        description: "Get 50+ correct characters in a row",
        requirement: |s: &MetricsSnapshot| s.longest_run >= 50,
    },
];

pub fn definition(id: AchievementId) -> &'static AchievementDefinition {
    ACHIEVEMENTS
        .iter()
        .find(|def| def.id == id)
        .unwrap_or(&ACHIEVEMENTS[0])
}

/// Which achievements are unlocked. Monotonic: ids are only ever added,
/// except through an explicit [`AchievementState::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementState {
    unlocked: BTreeSet<AchievementId>,
}

impl AchievementState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_unlocked(&self, id: AchievementId) -> bool {
        self.unlocked.contains(&id)
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked.len()
    }

    /// Flips every not-yet-unlocked achievement whose requirement holds and
    /// returns the newly unlocked ids in table order.
    pub fn evaluate(&mut self, snapshot: &MetricsSnapshot) -> Vec<AchievementId> {
        let mut newly = Vec::new();
        for def in ACHIEVEMENTS.iter() {
            if self.unlocked.contains(&def.id) {
                continue;
            }
            if (def.requirement)(snapshot) {
                self.unlocked.insert(def.id);
                newly.push(def.id);
            }
        }
        newly
    }

    /// Clears the whole profile. Never called by a race reset.
    pub fn reset(&mut self) {
        self.unlocked.clear();
    }

    /// (definition, unlocked) pairs in table order, for display.
    pub fn entries(&self) -> impl Iterator<Item = (&'static AchievementDefinition, bool)> + '_ {
        ACHIEVEMENTS
            .iter()
            .map(move |def| (def, self.unlocked.contains(&def.id)))
    }
}

pub trait AchievementStore {
    fn load(&self) -> AchievementState;
    fn save(&self, state: &AchievementState) -> Result<(), StoreError>;
}

/// Keeps unlocks in a json file so they survive restarts.
#[derive(Debug, Clone)]
pub struct FileAchievementStore {
    path: PathBuf,
}

impl FileAchievementStore {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl AchievementStore for FileAchievementStore {
    fn load(&self) -> AchievementState {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return AchievementState::default(),
        };
        match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable achievements file");
                AchievementState::default()
            }
        }
    }

    fn save(&self, state: &AchievementState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(state)?)?;
        Ok(())
    }
}

/// Discards unlocks when the program exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct EphemeralAchievementStore;

impl AchievementStore for EphemeralAchievementStore {
    fn load(&self) -> AchievementState {
        AchievementState::default()
    }

    fn save(&self, _state: &AchievementState) -> Result<(), StoreError> {
        Ok(())
    }
}
