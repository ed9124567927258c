use clap::ValueEnum;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::StoreError;
use crate::passages::Category;

pub const MIN_TIMER_SECS: u64 = 30;
pub const MAX_TIMER_SECS: u64 = 300;
pub const TIMER_STEP_SECS: u64 = 30;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Expert,
}

/// Nominal per-difficulty tuning. Recorded with results only; no metric
/// reads it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyModifier {
    pub time_bonus: f64,
    pub accuracy_required: u32,
}

impl Difficulty {
    pub fn modifier(self) -> DifficultyModifier {
        let (time_bonus, accuracy_required) = match self {
            Difficulty::Easy => (1.2, 85),
            Difficulty::Medium => (1.0, 90),
            Difficulty::Hard => (0.8, 95),
            Difficulty::Expert => (0.6, 98),
        };
        DifficultyModifier {
            time_bonus,
            accuracy_required,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Expert,
            Difficulty::Expert => Difficulty::Easy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub difficulty: Difficulty,
    pub category: Category,
    pub timer_mode: bool,
    pub timer_duration_secs: u64,
    pub sound_enabled: bool,
    pub custom_passage: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            category: Category::General,
            timer_mode: false,
            timer_duration_secs: 60,
            sound_enabled: true,
            custom_passage: None,
        }
    }
}

impl Config {
    /// Step the timer duration by one slider notch, staying in range.
    pub fn adjust_timer(&mut self, up: bool) {
        let secs = if up {
            self.timer_duration_secs.saturating_add(TIMER_STEP_SECS)
        } else {
            self.timer_duration_secs.saturating_sub(TIMER_STEP_SECS)
        };
        self.timer_duration_secs = secs.clamp(MIN_TIMER_SECS, MAX_TIMER_SECS);
    }

    /// Pulls hand-edited values back into range.
    pub fn normalized(mut self) -> Self {
        let secs = self
            .timer_duration_secs
            .clamp(MIN_TIMER_SECS, MAX_TIMER_SECS);
        if secs != self.timer_duration_secs {
            warn!(
                configured = self.timer_duration_secs,
                using = secs,
                "timer duration out of range"
            );
            self.timer_duration_secs = secs;
        }
        self
    }

    pub fn has_custom_passage(&self) -> bool {
        self.custom_passage
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "typerace") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("typerace_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        serde_json::from_slice::<Config>(&bytes)
            .map(Config::normalized)
            .unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "config unreadable, using defaults");
                Config::default()
            })
    }

    fn save(&self, cfg: &Config) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cfg = Config {
            difficulty: Difficulty::Expert,
            category: Category::Literature,
            timer_mode: true,
            timer_duration_secs: 120,
            sound_enabled: false,
            custom_passage: Some("hello there".into()),
        };
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{ "difficulty": "hard" }"#).unwrap();

        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.difficulty, Difficulty::Hard);
        assert_eq!(cfg.timer_duration_secs, 60);
        assert!(cfg.sound_enabled);
    }

    #[test]
    fn timer_adjustment_is_clamped() {
        let mut cfg = Config::default();
        cfg.adjust_timer(true);
        assert_eq!(cfg.timer_duration_secs, 90);
        for _ in 0..20 {
            cfg.adjust_timer(true);
        }
        assert_eq!(cfg.timer_duration_secs, MAX_TIMER_SECS);
        for _ in 0..20 {
            cfg.adjust_timer(false);
        }
        assert_eq!(cfg.timer_duration_secs, MIN_TIMER_SECS);
    }

    #[test]
    fn hand_edited_timer_is_clamped_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);

        fs::write(&path, br#"{ "timer_mode": true, "timer_duration_secs": 0 }"#).unwrap();
        let cfg = store.load();
        assert!(cfg.timer_mode);
        assert_eq!(cfg.timer_duration_secs, MIN_TIMER_SECS);

        fs::write(&path, br#"{ "timer_duration_secs": 1000 }"#).unwrap();
        assert_eq!(store.load().timer_duration_secs, MAX_TIMER_SECS);

        fs::write(&path, br#"{ "timer_duration_secs": 90 }"#).unwrap();
        assert_eq!(store.load().timer_duration_secs, 90);
    }

    #[test]
    fn difficulty_modifiers() {
        assert_eq!(Difficulty::Easy.modifier().accuracy_required, 85);
        assert_eq!(Difficulty::Expert.modifier().time_bonus, 0.6);
        assert_eq!(Difficulty::Expert.next(), Difficulty::Easy);
        assert_eq!(Difficulty::Hard.to_string(), "hard");
    }
}
