use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "typerace";

/// Where persistent state lives: `$HOME/.local/state/typerace`, falling
/// back to the platform data dir.
pub struct AppDirs;

impl AppDirs {
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("leaderboard.db"))
    }

    pub fn achievements_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("achievements.json"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("typerace.log"))
    }
}
