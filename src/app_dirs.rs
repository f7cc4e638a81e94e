use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "mathdrill";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/mathdrill`, or the platform data dir without a HOME
    pub fn state_dir() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME)
        } else {
            ProjectDirs::from("", "", APP_NAME)
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        }
    }

    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("mathdrill_config.json"))
    }

    pub fn db_path() -> PathBuf {
        Self::state_dir().join("highscores.db")
    }

    pub fn history_path() -> PathBuf {
        Self::state_dir().join("history.csv")
    }

    pub fn log_path() -> PathBuf {
        Self::state_dir().join("mathdrill.log")
    }
}
