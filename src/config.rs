use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::round::RoundSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub round_secs: u32,
    pub question_secs: u32,
    pub feedback_secs: u32,
}

impl Default for Config {
    fn default() -> Self {
        let settings = RoundSettings::default();
        Self {
            round_secs: settings.round_secs,
            question_secs: settings.question_secs,
            feedback_secs: settings.feedback_secs,
        }
    }
}

impl From<&Config> for RoundSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            round_secs: cfg.round_secs.max(1),
            question_secs: cfg.question_secs.max(1),
            feedback_secs: cfg.feedback_secs,
        }
    }
}

impl From<&RoundSettings> for Config {
    fn from(settings: &RoundSettings) -> Self {
        Self {
            round_secs: settings.round_secs,
            question_secs: settings.question_secs,
            feedback_secs: settings.feedback_secs,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
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
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice::<Config>(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable config");
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
