//! Trainer configuration.
//!
//! Values come from a TOML file; any key left out falls back to the default.
//!
//! ```toml
//! database = "/home/me/chess/woodpecker.sqlite"
//! staging = "/home/me/chess/staging.pgn"
//! player_names = ["gio", "gpiantoni"]
//! mastery_threshold = 10
//! cooldown_days = 0.8333
//! target_pool_size = 100
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_MASTERY_THRESHOLD: u32 = 10;
/// Twenty hours.
pub const DEFAULT_COOLDOWN_DAYS: f64 = 20.0 / 24.0;
pub const DEFAULT_TARGET_POOL_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// SQLite file. Move files live in a `tactics/` directory beside it.
    pub database: PathBuf,
    /// Flat PGN file drained by the importer.
    pub staging: PathBuf,
    /// Names the user plays under, matched against the `White`/`Black` headers.
    pub player_names: Vec<String>,
    /// Tactics with at least this many successes are retired.
    pub mastery_threshold: u32,
    /// A tactic attempted within this many days is skipped.
    pub cooldown_days: f64,
    /// Number of non-mastered tactics the importer keeps in the pool.
    pub target_pool_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            database: data_dir.join("woodpecker.sqlite"),
            staging: data_dir.join("staging.pgn"),
            player_names: Vec::new(),
            mastery_threshold: DEFAULT_MASTERY_THRESHOLD,
            cooldown_days: DEFAULT_COOLDOWN_DAYS,
            target_pool_size: DEFAULT_TARGET_POOL_SIZE,
        }
    }
}

impl Config {
    /// Read a TOML config file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: Config = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise from the default location if a
    /// file exists there, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.mastery_threshold == 0 {
            return Err(Error::Config(
                "mastery_threshold must be at least 1".into(),
            ));
        }
        if !self.cooldown_days.is_finite() || self.cooldown_days < 0.0 {
            return Err(Error::Config(format!(
                "cooldown_days must be a non-negative number, got {}",
                self.cooldown_days
            )));
        }
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "woodpecker")
}

fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("woodpecker.toml"))
}
