//! Configuration loading.
//!
//! Precedence, highest first:
//! 1. Command-line flags (applied by the binary)
//! 2. Environment variables (`CONJUGA_DB`, `CONJUGA_REGION`, `CONJUGA_LEVEL`)
//! 3. Config file at `$CONJUGA_CONFIG` or `<config_dir>/conjuga/config.toml`
//! 4. Defaults
//!
//! Everything is optional. A missing or malformed file means defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analytics::AnalyticsConfig;
use crate::corpus::Corpus;
use crate::error::{ConjugaError, FailOpen, Result};
use crate::models::{Level, Region, Settings};
use crate::srs::{ExpertModeOverrides, SrsConfig};

pub const DEFAULT_DB_NAME: &str = "conjuga.db";
pub const DEFAULT_USER_ID: &str = "local";
const APP_DIR: &str = "conjuga";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user_id: String,
    pub db_path: Option<PathBuf>,
    /// JSON corpus replacing the built-in verbs.
    pub corpus_path: Option<PathBuf>,
    /// Default drill settings.
    pub settings: Settings,
    /// Expert Mode scheduling overrides.
    pub srs: ExpertModeOverrides,
    pub analytics: AnalyticsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_USER_ID.to_string(),
            db_path: None,
            corpus_path: None,
            settings: Settings::default(),
            srs: ExpertModeOverrides::default(),
            analytics: AnalyticsConfig::default(),
        }
    }
}

fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn config_path() -> PathBuf {
    match env::var("CONJUGA_CONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => app_dir().join("config.toml"),
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    /// Load `path` if it exists, then apply environment overrides.
    pub fn load_from(path: &Path) -> Self {
        let mut config = if path.exists() {
            Self::load_from_file(path).fail_open_default("loading config")
        } else {
            Config::default()
        };
        config.apply_env_overrides();
        config
    }

    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Config> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = env::var("CONJUGA_DB") {
            self.db_path = Some(PathBuf::from(path));
        }

        if let Ok(val) = env::var("CONJUGA_REGION") {
            match Region::from_str(&val) {
                Some(region) => self.settings.region = region,
                None => log::warn!(
                    "invalid CONJUGA_REGION '{}', keeping '{}'",
                    val,
                    self.settings.region.as_str()
                ),
            }
        }

        if let Ok(val) = env::var("CONJUGA_LEVEL") {
            match Level::from_str(&val) {
                Some(level) => self.settings.level = Some(level),
                None => log::warn!("invalid CONJUGA_LEVEL '{}', keeping current level", val),
            }
        }
    }

    /// Database location; the default directory is created on demand.
    pub fn db_path(&self) -> PathBuf {
        if let Some(path) = &self.db_path {
            return path.clone();
        }
        let dir = app_dir();
        if let Err(e) = fs::create_dir_all(&dir) {
            log::warn!("could not create {}: {}", dir.display(), e);
        }
        dir.join(DEFAULT_DB_NAME)
    }

    pub fn srs_config(&self) -> SrsConfig {
        SrsConfig::default().with_overrides(&self.srs)
    }

    /// Configured corpus, or the built-in one when none is set.
    pub fn corpus(&self) -> Result<Corpus> {
        match &self.corpus_path {
            Some(path) => Corpus::load(path).map_err(|e| {
                ConjugaError::config(format!("corpus {}: {}", path.display(), e))
            }),
            None => Ok(Corpus::builtin()),
        }
    }
}
