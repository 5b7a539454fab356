use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use crate::clock::{LocalClock, DEFAULT_TIME_ZONE};
use crate::log_warn;

const ENABLE_LOGS: bool = true;
const LOG_TARGET: &str = "daytally::settings";

pub const DEFAULT_DATABASE_FILE: &str = "daytally.sqlite3";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// IANA zone used for day boundaries and wall-clock input.
    pub time_zone: String,
    pub database_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            time_zone: DEFAULT_TIME_ZONE.into(),
            database_path: PathBuf::from(DEFAULT_DATABASE_FILE),
        }
    }
}

impl Settings {
    /// Command-line and environment values win over the stored ones.
    pub fn with_overrides(
        mut self,
        time_zone: Option<String>,
        database_path: Option<PathBuf>,
    ) -> Self {
        if let Some(time_zone) = time_zone {
            self.time_zone = time_zone;
        }
        if let Some(database_path) = database_path {
            self.database_path = database_path;
        }
        self
    }

    pub fn clock(&self) -> Result<LocalClock> {
        LocalClock::from_name(&self.time_zone)
            .with_context(|| format!("invalid timeZone setting '{}'", self.time_zone))
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!("ignoring unreadable settings in {}: {err}", path.display());
                Settings::default()
            })
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> Settings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validates the zone, then writes the file and swaps the in-memory copy.
    pub fn update(&self, settings: Settings) -> Result<()> {
        settings.clock()?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
