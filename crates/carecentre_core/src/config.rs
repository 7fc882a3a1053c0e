//! Deployment configuration for the care centre core.
//!
//! # Responsibility
//! - Collect per-deployment settings (capacity, storage, logging).
//! - Load overrides from the process environment and an optional `.env`.
//!
//! # Invariants
//! - Respite capacity is at least one slot per half-session.
//! - Log directory, when configured, is absolute.
//!
//! Recognised variables: `CARECENTRE_RESPITE_CAPACITY`,
//! `CARECENTRE_DEFAULT_CONDITION_LABEL`, `CARECENTRE_DB_PATH`,
//! `CARECENTRE_LOG_LEVEL`, `CARECENTRE_LOG_DIR`, `CARECENTRE_CENTRE_NAME`.

use crate::capacity::{CapacityConfig, DEFAULT_CONDITION_LABEL, DEFAULT_SLOTS_PER_HALF};
use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_RESPITE_CAPACITY: &str = "CARECENTRE_RESPITE_CAPACITY";
pub const ENV_DEFAULT_CONDITION_LABEL: &str = "CARECENTRE_DEFAULT_CONDITION_LABEL";
pub const ENV_DB_PATH: &str = "CARECENTRE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "CARECENTRE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CARECENTRE_LOG_DIR";
pub const ENV_CENTRE_NAME: &str = "CARECENTRE_CENTRE_NAME";

const DEFAULT_DB_FILE_NAME: &str = "carecentre.sqlite3";
const DEFAULT_CENTRE_NAME: &str = "Care Centre";

/// Rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid value `{}` for {}: {}",
            self.value, self.key, self.reason
        )
    }
}

impl Error for ConfigError {}

/// Resolved core settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub respite_capacity: u32,
    pub default_condition_label: String,
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub centre_name: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            respite_capacity: DEFAULT_SLOTS_PER_HALF,
            default_condition_label: DEFAULT_CONDITION_LABEL.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level(),
            log_dir: None,
            centre_name: DEFAULT_CENTRE_NAME.to_string(),
        }
    }
}

impl CoreConfig {
    /// Loads `.env` when present, then reads `CARECENTRE_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Missing .env is normal in production.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds config from any key lookup, starting from defaults.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(value) = read(ENV_RESPITE_CAPACITY) {
            config.respite_capacity = parse_capacity(&value)?;
        }
        if let Some(value) = read(ENV_DEFAULT_CONDITION_LABEL) {
            config.default_condition_label = value;
        }
        if let Some(value) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(value);
        }
        if let Some(value) = read(ENV_LOG_LEVEL) {
            config.log_level = normalize_level(&value).map_err(|err| ConfigError {
                key: ENV_LOG_LEVEL,
                value: value.clone(),
                reason: err.to_string(),
            })?;
        }
        if let Some(value) = read(ENV_LOG_DIR) {
            let dir = normalize_log_dir(Path::new(&value)).map_err(|err| ConfigError {
                key: ENV_LOG_DIR,
                value: value.clone(),
                reason: err.to_string(),
            })?;
            config.log_dir = Some(dir);
        }
        if let Some(value) = read(ENV_CENTRE_NAME) {
            config.centre_name = value;
        }

        Ok(config)
    }

    /// Capacity settings handed to the capacity engine.
    pub fn capacity_config(&self) -> CapacityConfig {
        CapacityConfig {
            slots_per_half: self.respite_capacity,
            default_condition_label: self.default_condition_label.clone(),
        }
    }
}

fn parse_capacity(value: &str) -> Result<u32, ConfigError> {
    let invalid = |reason: &str| ConfigError {
        key: ENV_RESPITE_CAPACITY,
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let capacity: u32 = value
        .parse()
        .map_err(|_| invalid("expected a whole number of slots"))?;
    if capacity == 0 {
        return Err(invalid("capacity must be at least 1"));
    }
    Ok(capacity)
}
