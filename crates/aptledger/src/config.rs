//! Configuration management for aptledger.
//!
//! Settings come from built-in defaults, then the TOML config file, then
//! `APTLEDGER_*` environment variables. Nested keys use a double underscore in
//! the environment, e.g. `APTLEDGER_SECURITY__MIN_PASSWORD_SCORE=4`.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::Language;
use crate::password::{MAX_SCORE, MIN_ITERATIONS, MIN_SALT_LENGTH};
use crate::retention::{RetentionPolicy, DEFAULT_RETENTION_DAYS};

const CONFIG_FILE_NAME: &str = "config.toml";

const DATA_DIR_NAME: &str = "aptledger";

const DATABASE_FILE_NAME: &str = "ledger.db";

const BACKUP_DIR_NAME: &str = "backups";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database location.
    pub storage: StorageConfig,
    /// Trash retention.
    pub retention: RetentionConfig,
    /// Credential and account settings.
    pub security: SecurityConfig,
    /// Backup defaults.
    pub backup: BackupConfig,
    /// Output defaults.
    pub display: DisplayConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/aptledger/ledger.db`
    pub database_path: Option<PathBuf>,
}

/// Trash retention configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Days a trashed record is kept before it may be purged.
    pub trash_retention_days: u32,
}

/// Credential and account configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// PBKDF2 rounds for new password hashes.
    pub hash_iterations: u32,
    /// Random salt bytes for new password hashes.
    pub salt_length: usize,
    /// Minimum strength score for new passwords (0-7).
    pub min_password_score: u8,
    /// Whether `register` is available without an administrator.
    pub allow_self_registration: bool,
    /// Length of passwords generated by admin resets.
    pub generated_password_length: usize,
}

/// Backup configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Directory new backups are written to.
    /// Defaults to `~/.local/share/aptledger/backups`
    pub directory: Option<PathBuf>,
    /// Include trashed records unless overridden per backup.
    pub include_deleted: bool,
    /// Number of entries shown by backup history.
    pub history_limit: usize,
}

/// Display configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Language used when the account has no preference.
    pub language: Language,
    /// Currency code printed next to amounts.
    pub currency: String,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            trash_retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            hash_iterations: 100_000,
            salt_length: 32,
            min_password_score: 3,
            allow_self_registration: false,
            generated_password_length: 10,
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            directory: None,
            include_deleted: false,
            history_limit: 20,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            language: Language::En,
            currency: "SAR".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config file.
    ///
    /// A missing file is not an error; defaults and the environment still
    /// apply.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result is invalid.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("APTLEDGER_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] naming the first bad setting.
    pub fn validate(&self) -> Result<()> {
        if self.security.hash_iterations < MIN_ITERATIONS {
            return Err(Error::ConfigValidation {
                message: format!(
                    "security.hash_iterations ({}) must be at least {MIN_ITERATIONS}",
                    self.security.hash_iterations
                ),
            });
        }

        if self.security.salt_length < MIN_SALT_LENGTH {
            return Err(Error::ConfigValidation {
                message: format!(
                    "security.salt_length ({}) must be at least {MIN_SALT_LENGTH}",
                    self.security.salt_length
                ),
            });
        }

        if self.security.min_password_score > MAX_SCORE {
            return Err(Error::ConfigValidation {
                message: format!(
                    "security.min_password_score ({}) cannot exceed {MAX_SCORE}",
                    self.security.min_password_score
                ),
            });
        }

        if self.security.generated_password_length < 8 {
            return Err(Error::ConfigValidation {
                message: "security.generated_password_length must be at least 8".to_string(),
            });
        }

        if self.retention.trash_retention_days == 0 {
            return Err(Error::ConfigValidation {
                message: "retention.trash_retention_days must be greater than 0".to_string(),
            });
        }

        if self.backup.history_limit == 0 {
            return Err(Error::ConfigValidation {
                message: "backup.history_limit must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the backup directory, resolving defaults if not set.
    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.backup
            .directory
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(BACKUP_DIR_NAME))
    }

    /// The trash retention policy.
    #[must_use]
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.retention.trash_retention_days)
    }
}
