//! Ledger operations.
//!
//! [`Ledger`] ties the store to the configuration and exposes every
//! user-facing operation. Each operation takes the caller's [`Session`],
//! checks it against [`crate::policy`], reads and writes through
//! [`Storage`], and appends an audit entry describing what changed.

mod accounts;
mod audit;
mod backup;
mod catalog;
mod dashboard;
mod purchases;
mod reports;
mod trash;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::password::PasswordHasher;
use crate::policy::Session;
use crate::retention::RetentionPolicy;
use crate::storage::Storage;

pub use accounts::AccountActivity;
pub use audit::Change;
pub use backup::{BackupOutcome, BackupRequest, RestoreOptions, RestoreSummary};
pub use catalog::ItemListing;
pub use dashboard::Dashboard;
pub use purchases::PurchaseView;
pub use trash::{PurgeSummary, TrashEntry, TrashKind};

/// The purchase ledger: storage plus the settings operations depend on.
#[derive(Debug)]
pub struct Ledger {
    storage: Storage,
    config: Config,
}

impl Ledger {
    /// Wrap an opened store.
    #[must_use]
    pub fn new(storage: Storage, config: Config) -> Self {
        Self { storage, config }
    }

    /// Open the database named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(config: Config) -> Result<Self> {
        let storage = Storage::open(config.database_path())?;
        info!(path = %storage.path().display(), "Ledger ready");
        Ok(Self::new(storage, config))
    }

    /// The underlying store.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn hasher(&self) -> PasswordHasher {
        PasswordHasher::new(
            self.config.security.hash_iterations,
            self.config.security.salt_length,
        )
    }

    fn retention(&self) -> RetentionPolicy {
        self.config.retention_policy()
    }

    fn require_strength(&self, password: &str) -> Result<()> {
        let report = crate::password::check_strength(password)
            .require(self.config.security.min_password_score)?;
        debug!(score = report.score, "Password accepted");
        Ok(())
    }
}
