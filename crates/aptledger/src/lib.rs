//! `aptledger` - Apartment purchase ledger
//!
//! Residents log purchases against a shared catalog of vendors and items.
//! Administrators manage accounts, take plain or encrypted backups, and
//! empty a trash that keeps soft-deleted records for a retention window.
//! Every operation runs on behalf of an explicit [`Session`] and is checked
//! against one role policy.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod password;
pub mod policy;
pub mod report;
pub mod retention;
pub mod storage;
pub mod validate;

pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use logging::{init_logging, Verbosity};
pub use policy::{Scope, Session};
pub use report::{Report, ReportKind, ReportPeriod};
pub use storage::{Storage, StorageStats};
