//! Soft-delete lifecycle and trash retention.
//!
//! Purchases, vendors and items are never removed by a normal delete. They
//! move to the trash, carrying who deleted them and when, and stay there until
//! restored or explicitly purged. A record is eligible for purge once it has
//! spent the whole retention window in the trash; nothing purges on a timer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::Collection;

/// Default number of days a trashed record is kept.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

const SECONDS_PER_DAY: i64 = 86_400;

/// Soft-delete stamps carried by every trashable record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SoftDelete {
    /// Whether the record is currently in the trash.
    #[serde(default)]
    pub is_deleted: bool,
    /// When the record was trashed.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Who trashed the record.
    #[serde(default)]
    pub deleted_by: Option<String>,
    /// When the record was last restored.
    #[serde(default)]
    pub restored_at: Option<DateTime<Utc>>,
    /// Who last restored the record.
    #[serde(default)]
    pub restored_by: Option<String>,
}

/// Where a record sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Visible in normal listings.
    Active,
    /// Hidden, restorable, waiting for purge.
    Trashed,
}

impl SoftDelete {
    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        if self.is_deleted {
            LifecycleState::Trashed
        } else {
            LifecycleState::Active
        }
    }
}

/// A record that can be moved to the trash.
pub trait Trashable {
    /// Collection the record lives in.
    const COLLECTION: Collection;

    /// The record key.
    fn record_id(&self) -> &str;

    /// Soft-delete stamps.
    fn soft_delete(&self) -> &SoftDelete;

    /// Mutable soft-delete stamps.
    fn soft_delete_mut(&mut self) -> &mut SoftDelete;

    /// Whether the record is in the trash.
    fn is_trashed(&self) -> bool {
        self.soft_delete().is_deleted
    }
}

/// Move an active record to the trash.
///
/// # Errors
///
/// Returns [`Error::InvalidState`] if the record is already trashed.
pub fn trash<T: Trashable>(record: &mut T, actor: &str, at: DateTime<Utc>) -> Result<()> {
    if record.is_trashed() {
        return Err(Error::invalid_state(
            T::COLLECTION,
            record.record_id(),
            "is already in the trash",
        ));
    }
    let stamps = record.soft_delete_mut();
    stamps.is_deleted = true;
    stamps.deleted_at = Some(at);
    stamps.deleted_by = Some(actor.to_string());
    Ok(())
}

/// Bring a trashed record back, clearing its deletion stamps.
///
/// # Errors
///
/// Returns [`Error::InvalidState`] if the record is not in the trash.
pub fn restore<T: Trashable>(record: &mut T, actor: &str, at: DateTime<Utc>) -> Result<()> {
    if !record.is_trashed() {
        return Err(Error::invalid_state(
            T::COLLECTION,
            record.record_id(),
            "is not in the trash",
        ));
    }
    let stamps = record.soft_delete_mut();
    stamps.is_deleted = false;
    stamps.deleted_at = None;
    stamps.deleted_by = None;
    stamps.restored_at = Some(at);
    stamps.restored_by = Some(actor.to_string());
    Ok(())
}

/// Days a record trashed at `deleted_at` has left before it may be purged.
///
/// Whole elapsed days are floored, so a record deleted 29.9 days ago under a
/// 30-day window still has one day left. The result goes to zero or below
/// once the window has passed.
#[must_use]
pub fn days_left(deleted_at: DateTime<Utc>, now: DateTime<Utc>, retention_days: u32) -> i64 {
    let elapsed_days = (now - deleted_at).num_seconds().div_euclid(SECONDS_PER_DAY);
    i64::from(retention_days) - elapsed_days
}

/// Retention status of a trashed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "days")]
pub enum RetentionStatus {
    /// Still inside the window, with this many days left.
    Remaining(u32),
    /// The window has passed.
    EligibleForPurge,
}

impl RetentionStatus {
    /// Classify a days-left value.
    #[must_use]
    pub fn from_days_left(days: i64) -> Self {
        if days > 0 {
            Self::Remaining(u32::try_from(days).unwrap_or(u32::MAX))
        } else {
            Self::EligibleForPurge
        }
    }

    /// Whether the record may be purged.
    #[must_use]
    pub fn is_eligible_for_purge(&self) -> bool {
        matches!(self, Self::EligibleForPurge)
    }
}

impl fmt::Display for RetentionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remaining(1) => f.write_str("1 day"),
            Self::Remaining(n) => write!(f, "{n} days"),
            Self::EligibleForPurge => f.write_str("Will be deleted soon"),
        }
    }
}

/// Retention window applied to the trash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    retention_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_DAYS)
    }
}

impl RetentionPolicy {
    /// Create a policy with the given window.
    #[must_use]
    pub fn new(retention_days: u32) -> Self {
        Self { retention_days }
    }

    /// The window length in days.
    #[must_use]
    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    /// Status of a record, or `None` if it is not in the trash.
    ///
    /// A trashed record missing its `deleted_at` stamp is treated as
    /// eligible, since its age cannot be proven.
    #[must_use]
    pub fn status(&self, stamps: &SoftDelete, now: DateTime<Utc>) -> Option<RetentionStatus> {
        if !stamps.is_deleted {
            return None;
        }
        Some(match stamps.deleted_at {
            Some(deleted_at) => {
                RetentionStatus::from_days_left(days_left(deleted_at, now, self.retention_days))
            }
            None => RetentionStatus::EligibleForPurge,
        })
    }
}
