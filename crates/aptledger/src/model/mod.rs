//! Core record types for aptledger.
//!
//! This module defines the records kept in the ledger (users, vendors, items,
//! purchases, audit entries, backup history) and the small enums shared
//! between them.

mod audit;
mod backup;
mod catalog;
mod purchase;
mod user;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use audit::{AuditAction, AuditEntry};
pub use backup::{BackupFormat, BackupMetadata, BackupRecord, BackupScope, BACKUP_FORMAT_VERSION};
pub use catalog::{Item, ItemUpdate, NewItem, NewVendor, Vendor, VendorUpdate};
pub use purchase::{NewPurchase, Purchase};
pub use user::{NewUser, ProfileUpdate, User, UserUpdate};

/// A named collection of records in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Accounts.
    Users,
    /// Purchases logged against vendors and items.
    Purchases,
    /// Vendors purchases are made from.
    Vendors,
    /// Items that can be purchased.
    Items,
    /// Audit log entries.
    AuditLog,
    /// System-wide actions (backup, empty trash).
    System,
}

impl Collection {
    /// The canonical collection name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Purchases => "purchases",
            Self::Vendors => "vendors",
            Self::Items => "items",
            Self::AuditLog => "audit_log",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "users" => Ok(Self::Users),
            "purchases" => Ok(Self::Purchases),
            "vendors" => Ok(Self::Vendors),
            "items" => Ok(Self::Items),
            "audit_log" => Ok(Self::AuditLog),
            "system" => Ok(Self::System),
            other => Err(Error::validation(
                "collection",
                format!("unknown collection '{other}'"),
            )),
        }
    }
}

/// Display language for names, titles and month names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// English.
    #[default]
    En,
    /// Arabic.
    Ar,
}

impl Language {
    /// The language code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "en" => Ok(Self::En),
            "ar" => Ok(Self::Ar),
            other => Err(Error::validation(
                "language",
                format!("unsupported language '{other}' (expected en or ar)"),
            )),
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Sees and manages every apartment.
    #[serde(alias = "systemAdmin")]
    SystemAdmin,
    /// Manages one apartment.
    #[serde(alias = "apartmentAdmin")]
    ApartmentAdmin,
    /// Logs purchases for one apartment.
    #[default]
    #[serde(alias = "apartmentUser")]
    ApartmentUser,
}

impl Role {
    /// The stored role name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemAdmin => "system_admin",
            Self::ApartmentAdmin => "apartment_admin",
            Self::ApartmentUser => "apartment_user",
        }
    }

    /// Whether the role has any administrative capability.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::SystemAdmin | Self::ApartmentAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "system_admin" | "systemAdmin" => Ok(Self::SystemAdmin),
            "apartment_admin" | "apartmentAdmin" => Ok(Self::ApartmentAdmin),
            "apartment_user" | "apartmentUser" => Ok(Self::ApartmentUser),
            other => Err(Error::validation("role", format!("unknown role '{other}'"))),
        }
    }
}

/// A name kept in both supported languages.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalizedName {
    /// English name.
    pub english_name: String,
    /// Arabic name.
    pub arabic_name: String,
}

impl LocalizedName {
    /// Create a name from its English and Arabic forms.
    #[must_use]
    pub fn new(english: impl Into<String>, arabic: impl Into<String>) -> Self {
        Self {
            english_name: english.into(),
            arabic_name: arabic.into(),
        }
    }

    /// The name in the given language, falling back to English when the
    /// Arabic form is blank.
    #[must_use]
    pub fn get(&self, lang: Language) -> &str {
        match lang {
            Language::Ar if !self.arabic_name.trim().is_empty() => &self.arabic_name,
            _ => &self.english_name,
        }
    }
}

/// Generate a new record key.
///
/// Keys are `UUIDv7`, so they sort by creation time.
#[must_use]
pub fn new_record_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// The current time at the precision records are stored with.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_round_trip_names() {
        for collection in [
            Collection::Users,
            Collection::Purchases,
            Collection::Vendors,
            Collection::Items,
            Collection::AuditLog,
            Collection::System,
        ] {
            assert_eq!(collection.as_str().parse::<Collection>().unwrap(), collection);
        }
        assert!("trash".parse::<Collection>().is_err());
    }

    #[test]
    fn test_role_parse_and_admin() {
        assert_eq!("system_admin".parse::<Role>().unwrap(), Role::SystemAdmin);
        assert!(Role::SystemAdmin.is_admin());
        assert!(Role::ApartmentAdmin.is_admin());
        assert!(!Role::ApartmentUser.is_admin());
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_matches_display() {
        let json = serde_json::to_string(&Role::ApartmentAdmin).unwrap();
        assert_eq!(json, "\"apartment_admin\"");

        let legacy: Role = serde_json::from_str("\"systemAdmin\"").unwrap();
        assert_eq!(legacy, Role::SystemAdmin);
    }

    #[test]
    fn test_language_parse() {
        assert_eq!("ar".parse::<Language>().unwrap(), Language::Ar);
        assert_eq!(Language::default(), Language::En);
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_localized_name_fallback() {
        let name = LocalizedName::new("Milk", "حليب");
        assert_eq!(name.get(Language::En), "Milk");
        assert_eq!(name.get(Language::Ar), "حليب");

        let english_only = LocalizedName::new("Bread", " ");
        assert_eq!(english_only.get(Language::Ar), "Bread");
    }

    #[test]
    fn test_record_ids_are_unique() {
        let a = new_record_id();
        let b = new_record_id();
        assert_ne!(a, b);
        assert_eq!(uuid::Uuid::parse_str(&a).unwrap().get_version_num(), 7);
    }

    #[test]
    fn test_now_has_microsecond_precision() {
        assert_eq!(now().timestamp_subsec_nanos() % 1_000, 0);
    }
}
