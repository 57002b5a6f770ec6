use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Backup format version written into new backups.
pub const BACKUP_FORMAT_VERSION: &str = "1.0";

/// What a backup covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupScope {
    /// Every apartment.
    All,
    /// One apartment and the catalog entries its purchases use.
    Apartment,
}

impl BackupScope {
    /// The stored scope name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Apartment => "apartment",
        }
    }
}

impl fmt::Display for BackupScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "apartment" => Ok(Self::Apartment),
            other => Err(Error::validation(
                "scope",
                format!("unknown backup scope '{other}'"),
            )),
        }
    }
}

/// How a backup file is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupFormat {
    /// Plain JSON.
    Json,
    /// Password-encrypted JSON.
    Encrypted,
}

impl BackupFormat {
    /// The stored format name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Encrypted => "encrypted",
        }
    }

    /// File extension for this format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Encrypted => "enc",
        }
    }
}

impl fmt::Display for BackupFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "encrypted" => Ok(Self::Encrypted),
            other => Err(Error::validation(
                "format",
                format!("unknown backup format '{other}'"),
            )),
        }
    }
}

/// Header of a backup file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// Backup format version.
    pub version: String,
    /// When the backup was taken.
    pub created_at: DateTime<Utc>,
    /// What the backup covers.
    pub scope: BackupScope,
    /// Apartment for apartment-scoped backups.
    #[serde(default)]
    pub apartment_id: Option<String>,
    /// Username of the creator.
    pub created_by: String,
    /// Account id of the creator.
    pub created_by_id: String,
    /// Whether trashed records were included.
    pub include_deleted: bool,
    /// File encoding.
    pub format: BackupFormat,
    /// BLAKE3 checksum of the serialized data section.
    #[serde(default)]
    pub checksum: Option<String>,
}

/// A backup history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Sequence number assigned by the store.
    pub id: i64,
    /// File name of the backup.
    pub file_name: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Backup header.
    pub metadata: BackupMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_and_format_names() {
        assert_eq!("all".parse::<BackupScope>().unwrap(), BackupScope::All);
        assert_eq!(
            "apartment".parse::<BackupScope>().unwrap(),
            BackupScope::Apartment
        );
        assert!("house".parse::<BackupScope>().is_err());

        assert_eq!(BackupFormat::Encrypted.extension(), "enc");
        assert_eq!(BackupFormat::Json.extension(), "json");
        assert_eq!(
            "encrypted".parse::<BackupFormat>().unwrap(),
            BackupFormat::Encrypted
        );
    }

    #[test]
    fn test_metadata_missing_checksum_defaults() {
        let json = r#"{
            "version": "1.0",
            "created_at": "2024-03-01T10:00:00Z",
            "scope": "apartment",
            "apartment_id": "A1",
            "created_by": "admin",
            "created_by_id": "u-1",
            "include_deleted": false,
            "format": "json"
        }"#;
        let meta: BackupMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.checksum, None);
        assert_eq!(meta.apartment_id.as_deref(), Some("A1"));
    }
}
