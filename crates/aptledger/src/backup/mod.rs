//! Backup file format.
//!
//! A backup is a JSON envelope `{ "metadata": ..., "data": ... }`. The data
//! section maps each collection name to its records keyed by id. The metadata
//! carries a BLAKE3 checksum of the data section in canonical form (keys
//! sorted, compact), so files survive reformatting but not edits.
//!
//! Files named `*.enc` hold the same envelope encrypted with a passphrase,
//! see [`cipher`].

pub mod cipher;

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{BackupFormat, BackupMetadata, BackupScope, Item, Purchase, User, Vendor};

/// Records carried by a backup, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupData {
    /// Accounts.
    pub users: BTreeMap<String, User>,
    /// Purchases.
    pub purchases: BTreeMap<String, Purchase>,
    /// Vendors.
    pub vendors: BTreeMap<String, Vendor>,
    /// Items.
    pub items: BTreeMap<String, Item>,
}

impl BackupData {
    /// Record counts per collection.
    #[must_use]
    pub fn counts(&self) -> BackupCounts {
        BackupCounts {
            users: self.users.len(),
            purchases: self.purchases.len(),
            vendors: self.vendors.len(),
            items: self.items.len(),
        }
    }
}

/// Number of records per collection in a backup or restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackupCounts {
    /// Accounts.
    pub users: usize,
    /// Purchases.
    pub purchases: usize,
    /// Vendors.
    pub vendors: usize,
    /// Items.
    pub items: usize,
}

impl BackupCounts {
    /// Total records.
    #[must_use]
    pub fn total(&self) -> usize {
        self.users + self.purchases + self.vendors + self.items
    }
}

/// A complete backup: header plus records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupFile {
    /// Header.
    pub metadata: BackupMetadata,
    /// Records.
    pub data: BackupData,
}

impl BackupFile {
    /// Build a backup and stamp its checksum.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be serialized.
    pub fn sealed(mut metadata: BackupMetadata, data: BackupData) -> Result<Self> {
        metadata.checksum = Some(checksum(&serde_json::to_value(&data)?)?);
        Ok(Self { metadata, data })
    }

    /// Serialize for writing. Encrypted when `passphrase` is given.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or encryption fails, or if the
    /// metadata format and the presence of a passphrase disagree.
    pub fn encode(&self, passphrase: Option<&str>) -> Result<Vec<u8>> {
        let json = serde_json::to_vec_pretty(self)?;
        match (self.metadata.format, passphrase) {
            (BackupFormat::Json, None) => Ok(json),
            (BackupFormat::Encrypted, Some(passphrase)) => {
                Ok(cipher::encrypt(&json, passphrase)?.into_bytes())
            }
            (BackupFormat::Encrypted, None) => Err(Error::Encryption(
                "encrypted backups need a passphrase".to_string(),
            )),
            (BackupFormat::Json, Some(_)) => Err(Error::Encryption(
                "plain JSON backups cannot be encrypted".to_string(),
            )),
        }
    }

    /// Parse file contents, decrypting first when `passphrase` is given.
    ///
    /// Checks the envelope shape and, when the metadata carries one, the
    /// checksum.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decryption`] for a wrong passphrase,
    /// [`Error::InvalidBackup`] for a malformed file and
    /// [`Error::ChecksumMismatch`] for edited data.
    pub fn decode(contents: &[u8], passphrase: Option<&str>) -> Result<Self> {
        let json = match passphrase {
            Some(passphrase) => {
                let body = std::str::from_utf8(contents)
                    .map_err(|_| Error::invalid_backup("encrypted body is not text"))?;
                cipher::decrypt(body, passphrase)?
            }
            None => contents.to_vec(),
        };

        let envelope: serde_json::Value = serde_json::from_slice(&json)
            .map_err(|e| Error::invalid_backup(format!("not valid JSON: {e}")))?;
        let (Some(metadata), Some(data)) = (envelope.get("metadata"), envelope.get("data")) else {
            return Err(Error::invalid_backup("missing metadata or data section"));
        };

        let metadata: BackupMetadata = serde_json::from_value(metadata.clone())
            .map_err(|e| Error::invalid_backup(format!("bad metadata: {e}")))?;

        if let Some(expected) = &metadata.checksum {
            let actual = checksum(data)?;
            if &actual != expected {
                return Err(Error::ChecksumMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let data: BackupData = serde_json::from_value(data.clone())
            .map_err(|e| Error::invalid_backup(format!("bad data section: {e}")))?;

        debug!(
            scope = %metadata.scope,
            records = data.counts().total(),
            "Decoded backup"
        );
        Ok(Self { metadata, data })
    }
}

/// BLAKE3 of the canonical JSON form of a data section.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn checksum(data: &serde_json::Value) -> Result<String> {
    let canonical = serde_json::to_vec(data)?;
    Ok(blake3::hash(&canonical).to_hex().to_string())
}

/// Whether a path names an encrypted backup.
#[must_use]
pub fn is_encrypted_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "enc")
}

/// File name for a new backup.
#[must_use]
pub fn file_name(scope: BackupScope, apartment_id: Option<&str>, format: BackupFormat, at: DateTime<Utc>) -> String {
    let stamp = at.format("%Y-%m-%d_%H%M%S");
    match apartment_id {
        Some(apartment) if scope == BackupScope::Apartment => {
            let apartment: String = apartment
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
                .collect();
            format!("backup_{scope}_{apartment}_{stamp}.{}", format.extension())
        }
        _ => format!("backup_{scope}_{stamp}.{}", format.extension()),
    }
}

/// Human-readable file size.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}
