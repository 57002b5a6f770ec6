//! Error types for aptledger.
//!
//! This module defines all error types used throughout the aptledger crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::Collection;

/// The main error type for aptledger operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Credential Errors ===
    /// A stored password hash could not be parsed.
    #[error("invalid hash format: {reason}")]
    CredentialFormat {
        /// Which part of the stored hash is malformed.
        reason: String,
    },

    /// Username or password did not match.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The account exists but has been deactivated.
    #[error("account '{username}' is deactivated; contact an administrator")]
    AccountInactive {
        /// Username of the deactivated account.
        username: String,
    },

    /// A new password did not reach the required strength score.
    #[error("password is too weak (score {score}, need {required}): {}", feedback.join("; "))]
    WeakPassword {
        /// Score the password reached.
        score: u8,
        /// Minimum score required.
        required: u8,
        /// Suggestions for a stronger password.
        feedback: Vec<String>,
    },

    // === Authorization Errors ===
    /// The session is not allowed to perform an action.
    #[error("permission denied: cannot {action}: {reason}")]
    PermissionDenied {
        /// The action that was attempted.
        action: String,
        /// Why it was refused.
        reason: String,
    },

    // === Record Errors ===
    /// A record does not exist.
    #[error("{collection} record '{id}' not found")]
    NotFound {
        /// Collection that was searched.
        collection: Collection,
        /// The missing id.
        id: String,
    },

    /// A record with the same unique key already exists.
    #[error("{what} already exists")]
    AlreadyExists {
        /// Description of the duplicate.
        what: String,
    },

    /// A vendor or item cannot be trashed while active purchases use it.
    #[error("cannot delete {collection} '{id}': referenced by {count} active purchase(s)")]
    Referenced {
        /// Collection of the referenced record.
        collection: Collection,
        /// Id of the referenced record.
        id: String,
        /// Number of active purchases referencing it.
        count: u64,
    },

    /// A lifecycle transition is not valid from the record's current state.
    #[error("{collection} '{id}' {message}")]
    InvalidState {
        /// Collection of the record.
        collection: Collection,
        /// Id of the record.
        id: String,
        /// What is wrong with the transition.
        message: String,
    },

    /// User input failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: String,
        /// Description of the problem.
        message: String,
    },

    // === Backup Errors ===
    /// A backup file does not have the expected shape.
    #[error("invalid backup file: {0}")]
    InvalidBackup(String),

    /// The backup data does not match the checksum in its metadata.
    #[error("backup checksum mismatch: expected {expected}, found {actual}")]
    ChecksumMismatch {
        /// Checksum recorded in the backup metadata.
        expected: String,
        /// Checksum computed from the backup data.
        actual: String,
    },

    /// Encrypting a backup failed.
    #[error("backup encryption failed: {0}")]
    Encryption(String),

    /// Decrypting a backup failed (wrong password or corrupted file).
    #[error("backup decryption failed: wrong password or corrupted file")]
    Decryption,

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for aptledger operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a credential format error.
    #[must_use]
    pub fn credential_format(reason: impl Into<String>) -> Self {
        Self::CredentialFormat {
            reason: reason.into(),
        }
    }

    /// Create a permission denied error.
    #[must_use]
    pub fn permission_denied(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(collection: Collection, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection,
            id: id.into(),
        }
    }

    /// Create a validation error for a field.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid lifecycle transition error.
    #[must_use]
    pub fn invalid_state(
        collection: Collection,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            collection,
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create an invalid backup error.
    #[must_use]
    pub fn invalid_backup(message: impl Into<String>) -> Self {
        Self::InvalidBackup(message.into())
    }

    /// Check if this error is an authorization failure.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// Check if this error means a record was missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is a malformed stored credential, as opposed to a
    /// wrong password.
    #[must_use]
    pub fn is_credential_format(&self) -> bool {
        matches!(self, Self::CredentialFormat { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidCredentials;
        assert_eq!(err.to_string(), "invalid username or password");

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_permission_error_predicate() {
        let err = Error::permission_denied("restore backup", "apartment users cannot restore");
        assert!(err.is_permission_error());
        assert!(!Error::InvalidCredentials.is_permission_error());
        let msg = err.to_string();
        assert!(msg.contains("restore backup"));
        assert!(msg.contains("apartment users"));
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found(Collection::Vendors, "v-1");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "vendors record 'v-1' not found");
    }

    #[test]
    fn test_credential_format_is_distinct() {
        let err = Error::credential_format("missing iteration count");
        assert!(err.is_credential_format());
        assert!(!Error::InvalidCredentials.is_credential_format());
        assert!(err.to_string().contains("invalid hash format"));
    }

    #[test]
    fn test_weak_password_display() {
        let err = Error::WeakPassword {
            score: 2,
            required: 3,
            feedback: vec![
                "Include numbers".to_string(),
                "Include special characters".to_string(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("score 2"));
        assert!(msg.contains("need 3"));
        assert!(msg.contains("Include numbers; Include special characters"));
    }

    #[test]
    fn test_referenced_display() {
        let err = Error::Referenced {
            collection: Collection::Items,
            id: "i-9".to_string(),
            count: 4,
        };
        assert_eq!(
            err.to_string(),
            "cannot delete items 'i-9': referenced by 4 active purchase(s)"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let err = Error::ChecksumMismatch {
            expected: "abc".to_string(),
            actual: "def".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc"));
        assert!(msg.contains("def"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
