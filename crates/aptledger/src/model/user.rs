use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Language, LocalizedName, Role};

/// An account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Record key.
    pub id: String,
    /// Unique login name.
    pub username: String,
    /// Display name.
    #[serde(flatten)]
    pub name: LocalizedName,
    /// Contact email.
    pub email: String,
    /// Encoded credential, `key:salt:iterations`.
    pub password_hash: String,
    /// Apartment the account belongs to.
    pub apartment_id: String,
    /// Account role.
    pub role: Role,
    /// Deactivated accounts cannot log in.
    pub is_active: bool,
    /// Language used for names and reports.
    #[serde(default)]
    pub preferred_language: Language,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// Who created the account (`None` for setup and self-registration).
    #[serde(default)]
    pub created_by: Option<String>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
    /// Last successful login.
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    /// Last password change.
    #[serde(default)]
    pub password_changed_at: Option<DateTime<Utc>>,
}

/// Input for creating an account. The password is plain text here and is
/// hashed before anything is stored.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    /// Login name.
    pub username: String,
    /// Plain-text password.
    pub password: String,
    /// Display name.
    pub name: LocalizedName,
    /// Contact email.
    pub email: String,
    /// Apartment id.
    pub apartment_id: String,
    /// Requested role.
    pub role: Role,
    /// Preferred language.
    pub preferred_language: Language,
}

/// Admin edits to an account. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// New English name.
    pub english_name: Option<String>,
    /// New Arabic name.
    pub arabic_name: Option<String>,
    /// New email.
    pub email: Option<String>,
    /// Move to another apartment.
    pub apartment_id: Option<String>,
    /// Change role.
    pub role: Option<Role>,
    /// Change language.
    pub preferred_language: Option<Language>,
}

/// Edits a user may make to their own profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New English name.
    pub english_name: Option<String>,
    /// New Arabic name.
    pub arabic_name: Option<String>,
    /// New email.
    pub email: Option<String>,
    /// Change language.
    pub preferred_language: Option<Language>,
}
