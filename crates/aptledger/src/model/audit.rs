use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Collection;
use crate::error::{Error, Result};

macro_rules! audit_actions {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// An auditable action.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum AuditAction {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )+
        }

        impl AuditAction {
            /// The stored action name.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl FromStr for AuditAction {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(Error::validation(
                        "audit action",
                        format!("unknown action '{other}'"),
                    )),
                }
            }
        }
    };
}

audit_actions! {
    SystemSetup => "SYSTEM_SETUP",
    UserLogin => "USER_LOGIN",
    LoginFailed => "LOGIN_FAILED",
    UserRegistered => "USER_REGISTERED",
    CreateUser => "CREATE_USER",
    UpdateUser => "UPDATE_USER",
    ActivateUser => "ACTIVATE_USER",
    DeactivateUser => "DEACTIVATE_USER",
    PasswordChanged => "PASSWORD_CHANGED",
    PasswordReset => "PASSWORD_RESET",
    UpdateProfile => "UPDATE_PROFILE",
    CreateVendor => "CREATE_VENDOR",
    UpdateVendor => "UPDATE_VENDOR",
    DeleteVendor => "DELETE_VENDOR",
    RestoreVendor => "RESTORE_VENDOR",
    CreateItem => "CREATE_ITEM",
    UpdateItem => "UPDATE_ITEM",
    DeleteItem => "DELETE_ITEM",
    RestoreItem => "RESTORE_ITEM",
    CreatePurchase => "CREATE_PURCHASE",
    DeletePurchase => "DELETE_PURCHASE",
    RestorePurchase => "RESTORE_PURCHASE",
    DeletePermanently => "DELETE_PERMANENTLY",
    EmptyTrash => "EMPTY_TRASH",
    PurgeExpired => "PURGE_EXPIRED",
    CreateBackup => "CREATE_BACKUP",
    RestoreBackup => "RESTORE_BACKUP",
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Sequence number assigned by the store.
    pub id: i64,
    /// What happened.
    pub action: AuditAction,
    /// Collection the action touched.
    pub collection: Collection,
    /// Record the action touched, if any.
    pub target_id: Option<String>,
    /// Snapshot before the change.
    pub old_value: Option<serde_json::Value>,
    /// Snapshot after the change.
    pub new_value: Option<serde_json::Value>,
    /// Who did it. `None` for failed logins of unknown users.
    pub actor_id: Option<String>,
    /// Apartment of the actor, used to scope the log for apartment admins.
    pub actor_apartment_id: Option<String>,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}
