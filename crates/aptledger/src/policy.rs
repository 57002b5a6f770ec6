//! Who may see and do what.
//!
//! Every ledger operation receives an explicit [`Session`]. Reads are narrowed
//! with the session's [`Scope`]; writes are checked with [`authorize`]. There
//! is no ambient "current user" anywhere in the crate.

use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{Language, Role, User};

/// The authenticated caller of a ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Account id.
    pub user_id: String,
    /// Login name.
    pub username: String,
    /// Account role.
    pub role: Role,
    /// Apartment the account belongs to.
    pub apartment_id: String,
    /// Language for names and titles.
    pub language: Language,
}

impl Session {
    /// Build a session for an account.
    #[must_use]
    pub fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            apartment_id: user.apartment_id.clone(),
            language: user.preferred_language,
        }
    }

    /// The apartments this session can see.
    #[must_use]
    pub fn scope(&self) -> Scope {
        match self.role {
            Role::SystemAdmin => Scope::All,
            Role::ApartmentAdmin | Role::ApartmentUser => {
                Scope::Apartment(self.apartment_id.clone())
            }
        }
    }

    /// Whether the session may see records of `apartment_id`.
    #[must_use]
    pub fn can_access_apartment(&self, apartment_id: &str) -> bool {
        self.scope().includes(apartment_id)
    }
}

/// Visibility applied to apartment-owned records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every apartment.
    All,
    /// One apartment.
    Apartment(String),
}

impl Scope {
    /// Whether records of `apartment_id` are visible.
    #[must_use]
    pub fn includes(&self, apartment_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Apartment(own) => own == apartment_id,
        }
    }

    /// The apartment filter, or `None` for everything.
    #[must_use]
    pub fn apartment(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Apartment(id) => Some(id),
        }
    }
}

/// A privileged action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability<'a> {
    /// Create, edit or (de)activate an account in an apartment with a role.
    ManageUser {
        /// Apartment of the account.
        apartment_id: &'a str,
        /// Role the account has or will have.
        role: Role,
    },
    /// List accounts.
    ViewUsers,
    /// Move a vendor or item to the trash.
    TrashCatalog,
    /// Move a purchase of an apartment to the trash.
    TrashPurchase {
        /// Apartment that owns the purchase.
        apartment_id: &'a str,
    },
    /// List the trash or restore vendors and items from it.
    ManageTrash,
    /// Restore or purge a trashed purchase of an apartment.
    ManageTrashedPurchase {
        /// Apartment that owns the purchase.
        apartment_id: &'a str,
    },
    /// Permanently delete vendors or items, or run a global purge.
    PurgeCatalog,
    /// Back up every apartment.
    BackupAll,
    /// Back up one apartment.
    BackupApartment {
        /// Apartment being backed up.
        apartment_id: &'a str,
    },
    /// Restore a backup created for an apartment (`None` for a full backup).
    RestoreBackup {
        /// Apartment recorded in the backup metadata.
        apartment_id: Option<&'a str>,
    },
    /// Read the audit log.
    ViewAuditLog,
}

impl Capability<'_> {
    /// Human-readable action name, used in denials.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::ManageUser { .. } => "manage user",
            Self::ViewUsers => "list users",
            Self::TrashCatalog => "delete catalog entry",
            Self::TrashPurchase { .. } => "delete purchase",
            Self::ManageTrash => "manage trash",
            Self::ManageTrashedPurchase { .. } => "manage trashed purchase",
            Self::PurgeCatalog => "permanently delete",
            Self::BackupAll => "back up all apartments",
            Self::BackupApartment { .. } => "back up apartment",
            Self::RestoreBackup { .. } => "restore backup",
            Self::ViewAuditLog => "view audit log",
        }
    }
}

/// Check that `session` may perform `capability`.
///
/// # Errors
///
/// Returns [`Error::PermissionDenied`] with the reason when it may not.
pub fn authorize(session: &Session, capability: Capability<'_>) -> Result<()> {
    let denial = denial_reason(session, capability);
    match denial {
        None => Ok(()),
        Some(reason) => {
            warn!(
                user = %session.username,
                role = %session.role,
                action = capability.describe(),
                reason,
                "Permission denied"
            );
            Err(Error::permission_denied(capability.describe(), reason))
        }
    }
}

fn denial_reason(session: &Session, capability: Capability<'_>) -> Option<&'static str> {
    let own = |apartment_id: &str| session.apartment_id == apartment_id;

    match (session.role, capability) {
        (Role::SystemAdmin, _) => None,

        (Role::ApartmentAdmin, Capability::ManageUser { apartment_id, role }) => {
            if !own(apartment_id) {
                Some("apartment admins manage only their own apartment")
            } else if role == Role::SystemAdmin {
                Some("only system admins can grant the system admin role")
            } else {
                None
            }
        }
        (Role::ApartmentUser, Capability::ManageUser { .. }) => {
            Some("only administrators can manage users")
        }

        (
            Role::ApartmentAdmin,
            Capability::ViewUsers | Capability::TrashCatalog | Capability::ManageTrash,
        ) => None,
        (
            Role::ApartmentUser,
            Capability::ViewUsers | Capability::TrashCatalog | Capability::ManageTrash,
        ) => {
            Some("only administrators can do this")
        }

        (_, Capability::TrashPurchase { apartment_id }) => {
            (!own(apartment_id)).then_some("purchase belongs to another apartment")
        }

        (Role::ApartmentAdmin, Capability::ManageTrashedPurchase { apartment_id }) => {
            (!own(apartment_id)).then_some("purchase belongs to another apartment")
        }
        (Role::ApartmentUser, Capability::ManageTrashedPurchase { .. }) => {
            Some("only administrators can manage the trash")
        }

        (_, Capability::PurgeCatalog | Capability::BackupAll) => {
            Some("only system admins can do this")
        }

        (_, Capability::BackupApartment { apartment_id }) => {
            (!own(apartment_id)).then_some("can only back up your own apartment")
        }

        (Role::ApartmentUser, Capability::RestoreBackup { .. }) => {
            Some("apartment users cannot restore backups")
        }
        (Role::ApartmentAdmin, Capability::RestoreBackup { apartment_id }) => match apartment_id {
            Some(id) if own(id) => None,
            Some(_) => Some("backup belongs to another apartment"),
            None => Some("only system admins can restore full backups"),
        },

        (Role::ApartmentAdmin, Capability::ViewAuditLog) => None,
        (Role::ApartmentUser, Capability::ViewAuditLog) => {
            Some("only administrators can view the audit log")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role, apartment: &str) -> Session {
        Session {
            user_id: format!("u-{apartment}"),
            username: "tester".to_string(),
            role,
            apartment_id: apartment.to_string(),
            language: Language::En,
        }
    }

    #[test]
    fn test_scope_by_role() {
        assert_eq!(session(Role::SystemAdmin, "A1").scope(), Scope::All);
        assert_eq!(
            session(Role::ApartmentUser, "A1").scope(),
            Scope::Apartment("A1".to_string())
        );
        assert!(session(Role::SystemAdmin, "A1").can_access_apartment("B2"));
        assert!(session(Role::ApartmentAdmin, "A1").can_access_apartment("A1"));
        assert!(!session(Role::ApartmentAdmin, "A1").can_access_apartment("B2"));
    }

    #[test]
    fn test_scope_apartment_filter() {
        assert_eq!(Scope::All.apartment(), None);
        assert_eq!(Scope::Apartment("A1".into()).apartment(), Some("A1"));
    }

    #[test]
    fn test_system_admin_can_do_everything() {
        let s = session(Role::SystemAdmin, "A1");
        assert!(authorize(&s, Capability::PurgeCatalog).is_ok());
        assert!(authorize(&s, Capability::BackupAll).is_ok());
        assert!(authorize(&s, Capability::RestoreBackup { apartment_id: None }).is_ok());
        assert!(authorize(
            &s,
            Capability::ManageUser {
                apartment_id: "B2",
                role: Role::SystemAdmin
            }
        )
        .is_ok());
    }

    #[test]
    fn test_apartment_admin_user_management() {
        let s = session(Role::ApartmentAdmin, "A1");
        assert!(authorize(
            &s,
            Capability::ManageUser {
                apartment_id: "A1",
                role: Role::ApartmentUser
            }
        )
        .is_ok());
        assert!(authorize(
            &s,
            Capability::ManageUser {
                apartment_id: "B2",
                role: Role::ApartmentUser
            }
        )
        .unwrap_err()
        .is_permission_error());
        assert!(authorize(
            &s,
            Capability::ManageUser {
                apartment_id: "A1",
                role: Role::SystemAdmin
            }
        )
        .is_err());
    }

    #[test]
    fn test_apartment_user_restrictions() {
        let s = session(Role::ApartmentUser, "A1");
        assert!(authorize(&s, Capability::ViewUsers).is_err());
        assert!(authorize(&s, Capability::TrashCatalog).is_err());
        assert!(authorize(&s, Capability::ManageTrash).is_err());
        assert!(authorize(&s, Capability::ViewAuditLog).is_err());
        assert!(authorize(&s, Capability::TrashPurchase { apartment_id: "A1" }).is_ok());
        assert!(authorize(&s, Capability::TrashPurchase { apartment_id: "B2" }).is_err());
        assert!(authorize(&s, Capability::BackupApartment { apartment_id: "A1" }).is_ok());
    }

    #[test]
    fn test_restore_backup_rules() {
        let user = session(Role::ApartmentUser, "A1");
        let err = authorize(
            &user,
            Capability::RestoreBackup {
                apartment_id: Some("A1"),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("apartment users cannot restore"));

        let admin = session(Role::ApartmentAdmin, "A1");
        assert!(authorize(
            &admin,
            Capability::RestoreBackup {
                apartment_id: Some("A1")
            }
        )
        .is_ok());
        assert!(authorize(
            &admin,
            Capability::RestoreBackup {
                apartment_id: Some("B2")
            }
        )
        .is_err());
        assert!(authorize(&admin, Capability::RestoreBackup { apartment_id: None }).is_err());
    }

    #[test]
    fn test_purge_is_system_admin_only() {
        let admin = session(Role::ApartmentAdmin, "A1");
        assert!(authorize(&admin, Capability::PurgeCatalog).is_err());
        assert!(authorize(&admin, Capability::BackupAll).is_err());
        assert!(authorize(&admin, Capability::ManageTrashedPurchase { apartment_id: "A1" }).is_ok());
        assert!(authorize(&admin, Capability::ManageTrashedPurchase { apartment_id: "B2" }).is_err());
    }
}
