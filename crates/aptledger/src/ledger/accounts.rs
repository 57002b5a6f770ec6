use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::audit::{user_snapshot, Change};
use super::Ledger;
use crate::error::{Error, Result};
use crate::model::{
    new_record_id, now, AuditAction, Collection, NewUser, ProfileUpdate, Role, User, UserUpdate,
};
use crate::password::{generate_password, verify_password};
use crate::policy::{authorize, Capability, Session};
use crate::storage::PurchaseQuery;
use crate::validate;

/// What an account has done in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountActivity {
    /// When the account was created.
    pub member_since: DateTime<Utc>,
    /// Last successful login.
    pub last_login: Option<DateTime<Utc>>,
    /// Active purchases the account logged.
    pub purchases_added: usize,
    /// Sum of those purchases.
    pub total_spent: f64,
}

impl Ledger {
    /// Create the first system administrator.
    ///
    /// Only possible while the ledger has no accounts. The role in `new` is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] once any account exists, or a
    /// validation error for bad input.
    pub fn setup(&self, new: NewUser) -> Result<User> {
        if self.storage.count(Collection::Users, None)? > 0 {
            return Err(Error::AlreadyExists {
                what: "an administrator account".to_string(),
            });
        }
        let user = self.create_account(
            NewUser {
                role: Role::SystemAdmin,
                ..new
            },
            None,
        )?;
        info!(username = %user.username, "Ledger set up");
        self.record(
            Some(&Session::for_user(&user)),
            Change::new(AuditAction::SystemSetup, Collection::Users)
                .target(&user.id)
                .after(&user_snapshot(&user)),
        );
        Ok(user)
    }

    /// Register an apartment user without an administrator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] unless self-registration is
    /// enabled, or a validation error for bad input.
    pub fn register(&self, new: NewUser) -> Result<User> {
        if !self.config.security.allow_self_registration {
            return Err(Error::permission_denied(
                "register",
                "self-registration is disabled",
            ));
        }
        let user = self.create_account(
            NewUser {
                role: Role::ApartmentUser,
                ..new
            },
            None,
        )?;
        info!(username = %user.username, apartment = %user.apartment_id, "User registered");
        self.record(
            Some(&Session::for_user(&user)),
            Change::new(AuditAction::UserRegistered, Collection::Users)
                .target(&user.id)
                .after(&user_snapshot(&user)),
        );
        Ok(user)
    }

    /// Check a username and password and open a session.
    ///
    /// Unknown accounts and wrong passwords fail the same way. Hashes made
    /// with fewer rounds than configured are upgraded on success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`], [`Error::AccountInactive`], or
    /// [`Error::CredentialFormat`] when the stored hash is malformed.
    pub fn login(&self, username: &str, password: &str) -> Result<Session> {
        let Some(mut user) = self.storage.find_user_by_username(username)? else {
            warn!(username, "Login failed: unknown user");
            self.record(
                None,
                Change::new(AuditAction::LoginFailed, Collection::Users)
                    .after(&serde_json::json!({ "username": username })),
            );
            return Err(Error::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(username, "Login failed: wrong password");
            self.record(
                None,
                Change::new(AuditAction::LoginFailed, Collection::Users).target(&user.id),
            );
            return Err(Error::InvalidCredentials);
        }

        if !user.is_active {
            warn!(username, "Login refused: account inactive");
            return Err(Error::AccountInactive {
                username: user.username,
            });
        }

        let hasher = self.hasher();
        if hasher.needs_rehash(&user.password_hash)? {
            info!(username, iterations = hasher.iterations(), "Upgrading password hash");
            user.password_hash = hasher.create_hash(password);
        }
        user.last_login = Some(now());
        self.storage.put_user(&user)?;

        let session = Session::for_user(&user);
        info!(username, role = %user.role, "User logged in");
        self.record(
            Some(&session),
            Change::new(AuditAction::UserLogin, Collection::Users).target(&user.id),
        );
        Ok(session)
    }

    /// Change the caller's own password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WeakPassword`] for a weak new password and
    /// [`Error::InvalidCredentials`] when `current` is wrong.
    pub fn change_password(&self, session: &Session, current: &str, new_password: &str) -> Result<()> {
        self.require_strength(new_password)?;
        let mut user = self.load_user(&session.user_id)?;
        if !verify_password(current, &user.password_hash)? {
            return Err(Error::InvalidCredentials);
        }

        let at = now();
        user.password_hash = self.hasher().create_hash(new_password);
        user.password_changed_at = Some(at);
        user.updated_at = at;
        self.storage.put_user(&user)?;

        info!(username = %user.username, "Password changed");
        self.record(
            Some(session),
            Change::new(AuditAction::PasswordChanged, Collection::Users).target(&user.id),
        );
        Ok(())
    }

    /// Create an account as an administrator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] when the caller may not manage
    /// accounts of that apartment and role, or a validation error.
    pub fn add_user(&self, session: &Session, new: NewUser) -> Result<User> {
        authorize(
            session,
            Capability::ManageUser {
                apartment_id: &new.apartment_id,
                role: new.role,
            },
        )?;
        let user = self.create_account(new, Some(&session.user_id))?;
        info!(username = %user.username, role = %user.role, "User created");
        self.record(
            Some(session),
            Change::new(AuditAction::CreateUser, Collection::Users)
                .target(&user.id)
                .after(&user_snapshot(&user)),
        );
        Ok(user)
    }

    /// Edit an account as an administrator.
    ///
    /// Both the account as it is and as it will be must be manageable by
    /// the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::PermissionDenied`] or a
    /// validation error.
    pub fn update_user(&self, session: &Session, id: &str, update: UserUpdate) -> Result<User> {
        let mut user = self.load_user(id)?;
        authorize(
            session,
            Capability::ManageUser {
                apartment_id: &user.apartment_id,
                role: user.role,
            },
        )?;
        let before = user_snapshot(&user);

        if let Some(name) = update.english_name {
            user.name.english_name = name;
        }
        if let Some(name) = update.arabic_name {
            user.name.arabic_name = name;
        }
        if let Some(email) = update.email {
            validate::email(&email)?;
            user.email = email;
        }
        if let Some(apartment) = update.apartment_id {
            validate::required("apartment", &apartment)?;
            user.apartment_id = apartment;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(language) = update.preferred_language {
            user.preferred_language = language;
        }
        authorize(
            session,
            Capability::ManageUser {
                apartment_id: &user.apartment_id,
                role: user.role,
            },
        )?;

        user.updated_at = now();
        self.storage.put_user(&user)?;
        info!(username = %user.username, "User updated");
        self.record(
            Some(session),
            Change::new(AuditAction::UpdateUser, Collection::Users)
                .target(&user.id)
                .before(&before)
                .after(&user_snapshot(&user)),
        );
        Ok(user)
    }

    /// Activate or deactivate an account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] when deactivating yourself or when the
    /// account is already in the requested state.
    pub fn set_user_active(&self, session: &Session, id: &str, active: bool) -> Result<User> {
        let mut user = self.load_user(id)?;
        authorize(
            session,
            Capability::ManageUser {
                apartment_id: &user.apartment_id,
                role: user.role,
            },
        )?;
        if !active && user.id == session.user_id {
            return Err(Error::invalid_state(
                Collection::Users,
                id,
                "cannot deactivate the account you are using",
            ));
        }
        if user.is_active == active {
            return Err(Error::invalid_state(
                Collection::Users,
                id,
                if active { "is already active" } else { "is already inactive" },
            ));
        }

        user.is_active = active;
        user.updated_at = now();
        self.storage.put_user(&user)?;

        let action = if active {
            AuditAction::ActivateUser
        } else {
            AuditAction::DeactivateUser
        };
        info!(username = %user.username, active, "User status changed");
        self.record(
            Some(session),
            Change::new(action, Collection::Users)
                .target(&user.id)
                .after(&serde_json::json!({ "is_active": active })),
        );
        Ok(user)
    }

    /// Reset another account's password, returning the password set.
    ///
    /// Without `password` a random one is generated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::PermissionDenied`] or
    /// [`Error::WeakPassword`].
    pub fn reset_password(&self, session: &Session, id: &str, password: Option<String>) -> Result<String> {
        let mut user = self.load_user(id)?;
        authorize(
            session,
            Capability::ManageUser {
                apartment_id: &user.apartment_id,
                role: user.role,
            },
        )?;

        let password = match password {
            Some(password) => {
                self.require_strength(&password)?;
                password
            }
            None => self.strong_generated_password(),
        };

        let at = now();
        user.password_hash = self.hasher().create_hash(&password);
        user.password_changed_at = Some(at);
        user.updated_at = at;
        self.storage.put_user(&user)?;

        info!(username = %user.username, "Password reset");
        self.record(
            Some(session),
            Change::new(AuditAction::PasswordReset, Collection::Users).target(&user.id),
        );
        Ok(password)
    }

    /// Accounts visible to the caller, sorted by display name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] for apartment users.
    pub fn list_users(&self, session: &Session) -> Result<Vec<User>> {
        authorize(session, Capability::ViewUsers)?;
        let mut users = self.storage.list_users(session.scope().apartment())?;
        users.sort_by_cached_key(|u| display_name(u, session).to_lowercase());
        Ok(users)
    }

    /// One account, if the caller may see it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for missing accounts and for accounts of
    /// other apartments.
    pub fn get_user(&self, session: &Session, id: &str) -> Result<User> {
        let user = self.load_user(id)?;
        if user.id != session.user_id && !session.can_access_apartment(&user.apartment_id) {
            return Err(Error::not_found(Collection::Users, id));
        }
        Ok(user)
    }

    /// Edit the caller's own profile.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed email.
    pub fn update_profile(&self, session: &Session, update: ProfileUpdate) -> Result<User> {
        let mut user = self.load_user(&session.user_id)?;
        let before = user_snapshot(&user);

        if let Some(name) = update.english_name {
            user.name.english_name = name;
        }
        if let Some(name) = update.arabic_name {
            user.name.arabic_name = name;
        }
        if let Some(email) = update.email {
            validate::email(&email)?;
            user.email = email;
        }
        if let Some(language) = update.preferred_language {
            user.preferred_language = language;
        }

        user.updated_at = now();
        self.storage.put_user(&user)?;
        self.record(
            Some(session),
            Change::new(AuditAction::UpdateProfile, Collection::Users)
                .target(&user.id)
                .before(&before)
                .after(&user_snapshot(&user)),
        );
        Ok(user)
    }

    /// Summary of the caller's own account.
    ///
    /// # Errors
    ///
    /// Returns an error if the account no longer exists.
    pub fn account_activity(&self, session: &Session) -> Result<AccountActivity> {
        let user = self.load_user(&session.user_id)?;
        let purchases = self.storage.list_purchases(&PurchaseQuery {
            added_by: Some(user.id.clone()),
            ..PurchaseQuery::default()
        })?;
        Ok(AccountActivity {
            member_since: user.created_at,
            last_login: user.last_login,
            purchases_added: purchases.len(),
            total_spent: purchases.iter().map(|p| p.total_price).sum(),
        })
    }

    pub(super) fn load_user(&self, id: &str) -> Result<User> {
        self.storage
            .get_user(id)?
            .ok_or_else(|| Error::not_found(Collection::Users, id))
    }

    fn create_account(&self, new: NewUser, created_by: Option<&str>) -> Result<User> {
        validate::required("username", &new.username)?;
        validate::required("password", &new.password)?;
        validate::required("apartment", &new.apartment_id)?;
        validate::required("email", &new.email)?;
        validate::username(&new.username)?;
        validate::email(&new.email)?;
        self.require_strength(&new.password)?;

        if self.storage.find_user_by_username(&new.username)?.is_some() {
            return Err(Error::AlreadyExists {
                what: format!("username '{}'", new.username),
            });
        }

        let at = now();
        let user = User {
            id: new_record_id(),
            username: new.username,
            name: new.name,
            email: new.email,
            password_hash: self.hasher().create_hash(&new.password),
            apartment_id: new.apartment_id,
            role: new.role,
            is_active: true,
            preferred_language: new.preferred_language,
            created_at: at,
            created_by: created_by.map(str::to_string),
            updated_at: at,
            last_login: None,
            password_changed_at: None,
        };
        self.storage.put_user(&user)?;
        Ok(user)
    }

    /// Generated passwords are redrawn until they pass the strength gate.
    fn strong_generated_password(&self) -> String {
        let length = self.config.security.generated_password_length;
        loop {
            let candidate = generate_password(length);
            if self.require_strength(&candidate).is_ok() {
                return candidate;
            }
        }
    }
}

fn display_name<'a>(user: &'a User, session: &Session) -> &'a str {
    let name = user.name.get(session.language);
    if name.trim().is_empty() {
        &user.username
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testing::{config, ledger, ledger_with_root, member, PASSWORD};
    use crate::model::{Language, LocalizedName};
    use crate::password::{check_strength, PasswordHasher};
    use crate::storage::Storage;

    fn new_user(username: &str, apartment: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password: PASSWORD.to_string(),
            name: LocalizedName::new(username, ""),
            email: format!("{username}@example.com"),
            apartment_id: apartment.to_string(),
            ..NewUser::default()
        }
    }

    #[test]
    fn test_setup_only_once() {
        let (ledger, root) = ledger_with_root();
        assert_eq!(root.role, Role::SystemAdmin);
        let err = ledger.setup(new_user("second", "A1")).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[test]
    fn test_login_success_updates_last_login() {
        let (ledger, root) = ledger_with_root();
        let session = ledger.login("root", PASSWORD).unwrap();
        assert_eq!(session, root);
        let user = ledger.get_user(&session, &session.user_id).unwrap();
        assert!(user.last_login.is_some());
    }

    #[test]
    fn test_login_failures_look_alike() {
        let (ledger, _) = ledger_with_root();
        let unknown = ledger.login("ghost", PASSWORD).unwrap_err();
        let wrong = ledger.login("root", "Wr0ng!Pass").unwrap_err();
        assert!(matches!(unknown, Error::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[test]
    fn test_login_inactive_account() {
        let (ledger, root) = ledger_with_root();
        let user = member(&ledger, &root, "tenant", "A1", Role::ApartmentUser);
        ledger.set_user_active(&root, &user.user_id, false).unwrap();

        let err = ledger.login("tenant", PASSWORD).unwrap_err();
        assert!(matches!(err, Error::AccountInactive { .. }));
    }

    #[test]
    fn test_login_malformed_hash_is_format_error() {
        let (ledger, root) = ledger_with_root();
        let mut user = ledger.load_user(&root.user_id).unwrap();
        user.password_hash = "abcd:1234".to_string();
        ledger.storage.put_user(&user).unwrap();

        assert!(ledger.login("root", PASSWORD).unwrap_err().is_credential_format());
    }

    #[test]
    fn test_login_upgrades_weak_hash() {
        let storage = Storage::open_in_memory().unwrap();
        let mut weak = config();
        weak.security.hash_iterations = 500;
        let ledger = super::Ledger::new(storage, weak);
        ledger.setup(new_user("root", "HQ")).unwrap();

        let ledger = super::Ledger::new(ledger.storage, config());
        let session = ledger.login("root", PASSWORD).unwrap();
        let stored = ledger.load_user(&session.user_id).unwrap().password_hash;
        assert!(stored.ends_with(":1000"));
        assert!(!PasswordHasher::with_iterations(1_000)
            .needs_rehash(&stored)
            .unwrap());
    }

    #[test]
    fn test_register_requires_opt_in() {
        let ledger = ledger();
        assert!(ledger
            .register(new_user("tenant", "A1"))
            .unwrap_err()
            .is_permission_error());

        let mut open = config();
        open.security.allow_self_registration = true;
        let ledger = super::Ledger::new(Storage::open_in_memory().unwrap(), open);
        let user = ledger
            .register(NewUser {
                role: Role::SystemAdmin,
                ..new_user("tenant", "A1")
            })
            .unwrap();
        assert_eq!(user.role, Role::ApartmentUser);
    }

    #[test]
    fn test_account_validation() {
        let (ledger, root) = ledger_with_root();
        let bad_name = ledger.add_user(&root, new_user("bad name", "A1")).unwrap_err();
        assert!(matches!(bad_name, Error::Validation { .. }));

        let weak = ledger
            .add_user(
                &root,
                NewUser {
                    password: "abc".to_string(),
                    ..new_user("tenant", "A1")
                },
            )
            .unwrap_err();
        assert!(matches!(weak, Error::WeakPassword { .. }));

        let missing = ledger
            .add_user(
                &root,
                NewUser {
                    email: String::new(),
                    ..new_user("tenant", "A1")
                },
            )
            .unwrap_err();
        assert!(matches!(missing, Error::Validation { .. }));

        ledger.add_user(&root, new_user("tenant", "A1")).unwrap();
        let dup = ledger.add_user(&root, new_user("tenant", "B2")).unwrap_err();
        assert!(matches!(dup, Error::AlreadyExists { .. }));
    }

    #[test]
    fn test_apartment_admin_manages_own_apartment_only() {
        let (ledger, root) = ledger_with_root();
        let admin = member(&ledger, &root, "a1admin", "A1", Role::ApartmentAdmin);

        assert!(ledger.add_user(&admin, new_user("a1user", "A1")).is_ok());
        assert!(ledger
            .add_user(&admin, new_user("b2user", "B2"))
            .unwrap_err()
            .is_permission_error());

        let other = member(&ledger, &root, "b2other", "B2", Role::ApartmentUser);
        let err = ledger
            .update_user(
                &admin,
                &other.user_id,
                UserUpdate {
                    email: Some("x@example.com".to_string()),
                    ..UserUpdate::default()
                },
            )
            .unwrap_err();
        assert!(err.is_permission_error());
    }

    #[test]
    fn test_apartment_admin_cannot_promote_to_system_admin() {
        let (ledger, root) = ledger_with_root();
        let admin = member(&ledger, &root, "a1admin", "A1", Role::ApartmentAdmin);
        let user = member(&ledger, &admin, "a1user", "A1", Role::ApartmentUser);

        let err = ledger
            .update_user(
                &admin,
                &user.user_id,
                UserUpdate {
                    role: Some(Role::SystemAdmin),
                    ..UserUpdate::default()
                },
            )
            .unwrap_err();
        assert!(err.is_permission_error());
        assert_eq!(ledger.load_user(&user.user_id).unwrap().role, Role::ApartmentUser);
    }

    #[test]
    fn test_cannot_deactivate_self() {
        let (ledger, root) = ledger_with_root();
        let err = ledger.set_user_active(&root, &root.user_id, false).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[test]
    fn test_change_password() {
        let (ledger, root) = ledger_with_root();
        let err = ledger
            .change_password(&root, "Wr0ng!Pass", "N3w!Passw0rd")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));

        ledger.change_password(&root, PASSWORD, "N3w!Passw0rd").unwrap();
        assert!(ledger.login("root", PASSWORD).is_err());
        assert!(ledger.login("root", "N3w!Passw0rd").is_ok());
    }

    #[test]
    fn test_reset_password_generates_strong_password() {
        let (ledger, root) = ledger_with_root();
        let user = member(&ledger, &root, "tenant", "A1", Role::ApartmentUser);

        let password = ledger.reset_password(&root, &user.user_id, None).unwrap();
        assert_eq!(password.chars().count(), 10);
        assert!(check_strength(&password).score >= 3);
        assert!(ledger.login("tenant", &password).is_ok());
    }

    #[test]
    fn test_list_users_scoped_and_sorted() {
        let (ledger, root) = ledger_with_root();
        let admin = member(&ledger, &root, "zed", "A1", Role::ApartmentAdmin);
        member(&ledger, &root, "amy", "A1", Role::ApartmentUser);
        let tenant = member(&ledger, &root, "bob", "B2", Role::ApartmentUser);

        let names: Vec<String> = ledger
            .list_users(&root)
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["amy", "bob", "root", "zed"]);

        let a1: Vec<String> = ledger
            .list_users(&admin)
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(a1, vec!["amy", "zed"]);
        assert!(ledger.list_users(&tenant).unwrap_err().is_permission_error());
        assert!(ledger.get_user(&admin, &tenant.user_id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_profile() {
        let (ledger, root) = ledger_with_root();
        let user = ledger
            .update_profile(
                &root,
                ProfileUpdate {
                    arabic_name: Some("المدير".to_string()),
                    preferred_language: Some(Language::Ar),
                    ..ProfileUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(user.name.get(Language::Ar), "المدير");
        assert_eq!(user.preferred_language, Language::Ar);

        let err = ledger
            .update_profile(
                &root,
                ProfileUpdate {
                    email: Some("not-an-email".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_account_activity_starts_empty() {
        let (ledger, root) = ledger_with_root();
        let activity = ledger.account_activity(&root).unwrap();
        assert_eq!(activity.purchases_added, 0);
        assert!(activity.total_spent.abs() < f64::EPSILON);
    }
}
