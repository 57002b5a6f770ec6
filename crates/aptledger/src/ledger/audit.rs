use serde::Serialize;
use tracing::warn;

use super::Ledger;
use crate::error::Result;
use crate::model::{now, AuditAction, AuditEntry, Collection, User};
use crate::policy::{authorize, Capability, Session};

/// One audited change: the action, its target and before/after snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    action: AuditAction,
    collection: Collection,
    target_id: Option<String>,
    old_value: Option<serde_json::Value>,
    new_value: Option<serde_json::Value>,
}

impl Change {
    /// A change of `collection` by `action`.
    #[must_use]
    pub fn new(action: AuditAction, collection: Collection) -> Self {
        Self {
            action,
            collection,
            target_id: None,
            old_value: None,
            new_value: None,
        }
    }

    /// The record the change applies to.
    #[must_use]
    pub fn target(mut self, id: &str) -> Self {
        self.target_id = Some(id.to_string());
        self
    }

    /// Snapshot before the change.
    #[must_use]
    pub fn before(mut self, value: &impl Serialize) -> Self {
        self.old_value = snapshot(value);
        self
    }

    /// Snapshot after the change.
    #[must_use]
    pub fn after(mut self, value: &impl Serialize) -> Self {
        self.new_value = snapshot(value);
        self
    }
}

fn snapshot(value: &impl Serialize) -> Option<serde_json::Value> {
    let mut value = serde_json::to_value(value).ok()?;
    if let Some(fields) = value.as_object_mut() {
        fields.remove("password_hash");
    }
    Some(value)
}

/// Account fields worth auditing, without the credential.
pub(super) fn user_snapshot(user: &User) -> serde_json::Value {
    serde_json::json!({
        "username": user.username,
        "english_name": user.name.english_name,
        "arabic_name": user.name.arabic_name,
        "email": user.email,
        "apartment_id": user.apartment_id,
        "role": user.role,
        "is_active": user.is_active,
    })
}

impl Ledger {
    /// Append an audit entry for `change` made by `actor`.
    ///
    /// A failed write is logged and otherwise ignored; it never fails the
    /// operation being described.
    pub(super) fn record(&self, actor: Option<&Session>, change: Change) {
        let entry = AuditEntry {
            id: 0,
            action: change.action,
            collection: change.collection,
            target_id: change.target_id,
            old_value: change.old_value,
            new_value: change.new_value,
            actor_id: actor.map(|s| s.user_id.clone()),
            actor_apartment_id: actor.map(|s| s.apartment_id.clone()),
            timestamp: now(),
        };
        if let Err(e) = self.storage.append_audit(&entry) {
            warn!(action = %entry.action, error = %e, "Failed to write audit entry");
        }
    }

    /// Most recent audit entries, newest first.
    ///
    /// System admins see everything; apartment admins see what members of
    /// their apartment did.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::PermissionDenied`] for apartment users, or a
    /// storage error.
    pub fn audit_log(&self, session: &Session, limit: usize) -> Result<Vec<AuditEntry>> {
        authorize(session, Capability::ViewAuditLog)?;
        self.storage.list_audit(session.scope().apartment(), limit)
    }
}
