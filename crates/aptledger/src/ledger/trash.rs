use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::audit::Change;
use super::catalog::ensure_active;
use super::purchases::Catalog;
use super::Ledger;
use crate::error::{Error, Result};
use crate::model::{now, AuditAction, Collection, Language, Purchase, Role};
use crate::policy::{authorize, Capability, Session};
use crate::retention::{self, RetentionStatus, SoftDelete, Trashable};
use crate::storage::{PurchaseQuery, Visibility};

/// The kinds of record that go through the trash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrashKind {
    /// Purchases.
    Purchase,
    /// Vendors.
    Vendor,
    /// Items.
    Item,
}

impl TrashKind {
    /// Every kind, in listing order.
    pub const ALL: [Self; 3] = [Self::Purchase, Self::Vendor, Self::Item];

    /// The collection records of this kind live in.
    #[must_use]
    pub fn collection(&self) -> Collection {
        match self {
            Self::Purchase => Collection::Purchases,
            Self::Vendor => Collection::Vendors,
            Self::Item => Collection::Items,
        }
    }

    fn restore_action(self) -> AuditAction {
        match self {
            Self::Purchase => AuditAction::RestorePurchase,
            Self::Vendor => AuditAction::RestoreVendor,
            Self::Item => AuditAction::RestoreItem,
        }
    }
}

impl fmt::Display for TrashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Purchase => "purchase",
            Self::Vendor => "vendor",
            Self::Item => "item",
        })
    }
}

impl FromStr for TrashKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "purchase" | "purchases" => Ok(Self::Purchase),
            "vendor" | "vendors" => Ok(Self::Vendor),
            "item" | "items" => Ok(Self::Item),
            other => Err(Error::validation(
                "kind",
                format!("unknown trash kind '{other}'"),
            )),
        }
    }
}

/// A record sitting in the trash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrashEntry {
    /// Record kind.
    pub kind: TrashKind,
    /// Record key.
    pub id: String,
    /// Display name; for purchases, item and vendor.
    pub name: String,
    /// Owning apartment, purchases only.
    pub apartment_id: Option<String>,
    /// When it was trashed.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Username of whoever trashed it, or their id if the account is gone.
    pub deleted_by: Option<String>,
    /// Time left before it may be purged.
    pub status: RetentionStatus,
}

/// Records removed by a bulk purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeSummary {
    /// Purchases removed.
    pub purchases: usize,
    /// Vendors removed.
    pub vendors: usize,
    /// Items removed.
    pub items: usize,
}

impl PurgeSummary {
    /// Total records removed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.purchases + self.vendors + self.items
    }

    fn add(&mut self, kind: TrashKind, n: usize) {
        match kind {
            TrashKind::Purchase => self.purchases += n,
            TrashKind::Vendor => self.vendors += n,
            TrashKind::Item => self.items += n,
        }
    }
}

impl Ledger {
    /// Trashed records visible to the caller, most recently deleted first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] for apartment users.
    pub fn list_trash(&self, session: &Session, kind: Option<TrashKind>) -> Result<Vec<TrashEntry>> {
        authorize(session, Capability::ManageTrash)?;
        let kinds: Vec<TrashKind> = kind.map_or_else(|| TrashKind::ALL.to_vec(), |k| vec![k]);
        let at = now();
        let policy = self.retention();
        let language = session.language;

        let usernames: HashMap<String, String> = self
            .storage
            .list_users(None)?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();
        let entry = |kind, id: &str, name: String, apartment_id, stamps: &SoftDelete| TrashEntry {
            kind,
            id: id.to_string(),
            name,
            apartment_id,
            deleted_at: stamps.deleted_at,
            deleted_by: stamps
                .deleted_by
                .as_ref()
                .map(|by| usernames.get(by).unwrap_or(by).clone()),
            status: policy
                .status(stamps, at)
                .unwrap_or(RetentionStatus::EligibleForPurge),
        };

        let mut entries = Vec::new();
        for kind in kinds {
            match kind {
                TrashKind::Purchase => {
                    let purchases = self.trashed_purchases(session)?;
                    let catalog = self.catalog_for(&purchases)?;
                    entries.extend(purchases.iter().map(|p| {
                        entry(
                            kind,
                            &p.id,
                            purchase_label(&catalog, p, language),
                            Some(p.apartment_id.clone()),
                            &p.trash,
                        )
                    }));
                }
                TrashKind::Vendor => {
                    for v in self.storage.list_vendors(Visibility::Trashed)? {
                        entries.push(entry(kind, &v.id, v.name.get(language).to_string(), None, &v.trash));
                    }
                }
                TrashKind::Item => {
                    for i in self.storage.list_items(Visibility::Trashed, None)? {
                        entries.push(entry(kind, &i.id, i.name.get(language).to_string(), None, &i.trash));
                    }
                }
            }
        }
        entries.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        Ok(entries)
    }

    /// Bring a record back from the trash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::PermissionDenied`], or
    /// [`Error::InvalidState`] if the record is not in the trash or is a
    /// purchase whose vendor or item is still in the trash.
    pub fn restore(&self, session: &Session, kind: TrashKind, id: &str) -> Result<()> {
        let at = now();
        match kind {
            TrashKind::Purchase => {
                let mut purchase = self.find_purchase(id)?;
                authorize(
                    session,
                    Capability::ManageTrashedPurchase {
                        apartment_id: &purchase.apartment_id,
                    },
                )?;
                if let Some(vendor) = self.storage.get_vendor(&purchase.vendor_id)? {
                    ensure_active(&vendor)?;
                }
                if let Some(item) = self.storage.get_item(&purchase.item_id)? {
                    ensure_active(&item)?;
                }
                retention::restore(&mut purchase, &session.user_id, at)?;
                self.storage.put_purchase(&purchase)?;
            }
            TrashKind::Vendor => {
                authorize(session, Capability::ManageTrash)?;
                let mut vendor = self.get_vendor(id)?;
                retention::restore(&mut vendor, &session.user_id, at)?;
                self.storage.put_vendor(&vendor)?;
            }
            TrashKind::Item => {
                authorize(session, Capability::ManageTrash)?;
                let mut item = self.get_item(id)?;
                retention::restore(&mut item, &session.user_id, at)?;
                self.storage.put_item(&item)?;
            }
        }

        info!(%kind, id, "Restored from trash");
        self.record(
            Some(session),
            Change::new(kind.restore_action(), kind.collection()).target(id),
        );
        Ok(())
    }

    /// Permanently delete one trashed record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::PermissionDenied`] (vendors and
    /// items need a system admin), [`Error::InvalidState`] if the record
    /// is not in the trash, or [`Error::Referenced`] if an active purchase
    /// still uses the vendor or item.
    pub fn purge(&self, session: &Session, kind: TrashKind, id: &str) -> Result<()> {
        let snapshot = match kind {
            TrashKind::Purchase => {
                let purchase = self.find_purchase(id)?;
                authorize(
                    session,
                    Capability::ManageTrashedPurchase {
                        apartment_id: &purchase.apartment_id,
                    },
                )?;
                ensure_trashed(&purchase)?;
                serde_json::to_value(&purchase)?
            }
            TrashKind::Vendor => {
                authorize(session, Capability::PurgeCatalog)?;
                let vendor = self.get_vendor(id)?;
                ensure_trashed(&vendor)?;
                self.ensure_unreferenced(Collection::Vendors, id)?;
                serde_json::to_value(&vendor)?
            }
            TrashKind::Item => {
                authorize(session, Capability::PurgeCatalog)?;
                let item = self.get_item(id)?;
                ensure_trashed(&item)?;
                self.ensure_unreferenced(Collection::Items, id)?;
                serde_json::to_value(&item)?
            }
        };

        self.storage.delete(kind.collection(), id)?;
        info!(%kind, id, "Permanently deleted");
        self.record(
            Some(session),
            Change::new(AuditAction::DeletePermanently, kind.collection())
                .target(id)
                .before(&snapshot),
        );
        Ok(())
    }

    /// Permanently delete everything in the trash the caller manages.
    ///
    /// System admins empty the whole trash; apartment admins remove their
    /// apartment's trashed purchases. Vendors and items an active purchase
    /// still uses stay in the trash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] for apartment users. Nothing is
    /// removed if any delete fails.
    pub fn empty_trash(&self, session: &Session) -> Result<PurgeSummary> {
        let kinds = self.purgeable_kinds(session)?;
        let apartment = session.scope().apartment().map(str::to_string);

        let summary = self.storage.in_transaction(|storage| {
            let mut summary = PurgeSummary::default();
            for kind in kinds {
                let removed = storage.purge_trashed(kind.collection(), apartment.as_deref())?;
                summary.add(kind, removed);
            }
            Ok(summary)
        })?;

        info!(removed = summary.total(), "Trash emptied");
        self.record(
            Some(session),
            Change::new(AuditAction::EmptyTrash, Collection::System).after(&summary),
        );
        Ok(summary)
    }

    /// Permanently delete trashed records whose retention window has passed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] for apartment users. Nothing is
    /// removed if any delete fails.
    pub fn purge_expired(&self, session: &Session) -> Result<PurgeSummary> {
        let kinds = self.purgeable_kinds(session)?;
        let at = now();
        let policy = self.retention();
        let expired = |stamps: &SoftDelete| {
            policy
                .status(stamps, at)
                .is_some_and(|s| s.is_eligible_for_purge())
        };

        let mut doomed: Vec<(TrashKind, String)> = Vec::new();
        for kind in kinds {
            match kind {
                TrashKind::Purchase => doomed.extend(
                    self.trashed_purchases(session)?
                        .into_iter()
                        .filter(|p| expired(&p.trash))
                        .map(|p| (kind, p.id)),
                ),
                TrashKind::Vendor => doomed.extend(
                    self.storage
                        .list_vendors(Visibility::Trashed)?
                        .into_iter()
                        .filter(|v| expired(&v.trash))
                        .map(|v| (kind, v.id)),
                ),
                TrashKind::Item => doomed.extend(
                    self.storage
                        .list_items(Visibility::Trashed, None)?
                        .into_iter()
                        .filter(|i| expired(&i.trash))
                        .map(|i| (kind, i.id)),
                ),
            }
        }

        let summary = self.storage.in_transaction(|storage| {
            let mut summary = PurgeSummary::default();
            for (kind, id) in &doomed {
                if *kind != TrashKind::Purchase
                    && storage.count_active_references(kind.collection(), id)? > 0
                {
                    continue;
                }
                if storage.delete(kind.collection(), id)? {
                    summary.add(*kind, 1);
                }
            }
            Ok(summary)
        })?;

        info!(
            removed = summary.total(),
            retention_days = policy.retention_days(),
            "Purged expired trash"
        );
        self.record(
            Some(session),
            Change::new(AuditAction::PurgeExpired, Collection::System).after(&summary),
        );
        Ok(summary)
    }

    fn purgeable_kinds(&self, session: &Session) -> Result<Vec<TrashKind>> {
        authorize(session, Capability::ManageTrash)?;
        if session.role == Role::SystemAdmin {
            authorize(session, Capability::PurgeCatalog)?;
            Ok(TrashKind::ALL.to_vec())
        } else {
            authorize(
                session,
                Capability::ManageTrashedPurchase {
                    apartment_id: &session.apartment_id,
                },
            )?;
            Ok(vec![TrashKind::Purchase])
        }
    }

    fn trashed_purchases(&self, session: &Session) -> Result<Vec<Purchase>> {
        self.storage.list_purchases(&PurchaseQuery {
            visibility: Visibility::Trashed,
            ..PurchaseQuery::in_apartment(session.scope().apartment())
        })
    }

    fn find_purchase(&self, id: &str) -> Result<Purchase> {
        self.storage
            .get_purchase(id)?
            .ok_or_else(|| Error::not_found(Collection::Purchases, id))
    }
}

fn ensure_trashed<T: Trashable>(record: &T) -> Result<()> {
    if !record.is_trashed() {
        return Err(Error::invalid_state(
            T::COLLECTION,
            record.record_id(),
            "is not in the trash",
        ));
    }
    Ok(())
}

fn purchase_label(catalog: &Catalog, purchase: &Purchase, language: Language) -> String {
    format!(
        "{} ({})",
        catalog.item_name(&purchase.item_id, language),
        catalog.vendor_name(&purchase.vendor_id, language)
    )
}
