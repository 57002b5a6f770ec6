use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::info;

use super::audit::Change;
use super::catalog::ensure_active;
use super::Ledger;
use crate::error::{Error, Result};
use crate::model::{
    new_record_id, now, AuditAction, Collection, Item, Language, NewPurchase, Purchase, Vendor,
};
use crate::policy::{authorize, Capability, Session};
use crate::report::unknown_name;
use crate::retention::{self, SoftDelete};
use crate::storage::{PurchaseQuery, Visibility};
use crate::validate;

/// A purchase with its vendor and item names resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseView {
    /// The purchase.
    #[serde(flatten)]
    pub purchase: Purchase,
    /// Vendor name in the caller's language.
    pub vendor_name: String,
    /// Item name in the caller's language.
    pub item_name: String,
    /// Item category, empty if the item is gone.
    pub category: String,
}

/// Vendors and items referenced by a set of purchases, fetched together.
#[derive(Debug, Default)]
pub(crate) struct Catalog {
    pub(crate) vendors: HashMap<String, Vendor>,
    pub(crate) items: HashMap<String, Item>,
}

impl Catalog {
    pub(crate) fn vendor_name(&self, id: &str, language: Language) -> String {
        self.vendors
            .get(id)
            .map_or(unknown_name(language), |v| v.name.get(language))
            .to_string()
    }

    pub(crate) fn item_name(&self, id: &str, language: Language) -> String {
        self.items
            .get(id)
            .map_or(unknown_name(language), |i| i.name.get(language))
            .to_string()
    }
}

impl Ledger {
    /// Log a purchase for the caller's apartment.
    ///
    /// The unit price defaults to the item's current price and the total is
    /// computed from it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown vendor or item,
    /// [`Error::InvalidState`] if either is in the trash, or a validation
    /// error for a zero quantity or non-positive price.
    pub fn create_purchase(&self, session: &Session, new: NewPurchase) -> Result<Purchase> {
        validate::positive_quantity(new.quantity)?;
        let vendor = self.get_vendor(&new.vendor_id)?;
        ensure_active(&vendor)?;
        let item = self.get_item(&new.item_id)?;
        ensure_active(&item)?;

        let unit_price = new.unit_price.unwrap_or(item.unit_price);
        validate::positive_amount("unit price", unit_price)?;

        let at = now();
        let purchase = Purchase {
            id: new_record_id(),
            apartment_id: session.apartment_id.clone(),
            vendor_id: vendor.id,
            item_id: item.id,
            quantity: new.quantity,
            unit_price,
            total_price: Purchase::compute_total(new.quantity, unit_price),
            purchased_at: new.purchased_at.unwrap_or(at),
            added_by: session.user_id.clone(),
            added_at: at,
            updated_at: at,
            trash: SoftDelete::default(),
        };
        self.storage.put_purchase(&purchase)?;

        info!(
            id = %purchase.id,
            apartment = %purchase.apartment_id,
            total = purchase.total_price,
            "Purchase logged"
        );
        self.record(
            Some(session),
            Change::new(AuditAction::CreatePurchase, Collection::Purchases)
                .target(&purchase.id)
                .after(&purchase),
        );
        Ok(purchase)
    }

    /// Active purchases visible to the caller, newest first.
    ///
    /// The apartment filter of `query` is replaced by the caller's scope for
    /// non-system roles, and trashed purchases are never returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_purchases(&self, session: &Session, mut query: PurchaseQuery) -> Result<Vec<PurchaseView>> {
        if let Some(own) = session.scope().apartment() {
            query.apartment_id = Some(own.to_string());
        }
        query.visibility = Visibility::Active;
        let purchases = self.storage.list_purchases(&query)?;
        self.describe_purchases(purchases, session.language)
    }

    /// A purchase the caller may see.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if it does not exist or belongs to another
    /// apartment.
    pub fn get_purchase(&self, session: &Session, id: &str) -> Result<Purchase> {
        self.storage
            .get_purchase(id)?
            .filter(|p| session.can_access_apartment(&p.apartment_id))
            .ok_or_else(|| Error::not_found(Collection::Purchases, id))
    }

    /// Move a purchase to the trash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] for purchases of another
    /// apartment, or [`Error::InvalidState`] if it is already trashed.
    pub fn trash_purchase(&self, session: &Session, id: &str) -> Result<Purchase> {
        let mut purchase = self
            .storage
            .get_purchase(id)?
            .ok_or_else(|| Error::not_found(Collection::Purchases, id))?;
        authorize(
            session,
            Capability::TrashPurchase {
                apartment_id: &purchase.apartment_id,
            },
        )?;
        retention::trash(&mut purchase, &session.user_id, now())?;
        self.storage.put_purchase(&purchase)?;

        info!(id, "Purchase moved to trash");
        self.record(
            Some(session),
            Change::new(AuditAction::DeletePurchase, Collection::Purchases).target(id),
        );
        Ok(purchase)
    }

    /// Fetch every vendor and item the purchases refer to, one query per
    /// collection.
    pub(crate) fn catalog_for(&self, purchases: &[Purchase]) -> Result<Catalog> {
        let vendor_ids: Vec<String> = purchases
            .iter()
            .map(|p| p.vendor_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let item_ids: Vec<String> = purchases
            .iter()
            .map(|p| p.item_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Ok(Catalog {
            vendors: self.storage.get_vendors(&vendor_ids)?,
            items: self.storage.get_items(&item_ids)?,
        })
    }

    pub(crate) fn describe_purchases(&self, purchases: Vec<Purchase>, language: Language) -> Result<Vec<PurchaseView>> {
        let catalog = self.catalog_for(&purchases)?;
        Ok(purchases
            .into_iter()
            .map(|purchase| PurchaseView {
                vendor_name: catalog.vendor_name(&purchase.vendor_id, language),
                item_name: catalog.item_name(&purchase.item_id, language),
                category: catalog
                    .items
                    .get(&purchase.item_id)
                    .map(|i| i.category.clone())
                    .unwrap_or_default(),
                purchase,
            })
            .collect())
    }
}
