use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::audit::Change;
use super::Ledger;
use crate::error::{Error, Result};
use crate::model::{
    new_record_id, now, AuditAction, Collection, Item, ItemUpdate, NewItem, NewVendor,
    Vendor, VendorUpdate,
};
use crate::policy::{authorize, Capability, Session};
use crate::retention::{self, Trashable};
use crate::storage::Visibility;
use crate::validate;

/// An item with the date it was last bought.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemListing {
    /// The item.
    #[serde(flatten)]
    pub item: Item,
    /// Newest active purchase of the item, if any.
    pub last_purchased: Option<DateTime<Utc>>,
}

impl Ledger {
    /// Add a vendor.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing name or malformed contact
    /// details.
    pub fn create_vendor(&self, session: &Session, new: NewVendor) -> Result<Vendor> {
        validate::required("english name", &new.name.english_name)?;
        validate::phone(&new.phone)?;
        validate::optional_email(&new.email)?;

        let at = now();
        let vendor = Vendor {
            id: new_record_id(),
            name: new.name,
            contact_person: new.contact_person,
            phone: new.phone,
            email: new.email,
            created_at: at,
            created_by: Some(session.user_id.clone()),
            updated_at: at,
            trash: retention::SoftDelete::default(),
        };
        self.storage.put_vendor(&vendor)?;

        info!(id = %vendor.id, name = %vendor.name.english_name, "Vendor created");
        self.record(
            Some(session),
            Change::new(AuditAction::CreateVendor, Collection::Vendors)
                .target(&vendor.id)
                .after(&vendor),
        );
        Ok(vendor)
    }

    /// Edit a vendor that is not in the trash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::InvalidState`] for a trashed
    /// vendor, or a validation error.
    pub fn update_vendor(&self, session: &Session, id: &str, update: VendorUpdate) -> Result<Vendor> {
        let mut vendor = self.get_vendor(id)?;
        ensure_active(&vendor)?;
        let before = vendor.clone();

        if let Some(name) = update.english_name {
            validate::required("english name", &name)?;
            vendor.name.english_name = name;
        }
        if let Some(name) = update.arabic_name {
            vendor.name.arabic_name = name;
        }
        if let Some(contact) = update.contact_person {
            vendor.contact_person = contact;
        }
        if let Some(phone) = update.phone {
            validate::phone(&phone)?;
            vendor.phone = phone;
        }
        if let Some(email) = update.email {
            validate::optional_email(&email)?;
            vendor.email = email;
        }

        vendor.updated_at = now();
        self.storage.put_vendor(&vendor)?;
        self.record(
            Some(session),
            Change::new(AuditAction::UpdateVendor, Collection::Vendors)
                .target(&vendor.id)
                .before(&before)
                .after(&vendor),
        );
        Ok(vendor)
    }

    /// A vendor by id, trashed or not.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such vendor.
    pub fn get_vendor(&self, id: &str) -> Result<Vendor> {
        self.storage
            .get_vendor(id)?
            .ok_or_else(|| Error::not_found(Collection::Vendors, id))
    }

    /// Active vendors sorted by name in the caller's language.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_vendors(&self, session: &Session) -> Result<Vec<Vendor>> {
        let mut vendors = self.storage.list_vendors(Visibility::Active)?;
        sort_by_name(&mut vendors, |v| v.name.get(session.language));
        Ok(vendors)
    }

    /// Move a vendor to the trash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Referenced`] while active purchases use the vendor,
    /// [`Error::InvalidState`] if it is already trashed, or
    /// [`Error::PermissionDenied`] for apartment users.
    pub fn trash_vendor(&self, session: &Session, id: &str) -> Result<Vendor> {
        authorize(session, Capability::TrashCatalog)?;
        let mut vendor = self.get_vendor(id)?;
        self.ensure_unreferenced(Collection::Vendors, id)?;
        retention::trash(&mut vendor, &session.user_id, now())?;
        self.storage.put_vendor(&vendor)?;

        info!(id, "Vendor moved to trash");
        self.record(
            Some(session),
            Change::new(AuditAction::DeleteVendor, Collection::Vendors).target(id),
        );
        Ok(vendor)
    }

    /// Add an item.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing name or category, or a
    /// price that is not positive.
    pub fn create_item(&self, session: &Session, new: NewItem) -> Result<Item> {
        validate::required("english name", &new.name.english_name)?;
        validate::required("category", &new.category)?;
        validate::positive_amount("unit price", new.unit_price)?;

        let at = now();
        let item = Item {
            id: new_record_id(),
            name: new.name,
            category: new.category.trim().to_string(),
            unit_price: new.unit_price,
            description: new.description,
            created_at: at,
            created_by: Some(session.user_id.clone()),
            updated_at: at,
            trash: retention::SoftDelete::default(),
        };
        self.storage.put_item(&item)?;

        info!(id = %item.id, name = %item.name.english_name, "Item created");
        self.record(
            Some(session),
            Change::new(AuditAction::CreateItem, Collection::Items)
                .target(&item.id)
                .after(&item),
        );
        Ok(item)
    }

    /// Edit an item that is not in the trash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::InvalidState`] for a trashed
    /// item, or a validation error.
    pub fn update_item(&self, session: &Session, id: &str, update: ItemUpdate) -> Result<Item> {
        let mut item = self.get_item(id)?;
        ensure_active(&item)?;
        let before = item.clone();

        if let Some(name) = update.english_name {
            validate::required("english name", &name)?;
            item.name.english_name = name;
        }
        if let Some(name) = update.arabic_name {
            item.name.arabic_name = name;
        }
        if let Some(category) = update.category {
            validate::required("category", &category)?;
            item.category = category.trim().to_string();
        }
        if let Some(price) = update.unit_price {
            validate::positive_amount("unit price", price)?;
            item.unit_price = price;
        }
        if let Some(description) = update.description {
            item.description = description;
        }

        item.updated_at = now();
        self.storage.put_item(&item)?;
        self.record(
            Some(session),
            Change::new(AuditAction::UpdateItem, Collection::Items)
                .target(&item.id)
                .before(&before)
                .after(&item),
        );
        Ok(item)
    }

    /// An item by id, trashed or not.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such item.
    pub fn get_item(&self, id: &str) -> Result<Item> {
        self.storage
            .get_item(id)?
            .ok_or_else(|| Error::not_found(Collection::Items, id))
    }

    /// Active items sorted by name, optionally of one category, each with
    /// its last purchase date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_items(&self, session: &Session, category: Option<&str>) -> Result<Vec<ItemListing>> {
        let mut items = self.storage.list_items(Visibility::Active, category)?;
        sort_by_name(&mut items, |i| i.name.get(session.language));
        let mut last_purchased = self.storage.last_purchase_dates()?;
        Ok(items
            .into_iter()
            .map(|item| ItemListing {
                last_purchased: last_purchased.remove(&item.id),
                item,
            })
            .collect())
    }

    /// Distinct categories of active items, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn item_categories(&self) -> Result<Vec<String>> {
        let mut categories: Vec<String> = self
            .storage
            .list_items(Visibility::Active, None)?
            .into_iter()
            .map(|i| i.category)
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    /// Move an item to the trash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Referenced`] while active purchases use the item,
    /// [`Error::InvalidState`] if it is already trashed, or
    /// [`Error::PermissionDenied`] for apartment users.
    pub fn trash_item(&self, session: &Session, id: &str) -> Result<Item> {
        authorize(session, Capability::TrashCatalog)?;
        let mut item = self.get_item(id)?;
        self.ensure_unreferenced(Collection::Items, id)?;
        retention::trash(&mut item, &session.user_id, now())?;
        self.storage.put_item(&item)?;

        info!(id, "Item moved to trash");
        self.record(
            Some(session),
            Change::new(AuditAction::DeleteItem, Collection::Items).target(id),
        );
        Ok(item)
    }

    pub(super) fn ensure_unreferenced(&self, collection: Collection, id: &str) -> Result<()> {
        let count = self.storage.count_active_references(collection, id)?;
        if count > 0 {
            return Err(Error::Referenced {
                collection,
                id: id.to_string(),
                count,
            });
        }
        Ok(())
    }
}

/// Trashed records are read-only until restored.
pub(super) fn ensure_active<T: Trashable>(record: &T) -> Result<()> {
    if record.is_trashed() {
        return Err(Error::invalid_state(
            T::COLLECTION,
            record.record_id(),
            "is in the trash",
        ));
    }
    Ok(())
}

fn sort_by_name<T>(records: &mut [T], name: impl Fn(&T) -> &str) {
    records.sort_by_cached_key(|r| name(r).to_lowercase());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testing::{item, ledger_with_root, member, vendor};
    use crate::model::{Language, LocalizedName, NewPurchase, Role};

    #[test]
    fn test_create_vendor_validates() {
        let (ledger, root) = ledger_with_root();
        let err = ledger
            .create_vendor(&root, NewVendor::default())
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let err = ledger
            .create_vendor(
                &root,
                NewVendor {
                    name: LocalizedName::new("Panda", ""),
                    phone: "call me".to_string(),
                    ..NewVendor::default()
                },
            )
            .unwrap_err();
        assert!(err.to_string().contains("phone"));
    }

    #[test]
    fn test_list_vendors_sorted_by_language() {
        let (ledger, mut root) = ledger_with_root();
        for (en, ar) in [("Zad", "أ"), ("Amwaj", "ب")] {
            ledger
                .create_vendor(
                    &root,
                    NewVendor {
                        name: LocalizedName::new(en, ar),
                        ..NewVendor::default()
                    },
                )
                .unwrap();
        }
        let english: Vec<String> = ledger
            .list_vendors(&root)
            .unwrap()
            .into_iter()
            .map(|v| v.name.english_name)
            .collect();
        assert_eq!(english, vec!["Amwaj", "Zad"]);

        root.language = Language::Ar;
        let arabic: Vec<String> = ledger
            .list_vendors(&root)
            .unwrap()
            .into_iter()
            .map(|v| v.name.english_name)
            .collect();
        assert_eq!(arabic, vec!["Zad", "Amwaj"]);
    }

    #[test]
    fn test_update_item() {
        let (ledger, root) = ledger_with_root();
        let id = item(&ledger, &root, "Milk", "Dairy", 5.5);
        let updated = ledger
            .update_item(
                &root,
                &id,
                ItemUpdate {
                    unit_price: Some(6.0),
                    ..ItemUpdate::default()
                },
            )
            .unwrap();
        assert!((updated.unit_price - 6.0).abs() < f64::EPSILON);

        let err = ledger
            .update_item(
                &root,
                &id,
                ItemUpdate {
                    unit_price: Some(0.0),
                    ..ItemUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_referenced_vendor_cannot_be_trashed() {
        let (ledger, root) = ledger_with_root();
        let vendor_id = vendor(&ledger, &root, "Panda");
        let item_id = item(&ledger, &root, "Milk", "Dairy", 5.5);
        ledger
            .create_purchase(
                &root,
                NewPurchase {
                    vendor_id: vendor_id.clone(),
                    item_id: item_id.clone(),
                    quantity: 1,
                    ..NewPurchase::default()
                },
            )
            .unwrap();

        let err = ledger.trash_vendor(&root, &vendor_id).unwrap_err();
        assert!(matches!(err, Error::Referenced { count: 1, .. }));
        let err = ledger.trash_item(&root, &item_id).unwrap_err();
        assert!(matches!(err, Error::Referenced { .. }));
        assert!(!ledger.get_vendor(&vendor_id).unwrap().is_trashed());
    }

    #[test]
    fn test_trashed_vendor_hidden_and_read_only() {
        let (ledger, root) = ledger_with_root();
        let id = vendor(&ledger, &root, "Panda");
        let trashed = ledger.trash_vendor(&root, &id).unwrap();
        assert_eq!(trashed.trash.deleted_by.as_deref(), Some(root.user_id.as_str()));

        assert!(ledger.list_vendors(&root).unwrap().is_empty());
        assert!(matches!(
            ledger.trash_vendor(&root, &id).unwrap_err(),
            Error::InvalidState { .. }
        ));
        assert!(matches!(
            ledger
                .update_vendor(&root, &id, VendorUpdate::default())
                .unwrap_err(),
            Error::InvalidState { .. }
        ));
    }

    #[test]
    fn test_apartment_user_cannot_trash_catalog() {
        let (ledger, root) = ledger_with_root();
        let user = member(&ledger, &root, "tenant", "A1", Role::ApartmentUser);
        let id = vendor(&ledger, &user, "Panda");
        assert!(ledger.trash_vendor(&user, &id).unwrap_err().is_permission_error());
    }

    #[test]
    fn test_list_items_with_category_and_last_purchase() {
        let (ledger, root) = ledger_with_root();
        let vendor_id = vendor(&ledger, &root, "Panda");
        let milk = item(&ledger, &root, "Milk", "Dairy", 5.5);
        item(&ledger, &root, "Bread", "Bakery", 2.0);
        item(&ledger, &root, "Cheese", "Dairy", 12.0);
        let purchase = ledger
            .create_purchase(
                &root,
                NewPurchase {
                    vendor_id,
                    item_id: milk.clone(),
                    quantity: 2,
                    ..NewPurchase::default()
                },
            )
            .unwrap();

        let dairy = ledger.list_items(&root, Some("Dairy")).unwrap();
        let names: Vec<&str> = dairy.iter().map(|l| l.item.name.english_name.as_str()).collect();
        assert_eq!(names, vec!["Cheese", "Milk"]);
        assert_eq!(dairy[1].last_purchased, Some(purchase.purchased_at));
        assert_eq!(dairy[0].last_purchased, None);

        assert_eq!(ledger.item_categories().unwrap(), vec!["Bakery", "Dairy"]);
    }
}
