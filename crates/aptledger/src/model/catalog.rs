use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Collection, LocalizedName};
use crate::retention::{SoftDelete, Trashable};

/// A shop or supplier purchases are made from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    /// Record key.
    pub id: String,
    /// Vendor name.
    #[serde(flatten)]
    pub name: LocalizedName,
    /// Contact person.
    #[serde(default)]
    pub contact_person: String,
    /// Contact phone.
    #[serde(default)]
    pub phone: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// When the vendor was created.
    pub created_at: DateTime<Utc>,
    /// Who created it.
    #[serde(default)]
    pub created_by: Option<String>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete stamps.
    #[serde(flatten)]
    pub trash: SoftDelete,
}

impl Trashable for Vendor {
    const COLLECTION: Collection = Collection::Vendors;

    fn record_id(&self) -> &str {
        &self.id
    }

    fn soft_delete(&self) -> &SoftDelete {
        &self.trash
    }

    fn soft_delete_mut(&mut self) -> &mut SoftDelete {
        &mut self.trash
    }
}

/// Input for creating a vendor.
#[derive(Debug, Clone, Default)]
pub struct NewVendor {
    /// Vendor name.
    pub name: LocalizedName,
    /// Contact person.
    pub contact_person: String,
    /// Contact phone.
    pub phone: String,
    /// Contact email.
    pub email: String,
}

/// Edits to a vendor.
#[derive(Debug, Clone, Default)]
pub struct VendorUpdate {
    /// New English name.
    pub english_name: Option<String>,
    /// New Arabic name.
    pub arabic_name: Option<String>,
    /// New contact person.
    pub contact_person: Option<String>,
    /// New phone.
    pub phone: Option<String>,
    /// New email.
    pub email: Option<String>,
}

/// Something that can be bought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Record key.
    pub id: String,
    /// Item name.
    #[serde(flatten)]
    pub name: LocalizedName,
    /// Free-form category used by reports.
    pub category: String,
    /// Default price per unit.
    pub unit_price: f64,
    /// Optional description.
    #[serde(default)]
    pub description: String,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
    /// Who created it.
    #[serde(default)]
    pub created_by: Option<String>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete stamps.
    #[serde(flatten)]
    pub trash: SoftDelete,
}

impl Trashable for Item {
    const COLLECTION: Collection = Collection::Items;

    fn record_id(&self) -> &str {
        &self.id
    }

    fn soft_delete(&self) -> &SoftDelete {
        &self.trash
    }

    fn soft_delete_mut(&mut self) -> &mut SoftDelete {
        &mut self.trash
    }
}

/// Input for creating an item.
#[derive(Debug, Clone, Default)]
pub struct NewItem {
    /// Item name.
    pub name: LocalizedName,
    /// Category.
    pub category: String,
    /// Default price per unit.
    pub unit_price: f64,
    /// Description.
    pub description: String,
}

/// Edits to an item.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    /// New English name.
    pub english_name: Option<String>,
    /// New Arabic name.
    pub arabic_name: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New default price.
    pub unit_price: Option<f64>,
    /// New description.
    pub description: Option<String>,
}
