use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Collection;
use crate::retention::{SoftDelete, Trashable};

/// A logged purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    /// Record key.
    pub id: String,
    /// Apartment the purchase was made for.
    pub apartment_id: String,
    /// Vendor it was bought from.
    pub vendor_id: String,
    /// Item bought.
    pub item_id: String,
    /// Units bought, always positive.
    pub quantity: u32,
    /// Price per unit at the time of purchase.
    pub unit_price: f64,
    /// `quantity * unit_price`.
    pub total_price: f64,
    /// When the purchase happened.
    pub purchased_at: DateTime<Utc>,
    /// Who logged it.
    pub added_by: String,
    /// When it was logged.
    pub added_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete stamps.
    #[serde(flatten)]
    pub trash: SoftDelete,
}

impl Purchase {
    /// Compute a purchase total.
    #[must_use]
    pub fn compute_total(quantity: u32, unit_price: f64) -> f64 {
        f64::from(quantity) * unit_price
    }
}

impl Trashable for Purchase {
    const COLLECTION: Collection = Collection::Purchases;

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

/// Input for logging a purchase.
#[derive(Debug, Clone, Default)]
pub struct NewPurchase {
    /// Vendor id.
    pub vendor_id: String,
    /// Item id.
    pub item_id: String,
    /// Units bought.
    pub quantity: u32,
    /// Price per unit; the item's price when `None`.
    pub unit_price: Option<f64>,
    /// When it happened; now when `None`.
    pub purchased_at: Option<DateTime<Utc>>,
}
