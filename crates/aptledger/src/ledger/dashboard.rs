use serde::Serialize;

use super::purchases::PurchaseView;
use super::Ledger;
use crate::error::Result;
use crate::model::{now, Collection};
use crate::policy::Session;
use crate::report::{self, Amount, ReportInput, ReportPeriod};
use crate::storage::{PurchaseQuery, Visibility};

const RECENT_PURCHASES: usize = 10;

/// Overview of the current month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    /// The month shown, localized.
    pub month: String,
    /// Purchases this month.
    pub purchase_count: usize,
    /// Spent this month.
    pub total_spent: f64,
    /// Vendors not in the trash.
    pub active_vendors: u64,
    /// Items not in the trash.
    pub active_items: u64,
    /// Latest purchases, newest first.
    pub recent: Vec<PurchaseView>,
    /// Spending this month per category, largest first.
    pub by_category: Vec<Amount>,
}

impl Ledger {
    /// The caller's dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn dashboard(&self, session: &Session) -> Result<Dashboard> {
        let scope = session.scope();
        let period = ReportPeriod::month_of(now())?;

        let mut query = PurchaseQuery::in_apartment(scope.apartment()).between(period.since, period.until);
        query.visibility = Visibility::Active;
        let this_month = self.storage.list_purchases(&query)?;
        let catalog = self.catalog_for(&this_month)?;
        let by_category = report::largest_first(report::category_totals(&ReportInput {
            purchases: &this_month,
            vendors: &catalog.vendors,
            items: &catalog.items,
            language: session.language,
            period,
        }));

        let recent = self
            .storage
            .list_purchases(&PurchaseQuery::in_apartment(scope.apartment()).limit(RECENT_PURCHASES))?;

        Ok(Dashboard {
            month: period.label(session.language),
            purchase_count: this_month.len(),
            total_spent: this_month.iter().map(|p| p.total_price).sum(),
            active_vendors: self
                .storage
                .count(Collection::Vendors, Some(Visibility::Active))?,
            active_items: self.storage.count(Collection::Items, Some(Visibility::Active))?,
            recent: self.describe_purchases(recent, session.language)?,
            by_category,
        })
    }
}
