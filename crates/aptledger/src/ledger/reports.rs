use tracing::info;

use super::Ledger;
use crate::error::Result;
use crate::model::now;
use crate::policy::Session;
use crate::report::{self, Report, ReportInput, ReportKind, ReportPeriod};
use crate::storage::{PurchaseQuery, Visibility};

impl Ledger {
    /// Compute a report over the caller's purchases in `period`.
    ///
    /// Purchases in the trash are left out. Every vendor and item the
    /// purchases reference is loaded in one query per collection before
    /// aggregating.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn report(&self, session: &Session, kind: ReportKind, period: ReportPeriod) -> Result<Report> {
        let mut query =
            PurchaseQuery::in_apartment(session.scope().apartment()).between(period.since, period.until);
        query.visibility = Visibility::Active;
        let purchases = self.storage.list_purchases(&query)?;
        let catalog = self.catalog_for(&purchases)?;

        let input = ReportInput {
            purchases: &purchases,
            vendors: &catalog.vendors,
            items: &catalog.items,
            language: session.language,
            period,
        };
        let report = report::build(kind, &input, now());
        info!(
            %kind,
            period = %report.header().period_label,
            purchases = purchases.len(),
            "Report generated"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::ledger::testing;
    use crate::model::{Language, NewPurchase, Role};

    fn buy_on(ledger: &Ledger, session: &Session, vendor: &str, item: &str, quantity: u32, month: u32) -> String {
        ledger
            .create_purchase(
                session,
                NewPurchase {
                    vendor_id: vendor.to_string(),
                    item_id: item.to_string(),
                    quantity,
                    purchased_at: Some(Utc.with_ymd_and_hms(2024, month, 10, 9, 0, 0).unwrap()),
                    ..NewPurchase::default()
                },
            )
            .unwrap()
            .id
    }

    #[test]
    fn test_monthly_report_is_scoped_and_skips_trash() {
        let (ledger, root) = testing::ledger_with_root();
        let admin = testing::member(&ledger, &root, "admin1", "A1", Role::ApartmentAdmin);
        let vendor = testing::vendor(&ledger, &root, "Panda");
        let milk = testing::item(&ledger, &root, "Milk", "Dairy", 5.0);

        buy_on(&ledger, &admin, &vendor, &milk, 2, 3);
        let trashed = buy_on(&ledger, &admin, &vendor, &milk, 1, 3);
        ledger.trash_purchase(&admin, &trashed).unwrap();
        buy_on(&ledger, &admin, &vendor, &milk, 4, 4);
        buy_on(&ledger, &root, &vendor, &milk, 8, 3);

        let period = ReportPeriod::month(2024, 3).unwrap();
        let Report::Monthly(report) = ledger.report(&admin, ReportKind::Monthly, period).unwrap() else {
            panic!("expected a monthly report");
        };
        assert_eq!(report.purchase_count, 1);
        assert!((report.total_amount - 10.0).abs() < 1e-9);
        assert_eq!(report.by_vendor[0].label, "Panda");

        let Report::Monthly(all) = ledger.report(&root, ReportKind::Monthly, period).unwrap() else {
            panic!("expected a monthly report");
        };
        assert_eq!(all.purchase_count, 2);
    }

    #[test]
    fn test_yearly_report_in_arabic() {
        let (ledger, mut root) = testing::ledger_with_root();
        let vendor = testing::vendor(&ledger, &root, "Panda");
        let milk = testing::item(&ledger, &root, "Milk", "Dairy", 6.0);
        buy_on(&ledger, &root, &vendor, &milk, 1, 1);
        buy_on(&ledger, &root, &vendor, &milk, 1, 2);

        root.language = Language::Ar;
        let Report::Yearly(report) = ledger
            .report(&root, ReportKind::Yearly, ReportPeriod::year(2024).unwrap())
            .unwrap()
        else {
            panic!("expected a yearly report");
        };
        assert_eq!(report.header.title, "التقرير السنوي");
        let months: Vec<&str> = report.by_month.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(months, vec!["يناير", "فبراير"]);
        assert!((report.monthly_average - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_item_report_includes_trashed_catalog_entries() {
        let (ledger, root) = testing::ledger_with_root();
        let vendor = testing::vendor(&ledger, &root, "Panda");
        let milk = testing::item(&ledger, &root, "Milk", "Dairy", 5.0);
        let id = buy_on(&ledger, &root, &vendor, &milk, 3, 5);
        ledger.trash_purchase(&root, &id).unwrap();
        ledger.trash_item(&root, &milk).unwrap();
        // A purchases-only backup restore brings the purchase back on its own.
        let mut restored = ledger.storage().get_purchase(&id).unwrap().unwrap();
        restored.trash = crate::retention::SoftDelete::default();
        ledger.storage().put_purchase(&restored).unwrap();

        let Report::Item(report) = ledger
            .report(&root, ReportKind::Item, ReportPeriod::month(2024, 5).unwrap())
            .unwrap()
        else {
            panic!("expected an item report");
        };
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].total_quantity, 3);
    }
}
