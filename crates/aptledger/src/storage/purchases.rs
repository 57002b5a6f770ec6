use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tracing::debug;

use super::{db_time, limit_value, opt_db_time, soft_delete_columns, time_column, Storage, Visibility};
use crate::error::Result;
use crate::model::Purchase;

const PURCHASE_COLUMNS: &str = "id, apartment_id, vendor_id, item_id, quantity, unit_price, \
     total_price, purchased_at, added_by, added_at, updated_at, \
     is_deleted, deleted_at, deleted_by, restored_at, restored_by";

/// Filters for listing purchases. Results are newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PurchaseQuery {
    /// Only this apartment.
    pub apartment_id: Option<String>,
    /// Soft-delete state.
    pub visibility: Visibility,
    /// Purchased at or after.
    pub since: Option<DateTime<Utc>>,
    /// Purchased strictly before.
    pub until: Option<DateTime<Utc>>,
    /// Logged by this account.
    pub added_by: Option<String>,
    /// Bought from this vendor.
    pub vendor_id: Option<String>,
    /// Of this item.
    pub item_id: Option<String>,
    /// At most this many.
    pub limit: Option<usize>,
}

impl PurchaseQuery {
    /// Active purchases of an apartment, or of all apartments for `None`.
    #[must_use]
    pub fn in_apartment(apartment_id: Option<&str>) -> Self {
        Self {
            apartment_id: apartment_id.map(str::to_string),
            ..Self::default()
        }
    }

    /// Narrow to `[since, until)`.
    #[must_use]
    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE {}",
            self.visibility.condition()
        );
        let mut values = Vec::new();
        let mut filter = |column: &str, op: &str, value: Value| {
            values.push(value);
            sql.push_str(&format!(" AND {column} {op} ?{}", values.len()));
        };

        if let Some(apartment) = &self.apartment_id {
            filter("apartment_id", "=", Value::Text(apartment.clone()));
        }
        if let Some(since) = &self.since {
            filter("purchased_at", ">=", Value::Text(db_time(since)));
        }
        if let Some(until) = &self.until {
            filter("purchased_at", "<", Value::Text(db_time(until)));
        }
        if let Some(added_by) = &self.added_by {
            filter("added_by", "=", Value::Text(added_by.clone()));
        }
        if let Some(vendor) = &self.vendor_id {
            filter("vendor_id", "=", Value::Text(vendor.clone()));
        }
        if let Some(item) = &self.item_id {
            filter("item_id", "=", Value::Text(item.clone()));
        }

        sql.push_str(" ORDER BY purchased_at DESC, id DESC");
        if let Some(limit) = self.limit {
            values.push(Value::Integer(limit_value(limit)));
            sql.push_str(&format!(" LIMIT ?{}", values.len()));
        }
        (sql, values)
    }
}

impl Storage {
    /// Insert or overwrite a purchase by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn put_purchase(&self, purchase: &Purchase) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO purchases ({PURCHASE_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
            ),
            params![
                purchase.id,
                purchase.apartment_id,
                purchase.vendor_id,
                purchase.item_id,
                purchase.quantity,
                purchase.unit_price,
                purchase.total_price,
                db_time(&purchase.purchased_at),
                purchase.added_by,
                db_time(&purchase.added_at),
                db_time(&purchase.updated_at),
                purchase.trash.is_deleted,
                opt_db_time(purchase.trash.deleted_at.as_ref()),
                purchase.trash.deleted_by,
                opt_db_time(purchase.trash.restored_at.as_ref()),
                purchase.trash.restored_by,
            ],
        )?;
        debug!(id = %purchase.id, apartment = %purchase.apartment_id, "Saved purchase");
        Ok(())
    }

    /// Get a purchase by id, trashed or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_purchase(&self, id: &str) -> Result<Option<Purchase>> {
        let purchase = self
            .conn
            .query_row(
                &format!("SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?1"),
                [id],
                Self::row_to_purchase,
            )
            .optional()?;
        Ok(purchase)
    }

    /// List purchases matching a query, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_purchases(&self, query: &PurchaseQuery) -> Result<Vec<Purchase>> {
        let (sql, values) = query.to_sql();
        let mut stmt = self.conn.prepare(&sql)?;
        let purchases = stmt
            .query_map(params_from_iter(values), Self::row_to_purchase)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(purchases)
    }

    fn row_to_purchase(row: &Row<'_>) -> rusqlite::Result<Purchase> {
        Ok(Purchase {
            id: row.get(0)?,
            apartment_id: row.get(1)?,
            vendor_id: row.get(2)?,
            item_id: row.get(3)?,
            quantity: row.get(4)?,
            unit_price: row.get(5)?,
            total_price: row.get(6)?,
            purchased_at: time_column(row, 7)?,
            added_by: row.get(8)?,
            added_at: time_column(row, 9)?,
            updated_at: time_column(row, 10)?,
            trash: soft_delete_columns(row, 11)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{now, Collection};
    use crate::retention::SoftDelete;
    use chrono::TimeZone;

    fn purchase(id: &str, apartment: &str, day: u32) -> Purchase {
        let at = Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap();
        Purchase {
            id: id.to_string(),
            apartment_id: apartment.to_string(),
            vendor_id: "v-1".to_string(),
            item_id: "i-1".to_string(),
            quantity: 2,
            unit_price: 3.5,
            total_price: 7.0,
            purchased_at: at,
            added_by: "u-1".to_string(),
            added_at: at,
            updated_at: at,
            trash: SoftDelete::default(),
        }
    }

    fn seeded() -> Storage {
        let storage = Storage::open_in_memory().unwrap();
        storage.put_purchase(&purchase("p-1", "A1", 1)).unwrap();
        storage.put_purchase(&purchase("p-2", "A1", 10)).unwrap();
        storage.put_purchase(&purchase("p-3", "B2", 20)).unwrap();
        let mut trashed = purchase("p-4", "A1", 15);
        trashed.trash.is_deleted = true;
        trashed.trash.deleted_at = Some(now());
        storage.put_purchase(&trashed).unwrap();
        storage
    }

    fn ids(purchases: &[Purchase]) -> Vec<&str> {
        purchases.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_put_and_get_purchase() {
        let storage = seeded();
        assert_eq!(
            storage.get_purchase("p-2").unwrap(),
            Some(purchase("p-2", "A1", 10))
        );
        assert!(storage.get_purchase("p-9").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first_and_scoped() {
        let storage = seeded();
        let all = storage.list_purchases(&PurchaseQuery::default()).unwrap();
        assert_eq!(ids(&all), vec!["p-3", "p-2", "p-1"]);

        let a1 = storage
            .list_purchases(&PurchaseQuery::in_apartment(Some("A1")))
            .unwrap();
        assert_eq!(ids(&a1), vec!["p-2", "p-1"]);
    }

    #[test]
    fn test_list_date_range_is_half_open() {
        let storage = seeded();
        let since = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        let found = storage
            .list_purchases(&PurchaseQuery::default().between(since, until))
            .unwrap();
        assert_eq!(ids(&found), vec!["p-2", "p-1"]);
    }

    #[test]
    fn test_list_trashed_and_limit() {
        let storage = seeded();
        let trashed = storage
            .list_purchases(&PurchaseQuery {
                visibility: Visibility::Trashed,
                ..PurchaseQuery::default()
            })
            .unwrap();
        assert_eq!(ids(&trashed), vec!["p-4"]);

        let latest = storage
            .list_purchases(&PurchaseQuery::default().limit(1))
            .unwrap();
        assert_eq!(ids(&latest), vec!["p-3"]);
    }

    #[test]
    fn test_active_references_ignore_trashed() {
        let storage = seeded();
        assert_eq!(
            storage
                .count_active_references(Collection::Vendors, "v-1")
                .unwrap(),
            3
        );
        assert_eq!(
            storage
                .count_active_references(Collection::Items, "i-404")
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_purge_trashed_by_apartment() {
        let storage = seeded();
        assert_eq!(
            storage
                .purge_trashed(Collection::Purchases, Some("B2"))
                .unwrap(),
            0
        );
        assert_eq!(
            storage
                .purge_trashed(Collection::Purchases, Some("A1"))
                .unwrap(),
            1
        );
        assert!(storage.get_purchase("p-4").unwrap().is_none());
    }

    #[test]
    fn test_last_purchase_dates() {
        let storage = seeded();
        let dates = storage.last_purchase_dates().unwrap();
        assert_eq!(
            dates["i-1"],
            Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()
        );
    }
}
