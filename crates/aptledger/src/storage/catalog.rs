use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tracing::debug;

use super::{
    db_time, opt_db_time, placeholders, soft_delete_columns, text_values, time_column, Storage,
    Visibility,
};
use crate::error::Result;
use crate::model::{Item, LocalizedName, Vendor};

const VENDOR_COLUMNS: &str = "id, english_name, arabic_name, contact_person, phone, email, \
     created_at, created_by, updated_at, is_deleted, deleted_at, deleted_by, restored_at, restored_by";

const ITEM_COLUMNS: &str = "id, english_name, arabic_name, category, unit_price, description, \
     created_at, created_by, updated_at, is_deleted, deleted_at, deleted_by, restored_at, restored_by";

impl Storage {
    /// Insert or overwrite a vendor by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn put_vendor(&self, vendor: &Vendor) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO vendors ({VENDOR_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                vendor.id,
                vendor.name.english_name,
                vendor.name.arabic_name,
                vendor.contact_person,
                vendor.phone,
                vendor.email,
                db_time(&vendor.created_at),
                vendor.created_by,
                db_time(&vendor.updated_at),
                vendor.trash.is_deleted,
                opt_db_time(vendor.trash.deleted_at.as_ref()),
                vendor.trash.deleted_by,
                opt_db_time(vendor.trash.restored_at.as_ref()),
                vendor.trash.restored_by,
            ],
        )?;
        debug!(id = %vendor.id, "Saved vendor");
        Ok(())
    }

    /// Get a vendor by id, trashed or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_vendor(&self, id: &str) -> Result<Option<Vendor>> {
        let vendor = self
            .conn
            .query_row(
                &format!("SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = ?1"),
                [id],
                Self::row_to_vendor,
            )
            .optional()?;
        Ok(vendor)
    }

    /// List vendors by soft-delete state, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_vendors(&self, visibility: Visibility) -> Result<Vec<Vendor>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors WHERE {} ORDER BY created_at",
            visibility.condition()
        ))?;
        let vendors = stmt
            .query_map([], Self::row_to_vendor)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(vendors)
    }

    /// Fetch many vendors in one query, keyed by id. Unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_vendors(&self, ids: &[String]) -> Result<HashMap<String, Vendor>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors WHERE id IN ({})",
            placeholders(1, ids.len())
        ))?;
        let vendors = stmt
            .query_map(params_from_iter(text_values(ids)), Self::row_to_vendor)?
            .map(|v| v.map(|v| (v.id.clone(), v)))
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(vendors)
    }

    /// Insert or overwrite an item by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn put_item(&self, item: &Item) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO items ({ITEM_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                item.id,
                item.name.english_name,
                item.name.arabic_name,
                item.category,
                item.unit_price,
                item.description,
                db_time(&item.created_at),
                item.created_by,
                db_time(&item.updated_at),
                item.trash.is_deleted,
                opt_db_time(item.trash.deleted_at.as_ref()),
                item.trash.deleted_by,
                opt_db_time(item.trash.restored_at.as_ref()),
                item.trash.restored_by,
            ],
        )?;
        debug!(id = %item.id, "Saved item");
        Ok(())
    }

    /// Get an item by id, trashed or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_item(&self, id: &str) -> Result<Option<Item>> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
                [id],
                Self::row_to_item,
            )
            .optional()?;
        Ok(item)
    }

    /// List items by soft-delete state, optionally in one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_items(&self, visibility: Visibility, category: Option<&str>) -> Result<Vec<Item>> {
        let items = match category {
            Some(category) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {ITEM_COLUMNS} FROM items WHERE {} AND category = ?1 ORDER BY created_at",
                    visibility.condition()
                ))?;
                let rows = stmt
                    .query_map([category], Self::row_to_item)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {ITEM_COLUMNS} FROM items WHERE {} ORDER BY created_at",
                    visibility.condition()
                ))?;
                let rows = stmt
                    .query_map([], Self::row_to_item)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(items)
    }

    /// Fetch many items in one query, keyed by id. Unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_items(&self, ids: &[String]) -> Result<HashMap<String, Item>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id IN ({})",
            placeholders(1, ids.len())
        ))?;
        let items = stmt
            .query_map(params_from_iter(text_values(ids)), Self::row_to_item)?
            .map(|i| i.map(|i| (i.id.clone(), i)))
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(items)
    }

    /// Date of the newest non-deleted purchase of each item.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn last_purchase_dates(&self) -> Result<HashMap<String, DateTime<Utc>>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT item_id, MAX(purchased_at) FROM purchases
            WHERE is_deleted = 0 GROUP BY item_id
            ",
        )?;
        let dates = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, time_column(row, 1)?)))?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(dates)
    }

    fn row_to_vendor(row: &Row<'_>) -> rusqlite::Result<Vendor> {
        Ok(Vendor {
            id: row.get(0)?,
            name: LocalizedName {
                english_name: row.get(1)?,
                arabic_name: row.get(2)?,
            },
            contact_person: row.get(3)?,
            phone: row.get(4)?,
            email: row.get(5)?,
            created_at: time_column(row, 6)?,
            created_by: row.get(7)?,
            updated_at: time_column(row, 8)?,
            trash: soft_delete_columns(row, 9)?,
        })
    }

    fn row_to_item(row: &Row<'_>) -> rusqlite::Result<Item> {
        Ok(Item {
            id: row.get(0)?,
            name: LocalizedName {
                english_name: row.get(1)?,
                arabic_name: row.get(2)?,
            },
            category: row.get(3)?,
            unit_price: row.get(4)?,
            description: row.get(5)?,
            created_at: time_column(row, 6)?,
            created_by: row.get(7)?,
            updated_at: time_column(row, 8)?,
            trash: soft_delete_columns(row, 9)?,
        })
    }
}
