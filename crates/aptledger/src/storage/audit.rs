use rusqlite::{params, Row};

use super::{db_time, limit_value, parsed_column, time_column, conversion_error, Storage};
use crate::error::Result;
use crate::model::AuditEntry;

const AUDIT_COLUMNS: &str =
    "id, action, collection, target_id, old_value, new_value, actor_id, actor_apartment_id, timestamp";

impl Storage {
    /// Append an audit entry. The entry's `id` is ignored; the assigned one
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn append_audit(&self, entry: &AuditEntry) -> Result<i64> {
        let old_value = entry.old_value.as_ref().map(ToString::to_string);
        let new_value = entry.new_value.as_ref().map(ToString::to_string);
        self.conn.execute(
            r"
            INSERT INTO audit_log
                (action, collection, target_id, old_value, new_value, actor_id, actor_apartment_id, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                entry.action.as_str(),
                entry.collection.as_str(),
                entry.target_id,
                old_value,
                new_value,
                entry.actor_id,
                entry.actor_apartment_id,
                db_time(&entry.timestamp),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent audit entries, newest first, optionally only those made
    /// by members of one apartment.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_audit(&self, actor_apartment_id: Option<&str>, limit: usize) -> Result<Vec<AuditEntry>> {
        let limit = limit_value(limit);
        let entries = match actor_apartment_id {
            Some(apartment) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {AUDIT_COLUMNS} FROM audit_log WHERE actor_apartment_id = ?1 \
                     ORDER BY id DESC LIMIT ?2"
                ))?;
                let rows = stmt
                    .query_map(params![apartment, limit], Self::row_to_audit)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {AUDIT_COLUMNS} FROM audit_log ORDER BY id DESC LIMIT ?1"
                ))?;
                let rows = stmt
                    .query_map([limit], Self::row_to_audit)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(entries)
    }

    fn row_to_audit(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
        let json = |idx: usize| -> rusqlite::Result<Option<serde_json::Value>> {
            let text: Option<String> = row.get(idx)?;
            text.map(|t| serde_json::from_str(&t).map_err(|e| conversion_error(idx, e)))
                .transpose()
        };
        Ok(AuditEntry {
            id: row.get(0)?,
            action: parsed_column(row, 1)?,
            collection: parsed_column(row, 2)?,
            target_id: row.get(3)?,
            old_value: json(4)?,
            new_value: json(5)?,
            actor_id: row.get(6)?,
            actor_apartment_id: row.get(7)?,
            timestamp: time_column(row, 8)?,
        })
    }
}
