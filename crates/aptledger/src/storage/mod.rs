//! Storage layer for aptledger.
//!
//! A single `SQLite` database holds every collection. Records are addressed
//! by their string key; apartment-owned collections are filtered by
//! apartment id, and trashable collections by their soft-delete flag.

pub mod migrations;
pub mod schema;

mod audit;
mod backups;
mod catalog;
mod purchases;
mod users;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::Collection;
use crate::retention::SoftDelete;

pub use backups::BackupHistoryFilter;
pub use purchases::PurchaseQuery;

/// Which records of a trashable collection a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Records not in the trash.
    #[default]
    Active,
    /// Records in the trash.
    Trashed,
    /// Both.
    All,
}

impl Visibility {
    /// `include_deleted` flag to visibility.
    #[must_use]
    pub fn including_deleted(include_deleted: bool) -> Self {
        if include_deleted {
            Self::All
        } else {
            Self::Active
        }
    }

    fn condition(self) -> &'static str {
        match self {
            Self::Active => "is_deleted = 0",
            Self::Trashed => "is_deleted = 1",
            Self::All => "1 = 1",
        }
    }
}

/// Record store backed by `SQLite`.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a database at the given path.
    ///
    /// Creates parent directories as needed and brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store, mostly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` inside a transaction. Nothing `f` wrote is kept if it fails.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a database error from begin/commit.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    /// Count rows in a collection, optionally narrowed by soft-delete state.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self, collection: Collection, visibility: Option<Visibility>) -> Result<u64> {
        let table = table_name(collection)?;
        let sql = match visibility {
            Some(v) => format!("SELECT COUNT(*) FROM {table} WHERE {}", v.condition()),
            None => format!("SELECT COUNT(*) FROM {table}"),
        };
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Number of non-deleted purchases pointing at a vendor or item.
    ///
    /// # Errors
    ///
    /// Returns an error for collections other than vendors and items, or if
    /// the database operation fails.
    pub fn count_active_references(&self, collection: Collection, id: &str) -> Result<u64> {
        let column = match collection {
            Collection::Vendors => "vendor_id",
            Collection::Items => "item_id",
            other => {
                return Err(Error::internal(format!(
                    "{other} records are not referenced by purchases"
                )))
            }
        };
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM purchases WHERE {column} = ?1 AND is_deleted = 0"),
            [id],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Permanently delete a record.
    ///
    /// Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        let table = table_name(collection)?;
        let affected = self
            .conn
            .execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?;
        debug!(%collection, id, affected, "Deleted record");
        Ok(affected > 0)
    }

    /// Permanently delete every trashed record of a collection, optionally
    /// only those of one apartment (purchases only). Vendors and items still
    /// used by an active purchase are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn purge_trashed(&self, collection: Collection, apartment_id: Option<&str>) -> Result<usize> {
        let table = table_name(collection)?;
        let affected = match apartment_id {
            Some(apartment) if collection == Collection::Purchases => self.conn.execute(
                &format!("DELETE FROM {table} WHERE is_deleted = 1 AND apartment_id = ?1"),
                [apartment],
            )?,
            _ => {
                let unreferenced = match collection {
                    Collection::Vendors => {
                        " AND NOT EXISTS (SELECT 1 FROM purchases p \
                         WHERE p.vendor_id = vendors.id AND p.is_deleted = 0)"
                    }
                    Collection::Items => {
                        " AND NOT EXISTS (SELECT 1 FROM purchases p \
                         WHERE p.item_id = items.id AND p.is_deleted = 0)"
                    }
                    _ => "",
                };
                self.conn.execute(
                    &format!("DELETE FROM {table} WHERE is_deleted = 1{unreferenced}"),
                    [],
                )?
            }
        };
        if affected > 0 {
            info!(%collection, affected, "Purged trashed records");
        }
        Ok(affected)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let newest: Option<String> = self
            .conn
            .query_row(
                "SELECT purchased_at FROM purchases WHERE is_deleted = 0 ORDER BY purchased_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            users: self.count(Collection::Users, None)?,
            vendors: self.count(Collection::Vendors, Some(Visibility::Active))?,
            items: self.count(Collection::Items, Some(Visibility::Active))?,
            purchases: self.count(Collection::Purchases, Some(Visibility::Active))?,
            trashed: self.count(Collection::Vendors, Some(Visibility::Trashed))?
                + self.count(Collection::Items, Some(Visibility::Trashed))?
                + self.count(Collection::Purchases, Some(Visibility::Trashed))?,
            audit_entries: self.count(Collection::AuditLog, None)?,
            newest_purchase: newest.as_deref().and_then(parse_db_time),
            schema_version: migrations::get_schema_version(&self.conn)?,
            db_size_bytes,
        })
    }
}

/// Statistics about the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Number of accounts.
    pub users: u64,
    /// Active vendors.
    pub vendors: u64,
    /// Active items.
    pub items: u64,
    /// Active purchases.
    pub purchases: u64,
    /// Records of any kind in the trash.
    pub trashed: u64,
    /// Audit log entries.
    pub audit_entries: u64,
    /// Date of the newest active purchase.
    pub newest_purchase: Option<DateTime<Utc>>,
    /// Schema version of the database.
    pub schema_version: i32,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

fn table_name(collection: Collection) -> Result<&'static str> {
    match collection {
        Collection::Users => Ok("users"),
        Collection::Purchases => Ok("purchases"),
        Collection::Vendors => Ok("vendors"),
        Collection::Items => Ok("items"),
        Collection::AuditLog => Ok("audit_log"),
        Collection::System => Err(Error::internal("the system collection has no table")),
    }
}

/// Format a timestamp for storage.
pub(crate) fn db_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn opt_db_time(t: Option<&DateTime<Utc>>) -> Option<String> {
    t.map(db_time)
}

fn parse_db_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn opt_time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        DateTime::parse_from_rfc3339(&t)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

fn parsed_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = Error>,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_error(idx, e))
}

/// Read the five soft-delete columns starting at `start`.
fn soft_delete_columns(row: &Row<'_>, start: usize) -> rusqlite::Result<SoftDelete> {
    Ok(SoftDelete {
        is_deleted: row.get(start)?,
        deleted_at: opt_time_column(row, start + 1)?,
        deleted_by: row.get(start + 2)?,
        restored_at: opt_time_column(row, start + 3)?,
        restored_by: row.get(start + 4)?,
    })
}

/// `?1, ?2, ...` for an `IN` list of `n` values starting at `?{first}`.
fn placeholders(first: usize, n: usize) -> String {
    (first..first + n)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn text_values(ids: &[String]) -> Vec<Value> {
    ids.iter().map(|id| Value::Text(id.clone())).collect()
}

fn limit_value(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
