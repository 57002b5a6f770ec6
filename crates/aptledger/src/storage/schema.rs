//! `SQLite` schema definitions for aptledger.
//!
//! Timestamps are RFC 3339 text with microseconds and a `Z` suffix, so they
//! sort lexically in time order. Booleans are `INTEGER` 0/1.

/// SQL statement to create the users table.
pub const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    english_name TEXT NOT NULL,
    arabic_name TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    password_hash TEXT NOT NULL,
    apartment_id TEXT NOT NULL,
    role TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    preferred_language TEXT NOT NULL DEFAULT 'en',
    created_at TEXT NOT NULL,
    created_by TEXT,
    updated_at TEXT NOT NULL,
    last_login TEXT,
    password_changed_at TEXT
)
";

/// SQL statement to index users by apartment.
pub const CREATE_USERS_APARTMENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_users_apartment ON users(apartment_id)
";

/// SQL statement to create the vendors table.
pub const CREATE_VENDORS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS vendors (
    id TEXT PRIMARY KEY,
    english_name TEXT NOT NULL,
    arabic_name TEXT NOT NULL DEFAULT '',
    contact_person TEXT NOT NULL DEFAULT '',
    phone TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    created_by TEXT,
    updated_at TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT,
    deleted_by TEXT,
    restored_at TEXT,
    restored_by TEXT
)
";

/// SQL statement to create the items table.
pub const CREATE_ITEMS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY,
    english_name TEXT NOT NULL,
    arabic_name TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL,
    unit_price REAL NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    created_by TEXT,
    updated_at TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT,
    deleted_by TEXT,
    restored_at TEXT,
    restored_by TEXT
)
";

/// SQL statement to index items by category.
pub const CREATE_ITEMS_CATEGORY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_items_category ON items(category)
";

/// SQL statement to create the purchases table.
///
/// Vendor and item ids are not foreign keys: restores may write purchases
/// before the catalog entries they point at.
pub const CREATE_PURCHASES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS purchases (
    id TEXT PRIMARY KEY,
    apartment_id TEXT NOT NULL,
    vendor_id TEXT NOT NULL,
    item_id TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    unit_price REAL NOT NULL,
    total_price REAL NOT NULL,
    purchased_at TEXT NOT NULL,
    added_by TEXT NOT NULL,
    added_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT,
    deleted_by TEXT,
    restored_at TEXT,
    restored_by TEXT
)
";

/// SQL statement to index purchases by apartment and date.
pub const CREATE_PURCHASES_APARTMENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_purchases_apartment ON purchases(apartment_id, purchased_at DESC)
";

/// SQL statement to index purchases by date.
pub const CREATE_PURCHASES_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_purchases_date ON purchases(purchased_at DESC)
";

/// SQL statement to index purchases by vendor.
pub const CREATE_PURCHASES_VENDOR_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_purchases_vendor ON purchases(vendor_id)
";

/// SQL statement to index purchases by item.
pub const CREATE_PURCHASES_ITEM_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_purchases_item ON purchases(item_id)
";

/// SQL statement to create the audit log table.
pub const CREATE_AUDIT_LOG_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    action TEXT NOT NULL,
    collection TEXT NOT NULL,
    target_id TEXT,
    old_value TEXT,
    new_value TEXT,
    actor_id TEXT,
    actor_apartment_id TEXT,
    timestamp TEXT NOT NULL
)
";

/// SQL statement to index the audit log by time.
pub const CREATE_AUDIT_TIMESTAMP_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp DESC)
";

/// SQL statement to create the backup history table.
pub const CREATE_BACKUP_HISTORY_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS backup_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    version TEXT NOT NULL,
    created_at TEXT NOT NULL,
    scope TEXT NOT NULL,
    apartment_id TEXT,
    created_by TEXT NOT NULL,
    created_by_id TEXT NOT NULL,
    include_deleted INTEGER NOT NULL,
    format TEXT NOT NULL,
    checksum TEXT
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_USERS_TABLE,
    CREATE_USERS_APARTMENT_INDEX,
    CREATE_VENDORS_TABLE,
    CREATE_ITEMS_TABLE,
    CREATE_ITEMS_CATEGORY_INDEX,
    CREATE_PURCHASES_TABLE,
    CREATE_PURCHASES_APARTMENT_INDEX,
    CREATE_PURCHASES_DATE_INDEX,
    CREATE_PURCHASES_VENDOR_INDEX,
    CREATE_PURCHASES_ITEM_INDEX,
    CREATE_AUDIT_LOG_TABLE,
    CREATE_AUDIT_TIMESTAMP_INDEX,
    CREATE_BACKUP_HISTORY_TABLE,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_trashable_tables_carry_soft_delete_columns() {
        for table in [CREATE_VENDORS_TABLE, CREATE_ITEMS_TABLE, CREATE_PURCHASES_TABLE] {
            assert!(table.contains("is_deleted INTEGER NOT NULL DEFAULT 0"));
            assert!(table.contains("deleted_at TEXT"));
            assert!(table.contains("restored_by TEXT"));
        }
    }

    #[test]
    fn test_usernames_are_unique() {
        assert!(CREATE_USERS_TABLE.contains("username TEXT NOT NULL UNIQUE"));
    }
}
