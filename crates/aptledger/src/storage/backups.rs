use rusqlite::{params, Row};

use super::{db_time, limit_value, parsed_column, time_column, Storage};
use crate::error::Result;
use crate::model::{BackupMetadata, BackupRecord};

const BACKUP_COLUMNS: &str = "id, file_name, size_bytes, version, created_at, scope, apartment_id, \
     created_by, created_by_id, include_deleted, format, checksum";

/// Which backup history entries to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackupHistoryFilter<'a> {
    /// Only backups of this apartment.
    pub apartment_id: Option<&'a str>,
    /// Only backups created by this account id.
    pub created_by_id: Option<&'a str>,
}

impl Storage {
    /// Record a created backup in the history.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn record_backup(&self, file_name: &str, size_bytes: u64, metadata: &BackupMetadata) -> Result<i64> {
        self.conn.execute(
            &format!(
                "INSERT INTO backup_history ({BACKUP_COLUMNS}) \
                 VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                file_name,
                i64::try_from(size_bytes).unwrap_or(i64::MAX),
                metadata.version,
                db_time(&metadata.created_at),
                metadata.scope.as_str(),
                metadata.apartment_id,
                metadata.created_by,
                metadata.created_by_id,
                metadata.include_deleted,
                metadata.format.as_str(),
                metadata.checksum,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Backup history, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_backups(&self, filter: BackupHistoryFilter<'_>, limit: usize) -> Result<Vec<BackupRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BACKUP_COLUMNS} FROM backup_history \
             WHERE (?1 IS NULL OR apartment_id = ?1) AND (?2 IS NULL OR created_by_id = ?2) \
             ORDER BY id DESC LIMIT ?3"
        ))?;
        let records = stmt
            .query_map(
                params![filter.apartment_id, filter.created_by_id, limit_value(limit)],
                Self::row_to_backup,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn row_to_backup(row: &Row<'_>) -> rusqlite::Result<BackupRecord> {
        let size: i64 = row.get(2)?;
        Ok(BackupRecord {
            id: row.get(0)?,
            file_name: row.get(1)?,
            size_bytes: u64::try_from(size).unwrap_or(0),
            metadata: BackupMetadata {
                version: row.get(3)?,
                created_at: time_column(row, 4)?,
                scope: parsed_column(row, 5)?,
                apartment_id: row.get(6)?,
                created_by: row.get(7)?,
                created_by_id: row.get(8)?,
                include_deleted: row.get(9)?,
                format: parsed_column(row, 10)?,
                checksum: row.get(11)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{now, BackupFormat, BackupScope, BACKUP_FORMAT_VERSION};

    fn metadata(apartment: Option<&str>, creator: &str) -> BackupMetadata {
        BackupMetadata {
            version: BACKUP_FORMAT_VERSION.to_string(),
            created_at: now(),
            scope: if apartment.is_some() {
                BackupScope::Apartment
            } else {
                BackupScope::All
            },
            apartment_id: apartment.map(str::to_string),
            created_by: format!("name-{creator}"),
            created_by_id: creator.to_string(),
            include_deleted: false,
            format: BackupFormat::Encrypted,
            checksum: Some("abc".to_string()),
        }
    }

    #[test]
    fn test_record_and_list_backups() {
        let storage = Storage::open_in_memory().unwrap();
        let meta = metadata(Some("A1"), "u-1");
        let id = storage.record_backup("backup_1.enc", 2048, &meta).unwrap();

        let history = storage
            .list_backups(BackupHistoryFilter::default(), 20)
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, id);
        assert_eq!(history[0].size_bytes, 2048);
        assert_eq!(history[0].metadata, meta);
    }

    #[test]
    fn test_list_backups_filters() {
        let storage = Storage::open_in_memory().unwrap();
        storage.record_backup("a.json", 1, &metadata(None, "u-root")).unwrap();
        storage.record_backup("b.json", 1, &metadata(Some("A1"), "u-1")).unwrap();
        storage.record_backup("c.json", 1, &metadata(Some("A1"), "u-2")).unwrap();
        storage.record_backup("d.json", 1, &metadata(Some("B2"), "u-3")).unwrap();

        let a1 = storage
            .list_backups(
                BackupHistoryFilter {
                    apartment_id: Some("A1"),
                    created_by_id: None,
                },
                20,
            )
            .unwrap();
        let names: Vec<&str> = a1.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["c.json", "b.json"]);

        let mine = storage
            .list_backups(
                BackupHistoryFilter {
                    apartment_id: Some("A1"),
                    created_by_id: Some("u-1"),
                },
                20,
            )
            .unwrap();
        assert_eq!(mine.len(), 1);

        assert_eq!(
            storage
                .list_backups(BackupHistoryFilter::default(), 2)
                .unwrap()
                .len(),
            2
        );
    }
}
