use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::audit::Change;
use super::Ledger;
use crate::backup::{self, BackupCounts, BackupData, BackupFile};
use crate::error::{Error, Result};
use crate::model::{
    now, AuditAction, BackupFormat, BackupMetadata, BackupRecord, BackupScope, Collection, Role,
    BACKUP_FORMAT_VERSION,
};
use crate::policy::{authorize, Capability, Session};
use crate::retention::Trashable;
use crate::storage::{BackupHistoryFilter, PurchaseQuery, Visibility};

/// What to back up and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    /// Everything, or one apartment.
    pub scope: BackupScope,
    /// Apartment to back up; defaults to the caller's for apartment scope.
    pub apartment_id: Option<String>,
    /// Include trashed records. Defaults to the configured value.
    pub include_deleted: Option<bool>,
    /// Encrypt with this passphrase.
    pub passphrase: Option<String>,
    /// Write here instead of the configured backup directory.
    pub directory: Option<PathBuf>,
}

impl BackupRequest {
    /// A plain backup of `scope` with configured defaults.
    #[must_use]
    pub fn new(scope: BackupScope) -> Self {
        Self {
            scope,
            apartment_id: None,
            include_deleted: None,
            passphrase: None,
            directory: None,
        }
    }
}

/// A written backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupOutcome {
    /// Where the file was written.
    pub path: PathBuf,
    /// The history entry.
    pub record: BackupRecord,
    /// Records per collection.
    pub counts: BackupCounts,
}

/// How to restore a backup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Passphrase for encrypted files.
    pub passphrase: Option<String>,
    /// Collections to restore; all when `None`. Ignored for apartment admins.
    pub collections: Option<Vec<Collection>>,
}

/// What a restore wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    /// Header of the restored backup.
    pub metadata: BackupMetadata,
    /// Records written per collection.
    pub restored: BackupCounts,
}

impl Ledger {
    /// Collect the records a backup of `scope` would hold.
    ///
    /// An apartment backup holds the apartment's accounts and purchases,
    /// plus the vendors and items those purchases reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] if the caller may not back up the
    /// scope, or a storage error.
    pub fn build_backup(
        &self,
        session: &Session,
        scope: BackupScope,
        apartment_id: Option<&str>,
        include_deleted: bool,
    ) -> Result<BackupData> {
        let visibility = Visibility::including_deleted(include_deleted);
        let mut query = PurchaseQuery::in_apartment(None);
        query.visibility = visibility;

        let mut data = BackupData::default();
        match scope {
            BackupScope::All => {
                authorize(session, Capability::BackupAll)?;
                data.users = keyed(self.storage.list_users(None)?, |u| &u.id);
                data.purchases = keyed(self.storage.list_purchases(&query)?, |p| &p.id);
                data.vendors = keyed(self.storage.list_vendors(visibility)?, |v| &v.id);
                data.items = keyed(self.storage.list_items(visibility, None)?, |i| &i.id);
            }
            BackupScope::Apartment => {
                let apartment_id = apartment_id.unwrap_or(&session.apartment_id);
                authorize(session, Capability::BackupApartment { apartment_id })?;
                query.apartment_id = Some(apartment_id.to_string());

                let purchases = self.storage.list_purchases(&query)?;
                let mut vendor_ids: Vec<String> =
                    purchases.iter().map(|p| p.vendor_id.clone()).collect();
                let mut item_ids: Vec<String> = purchases.iter().map(|p| p.item_id.clone()).collect();
                vendor_ids.sort();
                vendor_ids.dedup();
                item_ids.sort();
                item_ids.dedup();

                data.users = keyed(self.storage.list_users(Some(apartment_id))?, |u| &u.id);
                data.vendors = self
                    .storage
                    .get_vendors(&vendor_ids)?
                    .into_iter()
                    .filter(|(_, v)| include_deleted || !v.is_trashed())
                    .collect();
                data.items = self
                    .storage
                    .get_items(&item_ids)?
                    .into_iter()
                    .filter(|(_, i)| include_deleted || !i.is_trashed())
                    .collect();
                data.purchases = keyed(purchases, |p| &p.id);
            }
        }
        Ok(data)
    }

    /// Write a backup file and record it in the history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] if the caller may not back up the
    /// scope, [`Error::DirectoryCreate`] or [`Error::Io`] if the file cannot
    /// be written, or an encryption error.
    pub fn create_backup(&self, session: &Session, request: BackupRequest) -> Result<BackupOutcome> {
        let include_deleted = request
            .include_deleted
            .unwrap_or(self.config.backup.include_deleted);
        let apartment_id = match request.scope {
            BackupScope::All => None,
            BackupScope::Apartment => Some(
                request
                    .apartment_id
                    .unwrap_or_else(|| session.apartment_id.clone()),
            ),
        };

        let data = self.build_backup(session, request.scope, apartment_id.as_deref(), include_deleted)?;
        let counts = data.counts();
        let format = if request.passphrase.is_some() {
            BackupFormat::Encrypted
        } else {
            BackupFormat::Json
        };
        let created_at = now();
        let metadata = BackupMetadata {
            version: BACKUP_FORMAT_VERSION.to_string(),
            created_at,
            scope: request.scope,
            apartment_id: apartment_id.clone(),
            created_by: session.username.clone(),
            created_by_id: session.user_id.clone(),
            include_deleted,
            format,
            checksum: None,
        };
        let file = BackupFile::sealed(metadata, data)?;
        let bytes = file.encode(request.passphrase.as_deref())?;

        let directory = request.directory.unwrap_or_else(|| self.config.backup_dir());
        fs::create_dir_all(&directory).map_err(|source| Error::DirectoryCreate {
            path: directory.clone(),
            source,
        })?;
        let file_name = backup::file_name(request.scope, apartment_id.as_deref(), format, created_at);
        let path = directory.join(&file_name);
        fs::write(&path, &bytes)?;

        let size_bytes = bytes.len() as u64;
        let id = self.storage.record_backup(&file_name, size_bytes, &file.metadata)?;
        let record = BackupRecord {
            id,
            file_name,
            size_bytes,
            metadata: file.metadata,
        };

        info!(
            path = %path.display(),
            scope = %record.metadata.scope,
            records = counts.total(),
            size = %backup::format_bytes(size_bytes),
            "Backup written"
        );
        self.record(
            Some(session),
            Change::new(AuditAction::CreateBackup, Collection::System)
                .target(&record.file_name)
                .after(&serde_json::json!({
                    "scope": record.metadata.scope,
                    "apartment_id": record.metadata.apartment_id,
                    "format": record.metadata.format,
                    "include_deleted": include_deleted,
                    "counts": counts,
                })),
        );

        Ok(BackupOutcome {
            path,
            record,
            counts,
        })
    }

    /// Read a backup file from disk and restore it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encryption`] if an encrypted file comes without a
    /// passphrase, plus everything [`Ledger::restore_file`] returns.
    pub fn restore_backup(&self, session: &Session, path: &Path, options: &RestoreOptions) -> Result<RestoreSummary> {
        let contents = fs::read(path)?;
        let passphrase = if backup::is_encrypted_path(path) {
            Some(options.passphrase.as_deref().ok_or_else(|| {
                Error::Encryption("encrypted backups need a passphrase".to_string())
            })?)
        } else {
            None
        };
        let file = BackupFile::decode(&contents, passphrase)?;
        debug!(path = %path.display(), scope = %file.metadata.scope, "Read backup");
        self.restore_file(session, &file, options.collections.as_deref())
    }

    /// Write the records of a decoded backup back into the store.
    ///
    /// Records are upserted by id in one transaction. System admins choose
    /// the collections; apartment admins restore their own apartment only,
    /// and never system admin accounts. For apartment admins both the backed
    /// up record and the stored row it would replace must belong to them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] if the caller may not restore this
    /// backup, or a storage error, in which case nothing is written.
    pub fn restore_file(
        &self,
        session: &Session,
        file: &BackupFile,
        collections: Option<&[Collection]>,
    ) -> Result<RestoreSummary> {
        authorize(
            session,
            Capability::RestoreBackup {
                apartment_id: file.metadata.apartment_id.as_deref(),
            },
        )?;

        let limited = session.role != Role::SystemAdmin;
        let wanted = |collection: Collection| {
            limited || collections.map_or(true, |c| c.contains(&collection))
        };
        let own = |apartment_id: &str| !limited || apartment_id == session.apartment_id;
        let data = &file.data;

        let restored = self.storage.in_transaction(|storage| {
            let mut restored = BackupCounts::default();
            if wanted(Collection::Vendors) {
                for vendor in data.vendors.values() {
                    storage.put_vendor(vendor)?;
                    restored.vendors += 1;
                }
            }
            if wanted(Collection::Items) {
                for item in data.items.values() {
                    storage.put_item(item)?;
                    restored.items += 1;
                }
            }
            if wanted(Collection::Users) {
                for user in data.users.values() {
                    let replaces_own = storage.get_user(&user.id)?.map_or(true, |current| {
                        own(&current.apartment_id) && !(limited && current.role == Role::SystemAdmin)
                    });
                    if replaces_own && own(&user.apartment_id) && !(limited && user.role == Role::SystemAdmin) {
                        storage.put_user(user)?;
                        restored.users += 1;
                    } else {
                        debug!(id = %user.id, "Skipped account outside the restoring apartment");
                    }
                }
            }
            if wanted(Collection::Purchases) {
                for purchase in data.purchases.values() {
                    let replaces_own = storage
                        .get_purchase(&purchase.id)?
                        .map_or(true, |current| own(&current.apartment_id));
                    if replaces_own && own(&purchase.apartment_id) {
                        storage.put_purchase(purchase)?;
                        restored.purchases += 1;
                    } else {
                        debug!(id = %purchase.id, "Skipped purchase outside the restoring apartment");
                    }
                }
            }
            Ok(restored)
        })?;

        info!(
            scope = %file.metadata.scope,
            records = restored.total(),
            "Backup restored"
        );
        self.record(
            Some(session),
            Change::new(AuditAction::RestoreBackup, Collection::System).after(&serde_json::json!({
                "scope": file.metadata.scope,
                "apartment_id": file.metadata.apartment_id,
                "created_at": file.metadata.created_at,
                "restored": restored,
            })),
        );

        Ok(RestoreSummary {
            metadata: file.metadata.clone(),
            restored,
        })
    }

    /// Backup history visible to the caller, newest first.
    ///
    /// System admins see every backup, apartment admins their apartment's,
    /// and apartment users the ones they made themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn backup_history(&self, session: &Session, limit: Option<usize>) -> Result<Vec<BackupRecord>> {
        let filter = match session.role {
            Role::SystemAdmin => BackupHistoryFilter::default(),
            Role::ApartmentAdmin => BackupHistoryFilter {
                apartment_id: Some(&session.apartment_id),
                created_by_id: None,
            },
            Role::ApartmentUser => BackupHistoryFilter {
                apartment_id: Some(&session.apartment_id),
                created_by_id: Some(&session.user_id),
            },
        };
        self.storage
            .list_backups(filter, limit.unwrap_or(self.config.backup.history_limit))
    }
}

fn keyed<T>(records: Vec<T>, id: impl Fn(&T) -> &String) -> std::collections::BTreeMap<String, T> {
    records.into_iter().map(|r| (id(&r).clone(), r)).collect()
}
