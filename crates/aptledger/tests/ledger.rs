//! End-to-end ledger behaviour against an on-disk database.

use std::path::Path;

use aptledger::backup::BackupFile;
use aptledger::ledger::{BackupRequest, RestoreOptions, TrashKind};
use aptledger::model::{
    BackupScope, ItemUpdate, LocalizedName, NewItem, NewPurchase, NewUser, NewVendor,
    ProfileUpdate, Role, VendorUpdate,
};
use aptledger::storage::PurchaseQuery;
use aptledger::{Config, Error, Ledger, Session};
use tempfile::TempDir;

const PASSWORD: &str = "Str0ng!Pass";

fn config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.database_path = Some(dir.join("ledger.db"));
    config.backup.directory = Some(dir.join("backups"));
    config.security.hash_iterations = 1_000;
    config
}

fn open(dir: &Path) -> Ledger {
    Ledger::open(config(dir)).unwrap()
}

fn setup(ledger: &Ledger) -> Session {
    ledger
        .setup(NewUser {
            username: "root".to_string(),
            password: PASSWORD.to_string(),
            name: LocalizedName::new("Root", "المدير"),
            email: "root@example.com".to_string(),
            apartment_id: "HQ".to_string(),
            ..NewUser::default()
        })
        .unwrap();
    ledger.login("root", PASSWORD).unwrap()
}

struct Seeded {
    vendor: String,
    item: String,
    purchase: String,
}

fn seed(ledger: &Ledger, session: &Session) -> Seeded {
    let vendor = ledger
        .create_vendor(
            session,
            NewVendor {
                name: LocalizedName::new("Panda", "بنده"),
                phone: "0500000000".to_string(),
                ..NewVendor::default()
            },
        )
        .unwrap()
        .id;
    let item = ledger
        .create_item(
            session,
            NewItem {
                name: LocalizedName::new("Milk", "حليب"),
                category: "Dairy".to_string(),
                unit_price: 5.5,
                description: String::new(),
            },
        )
        .unwrap()
        .id;
    let purchase = ledger
        .create_purchase(
            session,
            NewPurchase {
                vendor_id: vendor.clone(),
                item_id: item.clone(),
                quantity: 2,
                ..NewPurchase::default()
            },
        )
        .unwrap()
        .id;
    Seeded {
        vendor,
        item,
        purchase,
    }
}

#[test]
fn test_ledger_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let seeded = {
        let ledger = open(dir.path());
        let root = setup(&ledger);
        seed(&ledger, &root)
    };

    let ledger = open(dir.path());
    let root = ledger.login("root", PASSWORD).unwrap();
    let purchase = ledger.get_purchase(&root, &seeded.purchase).unwrap();
    assert!((purchase.total_price - 11.0).abs() < f64::EPSILON);
    assert_eq!(ledger.storage().stats().unwrap().purchases, 1);
}

#[test]
fn test_referenced_vendor_stays_until_purchase_is_trashed() {
    let dir = TempDir::new().unwrap();
    let ledger = open(dir.path());
    let root = setup(&ledger);
    let seeded = seed(&ledger, &root);

    let err = ledger.trash_vendor(&root, &seeded.vendor).unwrap_err();
    assert!(matches!(err, Error::Referenced { count: 1, .. }));

    let spare = ledger
        .create_vendor(
            &root,
            NewVendor {
                name: LocalizedName::new("Spare", ""),
                ..NewVendor::default()
            },
        )
        .unwrap();
    ledger.trash_vendor(&root, &spare.id).unwrap();
    assert!(ledger
        .list_vendors(&root)
        .unwrap()
        .iter()
        .all(|v| v.id != spare.id));

    let trash = ledger.list_trash(&root, Some(TrashKind::Vendor)).unwrap();
    assert_eq!(trash.len(), 1);
    assert_eq!(trash[0].deleted_by.as_deref(), Some("root"));

    ledger.restore(&root, TrashKind::Vendor, &spare.id).unwrap();
    assert!(ledger
        .list_vendors(&root)
        .unwrap()
        .iter()
        .any(|v| v.id == spare.id));

    ledger.trash_purchase(&root, &seeded.purchase).unwrap();
    ledger.trash_vendor(&root, &seeded.vendor).unwrap();
}

/// Edit one record of every collection, drop the purchase for good and
/// bring the spare vendor back, so a restore has something to undo.
fn scramble(ledger: &Ledger, session: &Session, seeded: &Seeded, spare: &str) {
    ledger
        .update_profile(
            session,
            ProfileUpdate {
                english_name: Some("Changed".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();
    ledger
        .update_vendor(
            session,
            &seeded.vendor,
            VendorUpdate {
                phone: Some("0599999999".to_string()),
                ..VendorUpdate::default()
            },
        )
        .unwrap();
    ledger
        .update_item(
            session,
            &seeded.item,
            ItemUpdate {
                unit_price: Some(9.0),
                ..ItemUpdate::default()
            },
        )
        .unwrap();
    ledger.trash_purchase(session, &seeded.purchase).unwrap();
    ledger.purge(session, TrashKind::Purchase, &seeded.purchase).unwrap();
    ledger.restore(session, TrashKind::Vendor, spare).unwrap();
}

fn seed_more(ledger: &Ledger, session: &Session) -> String {
    ledger
        .add_user(
            session,
            NewUser {
                username: "resident_b2".to_string(),
                password: PASSWORD.to_string(),
                name: LocalizedName::new("Resident", "ساكن"),
                email: "resident@example.com".to_string(),
                apartment_id: "B2".to_string(),
                ..NewUser::default()
            },
        )
        .unwrap();
    let spare = ledger
        .create_vendor(
            session,
            NewVendor {
                name: LocalizedName::new("Spare", ""),
                ..NewVendor::default()
            },
        )
        .unwrap()
        .id;
    ledger.trash_vendor(session, &spare).unwrap();
    spare
}

fn full_backup(passphrase: Option<&str>) -> BackupRequest {
    BackupRequest {
        include_deleted: Some(true),
        passphrase: passphrase.map(str::to_string),
        ..BackupRequest::new(BackupScope::All)
    }
}

#[test]
fn test_plain_backup_restores_exact_contents() {
    let dir = TempDir::new().unwrap();
    let ledger = open(dir.path());
    let root = setup(&ledger);
    let seeded = seed(&ledger, &root);
    let spare = seed_more(&ledger, &root);

    let outcome = ledger.create_backup(&root, full_backup(None)).unwrap();
    assert!(outcome.path.starts_with(dir.path().join("backups")));
    let snapshot = BackupFile::decode(&std::fs::read(&outcome.path).unwrap(), None)
        .unwrap()
        .data;
    assert_eq!(
        snapshot,
        ledger.build_backup(&root, BackupScope::All, None, true).unwrap()
    );
    assert_eq!(snapshot.users.len(), 2);
    assert_eq!(snapshot.vendors.len(), 2);

    scramble(&ledger, &root, &seeded, &spare);
    assert_ne!(
        snapshot,
        ledger.build_backup(&root, BackupScope::All, None, true).unwrap()
    );

    let summary = ledger
        .restore_backup(&root, &outcome.path, &RestoreOptions::default())
        .unwrap();
    assert_eq!(summary.restored, snapshot.counts());
    assert_eq!(
        ledger.build_backup(&root, BackupScope::All, None, true).unwrap(),
        snapshot
    );
}

#[test]
fn test_encrypted_backup_round_trip() {
    let dir = TempDir::new().unwrap();
    let ledger = open(dir.path());
    let root = setup(&ledger);
    let seeded = seed(&ledger, &root);
    let spare = seed_more(&ledger, &root);
    let snapshot = ledger.build_backup(&root, BackupScope::All, None, true).unwrap();

    let outcome = ledger
        .create_backup(&root, full_backup(Some("correct horse")))
        .unwrap();
    assert_eq!(outcome.path.extension().unwrap(), "enc");

    let wrong = RestoreOptions {
        passphrase: Some("battery staple".to_string()),
        ..RestoreOptions::default()
    };
    assert!(matches!(
        ledger.restore_backup(&root, &outcome.path, &wrong),
        Err(Error::Decryption)
    ));

    scramble(&ledger, &root, &seeded, &spare);

    let right = RestoreOptions {
        passphrase: Some("correct horse".to_string()),
        ..RestoreOptions::default()
    };
    let summary = ledger.restore_backup(&root, &outcome.path, &right).unwrap();
    assert_eq!(summary.restored, snapshot.counts());
    assert_eq!(
        ledger.build_backup(&root, BackupScope::All, None, true).unwrap(),
        snapshot
    );
    let restored = ledger.storage().get_purchase(&seeded.purchase).unwrap().unwrap();
    assert!(!restored.trash.is_deleted);
}

#[test]
fn test_tampered_backup_is_rejected() {
    let dir = TempDir::new().unwrap();
    let ledger = open(dir.path());
    let root = setup(&ledger);
    seed(&ledger, &root);

    let outcome = ledger
        .create_backup(&root, BackupRequest::new(BackupScope::All))
        .unwrap();
    let text = std::fs::read_to_string(&outcome.path).unwrap();
    std::fs::write(&outcome.path, text.replace("\"quantity\": 2", "\"quantity\": 20")).unwrap();

    let err = ledger
        .restore_backup(&root, &outcome.path, &RestoreOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::ChecksumMismatch { .. }));
}

#[test]
fn test_apartment_user_sees_only_own_apartment() {
    let dir = TempDir::new().unwrap();
    let ledger = open(dir.path());
    let root = setup(&ledger);
    let seeded = seed(&ledger, &root);

    let admin = ledger
        .add_user(
            &root,
            NewUser {
                username: "admin_a1".to_string(),
                password: PASSWORD.to_string(),
                name: LocalizedName::new("Admin", ""),
                email: "admin@example.com".to_string(),
                apartment_id: "A1".to_string(),
                role: Role::ApartmentAdmin,
                ..NewUser::default()
            },
        )
        .unwrap();
    let admin = ledger.login(&admin.username, PASSWORD).unwrap();

    assert!(ledger
        .list_purchases(&admin, PurchaseQuery::default())
        .unwrap()
        .is_empty());
    assert!(ledger.get_purchase(&admin, &seeded.purchase).unwrap_err().is_not_found());
    assert!(ledger
        .trash_purchase(&admin, &seeded.purchase)
        .unwrap_err()
        .is_permission_error());
    assert!(ledger
        .create_backup(&admin, BackupRequest::new(BackupScope::All))
        .unwrap_err()
        .is_permission_error());
}
