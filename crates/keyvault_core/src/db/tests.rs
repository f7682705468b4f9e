use super::*;
use crate::error::AppError;
use crate::models::identity::Identity;
use crate::models::paste::{ExpiryDuration, NewPaste, PasteType, Timestamp};
use tempfile::TempDir;

fn setup_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("db");
    let db = Database::new(db_path.to_str().unwrap()).unwrap();
    (db, temp_dir)
}

fn document(author: &str) -> crate::models::paste::PasteDocument {
    let identity = Identity {
        id: author.to_string(),
        display_name: format!("{} name", author),
        photo_url: None,
    };
    NewPaste {
        title: "secret".to_string(),
        paste_type: PasteType::Key,
        duration: ExpiryDuration::OneDay,
        ..NewPaste::for_identity(&identity, "ABCD-EFGH-IJKL-MNOP")
    }
    .into_document(1_000)
}

#[test]
fn insert_stamps_created_at_and_resets_views() {
    let (db, _temp) = setup_test_db();
    let mut doc = document("alice");
    doc.views = 42;

    let stored = db.pastes.insert(doc, 5_000).unwrap();
    assert_eq!(stored.created_at, Timestamp::At(5_000));
    assert_eq!(stored.views, 0);

    let fetched = db.pastes.get(&stored.id).unwrap().unwrap();
    assert_eq!(fetched, stored);
    assert_eq!(fetched.expires_at, Some(1_000 + 1_440 * 60_000));
    assert_eq!(fetched.paste_type, PasteType::Key);
}

#[test]
fn insert_rejects_expiry_that_disagrees_with_duration() {
    let (db, _temp) = setup_test_db();

    let mut forever = document("alice");
    forever.duration = ExpiryDuration::Never;
    forever.expires_at = Some(5);
    assert!(matches!(
        db.pastes.insert(forever, 1_000),
        Err(AppError::BadRequest(_))
    ));

    let mut missing = document("alice");
    missing.expires_at = None;
    assert!(matches!(
        db.pastes.insert(missing, 1_000),
        Err(AppError::BadRequest(_))
    ));

    let mut stale = document("alice");
    stale.expires_at = Some(1_000);
    assert!(matches!(
        db.pastes.insert(stale, 1_000),
        Err(AppError::BadRequest(_))
    ));

    assert!(db.pastes.list_by_author("alice").unwrap().is_empty());
}

#[test]
fn insert_accepts_never_expiring_document() {
    let (db, _temp) = setup_test_db();
    let mut forever = document("alice");
    forever.duration = ExpiryDuration::Never;
    forever.expires_at = None;

    let stored = db.pastes.insert(forever, 1_000).unwrap();
    assert_eq!(stored.expires_at, None);
}

#[test]
fn get_missing_returns_none() {
    let (db, _temp) = setup_test_db();
    assert!(db.pastes.get("missing").unwrap().is_none());
}

#[test]
fn increment_views_counts_up_and_ignores_missing_ids() {
    let (db, _temp) = setup_test_db();
    let stored = db.pastes.insert(document("alice"), 0).unwrap();

    assert_eq!(db.pastes.increment_views(&stored.id).unwrap(), Some(1));
    assert_eq!(db.pastes.increment_views(&stored.id).unwrap(), Some(2));
    assert_eq!(db.pastes.get(&stored.id).unwrap().unwrap().views, 2);
    assert_eq!(db.pastes.increment_views("missing").unwrap(), None);
}

#[test]
fn list_by_author_filters_on_equality() {
    let (db, _temp) = setup_test_db();
    let a1 = db.pastes.insert(document("alice"), 1).unwrap();
    let a2 = db.pastes.insert(document("alice"), 2).unwrap();
    db.pastes.insert(document("bob"), 3).unwrap();

    let mut ids: Vec<String> = db
        .pastes
        .list_by_author("alice")
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    ids.sort();
    let mut expected = vec![a1.id, a2.id];
    expected.sort();
    assert_eq!(ids, expected);
    assert!(db.pastes.list_by_author("carol").unwrap().is_empty());
}

#[test]
fn rows_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("db");
    let db_path_str = db_path.to_string_lossy().to_string();

    let id = {
        let db = Database::new(&db_path_str).unwrap();
        db.pastes.insert(document("alice"), 9).unwrap().id
    };

    let reopened = Database::new(&db_path_str).unwrap();
    assert!(reopened.pastes.get(&id).unwrap().is_some());
}
