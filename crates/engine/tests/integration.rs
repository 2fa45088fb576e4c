//! End-to-end behaviour of the verification engine

use imgaudit_engine::{CancellationToken, EditApproval, VerificationEngine};
use imgaudit_errors::{Error, IntegrityError, StorageError};
use imgaudit_events::{AppEvent, EditEvent, GeneralEvent, RegistryEvent, VerificationEvent};
use imgaudit_hash::{Hash, HashAlgorithm};
use imgaudit_store::IntegrityStore;
use imgaudit_types::{Classification, EditType, FileStatus, HistoryOrder};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

async fn setup_engine() -> (VerificationEngine, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let engine = VerificationEngine::open(
        &temp_dir.path().join("integrity.sqlite"),
        Duration::from_secs(5),
        HashAlgorithm::Sha256,
    )
    .await
    .unwrap();
    (engine, temp_dir)
}

async fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    tokio::fs::write(&path, content).await.unwrap();
    path
}

fn approval(edit_type: EditType) -> EditApproval {
    EditApproval {
        edit_type,
        description: "lab notebook p. 12".into(),
        approved_by: "Dr. Ortiz".into(),
        software_used: "Image Lab".into(),
    }
}

fn sha(data: &[u8]) -> Hash {
    Hash::from_data(HashAlgorithm::Sha256, data)
}

#[tokio::test]
async fn unmodified_file_verifies_repeatedly() {
    let (engine, dir) = setup_engine().await;
    let path = write_file(dir.path(), "gel.scn", b"d0").await;
    engine.register(&path, "Dr. Ortiz").await.unwrap();

    for _ in 0..3 {
        let result = engine.verify(&path).await;
        assert_eq!(result.classification, Classification::Verified);
        assert_eq!(result.current_hash, result.stored_hash);
        assert_eq!(result.size_current, Some(2));
    }

    let record = engine.find(&path).await.unwrap();
    assert_eq!(record.current_hash, sha(b"d0"));
    assert_eq!(record.status, FileStatus::Original);
    assert!(record.last_verified.is_some());
}

#[tokio::test]
async fn tamper_then_approve_scenario() {
    let (engine, dir) = setup_engine().await;
    let path = write_file(dir.path(), "sample.bin", b"d0").await;
    engine.register(&path, "op").await.unwrap();
    assert_eq!(
        engine.verify(&path).await.classification,
        Classification::Verified
    );
    let clean_at = engine.find(&path).await.unwrap().last_verified.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    tokio::fs::write(&path, b"d1-longer").await.unwrap();
    let tampered = engine.verify(&path).await;
    assert_eq!(tampered.classification, Classification::Tampered);
    let tampered_at = engine.find(&path).await.unwrap().last_verified.unwrap();
    assert!(tampered_at > clean_at, "tampered checks are still recorded");
    assert_eq!(tampered.stored_hash, Some(sha(b"d0")));
    assert_eq!(tampered.current_hash, Some(sha(b"d1-longer")));
    assert_eq!(tampered.size_stored, Some(2));
    assert_eq!(tampered.size_current, Some(9));
    assert_eq!(
        tampered.stored_hash_prefix().unwrap(),
        format!("{}...", &sha(b"d0").to_hex()[..16])
    );
    assert!(tampered.message.contains("size 9 bytes"));
    assert_eq!(
        engine.find(&path).await.unwrap().current_hash,
        sha(b"d0"),
        "verification must not move the current hash"
    );

    let edit = engine
        .approve_edit(&path, approval(EditType::GammaCorrection))
        .await
        .unwrap();
    assert_eq!(edit.previous_hash, sha(b"d0"));
    assert_eq!(edit.new_hash, sha(b"d1-longer"));

    let record = engine.find(&path).await.unwrap();
    assert_eq!(record.current_hash, sha(b"d1-longer"));
    assert_eq!(record.original_hash, sha(b"d0"));
    assert_eq!(record.status, FileStatus::ApprovedEdit);

    assert_eq!(
        engine.verify(&path).await.classification,
        Classification::Verified
    );
}

#[tokio::test]
async fn approve_unchanged_file_is_no_change() {
    let (engine, dir) = setup_engine().await;
    let path = write_file(dir.path(), "gel.scn", b"d0").await;
    engine.register(&path, "op").await.unwrap();

    let err = engine
        .approve_edit(&path, approval(EditType::Cropping))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Integrity(IntegrityError::NoChange { .. })
    ));
    assert!(engine
        .edit_history(&path, HistoryOrder::Ascending)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn approve_unregistered_file_is_not_found() {
    let (engine, dir) = setup_engine().await;
    let path = write_file(dir.path(), "gel.scn", b"d0").await;

    let err = engine
        .approve_edit(&path, approval(EditType::Other))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Integrity(IntegrityError::NotFound { .. })
    ));
}

#[tokio::test]
async fn sequential_edits_form_a_hash_chain() {
    let (engine, dir) = setup_engine().await;
    let path = write_file(dir.path(), "gel.scn", b"v0").await;
    let record = engine.register(&path, "op").await.unwrap();

    for (i, edit_type) in EditType::ALL.iter().enumerate() {
        tokio::fs::write(&path, format!("v{}", i + 1)).await.unwrap();
        engine.approve_edit(&path, approval(*edit_type)).await.unwrap();
    }

    let history = engine
        .edit_history(&path, HistoryOrder::Ascending)
        .await
        .unwrap();
    assert_eq!(history.len(), EditType::ALL.len());
    assert_eq!(history[0].previous_hash, record.original_hash);
    for pair in history.windows(2) {
        assert_eq!(pair[0].new_hash, pair[1].previous_hash);
    }
    let current = engine.find(&path).await.unwrap().current_hash;
    assert_eq!(history.last().unwrap().new_hash, current);
    assert_eq!(
        engine.verify_chain(&path).await.unwrap(),
        EditType::ALL.len()
    );

    let newest_first = engine
        .edit_history(&path, HistoryOrder::Descending)
        .await
        .unwrap();
    assert_eq!(newest_first[0].id, history.last().unwrap().id);
}

#[tokio::test]
async fn never_registered_path_is_unregistered_without_writes() {
    let (engine, dir) = setup_engine().await;
    let path = write_file(dir.path(), "loose.scn", b"x").await;

    let result = engine.verify(&path).await;
    assert_eq!(result.classification, Classification::Unregistered);
    assert!(result.stored_hash.is_none());
    assert_eq!(engine.store().count().await.unwrap(), 0);
}

#[tokio::test]
async fn reverting_to_earlier_approved_state_is_approved_modification() {
    let (engine, dir) = setup_engine().await;
    let path = write_file(dir.path(), "gel.scn", b"d0").await;
    engine.register(&path, "op").await.unwrap();

    tokio::fs::write(&path, b"d1").await.unwrap();
    let first = engine
        .approve_edit(&path, approval(EditType::BrightnessAdjustment))
        .await
        .unwrap();
    tokio::fs::write(&path, b"d2").await.unwrap();
    engine
        .approve_edit(&path, approval(EditType::ContrastAdjustment))
        .await
        .unwrap();

    assert_eq!(
        engine.verify(&path).await.classification,
        Classification::Verified
    );
    let clean_at = engine.find(&path).await.unwrap().last_verified.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    tokio::fs::write(&path, b"d1").await.unwrap();
    let result = engine.verify(&path).await;
    assert_eq!(result.classification, Classification::ApprovedModification);
    assert_eq!(result.matched_edit_id, Some(first.id));
    let matched_at = engine.find(&path).await.unwrap().last_verified.unwrap();
    assert!(matched_at > clean_at);
    assert_eq!(
        engine.find(&path).await.unwrap().current_hash,
        sha(b"d2"),
        "an older approved state must not be promoted"
    );

    // The original contents were never the result of an edit
    tokio::fs::write(&path, b"d0").await.unwrap();
    assert_eq!(
        engine.verify(&path).await.classification,
        Classification::Tampered
    );
}

#[tokio::test]
async fn unreadable_registered_file_is_error_without_writes() {
    let (engine, dir) = setup_engine().await;
    let path = write_file(dir.path(), "gel.scn", b"d0").await;
    engine.register(&path, "op").await.unwrap();
    tokio::fs::remove_file(&path).await.unwrap();

    let result = engine.verify(&path).await;
    assert_eq!(result.classification, Classification::Error);
    assert_eq!(result.size_stored, Some(2));
    assert!(result.stored_hash_prefix().is_some());
    assert_eq!(result.error_code, Some("storage.path_not_found"));

    let record = engine.find(&path).await.unwrap();
    assert!(record.last_verified.is_none());
}

#[tokio::test]
async fn register_twice_fails() {
    let (engine, dir) = setup_engine().await;
    let path = write_file(dir.path(), "gel.scn", b"d0").await;
    let first = engine.register(&path, "first").await.unwrap();

    let err = engine.register(&path, "second").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Integrity(IntegrityError::AlreadyRegistered { .. })
    ));
    assert_eq!(engine.find(&path).await.unwrap(), first);
}

#[tokio::test]
async fn remove_cascades_and_reregistration_succeeds() {
    let (engine, dir) = setup_engine().await;
    let path = write_file(dir.path(), "gel.scn", b"d0").await;
    engine.register(&path, "op").await.unwrap();
    tokio::fs::write(&path, b"d1").await.unwrap();
    engine
        .approve_edit(&path, approval(EditType::Cropping))
        .await
        .unwrap();

    let removed = engine.remove(&path).await.unwrap();
    assert_eq!(removed.edits_removed, 1);
    assert_eq!(
        engine.verify(&path).await.classification,
        Classification::Unregistered
    );

    let again = engine.register(&path, "op").await.unwrap();
    assert_eq!(again.original_hash, sha(b"d1"));
    assert!(engine
        .edit_history(&path, HistoryOrder::Ascending)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn batch_continues_past_missing_files() {
    let (engine, dir) = setup_engine().await;
    let a = write_file(dir.path(), "a.scn", b"a").await;
    let b = write_file(dir.path(), "b.scn", b"b").await;
    let gone = write_file(dir.path(), "gone.scn", b"g").await;
    for path in [&a, &b, &gone] {
        engine.register(path, "op").await.unwrap();
    }
    tokio::fs::remove_file(&gone).await.unwrap();
    tokio::fs::write(&b, b"bb").await.unwrap();

    let batch = engine
        .verify_many([&a, &gone, &b], &CancellationToken::new())
        .await;
    assert!(!batch.interrupted);
    let classes: Vec<_> = batch.results.iter().map(|r| r.classification).collect();
    assert_eq!(
        classes,
        vec![
            Classification::Verified,
            Classification::Error,
            Classification::Tampered
        ]
    );
    assert_eq!(batch.counts.verified, 1);
    assert_eq!(batch.counts.errors, 1);
    assert_eq!(batch.counts.tampered, 1);
    assert!(batch.has_failures());
}

#[tokio::test]
async fn cancelled_batch_reports_interrupted() {
    let (engine, dir) = setup_engine().await;
    let a = write_file(dir.path(), "a.scn", b"a").await;
    engine.register(&a, "op").await.unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let batch = engine.verify_many([&a, &a], &cancel).await;
    assert!(batch.interrupted);
    assert!(batch.results.is_empty());
    assert_eq!(batch.counts.total(), 0);
}

#[tokio::test]
async fn directory_registration_and_verification() {
    let (engine, dir) = setup_engine().await;
    let images = dir.path().join("images");
    tokio::fs::create_dir_all(images.join("day1")).await.unwrap();
    let a = write_file(&images, "a.scn", b"a").await;
    write_file(&images, "b.SCN", b"b").await;
    write_file(&images.join("day1"), "c.scn", b"c").await;
    write_file(&images, "readme.txt", b"skip").await;
    engine.register(&a, "op").await.unwrap();

    let extensions = vec![".scn".to_string()];
    let summary = engine
        .register_directory(&images, &extensions, "op")
        .await
        .unwrap();
    assert_eq!(summary.registered.len(), 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(
        summary.failures[0].failure.code.as_deref(),
        Some("integrity.already_registered")
    );
    assert_eq!(summary.total(), 3);

    tokio::fs::write(&a, b"edited").await.unwrap();
    write_file(&images, "new.scn", b"n").await;
    let batch = engine
        .verify_directory(&images, &extensions, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(batch.counts.verified, 2);
    assert_eq!(batch.counts.tampered, 1);
    assert_eq!(batch.counts.unregistered, 1);

    let err = engine
        .verify_directory(&dir.path().join("nope"), &extensions, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Storage(StorageError::DirectoryNotFound { .. })
    ));
}

#[tokio::test]
async fn blake3_records_keep_their_algorithm() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("integrity.sqlite");
    let engine = VerificationEngine::open(&db, Duration::from_secs(5), HashAlgorithm::Blake3)
        .await
        .unwrap();
    let path = write_file(temp_dir.path(), "gel.scn", b"d0").await;
    let record = engine.register(&path, "op").await.unwrap();
    assert_eq!(record.algorithm(), HashAlgorithm::Blake3);
    engine.close().await;

    // A later session defaulting to SHA-256 still verifies with BLAKE3
    let engine = VerificationEngine::open(&db, Duration::from_secs(5), HashAlgorithm::Sha256)
        .await
        .unwrap();
    assert_eq!(
        engine.verify(&path).await.classification,
        Classification::Verified
    );
}

#[tokio::test]
async fn events_follow_the_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let (tx, mut rx) = imgaudit_events::channel();
    let engine = VerificationEngine::open(
        &temp_dir.path().join("integrity.sqlite"),
        Duration::from_secs(5),
        HashAlgorithm::Sha256,
    )
    .await
    .unwrap()
    .with_events(tx);

    let path = write_file(temp_dir.path(), "gel.scn", b"d0").await;
    engine.register(&path, "op").await.unwrap();
    tokio::fs::write(&path, b"d1").await.unwrap();
    engine.verify(&path).await;
    engine
        .approve_edit(&path, approval(EditType::Other))
        .await
        .unwrap();
    drop(engine);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert!(matches!(
        events[0],
        AppEvent::Registry(RegistryEvent::FileRegistered { .. })
    ));
    assert!(events.iter().any(|e| matches!(
        e,
        AppEvent::Verification(VerificationEvent::Completed {
            classification: Classification::Tampered,
            ..
        })
    )));
    assert!(matches!(
        events.last().unwrap(),
        AppEvent::Edit(EditEvent::Approved { .. })
    ));
}

#[tokio::test]
async fn all_records_lists_registrations() {
    use futures::TryStreamExt;

    let (engine, dir) = setup_engine().await;
    for name in ["a.scn", "b.scn"] {
        let path = write_file(dir.path(), name, name.as_bytes()).await;
        engine.register(&path, "op").await.unwrap();
    }
    let records: Vec<_> = engine.all_records().try_collect().await.unwrap();
    assert_eq!(records.len(), 2);
}

async fn collect_events(rx: &mut imgaudit_events::EventReceiver) -> Vec<AppEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn earlier_approved_state_emits_warning() {
    let temp_dir = TempDir::new().unwrap();
    let (tx, mut rx) = imgaudit_events::channel();
    let engine = VerificationEngine::open(
        &temp_dir.path().join("integrity.sqlite"),
        Duration::from_secs(5),
        HashAlgorithm::Sha256,
    )
    .await
    .unwrap()
    .with_events(tx);

    let path = write_file(temp_dir.path(), "gel.scn", b"d0").await;
    engine.register(&path, "op").await.unwrap();
    for content in [b"d1", b"d2"] {
        tokio::fs::write(&path, content).await.unwrap();
        engine
            .approve_edit(&path, approval(EditType::Other))
            .await
            .unwrap();
    }
    collect_events(&mut rx).await;

    tokio::fs::write(&path, b"d1").await.unwrap();
    engine.verify(&path).await;
    let events = collect_events(&mut rx).await;
    let warning = events.iter().find_map(|e| match e {
        AppEvent::General(GeneralEvent::Warning { message, context }) => {
            Some((message.clone(), context.clone()))
        }
        _ => None,
    });
    let (message, context) = warning.expect("stale store should be flagged");
    assert!(message.contains("approved edit"));
    assert_eq!(
        context.unwrap(),
        format!("stored hash {}", sha(b"d2").display_prefix())
    );

    // A clean file raises no warning
    tokio::fs::write(&path, b"d2").await.unwrap();
    engine.verify(&path).await;
    assert!(!collect_events(&mut rx)
        .await
        .iter()
        .any(|e| matches!(e, AppEvent::General(GeneralEvent::Warning { .. }))));
}

#[tokio::test]
async fn directory_operations_report_lifecycle() {
    let temp_dir = TempDir::new().unwrap();
    let (tx, mut rx) = imgaudit_events::channel();
    let engine = VerificationEngine::open(
        &temp_dir.path().join("integrity.sqlite"),
        Duration::from_secs(5),
        HashAlgorithm::Sha256,
    )
    .await
    .unwrap()
    .with_events(tx);
    let images = temp_dir.path().join("images");
    tokio::fs::create_dir_all(&images).await.unwrap();
    let a = write_file(&images, "a.scn", b"a").await;
    let extensions = vec![".scn".to_string()];

    engine
        .register_directory(&images, &extensions, "op")
        .await
        .unwrap();
    let events = collect_events(&mut rx).await;
    assert!(matches!(
        &events[0],
        AppEvent::General(GeneralEvent::OperationStarted { operation }) if operation == "register directory"
    ));
    assert!(matches!(
        events.last().unwrap(),
        AppEvent::General(GeneralEvent::OperationCompleted { success: true, .. })
    ));

    tokio::fs::write(&a, b"changed").await.unwrap();
    engine
        .verify_directory(&images, &extensions, &CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(
        collect_events(&mut rx).await.last().unwrap(),
        AppEvent::General(GeneralEvent::OperationCompleted { success: false, .. })
    ));

    engine
        .register_directory(&temp_dir.path().join("missing"), &extensions, "op")
        .await
        .unwrap_err();
    let failed = collect_events(&mut rx).await.into_iter().find_map(|e| match e {
        AppEvent::General(GeneralEvent::OperationFailed { operation, failure }) => {
            Some((operation, failure))
        }
        _ => None,
    });
    let (operation, failure) = failed.unwrap();
    assert_eq!(operation, "register directory");
    assert!(failure.code.is_some());
}

#[tokio::test]
async fn classification_survives_failed_timestamp_write() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("integrity.sqlite");
    let pool = imgaudit_store::create_pool(&db, Duration::from_secs(5))
        .await
        .unwrap();
    imgaudit_store::run_migrations(&pool).await.unwrap();
    sqlx::query(
        "CREATE TRIGGER freeze_last_verified BEFORE UPDATE OF last_verified_at ON file_records
         BEGIN SELECT RAISE(ABORT, 'audit copy is read-only'); END",
    )
    .execute(&pool)
    .await
    .unwrap();

    let (tx, mut rx) = imgaudit_events::channel();
    let engine =
        VerificationEngine::new(IntegrityStore::with_pool(pool), HashAlgorithm::Sha256)
            .with_events(tx);
    let path = write_file(temp_dir.path(), "gel.scn", b"d0").await;
    engine.register(&path, "op").await.unwrap();
    tokio::fs::write(&path, b"d1-longer").await.unwrap();

    let result = engine.verify(&path).await;
    assert_eq!(result.classification, Classification::Tampered);
    assert_eq!(result.current_hash, Some(sha(b"d1-longer")));
    assert_eq!(result.size_current, Some(9));
    assert!(result.error_code.is_none());
    assert!(engine.find(&path).await.unwrap().last_verified.is_none());

    assert!(collect_events(&mut rx).await.iter().any(|e| matches!(
        e,
        AppEvent::General(GeneralEvent::Warning { message, .. })
            if message.starts_with("Verification time not saved")
    )));
}
