#![forbid(unsafe_code)]

use std::path::PathBuf;

use rusqlite::{Connection, params};
use wc_core::conflict::{
    ConflictAction, ConflictOperation, ConflictReason, ConflictSide, NodeKindField,
    TreeConflictInfo,
};
use wc_core::paths::RelPath;
use wc_storage::{StoreError, WcDb};

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("wc_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn rel(path: &str) -> RelPath {
    RelPath::try_new(path).expect("relpath")
}

/// Rewind a freshly created store to format 1: no conflict_victim table,
/// tree conflicts as opaque blobs on actual_node.
fn downgrade_to_v1(dir: &PathBuf, blob: Option<&str>) {
    let db_path = dir.join("wc.db");
    let conn = Connection::open(&db_path).expect("open raw db");
    conn.execute_batch("DROP TABLE conflict_victim;").expect("drop victim table");
    conn.execute("UPDATE meta SET value = '1' WHERE key = 'format'", [])
        .expect("set format 1");
    if let Some(blob) = blob {
        conn.execute(
            "INSERT INTO actual_node (wc_id, local_relpath, parent_relpath, tree_conflict_data) \
             VALUES (1, 'a', '', ?1)",
            params![blob],
        )
        .expect("insert legacy conflict");
    }
}

#[test]
fn v1_file_upgrades_in_place_and_types_the_conflicts() {
    let dir = temp_dir("v1_upgrade");
    {
        let _db = WcDb::open(&dir).expect("create store");
    }
    let info = TreeConflictInfo {
        operation: ConflictOperation::Switch,
        action: ConflictAction::Replace,
        reason: ConflictReason::MovedAway,
        kind: NodeKindField::File,
        left: Some(ConflictSide {
            repos_relpath: "trunk/a".to_string(),
            revision: 11,
            kind: NodeKindField::File,
        }),
        right: None,
    };
    downgrade_to_v1(&dir, Some(&info.to_legacy_json()));

    let db = WcDb::open(&dir).expect("reopen upgrades");
    let stored = db
        .read_tree_conflict(&rel("a"))
        .expect("read tree conflict")
        .expect("typed row exists");
    assert_eq!(stored, info);

    // The legacy column is nulled, so nothing is left to re-migrate.
    assert!(db.pending_legacy_conflicts(10).expect("plan").is_empty());
    let victims = db
        .conflict_victims(&RelPath::root(), None)
        .expect("victims");
    assert_eq!(victims.iter().map(|p| p.as_str()).collect::<Vec<_>>(), vec!["a"]);
}

#[test]
fn upgrade_is_idempotent_across_reopens() {
    let dir = temp_dir("upgrade_idempotent");
    {
        let _db = WcDb::open(&dir).expect("create store");
    }
    downgrade_to_v1(&dir, None);
    {
        let _db = WcDb::open(&dir).expect("first upgrade");
    }
    let db = WcDb::open(&dir).expect("second open is a no-op");
    assert!(db.verify().expect("verify").is_empty());
}

#[test]
fn newer_format_is_refused() {
    let dir = temp_dir("newer_format_refused");
    {
        let _db = WcDb::open(&dir).expect("create store");
    }
    let conn = Connection::open(dir.join("wc.db")).expect("open raw db");
    conn.execute("UPDATE meta SET value = '99' WHERE key = 'format'", [])
        .expect("set future format");
    drop(conn);

    let err = WcDb::open(&dir).expect_err("open must refuse");
    match err {
        StoreError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 99);
            assert_eq!(supported, WcDb::format_version());
        }
        other => panic!("expected SchemaTooNew, got {other:?}"),
    }
}

#[test]
fn garbage_format_marker_is_corrupt() {
    let dir = temp_dir("garbage_format");
    {
        let _db = WcDb::open(&dir).expect("create store");
    }
    let conn = Connection::open(dir.join("wc.db")).expect("open raw db");
    conn.execute("UPDATE meta SET value = 'fish' WHERE key = 'format'", [])
        .expect("set garbage format");
    drop(conn);

    let err = WcDb::open(&dir).expect_err("open must refuse");
    assert!(matches!(err, StoreError::Corrupt(_)), "got {err:?}");
}

#[test]
fn prehistoric_format_is_unsupported() {
    let dir = temp_dir("prehistoric_format");
    {
        let _db = WcDb::open(&dir).expect("create store");
    }
    let conn = Connection::open(dir.join("wc.db")).expect("open raw db");
    conn.execute("UPDATE meta SET value = '0' WHERE key = 'format'", [])
        .expect("set ancient format");
    drop(conn);

    let err = WcDb::open(&dir).expect_err("open must refuse");
    assert!(matches!(err, StoreError::UnsupportedSchema { .. }), "got {err:?}");
}

#[test]
fn unreadable_legacy_blob_fails_the_migration() {
    let dir = temp_dir("unreadable_legacy_blob");
    {
        let _db = WcDb::open(&dir).expect("create store");
    }
    downgrade_to_v1(&dir, Some("not json at all"));

    let err = WcDb::open(&dir).expect_err("migration must fail");
    assert!(matches!(err, StoreError::Corrupt(_)), "got {err:?}");

    // The failed step rolled back whole: the file still reports format 1.
    let conn = Connection::open(dir.join("wc.db")).expect("open raw db");
    let format: String = conn
        .query_row("SELECT value FROM meta WHERE key = 'format'", [], |row| row.get(0))
        .expect("read format");
    assert_eq!(format, "1");
}
