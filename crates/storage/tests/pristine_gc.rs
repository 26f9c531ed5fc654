#![forbid(unsafe_code)]

use std::path::PathBuf;

use wc_core::model::{Md5Checksum, NodeKind, Presence, Sha1Checksum};
use wc_core::paths::RelPath;
use wc_storage::{BaseNodePayload, StoreError, WcDb};

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

fn sha(hex_byte: char) -> Sha1Checksum {
    Sha1Checksum::try_new(hex_byte.to_string().repeat(40)).expect("sha1")
}

fn md5(hex_byte: char) -> Md5Checksum {
    Md5Checksum::try_new(hex_byte.to_string().repeat(32)).expect("md5")
}

#[test]
fn add_ref_then_release_leaves_refcount_unchanged() {
    let dir = temp_dir("add_ref_release_round_trip");
    let mut db = WcDb::open(&dir).expect("open store");

    db.pristine_add_ref(&sha('1'), &md5('a'), 42).expect("add ref");
    let before = db
        .pristine_lookup(&sha('1'))
        .expect("lookup")
        .expect("row exists");
    assert_eq!(before.refcount, 1);
    assert_eq!(before.size, 42);

    db.pristine_add_ref(&sha('1'), &md5('a'), 42).expect("add second ref");
    db.pristine_release(&sha('1')).expect("release");

    let after = db
        .pristine_lookup(&sha('1'))
        .expect("lookup")
        .expect("row exists");
    assert_eq!(after.refcount, before.refcount);
}

#[test]
fn identity_mismatch_is_rejected() {
    let dir = temp_dir("identity_mismatch");
    let mut db = WcDb::open(&dir).expect("open store");

    db.pristine_add_ref(&sha('1'), &md5('a'), 42).expect("add ref");
    let err = db
        .pristine_add_ref(&sha('1'), &md5('b'), 42)
        .expect_err("md5 mismatch");
    assert!(matches!(err, StoreError::ConstraintViolation(_)), "got {err:?}");
    let err = db
        .pristine_add_ref(&sha('1'), &md5('a'), 43)
        .expect_err("size mismatch");
    assert!(matches!(err, StoreError::ConstraintViolation(_)), "got {err:?}");
}

#[test]
fn md5_secondary_lookup_round_trips() {
    let dir = temp_dir("md5_lookup");
    let mut db = WcDb::open(&dir).expect("open store");

    db.pristine_add_ref(&sha('2'), &md5('c'), 7).expect("add ref");
    let found = db
        .pristine_lookup_by_md5(&md5('c'))
        .expect("lookup by md5")
        .expect("sha found");
    assert_eq!(found, sha('2'));
    assert!(db
        .pristine_lookup_by_md5(&md5('d'))
        .expect("lookup by md5")
        .is_none());
}

#[test]
fn gc_removes_only_unreferenced_rows() {
    let dir = temp_dir("gc_union_reference");
    let mut db = WcDb::open(&dir).expect("open store");
    let repo_id = db
        .ensure_repository("https://svn.example.com/repo", "a0b1c2d3")
        .expect("ensure repository");

    db.pristine_add_ref(&sha('1'), &md5('a'), 42).expect("add ref");
    db.apply_base_node(&BaseNodePayload::new(
        RelPath::root(),
        repo_id,
        "trunk",
        5,
        Presence::Normal,
        NodeKind::Dir,
    ))
    .expect("apply base root");
    let mut file = BaseNodePayload::new(
        rel("a"),
        repo_id,
        "trunk/a",
        5,
        Presence::Normal,
        NodeKind::File,
    );
    file.checksum = Some(sha('1'));
    db.apply_base_node(&file).expect("apply base a");

    // Refcount can hit zero while the node still references the blob; the
    // union query must keep the row alive.
    db.pristine_release(&sha('1')).expect("release");
    assert!(db.pristine_gc().expect("gc").is_empty());
    assert!(db.pristine_lookup(&sha('1')).expect("lookup").is_some());

    // Drop the only referencing node; now GC may collect.
    db.remove_base_node(&rel("a")).expect("remove base a");
    let removed = db.pristine_gc().expect("gc");
    assert_eq!(removed, vec![sha('1')]);
    assert!(db.pristine_lookup(&sha('1')).expect("lookup").is_none());
}

#[test]
fn conflict_marker_checksums_keep_blobs_alive() {
    let dir = temp_dir("gc_conflict_reference");
    let mut db = WcDb::open(&dir).expect("open store");
    let repo_id = db
        .ensure_repository("https://svn.example.com/repo", "a0b1c2d3")
        .expect("ensure repository");
    db.apply_base_node(&BaseNodePayload::new(
        RelPath::root(),
        repo_id,
        "trunk",
        5,
        Presence::Normal,
        NodeKind::Dir,
    ))
    .expect("apply base root");
    db.apply_base_node(&BaseNodePayload::new(
        rel("a"),
        repo_id,
        "trunk/a",
        5,
        Presence::Normal,
        NodeKind::File,
    ))
    .expect("apply base a");

    db.pristine_add_ref(&sha('3'), &md5('e'), 10).expect("add ref");
    let conflict = wc_storage::TextConflict {
        old: Some("a.r4".to_string()),
        new: Some("a.r5".to_string()),
        working: Some("a.mine".to_string()),
        older_checksum: Some(sha('3')),
        left_checksum: None,
        right_checksum: None,
    };
    db.set_text_conflict(&rel("a"), &conflict).expect("set conflict");
    db.pristine_release(&sha('3')).expect("release");

    assert!(db.pristine_gc().expect("gc").is_empty());

    db.clear_text_conflict(&rel("a")).expect("clear conflict");
    assert_eq!(db.pristine_gc().expect("gc"), vec![sha('3')]);
}
