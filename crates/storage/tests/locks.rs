#![forbid(unsafe_code)]

use std::path::PathBuf;

use wc_core::model::{NodeKind, Presence};
use wc_core::paths::RelPath;
use wc_storage::{BaseNodePayload, ReposLockInfo, StoreError, WcDb};

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

#[test]
fn subtree_lock_covers_descendants() {
    let dir = temp_dir("subtree_lock_covers");
    let mut db = WcDb::open(&dir).expect("open store");

    db.wc_lock_acquire(&RelPath::root(), -1).expect("lock root");
    assert!(db.is_write_locked(&RelPath::root()).expect("root locked"));
    assert!(db.is_write_locked(&rel("a/b/c")).expect("descendant locked"));

    db.wc_lock_release(&RelPath::root()).expect("release root");
    assert!(!db.is_write_locked(&rel("a/b/c")).expect("released"));
}

#[test]
fn locked_levels_bound_the_reach() {
    let dir = temp_dir("locked_levels_reach");
    let mut db = WcDb::open(&dir).expect("open store");

    db.wc_lock_acquire(&rel("a"), 1).expect("lock a one level");
    assert!(db.is_write_locked(&rel("a")).expect("a"));
    assert!(db.is_write_locked(&rel("a/b")).expect("a/b"));
    assert!(!db.is_write_locked(&rel("a/b/c")).expect("a/b/c"));
    assert!(!db.is_write_locked(&rel("x")).expect("sibling"));

    db.wc_lock_acquire(&rel("a/b/c"), 0).expect("deeper lock");
    let covering = db
        .find_wc_lock(&rel("a/b/c"))
        .expect("find lock")
        .expect("covered");
    assert_eq!(covering.dir_relpath.as_str(), "a/b/c");
    assert_eq!(covering.locked_levels, 0);
}

#[test]
fn double_acquire_is_already_exists() {
    let dir = temp_dir("double_acquire");
    let mut db = WcDb::open(&dir).expect("open store");

    db.wc_lock_acquire(&rel("a"), 0).expect("first acquire");
    let err = db.wc_lock_acquire(&rel("a"), 0).expect_err("second acquire");
    assert!(matches!(err, StoreError::AlreadyExists { .. }), "got {err:?}");

    let err = db.wc_lock_release(&rel("b")).expect_err("release unheld");
    assert!(matches!(err, StoreError::NotFound { .. }), "got {err:?}");
}

#[test]
fn repository_lock_joins_into_node_reads() {
    let dir = temp_dir("repos_lock_join");
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

    db.repos_lock_set(
        repo_id,
        "trunk/a",
        &ReposLockInfo {
            token: "opaquelocktoken:1234".to_string(),
            owner: Some("harry".to_string()),
            comment: Some("editing".to_string()),
            date: Some(1_700_000_000_000_000),
        },
    )
    .expect("set repos lock");

    let plain = db.read_node_info(&rel("a")).expect("read a");
    assert!(plain.lock.is_none());

    let with_lock = db
        .read_node_info_with_lock(&rel("a"))
        .expect("read a with lock");
    let lock = with_lock.lock.expect("lock joined");
    assert_eq!(lock.token, "opaquelocktoken:1234");
    assert_eq!(lock.owner.as_deref(), Some("harry"));

    db.repos_lock_remove(repo_id, "trunk/a").expect("remove lock");
    let after = db
        .read_node_info_with_lock(&rel("a"))
        .expect("read a after unlock");
    assert!(after.lock.is_none());
}

#[test]
fn repository_locks_survive_node_churn() {
    let dir = temp_dir("lock_survives_churn");
    let mut db = WcDb::open(&dir).expect("open store");
    let repo_id = db
        .ensure_repository("https://svn.example.com/repo", "a0b1c2d3")
        .expect("ensure repository");

    // No node anywhere near trunk/ghost; the lock row stands alone.
    db.repos_lock_set(
        repo_id,
        "trunk/ghost",
        &ReposLockInfo {
            token: "opaquelocktoken:ghost".to_string(),
            owner: None,
            comment: None,
            date: None,
        },
    )
    .expect("set lock without node");

    let lock = db
        .repos_lock_get(repo_id, "trunk/ghost")
        .expect("get lock")
        .expect("lock exists");
    assert_eq!(lock.token, "opaquelocktoken:ghost");
}
