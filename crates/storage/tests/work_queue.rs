#![forbid(unsafe_code)]

use std::path::PathBuf;

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

#[test]
fn strict_fifo_by_id() {
    let dir = temp_dir("strict_fifo");
    let mut db = WcDb::open(&dir).expect("open store");

    assert!(!db.work_pending().expect("pending"));

    let first = db.work_enqueue(b"file-install a").expect("enqueue first");
    let second = db.work_enqueue(b"sync-file-flags a").expect("enqueue second");
    assert!(first < second);
    assert!(db.work_pending().expect("pending"));

    let head = db.work_peek().expect("peek").expect("head item");
    assert_eq!(head.id, first);
    assert_eq!(head.work, b"file-install a");

    // Peek does not consume.
    let again = db.work_peek().expect("peek").expect("head item");
    assert_eq!(again.id, first);

    db.work_done(first).expect("dequeue first");
    let head = db.work_peek().expect("peek").expect("next item");
    assert_eq!(head.id, second);

    db.work_done(second).expect("dequeue second");
    assert!(db.work_peek().expect("peek").is_none());
    assert!(!db.work_pending().expect("pending"));
}

#[test]
fn dequeue_of_unknown_id_fails() {
    let dir = temp_dir("dequeue_unknown");
    let mut db = WcDb::open(&dir).expect("open store");
    let err = db.work_done(99).expect_err("unknown id");
    assert!(matches!(err, StoreError::NotFound { .. }), "got {err:?}");
}

#[test]
fn queue_survives_reopen() {
    let dir = temp_dir("queue_survives_reopen");
    {
        let mut db = WcDb::open(&dir).expect("open store");
        db.work_enqueue(b"postcommit cleanup").expect("enqueue");
    }
    let db = WcDb::open(&dir).expect("reopen store");
    let head = db.work_peek().expect("peek").expect("item persisted");
    assert_eq!(head.work, b"postcommit cleanup");
}
