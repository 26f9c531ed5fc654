#![forbid(unsafe_code)]

use std::path::PathBuf;

use wc_core::conflict::{
    ConflictAction, ConflictOperation, ConflictReason, ConflictSide, NodeKindField,
    TreeConflictInfo,
};
use wc_core::model::{NodeKind, Presence, PropMap};
use wc_core::paths::RelPath;
use wc_storage::{BaseNodePayload, TextConflict, WcDb};

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

fn open_with_file(test_name: &str) -> WcDb {
    let dir = temp_dir(test_name);
    let mut db = WcDb::open(&dir).expect("open store");
    let repo_id = db
        .ensure_repository("https://svn.example.com/repo", "a0b1c2d3")
        .expect("ensure repository");
    db.apply_base_node(&BaseNodePayload::new(
        RelPath::root(),
        repo_id,
        "trunk",
        2,
        Presence::Normal,
        NodeKind::Dir,
    ))
    .expect("apply base root");
    db.apply_base_node(&BaseNodePayload::new(
        rel("a"),
        repo_id,
        "trunk/a",
        2,
        Presence::Normal,
        NodeKind::File,
    ))
    .expect("apply base a");
    db
}

#[test]
fn text_conflict_lifecycle_prunes_the_row() {
    let mut db = open_with_file("text_conflict_lifecycle");

    db.set_text_conflict(&rel("a"), &TextConflict::markers("a.r1", "a.r2", "a.mine"))
        .expect("set text conflict");

    let victims = db
        .conflict_victims(&RelPath::root(), None)
        .expect("list victims");
    assert_eq!(victims.iter().map(|p| p.as_str()).collect::<Vec<_>>(), vec!["a"]);

    let actual = db
        .read_actual(&rel("a"))
        .expect("read actual")
        .expect("row exists");
    let conflict = actual.text_conflict.expect("text conflict recorded");
    assert_eq!(conflict.old.as_deref(), Some("a.r1"));
    assert_eq!(conflict.new.as_deref(), Some("a.r2"));
    assert_eq!(conflict.working.as_deref(), Some("a.mine"));

    db.clear_text_conflict(&rel("a")).expect("clear text conflict");

    // No other override existed, so the row is gone entirely.
    assert!(db.read_actual(&rel("a")).expect("read actual").is_none());
    assert!(db
        .conflict_victims(&RelPath::root(), None)
        .expect("list victims")
        .is_empty());
    assert!(db.verify().expect("verify").is_empty());
}

#[test]
fn clearing_one_override_keeps_the_others() {
    let mut db = open_with_file("clear_keeps_others");

    db.set_text_conflict(&rel("a"), &TextConflict::markers("a.r1", "a.r2", "a.mine"))
        .expect("set text conflict");
    db.set_changelist(&rel("a"), Some("focus")).expect("set changelist");

    db.clear_text_conflict(&rel("a")).expect("clear text conflict");

    let actual = db
        .read_actual(&rel("a"))
        .expect("read actual")
        .expect("row survives for the changelist");
    assert!(actual.text_conflict.is_none());
    assert_eq!(actual.changelist.as_deref(), Some("focus"));

    db.set_changelist(&rel("a"), None).expect("drop changelist");
    assert!(db.read_actual(&rel("a")).expect("read actual").is_none());
}

#[test]
fn prop_conflict_and_reject_file() {
    let mut db = open_with_file("prop_conflict");

    db.set_prop_conflict(&rel("a"), "a.prej").expect("set prop conflict");
    let actual = db
        .read_actual(&rel("a"))
        .expect("read actual")
        .expect("row exists");
    assert_eq!(actual.prop_reject.as_deref(), Some("a.prej"));

    let victims = db
        .conflict_victims(&RelPath::root(), None)
        .expect("list victims");
    assert_eq!(victims.len(), 1);

    db.clear_prop_conflict(&rel("a")).expect("clear prop conflict");
    assert!(db.read_actual(&rel("a")).expect("read actual").is_none());
}

#[test]
fn actual_props_override_node_props() {
    let mut db = open_with_file("actual_props_override");

    let mut props = PropMap::new();
    props.insert("svn:eol-style".to_string(), "native".to_string());
    db.set_actual_props(&rel("a"), Some(&props)).expect("set actual props");

    let read = db.read_props(&rel("a")).expect("read props");
    assert_eq!(read.get("svn:eol-style").map(String::as_str), Some("native"));

    db.set_actual_props(&rel("a"), None).expect("clear actual props");
    assert!(db.read_props(&rel("a")).expect("read props").is_empty());
    assert!(db.read_actual(&rel("a")).expect("read actual").is_none());
}

#[test]
fn typed_tree_conflict_round_trips() {
    let mut db = open_with_file("typed_tree_conflict");

    let info = TreeConflictInfo {
        operation: ConflictOperation::Update,
        action: ConflictAction::Delete,
        reason: ConflictReason::Edited,
        kind: NodeKindField::File,
        left: Some(ConflictSide {
            repos_relpath: "trunk/a".to_string(),
            revision: 1,
            kind: NodeKindField::File,
        }),
        right: Some(ConflictSide {
            repos_relpath: "trunk/a".to_string(),
            revision: 2,
            kind: NodeKindField::Unknown,
        }),
    };
    db.set_tree_conflict(&rel("a"), &info).expect("set tree conflict");

    let stored = db
        .read_tree_conflict(&rel("a"))
        .expect("read tree conflict")
        .expect("descriptor exists");
    assert_eq!(stored, info);

    let victims = db
        .conflict_victims(&RelPath::root(), None)
        .expect("list victims");
    assert_eq!(victims.iter().map(|p| p.as_str()).collect::<Vec<_>>(), vec!["a"]);

    db.clear_tree_conflict(&rel("a")).expect("clear tree conflict");
    assert!(db
        .read_tree_conflict(&rel("a"))
        .expect("read tree conflict")
        .is_none());
    assert!(db
        .conflict_victims(&RelPath::root(), None)
        .expect("list victims")
        .is_empty());
}

#[test]
fn changelist_filter_narrows_victims() {
    let mut db = open_with_file("changelist_filter");
    let repo_id = db
        .ensure_repository("https://svn.example.com/repo", "a0b1c2d3")
        .expect("repo already interned");
    db.apply_base_node(&BaseNodePayload::new(
        rel("b"),
        repo_id,
        "trunk/b",
        2,
        Presence::Normal,
        NodeKind::File,
    ))
    .expect("apply base b");

    db.set_text_conflict(&rel("a"), &TextConflict::markers("a.r1", "a.r2", "a.mine"))
        .expect("conflict on a");
    db.set_text_conflict(&rel("b"), &TextConflict::markers("b.r1", "b.r2", "b.mine"))
        .expect("conflict on b");
    db.set_changelist(&rel("b"), Some("focus")).expect("changelist b");

    let all = db
        .conflict_victims(&RelPath::root(), None)
        .expect("all victims");
    assert_eq!(all.len(), 2);

    let focused = db
        .conflict_victims(&RelPath::root(), Some("focus"))
        .expect("focused victims");
    assert_eq!(focused.iter().map(|p| p.as_str()).collect::<Vec<_>>(), vec!["b"]);
}

#[test]
fn clear_all_conflicts_resolves_every_kind() {
    let mut db = open_with_file("clear_all_conflicts");

    db.set_text_conflict(&rel("a"), &TextConflict::markers("a.r1", "a.r2", "a.mine"))
        .expect("text conflict");
    db.set_prop_conflict(&rel("a"), "a.prej").expect("prop conflict");
    db.set_tree_conflict(
        &rel("a"),
        &TreeConflictInfo {
            operation: ConflictOperation::Merge,
            action: ConflictAction::Add,
            reason: ConflictReason::Obstructed,
            kind: NodeKindField::Dir,
            left: None,
            right: None,
        },
    )
    .expect("tree conflict");

    db.clear_all_conflicts(&rel("a")).expect("clear all");

    assert!(db.read_actual(&rel("a")).expect("read actual").is_none());
    assert!(db
        .read_tree_conflict(&rel("a"))
        .expect("read tree conflict")
        .is_none());
    assert!(db
        .conflict_victims(&RelPath::root(), None)
        .expect("victims")
        .is_empty());
}
