#![forbid(unsafe_code)]
//! Format 1 -> 2: lift legacy opaque tree_conflict_data blobs into typed
//! conflict_victim rows, then null the legacy column.

use rusqlite::{Transaction, params};
use wc_core::conflict::TreeConflictInfo;

use super::super::super::super::StoreError;
use super::super::CONFLICT_VICTIM_SQL;
use super::util::add_column_if_missing;
use crate::store::statements::Stmt;

pub(super) fn apply(tx: &Transaction<'_>) -> Result<(), StoreError> {
    tx.execute_batch(CONFLICT_VICTIM_SQL)?;

    // Format-1 files from before marker-checksum tracking lack these.
    add_column_if_missing(tx, "actual_node", "older_checksum", "TEXT")?;
    add_column_if_missing(tx, "actual_node", "left_checksum", "TEXT")?;
    add_column_if_missing(tx, "actual_node", "right_checksum", "TEXT")?;

    let legacy = {
        let mut stmt = tx.prepare_cached(Stmt::SelectOldTreeConflict.sql())?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::<(i64, String, Option<String>, String)>::new();
        while let Some(row) = rows.next()? {
            out.push((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?));
        }
        out
    };

    for (wc_id, local_relpath, parent_relpath, blob) in &legacy {
        let info = TreeConflictInfo::from_legacy_json(&blob).map_err(|err| {
            StoreError::Corrupt(format!(
                "unreadable tree_conflict_data at '{local_relpath}': {err}"
            ))
        })?;
        let (left_path, left_rev, left_kind) = match &info.left {
            Some(side) => (
                Some(side.repos_relpath.as_str()),
                Some(side.revision),
                Some(kind_str(side.kind)),
            ),
            None => (None, None, None),
        };
        let (right_path, right_rev, right_kind) = match &info.right {
            Some(side) => (
                Some(side.repos_relpath.as_str()),
                Some(side.revision),
                Some(kind_str(side.kind)),
            ),
            None => (None, None, None),
        };
        tx.execute(
            Stmt::InsertNewConflict.sql(),
            params![
                wc_id,
                local_relpath,
                parent_relpath,
                info.operation.as_str(),
                info.action.as_str(),
                info.reason.as_str(),
                kind_str(info.kind),
                left_path,
                left_rev,
                left_kind,
                right_path,
                right_rev,
                right_kind
            ],
        )?;
    }

    tx.execute(Stmt::EraseOldConflicts.sql(), [])?;

    // Rows that only carried the blob are now all-null and must go.
    for (wc_id, local_relpath, _, _) in &legacy {
        tx.execute(Stmt::DeleteActualEmpty.sql(), params![wc_id, local_relpath])?;
    }
    Ok(())
}

fn kind_str(kind: wc_core::conflict::NodeKindField) -> &'static str {
    wc_core::model::NodeKind::from(kind).as_str()
}
