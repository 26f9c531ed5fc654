#![forbid(unsafe_code)]
//! The actual overlay: user property edits, conflicts, changelists.
//!
//! A row exists only while it carries at least one non-null override; every
//! mutation ends with a prune so all-null rows disappear. The conflict-victim
//! query depends on that.

use rusqlite::{Transaction, params};
use wc_core::conflict::{
    ConflictAction, ConflictOperation, ConflictReason, ConflictSide, NodeKindField,
    TreeConflictInfo,
};
use wc_core::model::{NodeKind, PropMap, Sha1Checksum};
use wc_core::paths::RelPath;

use super::nodes::{parse_props, parse_stored_relpath, props_to_json};
use super::support::begin_immediate;
use super::types::{ActualInfo, TextConflict};
use super::{Stmt, StoreError, WcDb};

impl WcDb {
    pub fn set_text_conflict(
        &mut self,
        relpath: &RelPath,
        conflict: &TextConflict,
    ) -> Result<(), StoreError> {
        if conflict.is_empty() {
            return Err(StoreError::InvalidArgument(
                "text conflict needs at least one marker file",
            ));
        }
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let parent = relpath.parent().map(|p| p.as_str().to_string());
        tx.prepare_cached(Stmt::InsertActualTextConflict.sql())?
            .execute(params![
                wc_id,
                relpath.as_str(),
                parent,
                conflict.old,
                conflict.new,
                conflict.working,
                conflict.older_checksum.as_ref().map(Sha1Checksum::as_str),
                conflict.left_checksum.as_ref().map(Sha1Checksum::as_str),
                conflict.right_checksum.as_ref().map(Sha1Checksum::as_str)
            ])?;
        prune_actual_tx(&tx, wc_id, relpath)?;
        tx.commit()?;
        Ok(())
    }

    pub fn clear_text_conflict(&mut self, relpath: &RelPath) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        tx.prepare_cached(Stmt::ClearTextConflict.sql())?
            .execute(params![wc_id, relpath.as_str()])?;
        prune_actual_tx(&tx, wc_id, relpath)?;
        tx.commit()?;
        Ok(())
    }

    pub fn set_prop_conflict(
        &mut self,
        relpath: &RelPath,
        reject_file: &str,
    ) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let parent = relpath.parent().map(|p| p.as_str().to_string());
        tx.prepare_cached(Stmt::InsertActualPropsConflict.sql())?
            .execute(params![wc_id, relpath.as_str(), parent, reject_file])?;
        prune_actual_tx(&tx, wc_id, relpath)?;
        tx.commit()?;
        Ok(())
    }

    pub fn clear_prop_conflict(&mut self, relpath: &RelPath) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        tx.prepare_cached(Stmt::ClearPropsConflict.sql())?
            .execute(params![wc_id, relpath.as_str()])?;
        prune_actual_tx(&tx, wc_id, relpath)?;
        tx.commit()?;
        Ok(())
    }

    /// Record the typed tree-conflict descriptor for a victim path.
    pub fn set_tree_conflict(
        &mut self,
        relpath: &RelPath,
        info: &TreeConflictInfo,
    ) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let parent = relpath.parent().map(|p| p.as_str().to_string());
        let (left_path, left_rev, left_kind) = side_columns(info.left.as_ref());
        let (right_path, right_rev, right_kind) = side_columns(info.right.as_ref());
        tx.prepare_cached(Stmt::InsertNewConflict.sql())?
            .execute(params![
                wc_id,
                relpath.as_str(),
                parent,
                info.operation.as_str(),
                info.action.as_str(),
                info.reason.as_str(),
                NodeKind::from(info.kind).as_str(),
                left_path,
                left_rev,
                left_kind,
                right_path,
                right_rev,
                right_kind
            ])?;
        tx.commit()?;
        Ok(())
    }

    pub fn clear_tree_conflict(&mut self, relpath: &RelPath) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        tx.prepare_cached(Stmt::DeleteConflictVictim.sql())?
            .execute(params![wc_id, relpath.as_str()])?;
        prune_actual_tx(&tx, wc_id, relpath)?;
        tx.commit()?;
        Ok(())
    }

    pub fn set_changelist(
        &mut self,
        relpath: &RelPath,
        changelist: Option<&str>,
    ) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let parent = relpath.parent().map(|p| p.as_str().to_string());
        tx.prepare_cached(Stmt::UpdateActualChangelist.sql())?
            .execute(params![wc_id, relpath.as_str(), parent, changelist])?;
        prune_actual_tx(&tx, wc_id, relpath)?;
        tx.commit()?;
        Ok(())
    }

    /// Override (or with None, drop the override of) the resolved node
    /// properties.
    pub fn set_actual_props(
        &mut self,
        relpath: &RelPath,
        props: Option<&PropMap>,
    ) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let parent = relpath.parent().map(|p| p.as_str().to_string());
        tx.prepare_cached(Stmt::UpdateActualProps.sql())?
            .execute(params![wc_id, relpath.as_str(), parent, props_to_json(props)])?;
        prune_actual_tx(&tx, wc_id, relpath)?;
        tx.commit()?;
        Ok(())
    }

    pub fn read_actual(&self, relpath: &RelPath) -> Result<Option<ActualInfo>, StoreError> {
        let mut stmt = self.conn.prepare_cached(Stmt::SelectActualNode.sql())?;
        let mut rows = stmt.query(params![self.wc_id, relpath.as_str()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let properties: Option<String> = row.get(0)?;
        let changelist: Option<String> = row.get(1)?;
        let conflict_old: Option<String> = row.get(2)?;
        let conflict_new: Option<String> = row.get(3)?;
        let conflict_working: Option<String> = row.get(4)?;
        let prop_reject: Option<String> = row.get(5)?;
        let older_checksum: Option<String> = row.get(6)?;
        let left_checksum: Option<String> = row.get(7)?;
        let right_checksum: Option<String> = row.get(8)?;

        let text_conflict = if conflict_old.is_some()
            || conflict_new.is_some()
            || conflict_working.is_some()
            || older_checksum.is_some()
            || left_checksum.is_some()
            || right_checksum.is_some()
        {
            Some(TextConflict {
                old: conflict_old,
                new: conflict_new,
                working: conflict_working,
                older_checksum: parse_checksum(relpath, older_checksum)?,
                left_checksum: parse_checksum(relpath, left_checksum)?,
                right_checksum: parse_checksum(relpath, right_checksum)?,
            })
        } else {
            None
        };

        Ok(Some(ActualInfo {
            properties: parse_props(relpath.as_str(), properties)?,
            changelist,
            text_conflict,
            prop_reject,
        }))
    }

    pub fn read_tree_conflict(
        &self,
        relpath: &RelPath,
    ) -> Result<Option<TreeConflictInfo>, StoreError> {
        let mut stmt = self.conn.prepare_cached(Stmt::SelectConflictDetails.sql())?;
        let mut rows = stmt.query(params![self.wc_id, relpath.as_str()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let operation: String = row.get(0)?;
        let action: String = row.get(1)?;
        let reason: String = row.get(2)?;
        let node_kind: String = row.get(3)?;
        let left = read_side(relpath, row.get(4)?, row.get(5)?, row.get(6)?)?;
        let right = read_side(relpath, row.get(7)?, row.get(8)?, row.get(9)?)?;
        Ok(Some(TreeConflictInfo {
            operation: ConflictOperation::parse(&operation).ok_or_else(|| {
                corrupt_field(relpath, "operation", &operation)
            })?,
            action: ConflictAction::parse(&action)
                .ok_or_else(|| corrupt_field(relpath, "action", &action))?,
            reason: ConflictReason::parse(&reason)
                .ok_or_else(|| corrupt_field(relpath, "reason", &reason))?,
            kind: parse_kind_field(relpath, &node_kind)?,
            left,
            right,
        }))
    }

    /// Paths directly under `parent` with any conflict recorded, from either
    /// the actual overlay or the typed victim table. With a changelist the
    /// listing narrows to members of that changelist.
    pub fn conflict_victims(
        &self,
        parent: &RelPath,
        changelist: Option<&str>,
    ) -> Result<Vec<RelPath>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(Stmt::SelectActualConflictVictims.sql())?;
        let mut rows = stmt.query(params![self.wc_id, parent.as_str(), changelist])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let relpath: String = row.get(0)?;
            out.push(parse_stored_relpath(&relpath)?);
        }
        Ok(out)
    }

    /// Rows still carrying a legacy conflict blob; only ever non-empty on a
    /// partially upgraded file.
    pub fn pending_legacy_conflicts(
        &self,
        limit: i64,
    ) -> Result<Vec<(i64, RelPath)>, StoreError> {
        let mut stmt = self.conn.prepare_cached(Stmt::PlanPropUpgrade.sql())?;
        let mut rows = stmt.query(params![limit])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let wc_id: i64 = row.get(0)?;
            let relpath: String = row.get(1)?;
            out.push((wc_id, parse_stored_relpath(&relpath)?));
        }
        Ok(out)
    }
}

fn prune_actual_tx(
    tx: &Transaction<'_>,
    wc_id: i64,
    relpath: &RelPath,
) -> Result<(), StoreError> {
    tx.prepare_cached(Stmt::DeleteActualEmpty.sql())?
        .execute(params![wc_id, relpath.as_str()])?;
    Ok(())
}

fn side_columns(
    side: Option<&ConflictSide>,
) -> (Option<&str>, Option<i64>, Option<&'static str>) {
    match side {
        Some(side) => (
            Some(side.repos_relpath.as_str()),
            Some(side.revision),
            Some(NodeKind::from(side.kind).as_str()),
        ),
        None => (None, None, None),
    }
}

fn read_side(
    relpath: &RelPath,
    repos_relpath: Option<String>,
    revision: Option<i64>,
    kind: Option<String>,
) -> Result<Option<ConflictSide>, StoreError> {
    match (repos_relpath, revision, kind) {
        (None, None, None) => Ok(None),
        (Some(repos_relpath), Some(revision), Some(kind)) => Ok(Some(ConflictSide {
            repos_relpath,
            revision,
            kind: parse_kind_field(relpath, &kind)?,
        })),
        _ => Err(StoreError::Corrupt(format!(
            "partial conflict side at '{}'",
            relpath.as_str()
        ))),
    }
}

fn parse_kind_field(relpath: &RelPath, text: &str) -> Result<NodeKindField, StoreError> {
    NodeKind::parse(text)
        .map(NodeKindField::from)
        .ok_or_else(|| corrupt_field(relpath, "kind", text))
}

fn corrupt_field(relpath: &RelPath, field: &str, value: &str) -> StoreError {
    StoreError::Corrupt(format!(
        "unknown conflict {field} at '{}': {value}",
        relpath.as_str()
    ))
}

fn parse_checksum(
    relpath: &RelPath,
    raw: Option<String>,
) -> Result<Option<Sha1Checksum>, StoreError> {
    match raw {
        None => Ok(None),
        Some(text) => Sha1Checksum::try_new(text).map(Some).map_err(|err| {
            StoreError::Corrupt(format!(
                "malformed conflict checksum at '{}': {err}",
                relpath.as_str()
            ))
        }),
    }
}

impl WcDb {
    /// Clear every conflict kind at once, the resolve-path entry point.
    pub fn clear_all_conflicts(&mut self, relpath: &RelPath) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        tx.prepare_cached(Stmt::ClearTextConflict.sql())?
            .execute(params![wc_id, relpath.as_str()])?;
        tx.prepare_cached(Stmt::ClearPropsConflict.sql())?
            .execute(params![wc_id, relpath.as_str()])?;
        tx.prepare_cached(Stmt::DeleteConflictVictim.sql())?
            .execute(params![wc_id, relpath.as_str()])?;
        prune_actual_tx(&tx, wc_id, relpath)?;
        tx.commit()?;
        Ok(())
    }
}
