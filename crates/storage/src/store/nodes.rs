#![forbid(unsafe_code)]
//! The layered-node relation and its resolver.
//!
//! `op_depth = 0` is the BASE tree; `op_depth = k > 0` is a working layer
//! rooted at the path of depth k. The effective row at a path is the one
//! with the greatest op_depth; paths inside a copied subtree that were never
//! materialized inherit from the nearest covering layer.

use rusqlite::{Connection, Row, Transaction, params};
use wc_core::cancel::CancelToken;
use wc_core::model::{AmbientDepth, NodeKind, Presence, PropMap, Sha1Checksum};
use wc_core::paths::RelPath;

use super::support::{begin_immediate, subtree_like_pattern};
use super::types::{BaseNodePayload, CopyMaterialization, DeletionInfo, NodeInfo, ReposLockInfo};
use super::{DavDecode, Stmt, StoreError, WcDb};

impl WcDb {
    /// Effective node at `relpath`: the op_depth-maximal row, or the
    /// inherited view inside an unmaterialized copied subtree. A
    /// base-deleted top row shadows BASE, so the path reads as absent.
    pub fn read_node_info(&self, relpath: &RelPath) -> Result<NodeInfo, StoreError> {
        let dav = self.dav_decode();
        effective_info(&self.conn, &dav, self.wc_id, relpath)
    }

    /// Effective node joined with the repository-lock overlay.
    pub fn read_node_info_with_lock(&self, relpath: &RelPath) -> Result<NodeInfo, StoreError> {
        let dav = self.dav_decode();
        let raw = {
            let mut stmt = self.conn.prepare_cached(Stmt::SelectNodeInfoWithLock.sql())?;
            let mut rows = stmt.query(params![self.wc_id, relpath.as_str()])?;
            match rows.next()? {
                Some(row) => Some(RawNodeRow::read_with_lock(row)?),
                None => None,
            }
        };
        match raw {
            Some(raw) => {
                let info = raw_into_info(relpath.as_str(), raw, &dav)?;
                if info.presence == Presence::BaseDeleted {
                    return Err(not_found("node", relpath));
                }
                Ok(info)
            }
            None => inherited_info(&self.conn, &dav, self.wc_id, relpath),
        }
    }

    /// BASE row at `relpath`, ignoring every working layer.
    pub fn read_base_node(&self, relpath: &RelPath) -> Result<NodeInfo, StoreError> {
        let dav = self.dav_decode();
        match base_raw(&self.conn, self.wc_id, relpath)? {
            Some(raw) => raw_into_info(relpath.as_str(), raw, &dav),
            None => Err(not_found("base node", relpath)),
        }
    }

    /// Topmost working row at `relpath`; NotFound when only BASE exists.
    pub fn read_working_node(&self, relpath: &RelPath) -> Result<NodeInfo, StoreError> {
        let dav = self.dav_decode();
        match working_raw(&self.conn, self.wc_id, relpath)? {
            Some(raw) => raw_into_info(relpath.as_str(), raw, &dav),
            None => Err(not_found("working node", relpath)),
        }
    }

    /// BASE children of `parent` with their BASE rows.
    pub fn base_children(
        &self,
        parent: &RelPath,
    ) -> Result<Vec<(RelPath, NodeInfo)>, StoreError> {
        let dav = self.dav_decode();
        let mut stmt = self.conn.prepare_cached(Stmt::SelectBaseNodeChildren.sql())?;
        let mut rows = stmt.query(params![self.wc_id, parent.as_str()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let child: String = row.get(0)?;
            let raw = RawNodeRow::read_from(row, 1)?;
            let info = raw_into_info(&child, raw, &dav)?;
            out.push((parse_stored_relpath(&child)?, info));
        }
        Ok(out)
    }

    /// Distinct child paths that any working layer touches under `parent`.
    pub fn working_children(&self, parent: &RelPath) -> Result<Vec<RelPath>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(Stmt::SelectWorkingNodeChildren.sql())?;
        let mut rows = stmt.query(params![self.wc_id, parent.as_str()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let child: String = row.get(0)?;
            out.push(parse_stored_relpath(&child)?);
        }
        Ok(out)
    }

    /// Effective children of `parent`: the union of BASE and working
    /// children, working overriding BASE per path. Paths whose effective
    /// row is base-deleted are omitted.
    pub fn children(&self, parent: &RelPath) -> Result<Vec<(RelPath, NodeInfo)>, StoreError> {
        let dav = self.dav_decode();
        let names = {
            let mut stmt = self.conn.prepare_cached(Stmt::SelectNodeChildren.sql())?;
            let mut rows = stmt.query(params![self.wc_id, parent.as_str()])?;
            let mut out = Vec::<String>::new();
            while let Some(row) = rows.next()? {
                out.push(row.get(0)?);
            }
            out
        };
        let mut out = Vec::new();
        for name in names {
            let child = parse_stored_relpath(&name)?;
            let Some(raw) = top_raw(&self.conn, self.wc_id, &child)? else {
                continue;
            };
            let info = raw_into_info(&name, raw, &dav)?;
            if info.presence == Presence::BaseDeleted {
                continue;
            }
            out.push((child, info));
        }
        Ok(out)
    }

    /// Effective properties: the actual-overlay override when present,
    /// otherwise the effective node's recorded properties.
    pub fn read_props(&self, relpath: &RelPath) -> Result<PropMap, StoreError> {
        let actual: Option<Option<String>> = {
            let mut stmt = self.conn.prepare_cached(Stmt::SelectActualProps.sql())?;
            let mut rows = stmt.query(params![self.wc_id, relpath.as_str()])?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        };
        if let Some(Some(raw)) = actual {
            return parse_props(relpath.as_str(), Some(raw)).map(Option::unwrap_or_default);
        }
        let node: Option<Option<String>> = {
            let mut stmt = self.conn.prepare_cached(Stmt::SelectNodeProps.sql())?;
            let mut rows = stmt.query(params![self.wc_id, relpath.as_str()])?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        };
        match node {
            Some(raw) => parse_props(relpath.as_str(), raw).map(Option::unwrap_or_default),
            // No explicit row: resolve through copied-subtree inheritance.
            None => Ok(self.read_node_info(relpath)?.properties.unwrap_or_default()),
        }
    }

    pub fn read_base_props(&self, relpath: &RelPath) -> Result<PropMap, StoreError> {
        let raw: Option<String> = {
            let mut stmt = self.conn.prepare_cached(Stmt::SelectBaseProps.sql())?;
            let mut rows = stmt.query(params![self.wc_id, relpath.as_str()])?;
            match rows.next()? {
                Some(row) => row.get(0)?,
                None => return Err(not_found("base node", relpath)),
            }
        };
        parse_props(relpath.as_str(), raw).map(Option::unwrap_or_default)
    }

    pub fn read_working_props(&self, relpath: &RelPath) -> Result<PropMap, StoreError> {
        let raw: Option<String> = {
            let mut stmt = self.conn.prepare_cached(Stmt::SelectWorkingProps.sql())?;
            let mut rows = stmt.query(params![self.wc_id, relpath.as_str()])?;
            match rows.next()? {
                Some(row) => row.get(0)?,
                None => return Err(not_found("working node", relpath)),
            }
        };
        parse_props(relpath.as_str(), raw).map(Option::unwrap_or_default)
    }

    /// Topmost base-deleted working row at `relpath`, with the BASE
    /// presence it shadows and any recorded move target.
    pub fn deletion_info(&self, relpath: &RelPath) -> Result<Option<DeletionInfo>, StoreError> {
        let mut stmt = self.conn.prepare_cached(Stmt::SelectDeletionInfo.sql())?;
        let mut rows = stmt.query(params![self.wc_id, relpath.as_str()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let base_presence: Option<String> = row.get(0)?;
        let work_op_depth: i64 = row.get(1)?;
        let moved_to: Option<String> = row.get(2)?;
        let base_presence = match base_presence {
            Some(text) => Some(parse_presence(relpath.as_str(), &text)?),
            None => None,
        };
        let moved_to = match moved_to {
            Some(text) => Some(parse_stored_relpath(&text)?),
            None => None,
        };
        Ok(Some(DeletionInfo {
            base_presence,
            work_op_depth,
            moved_to,
        }))
    }

    /// Record a server-supplied BASE row, invalidating stale dav_cache on
    /// the covered subtree first.
    pub fn apply_base_node(&mut self, payload: &BaseNodePayload) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        apply_base_node_tx(&tx, wc_id, payload)?;
        tx.commit()?;
        Ok(())
    }

    /// Mark `relpath` (and optionally its descendants) deleted at the
    /// working layer rooted here. BASE stays untouched. An add or copy
    /// rooted exactly at `relpath` is discarded instead of shadowed.
    pub fn schedule_delete(
        &mut self,
        relpath: &RelPath,
        descendants: bool,
        moved_to: Option<&RelPath>,
    ) -> Result<(), StoreError> {
        if relpath.is_root() {
            return Err(StoreError::InvalidArgument(
                "cannot schedule delete of the workcopy root",
            ));
        }
        let dav = DavDecode::new(&self.cache, self.on_cache_warning.as_ref());
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        schedule_delete_tx(&tx, &dav, wc_id, relpath, descendants, moved_to)?;
        tx.commit()?;
        Ok(())
    }

    /// Schedule a copy of BASE@src at dst.
    pub fn copy_from_base(
        &mut self,
        src: &RelPath,
        dst: &RelPath,
        materialization: CopyMaterialization,
    ) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let cancel = self.cancel.clone();
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        copy_from_base_tx(&tx, wc_id, &cancel, src, dst, materialization, false)?;
        tx.commit()?;
        Ok(())
    }

    /// Schedule a copy of the effective working node at src.
    pub fn copy_from_working(
        &mut self,
        src: &RelPath,
        dst: &RelPath,
        materialization: CopyMaterialization,
    ) -> Result<(), StoreError> {
        let dav = DavDecode::new(&self.cache, self.on_cache_warning.as_ref());
        let wc_id = self.wc_id;
        let cancel = self.cancel.clone();
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        copy_from_working_tx(&tx, &dav, wc_id, &cancel, src, dst, materialization, false)?;
        tx.commit()?;
        Ok(())
    }

    /// Copy-plus-delete recorded as a move, in one transaction. The copy is
    /// materialized eagerly so the delete side can shadow every row.
    pub fn schedule_move(&mut self, src: &RelPath, dst: &RelPath) -> Result<(), StoreError> {
        if src.is_root() || dst.is_root() {
            return Err(StoreError::InvalidArgument(
                "cannot move the workcopy root",
            ));
        }
        let dav = DavDecode::new(&self.cache, self.on_cache_warning.as_ref());
        let wc_id = self.wc_id;
        let cancel = self.cancel.clone();
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        if base_raw(&tx, wc_id, src)?.is_some() {
            copy_from_base_tx(&tx, wc_id, &cancel, src, dst, CopyMaterialization::Eager, true)?;
        } else {
            copy_from_working_tx(
                &tx,
                &dav,
                wc_id,
                &cancel,
                src,
                dst,
                CopyMaterialization::Eager,
                true,
            )?;
        }
        schedule_delete_tx(&tx, &dav, wc_id, src, true, Some(dst))?;
        tx.commit()?;
        Ok(())
    }

    /// Remove the topmost working layer at `relpath`, restoring the next
    /// deeper layer as effective. When the layer is rooted here, its whole
    /// subtree goes with it.
    pub fn revert(&mut self, relpath: &RelPath) -> Result<(), StoreError> {
        let dav = DavDecode::new(&self.cache, self.on_cache_warning.as_ref());
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let Some(raw) = working_raw(&tx, wc_id, relpath)? else {
            return Err(not_found("working node", relpath));
        };
        let info = raw_into_info(relpath.as_str(), raw, &dav)?;
        if info.op_depth == relpath.depth() {
            let pattern = subtree_like_pattern(relpath);
            tx.prepare_cached(Stmt::DeleteWorkingNodesAtDepthRecursive.sql())?
                .execute(params![wc_id, relpath.as_str(), pattern, info.op_depth])?;
        } else {
            tx.prepare_cached(Stmt::DeleteWorkingNode.sql())?
                .execute(params![wc_id, relpath.as_str(), info.op_depth])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Full revert: every working layer at `relpath` and below is removed
    /// and the actual overlay is cleared.
    pub fn revert_tree(&mut self, relpath: &RelPath) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let pattern = subtree_like_pattern(relpath);
        tx.prepare_cached(Stmt::DeleteWorkingNodes.sql())?
            .execute(params![wc_id, relpath.as_str()])?;
        tx.prepare_cached(Stmt::DeleteWorkingNodesRecursive.sql())?
            .execute(params![wc_id, pattern])?;
        tx.prepare_cached(Stmt::DeleteActualNodeRecursive.sql())?
            .execute(params![wc_id, relpath.as_str(), pattern])?;
        tx.prepare_cached(Stmt::DeleteConflictVictimsRecursive.sql())?
            .execute(params![wc_id, relpath.as_str(), pattern])?;
        tx.commit()?;
        Ok(())
    }

    /// Forget the BASE row at `relpath`, as an update does when the server
    /// no longer has the path. Working layers are unaffected.
    pub fn remove_base_node(&mut self, relpath: &RelPath) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let affected = tx
            .prepare_cached(Stmt::DeleteBaseNode.sql())?
            .execute(params![wc_id, relpath.as_str()])?;
        if affected == 0 {
            return Err(not_found("base node", relpath));
        }
        tx.commit()?;
        Ok(())
    }

    /// Drop every layer's row at exactly `relpath`.
    pub fn remove_node(&mut self, relpath: &RelPath) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let affected = tx
            .prepare_cached(Stmt::DeleteAllNodes.sql())?
            .execute(params![wc_id, relpath.as_str()])?;
        if affected == 0 {
            return Err(not_found("node", relpath));
        }
        tx.commit()?;
        Ok(())
    }

    /// Retarget every BASE row under `relpath` from one repository to
    /// another, rewriting lock rows and dropping stale dav_cache.
    pub fn relocate(
        &mut self,
        relpath: &RelPath,
        from_repo_id: i64,
        to_repo_id: i64,
    ) -> Result<(), StoreError> {
        let dav = DavDecode::new(&self.cache, self.on_cache_warning.as_ref());
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let Some(raw) = base_raw(&tx, wc_id, relpath)? else {
            return Err(not_found("base node", relpath));
        };
        let info = raw_into_info(relpath.as_str(), raw, &dav)?;
        let pattern = subtree_like_pattern(relpath);
        tx.prepare_cached(Stmt::RecursiveUpdateNodeRepo.sql())?
            .execute(params![
                wc_id,
                relpath.as_str(),
                pattern,
                from_repo_id,
                to_repo_id
            ])?;
        if let Some(repos_path) = info.repos_path {
            let lock_pattern = repos_subtree_pattern(&repos_path);
            tx.prepare_cached(Stmt::UpdateLockReposId.sql())?
                .execute(params![from_repo_id, to_repo_id, repos_path, lock_pattern])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Exclude the BASE node: present on the server, deliberately not
    /// materialized here.
    pub fn exclude_base(&mut self, relpath: &RelPath) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let affected = tx
            .prepare_cached(Stmt::UpdateNodeBaseExcluded.sql())?
            .execute(params![wc_id, relpath.as_str()])?;
        if affected == 0 {
            return Err(not_found("base node", relpath));
        }
        tx.commit()?;
        Ok(())
    }

    /// Exclude at the topmost working layer.
    pub fn exclude_working(&mut self, relpath: &RelPath) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let affected = tx
            .prepare_cached(Stmt::UpdateNodeWorkingExcluded.sql())?
            .execute(params![wc_id, relpath.as_str()])?;
        if affected == 0 {
            return Err(not_found("working node", relpath));
        }
        tx.commit()?;
        Ok(())
    }

    /// Flip the BASE presence, e.g. to `incomplete` around an interrupted
    /// update.
    pub fn set_base_presence(
        &mut self,
        relpath: &RelPath,
        presence: Presence,
    ) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let affected = tx
            .prepare_cached(Stmt::UpdateNodeBasePresence.sql())?
            .execute(params![wc_id, relpath.as_str(), presence.as_str()])?;
        if affected == 0 {
            return Err(not_found("base node", relpath));
        }
        tx.commit()?;
        Ok(())
    }

    /// Rewrite the copyfrom origin of the topmost working layer at
    /// `relpath`. Shadowed layers and descendants keep theirs.
    pub fn update_copyfrom(
        &mut self,
        relpath: &RelPath,
        repos_id: i64,
        repos_path: &str,
        revision: i64,
    ) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let affected = tx.prepare_cached(Stmt::UpdateCopyfrom.sql())?.execute(params![
            wc_id,
            relpath.as_str(),
            repos_id,
            repos_path,
            revision
        ])?;
        if affected == 0 {
            return Err(not_found("working node", relpath));
        }
        tx.commit()?;
        Ok(())
    }

    /// Shift a whole working layer under `relpath` to a different op_depth.
    pub fn set_op_depth(
        &mut self,
        relpath: &RelPath,
        from_depth: i64,
        to_depth: i64,
    ) -> Result<(), StoreError> {
        if from_depth <= 0 || to_depth <= 0 {
            return Err(StoreError::InvalidArgument("op_depth must be positive"));
        }
        if to_depth > relpath.depth() {
            return Err(StoreError::ConstraintViolation(
                "op_depth exceeds the path depth of the layer root",
            ));
        }
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let pattern = subtree_like_pattern(relpath);
        tx.prepare_cached(Stmt::UpdateOpDepth.sql())?.execute(params![
            wc_id,
            relpath.as_str(),
            pattern,
            from_depth,
            to_depth
        ])?;
        tx.commit()?;
        Ok(())
    }
}

// ---- shared transaction bodies ----

pub(super) fn apply_base_node_tx(
    tx: &Transaction<'_>,
    wc_id: i64,
    payload: &BaseNodePayload,
) -> Result<(), StoreError> {
    let relpath = &payload.relpath;
    let parent = relpath.parent().map(|p| p.as_str().to_string());
    let pattern = subtree_like_pattern(relpath);
    // Drop stale dav_cache across the subtree before the fresh row lands.
    tx.prepare_cached(Stmt::ClearDavCacheRecursive.sql())?
        .execute(params![wc_id, relpath.as_str(), pattern])?;
    tx.prepare_cached(Stmt::ApplyChangesToBaseNode.sql())?
        .execute(params![
            wc_id,
            relpath.as_str(),
            parent,
            payload.repos_id,
            payload.repos_path,
            payload.revision,
            payload.presence.as_str(),
            payload.kind.as_str(),
            payload.depth.map(AmbientDepth::as_str),
            payload.checksum.as_ref().map(Sha1Checksum::as_str),
            props_to_json(payload.properties.as_ref()),
            payload.changed_revision,
            payload.changed_date,
            payload.changed_author,
            payload.translated_size,
            payload.last_mod_time,
            payload.symlink_target,
            payload.dav_cache.as_ref().map(|v| v.to_string()),
            payload.file_external as i64
        ])?;
    Ok(())
}

pub(super) fn schedule_delete_tx(
    tx: &Transaction<'_>,
    dav: &DavDecode<'_>,
    wc_id: i64,
    relpath: &RelPath,
    descendants: bool,
    moved_to: Option<&RelPath>,
) -> Result<(), StoreError> {
    let effective = effective_info(tx, dav, wc_id, relpath)?;
    if effective.presence != Presence::Normal {
        return Err(not_found("node", relpath));
    }
    let op_depth = relpath.depth();
    let pattern = subtree_like_pattern(relpath);
    let explicit = top_raw(tx, wc_id, relpath)?;
    let had_explicit = explicit.is_some();
    if let Some(raw) = explicit {
        let info = raw_into_info(relpath.as_str(), raw, dav)?;
        // An add or copy rooted exactly here is discarded, not shadowed.
        if info.op_depth == op_depth {
            tx.prepare_cached(Stmt::DeleteWorkingNodesAtDepthRecursive.sql())?
                .execute(params![wc_id, relpath.as_str(), pattern, op_depth])?;
        }
    }

    // Whatever still covers the path (BASE, an outer copy layer, or
    // inheritance) gets shadowed with base-deleted rows.
    let still_covered = match effective_info(tx, dav, wc_id, relpath) {
        Ok(info) => info.presence == Presence::Normal,
        Err(StoreError::NotFound { .. }) => false,
        Err(err) => return Err(err),
    };
    if !still_covered {
        return Ok(());
    }

    let descent_pattern: Option<String> = descendants.then(|| pattern.clone());
    tx.prepare_cached(Stmt::InsertDeleteNodesRecursive.sql())?
        .execute(params![wc_id, relpath.as_str(), descent_pattern, op_depth])?;

    // Inherited-only paths have no explicit row for the statement to clone.
    if !had_explicit && top_raw(tx, wc_id, relpath)?.is_none() {
        let effective = effective_info(tx, dav, wc_id, relpath)?;
        insert_minimal_row(
            tx,
            wc_id,
            relpath,
            op_depth,
            Presence::BaseDeleted,
            effective.kind,
        )?;
    }

    if let Some(target) = moved_to {
        tx.prepare_cached(Stmt::UpdateMovedTo.sql())?.execute(params![
            wc_id,
            relpath.as_str(),
            op_depth,
            target.as_str()
        ])?;
    }
    Ok(())
}

pub(super) fn copy_from_base_tx(
    tx: &Transaction<'_>,
    wc_id: i64,
    cancel: &CancelToken,
    src: &RelPath,
    dst: &RelPath,
    materialization: CopyMaterialization,
    moved_here: bool,
) -> Result<(), StoreError> {
    let Some(parent) = dst.parent() else {
        return Err(StoreError::InvalidArgument(
            "copy target cannot be the workcopy root",
        ));
    };
    let op_depth = dst.depth();
    let affected = tx
        .prepare_cached(Stmt::InsertWorkingNodeCopyFromBase.sql())?
        .execute(params![
            wc_id,
            src.as_str(),
            dst.as_str(),
            op_depth,
            parent.as_str(),
            Presence::Normal.as_str(),
            moved_here as i64
        ])?;
    if affected == 0 {
        return Err(not_found("base node", src));
    }
    if materialization == CopyMaterialization::Eager {
        let names = base_descendants(tx, wc_id, src)?;
        for name in names {
            if cancel.is_cancelled() {
                return Err(StoreError::Interrupted);
            }
            let desc = parse_stored_relpath(&name)?;
            let suffix = desc
                .suffix_below(src)
                .ok_or(StoreError::ConstraintViolation("descendant outside subtree"))?;
            let dst_child = dst.join(suffix)?;
            let dst_parent = dst_child.parent().unwrap_or_else(RelPath::root);
            tx.prepare_cached(Stmt::InsertWorkingNodeCopyFromBase.sql())?
                .execute(params![
                    wc_id,
                    desc.as_str(),
                    dst_child.as_str(),
                    op_depth,
                    dst_parent.as_str(),
                    Presence::Normal.as_str(),
                    0i64
                ])?;
        }
    }
    Ok(())
}

pub(super) fn copy_from_working_tx(
    tx: &Transaction<'_>,
    dav: &DavDecode<'_>,
    wc_id: i64,
    cancel: &CancelToken,
    src: &RelPath,
    dst: &RelPath,
    materialization: CopyMaterialization,
    moved_here: bool,
) -> Result<(), StoreError> {
    let Some(parent) = dst.parent() else {
        return Err(StoreError::InvalidArgument(
            "copy target cannot be the workcopy root",
        ));
    };
    let op_depth = dst.depth();
    let affected = tx
        .prepare_cached(Stmt::InsertWorkingNodeCopyFromWorking.sql())?
        .execute(params![
            wc_id,
            src.as_str(),
            dst.as_str(),
            op_depth,
            parent.as_str(),
            Presence::Normal.as_str(),
            moved_here as i64
        ])?;
    if affected == 0 {
        return Err(not_found("working node", src));
    }
    if materialization == CopyMaterialization::Eager {
        let names = node_descendants(tx, wc_id, src)?;
        for name in names {
            if cancel.is_cancelled() {
                return Err(StoreError::Interrupted);
            }
            let desc = parse_stored_relpath(&name)?;
            let Some(raw) = top_raw(tx, wc_id, &desc)? else {
                continue;
            };
            let info = raw_into_info(&name, raw, dav)?;
            if info.presence != Presence::Normal {
                continue;
            }
            let suffix = desc
                .suffix_below(src)
                .ok_or(StoreError::ConstraintViolation("descendant outside subtree"))?;
            let dst_child = dst.join(suffix)?;
            let dst_parent = dst_child.parent().unwrap_or_else(RelPath::root);
            insert_info_row(tx, wc_id, &dst_child, &dst_parent, op_depth, &info)?;
        }
    }
    Ok(())
}

// ---- raw row plumbing ----

pub(super) struct RawNodeRow {
    pub op_depth: i64,
    pub repos_id: Option<i64>,
    pub repos_path: Option<String>,
    pub revision: Option<i64>,
    pub presence: String,
    pub kind: String,
    pub depth: Option<String>,
    pub checksum: Option<String>,
    pub properties: Option<String>,
    pub changed_revision: Option<i64>,
    pub changed_date: Option<i64>,
    pub changed_author: Option<String>,
    pub translated_size: Option<i64>,
    pub last_mod_time: Option<i64>,
    pub symlink_target: Option<String>,
    pub dav_cache: Option<String>,
    pub moved_here: i64,
    pub moved_to: Option<String>,
    pub file_external: i64,
    pub lock: Option<(String, Option<String>, Option<String>, Option<i64>)>,
}

impl RawNodeRow {
    pub(super) fn read_from(row: &Row<'_>, base: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            op_depth: row.get(base)?,
            repos_id: row.get(base + 1)?,
            repos_path: row.get(base + 2)?,
            revision: row.get(base + 3)?,
            presence: row.get(base + 4)?,
            kind: row.get(base + 5)?,
            depth: row.get(base + 6)?,
            checksum: row.get(base + 7)?,
            properties: row.get(base + 8)?,
            changed_revision: row.get(base + 9)?,
            changed_date: row.get(base + 10)?,
            changed_author: row.get(base + 11)?,
            translated_size: row.get(base + 12)?,
            last_mod_time: row.get(base + 13)?,
            symlink_target: row.get(base + 14)?,
            dav_cache: row.get(base + 15)?,
            moved_here: row.get(base + 16)?,
            moved_to: row.get(base + 17)?,
            file_external: row.get(base + 18)?,
            lock: None,
        })
    }

    fn read_with_lock(row: &Row<'_>) -> rusqlite::Result<Self> {
        let mut raw = Self::read_from(row, 0)?;
        let token: Option<String> = row.get(19)?;
        if let Some(token) = token {
            raw.lock = Some((token, row.get(20)?, row.get(21)?, row.get(22)?));
        }
        Ok(raw)
    }
}

pub(super) fn raw_into_info(
    relpath: &str,
    raw: RawNodeRow,
    dav: &DavDecode<'_>,
) -> Result<NodeInfo, StoreError> {
    let presence = parse_presence(relpath, &raw.presence)?;
    let kind = NodeKind::parse(&raw.kind)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown kind at '{relpath}': {}", raw.kind)))?;
    let depth = match raw.depth.as_deref() {
        Some(text) => Some(AmbientDepth::parse(text).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown depth at '{relpath}': {text}"))
        })?),
        None => None,
    };
    let checksum = match raw.checksum {
        Some(text) => Some(Sha1Checksum::try_new(text).map_err(|err| {
            StoreError::Corrupt(format!("malformed checksum at '{relpath}': {err}"))
        })?),
        None => None,
    };
    let properties = parse_props(relpath, raw.properties)?;
    let moved_to = match raw.moved_to {
        Some(text) => Some(parse_stored_relpath(&text)?),
        None => None,
    };
    let dav_cache = dav.decode(relpath, raw.dav_cache)?;
    let lock = raw.lock.map(|(token, owner, comment, date)| ReposLockInfo {
        token,
        owner,
        comment,
        date,
    });
    Ok(NodeInfo {
        op_depth: raw.op_depth,
        repos_id: raw.repos_id,
        repos_path: raw.repos_path,
        revision: raw.revision,
        presence,
        kind,
        depth,
        checksum,
        properties,
        changed_revision: raw.changed_revision,
        changed_date: raw.changed_date,
        changed_author: raw.changed_author,
        translated_size: raw.translated_size,
        last_mod_time: raw.last_mod_time,
        symlink_target: raw.symlink_target,
        dav_cache,
        moved_here: raw.moved_here != 0,
        moved_to,
        file_external: raw.file_external != 0,
        lock,
    })
}

pub(super) fn top_raw(
    conn: &Connection,
    wc_id: i64,
    relpath: &RelPath,
) -> Result<Option<RawNodeRow>, StoreError> {
    let mut stmt = conn.prepare_cached(Stmt::SelectNodeInfo.sql())?;
    let mut rows = stmt.query(params![wc_id, relpath.as_str()])?;
    match rows.next()? {
        Some(row) => Ok(Some(RawNodeRow::read_from(row, 0)?)),
        None => Ok(None),
    }
}

pub(super) fn base_raw(
    conn: &Connection,
    wc_id: i64,
    relpath: &RelPath,
) -> Result<Option<RawNodeRow>, StoreError> {
    let mut stmt = conn.prepare_cached(Stmt::SelectBaseNode.sql())?;
    let mut rows = stmt.query(params![wc_id, relpath.as_str()])?;
    match rows.next()? {
        Some(row) => Ok(Some(RawNodeRow::read_from(row, 0)?)),
        None => Ok(None),
    }
}

fn working_raw(
    conn: &Connection,
    wc_id: i64,
    relpath: &RelPath,
) -> Result<Option<RawNodeRow>, StoreError> {
    let mut stmt = conn.prepare_cached(Stmt::SelectWorkingNode.sql())?;
    let mut rows = stmt.query(params![wc_id, relpath.as_str()])?;
    match rows.next()? {
        Some(row) => Ok(Some(RawNodeRow::read_from(row, 0)?)),
        None => Ok(None),
    }
}

fn source_raw(
    conn: &Connection,
    wc_id: i64,
    repos_id: i64,
    repos_path: &str,
    revision: i64,
) -> Result<Option<RawNodeRow>, StoreError> {
    let mut stmt = conn.prepare_cached(Stmt::SelectNodeByReposLocation.sql())?;
    let mut rows = stmt.query(params![wc_id, repos_id, repos_path, revision])?;
    match rows.next()? {
        Some(row) => Ok(Some(RawNodeRow::read_from(row, 0)?)),
        None => Ok(None),
    }
}

fn base_descendants(
    conn: &Connection,
    wc_id: i64,
    relpath: &RelPath,
) -> Result<Vec<String>, StoreError> {
    let pattern = subtree_like_pattern(relpath);
    let mut stmt = conn.prepare_cached(Stmt::SelectBaseDescendants.sql())?;
    let mut rows = stmt.query(params![wc_id, pattern])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(row.get(0)?);
    }
    Ok(out)
}

fn node_descendants(
    conn: &Connection,
    wc_id: i64,
    relpath: &RelPath,
) -> Result<Vec<String>, StoreError> {
    let pattern = subtree_like_pattern(relpath);
    let mut stmt = conn.prepare_cached(Stmt::SelectNodeDescendants.sql())?;
    let mut rows = stmt.query(params![wc_id, pattern])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(row.get(0)?);
    }
    Ok(out)
}

/// The layer-selection resolver over an open connection.
pub(super) fn effective_info(
    conn: &Connection,
    dav: &DavDecode<'_>,
    wc_id: i64,
    relpath: &RelPath,
) -> Result<NodeInfo, StoreError> {
    if let Some(raw) = top_raw(conn, wc_id, relpath)? {
        let info = raw_into_info(relpath.as_str(), raw, dav)?;
        if info.presence == Presence::BaseDeleted {
            return Err(not_found("node", relpath));
        }
        return Ok(info);
    }
    inherited_info(conn, dav, wc_id, relpath)
}

/// Resolver fallback: walk ancestors to the nearest covering layer and read
/// the copy source through the recorded origin.
fn inherited_info(
    conn: &Connection,
    dav: &DavDecode<'_>,
    wc_id: i64,
    relpath: &RelPath,
) -> Result<NodeInfo, StoreError> {
    let mut ancestor = relpath.parent();
    while let Some(anc) = ancestor {
        let Some(raw) = top_raw(conn, wc_id, &anc)? else {
            ancestor = anc.parent();
            continue;
        };
        // The nearest ancestor with any row decides coverage.
        let info = raw_into_info(anc.as_str(), raw, dav)?;
        if info.op_depth == 0 || info.presence != Presence::Normal {
            return Err(not_found("node", relpath));
        }
        let (Some(repos_id), Some(repos_path), Some(revision)) =
            (info.repos_id, info.repos_path.as_deref(), info.revision)
        else {
            return Err(not_found("node", relpath));
        };
        let suffix = relpath
            .suffix_below(&anc)
            .ok_or(StoreError::ConstraintViolation("ancestor walk left subtree"))?;
        let source_path = join_repos_path(repos_path, suffix);
        let Some(src_raw) = source_raw(conn, wc_id, repos_id, &source_path, revision)? else {
            return Err(not_found("node", relpath));
        };
        let src = raw_into_info(relpath.as_str(), src_raw, dav)?;
        if src.presence != Presence::Normal {
            return Err(not_found("node", relpath));
        }
        return Ok(NodeInfo {
            op_depth: info.op_depth,
            repos_id: Some(repos_id),
            repos_path: Some(source_path),
            revision: Some(revision),
            presence: Presence::Normal,
            kind: src.kind,
            depth: src.depth,
            checksum: src.checksum,
            properties: src.properties,
            changed_revision: src.changed_revision,
            changed_date: src.changed_date,
            changed_author: src.changed_author,
            translated_size: src.translated_size,
            last_mod_time: src.last_mod_time,
            symlink_target: src.symlink_target,
            dav_cache: None,
            moved_here: false,
            moved_to: None,
            file_external: false,
            lock: None,
        });
    }
    Err(not_found("node", relpath))
}

fn insert_minimal_row(
    tx: &Transaction<'_>,
    wc_id: i64,
    relpath: &RelPath,
    op_depth: i64,
    presence: Presence,
    kind: NodeKind,
) -> Result<(), StoreError> {
    let parent = relpath.parent().map(|p| p.as_str().to_string());
    tx.prepare_cached(Stmt::InsertNode.sql())?.execute(params![
        wc_id,
        relpath.as_str(),
        op_depth,
        parent,
        Option::<i64>::None,
        Option::<String>::None,
        Option::<i64>::None,
        presence.as_str(),
        kind.as_str(),
        Option::<String>::None,
        Option::<String>::None,
        Option::<String>::None,
        Option::<i64>::None,
        Option::<i64>::None,
        Option::<String>::None,
        Option::<i64>::None,
        Option::<i64>::None,
        Option::<String>::None,
        Option::<String>::None,
        0i64,
        Option::<String>::None,
        0i64
    ])?;
    Ok(())
}

fn insert_info_row(
    tx: &Transaction<'_>,
    wc_id: i64,
    relpath: &RelPath,
    parent: &RelPath,
    op_depth: i64,
    info: &NodeInfo,
) -> Result<(), StoreError> {
    tx.prepare_cached(Stmt::InsertNode.sql())?.execute(params![
        wc_id,
        relpath.as_str(),
        op_depth,
        parent.as_str(),
        info.repos_id,
        info.repos_path,
        info.revision,
        Presence::Normal.as_str(),
        info.kind.as_str(),
        info.depth.map(AmbientDepth::as_str),
        info.checksum.as_ref().map(Sha1Checksum::as_str),
        props_to_json(info.properties.as_ref()),
        info.changed_revision,
        info.changed_date,
        info.changed_author,
        info.translated_size,
        info.last_mod_time,
        info.symlink_target,
        Option::<String>::None,
        0i64,
        Option::<String>::None,
        0i64
    ])?;
    Ok(())
}

// ---- small shared parsers ----

pub(super) fn not_found(entity: &'static str, relpath: &RelPath) -> StoreError {
    StoreError::NotFound {
        entity,
        path: relpath.as_str().to_string(),
    }
}

pub(super) fn parse_presence(relpath: &str, text: &str) -> Result<Presence, StoreError> {
    Presence::parse(text)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown presence at '{relpath}': {text}")))
}

pub(super) fn parse_props(
    relpath: &str,
    raw: Option<String>,
) -> Result<Option<PropMap>, StoreError> {
    match raw {
        None => Ok(None),
        Some(text) => serde_json::from_str(&text).map(Some).map_err(|err| {
            StoreError::Corrupt(format!("unreadable properties at '{relpath}': {err}"))
        }),
    }
}

pub(super) fn props_to_json(props: Option<&PropMap>) -> Option<String> {
    props.map(|map| serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string()))
}

pub(super) fn parse_stored_relpath(text: &str) -> Result<RelPath, StoreError> {
    RelPath::try_new(text)
        .map_err(|err| StoreError::Corrupt(format!("non-canonical stored relpath: {err}")))
}

fn join_repos_path(base: &str, suffix: &str) -> String {
    if base.is_empty() {
        suffix.to_string()
    } else {
        format!("{base}/{suffix}")
    }
}

fn repos_subtree_pattern(repos_path: &str) -> String {
    let mut out = String::with_capacity(repos_path.len() + 2);
    for ch in repos_path.chars() {
        if matches!(ch, '%' | '_' | '#') {
            out.push('#');
        }
        out.push(ch);
    }
    if out.is_empty() {
        return "_%".to_string();
    }
    out.push_str("/%");
    out
}
