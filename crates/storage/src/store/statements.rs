#![forbid(unsafe_code)]
//! The fixed statement catalog.
//!
//! Every query and mutation the store issues lives here under a stable name,
//! with positional bindings. Execution goes through the connection's
//! prepared-statement cache, so the enum doubles as the cache key. Subtree
//! matches use LIKE with escape character '#' and a trailing '/%'.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stmt {
    // -- node reads
    SelectNodeInfo,
    SelectNodeInfoWithLock,
    SelectBaseNode,
    SelectWorkingNode,
    SelectNodeByReposLocation,
    SelectBaseNodeChildren,
    SelectWorkingNodeChildren,
    SelectNodeChildren,
    SelectBaseDescendants,
    SelectNodeDescendants,
    SelectNodeProps,
    SelectBaseProps,
    SelectWorkingProps,
    SelectDeletionInfo,
    // -- node writes
    InsertNode,
    ApplyChangesToBaseNode,
    UpdateNodeBasePresence,
    UpdateNodeBaseExcluded,
    UpdateNodeWorkingExcluded,
    InsertWorkingNodeCopyFromBase,
    InsertWorkingNodeCopyFromWorking,
    InsertDeleteNodesRecursive,
    DeleteBaseNode,
    DeleteWorkingNode,
    DeleteWorkingNodes,
    DeleteAllNodes,
    DeleteWorkingNodesRecursive,
    DeleteWorkingNodesAtDepthRecursive,
    UpdateCopyfrom,
    UpdateOpDepth,
    UpdateMovedTo,
    ClearDavCacheRecursive,
    RecursiveUpdateNodeRepo,
    // -- actual overlay
    SelectActualNode,
    SelectActualProps,
    InsertActualTextConflict,
    InsertActualPropsConflict,
    UpdateActualProps,
    UpdateActualChangelist,
    ClearTextConflict,
    ClearPropsConflict,
    DeleteActualEmpty,
    DeleteActualNodeRecursive,
    SelectActualConflictVictims,
    // -- typed tree conflicts
    SelectConflictDetails,
    InsertNewConflict,
    DeleteConflictVictim,
    DeleteConflictVictimsRecursive,
    SelectOldTreeConflict,
    EraseOldConflicts,
    PlanPropUpgrade,
    // -- pristine index
    InsertPristine,
    SelectPristine,
    SelectPristineByMd5,
    UpdatePristineRefcount,
    SelectUnreferencedPristines,
    SelectAnyPristineReference,
    DeletePristine,
    // -- lock registry
    InsertLock,
    SelectLock,
    DeleteLock,
    UpdateLockReposId,
    InsertWcLock,
    SelectWcLock,
    FindWcLock,
    DeleteWcLock,
    // -- work queue
    LookForWork,
    InsertWorkItem,
    SelectWorkItem,
    DeleteWorkItem,
    // -- integrity checks
    SelectNodeParentage,
    SelectEmptyActualNodes,
    SelectReferencedPristines,
    // -- repository / wcroot
    InsertRepository,
    SelectRepositoryByRoot,
    InsertWcRoot,
    SelectWcRoot,
}

impl Stmt {
    pub const fn name(self) -> &'static str {
        match self {
            Self::SelectNodeInfo => "SELECT_NODE_INFO",
            Self::SelectNodeInfoWithLock => "SELECT_NODE_INFO_WITH_LOCK",
            Self::SelectBaseNode => "SELECT_BASE_NODE",
            Self::SelectWorkingNode => "SELECT_WORKING_NODE",
            Self::SelectNodeByReposLocation => "SELECT_NODE_BY_REPOS_LOCATION",
            Self::SelectBaseNodeChildren => "SELECT_BASE_NODE_CHILDREN",
            Self::SelectWorkingNodeChildren => "SELECT_WORKING_NODE_CHILDREN",
            Self::SelectNodeChildren => "SELECT_NODE_CHILDREN",
            Self::SelectBaseDescendants => "SELECT_BASE_DESCENDANTS",
            Self::SelectNodeDescendants => "SELECT_NODE_DESCENDANTS",
            Self::SelectNodeProps => "SELECT_NODE_PROPS",
            Self::SelectBaseProps => "SELECT_BASE_PROPS",
            Self::SelectWorkingProps => "SELECT_WORKING_PROPS",
            Self::SelectDeletionInfo => "SELECT_DELETION_INFO",
            Self::InsertNode => "INSERT_NODE",
            Self::ApplyChangesToBaseNode => "APPLY_CHANGES_TO_BASE_NODE",
            Self::UpdateNodeBasePresence => "UPDATE_NODE_BASE_PRESENCE",
            Self::UpdateNodeBaseExcluded => "UPDATE_NODE_BASE_EXCLUDED",
            Self::UpdateNodeWorkingExcluded => "UPDATE_NODE_WORKING_EXCLUDED",
            Self::InsertWorkingNodeCopyFromBase => "INSERT_WORKING_NODE_COPY_FROM_BASE",
            Self::InsertWorkingNodeCopyFromWorking => "INSERT_WORKING_NODE_COPY_FROM_WORKING",
            Self::InsertDeleteNodesRecursive => "INSERT_DELETE_NODES_RECURSIVE",
            Self::DeleteBaseNode => "DELETE_BASE_NODE",
            Self::DeleteWorkingNode => "DELETE_WORKING_NODE",
            Self::DeleteWorkingNodes => "DELETE_WORKING_NODES",
            Self::DeleteAllNodes => "DELETE_ALL_NODES",
            Self::DeleteWorkingNodesRecursive => "DELETE_WORKING_NODES_RECURSIVE",
            Self::DeleteWorkingNodesAtDepthRecursive => "DELETE_WORKING_NODES_AT_DEPTH_RECURSIVE",
            Self::UpdateCopyfrom => "UPDATE_COPYFROM",
            Self::UpdateOpDepth => "UPDATE_OP_DEPTH",
            Self::UpdateMovedTo => "UPDATE_MOVED_TO",
            Self::ClearDavCacheRecursive => "CLEAR_DAV_CACHE_RECURSIVE",
            Self::RecursiveUpdateNodeRepo => "RECURSIVE_UPDATE_NODE_REPO",
            Self::SelectActualNode => "SELECT_ACTUAL_NODE",
            Self::SelectActualProps => "SELECT_ACTUAL_PROPS",
            Self::InsertActualTextConflict => "INSERT_ACTUAL_TEXT_CONFLICT",
            Self::InsertActualPropsConflict => "INSERT_ACTUAL_PROPS_CONFLICT",
            Self::UpdateActualProps => "UPDATE_ACTUAL_PROPS",
            Self::UpdateActualChangelist => "UPDATE_ACTUAL_CHANGELIST",
            Self::ClearTextConflict => "CLEAR_TEXT_CONFLICT",
            Self::ClearPropsConflict => "CLEAR_PROPS_CONFLICT",
            Self::DeleteActualEmpty => "DELETE_ACTUAL_EMPTY",
            Self::DeleteActualNodeRecursive => "DELETE_ACTUAL_NODE_RECURSIVE",
            Self::SelectActualConflictVictims => "SELECT_ACTUAL_CONFLICT_VICTIMS",
            Self::SelectConflictDetails => "SELECT_CONFLICT_DETAILS",
            Self::InsertNewConflict => "INSERT_NEW_CONFLICT",
            Self::DeleteConflictVictim => "DELETE_CONFLICT_VICTIM",
            Self::DeleteConflictVictimsRecursive => "DELETE_CONFLICT_VICTIMS_RECURSIVE",
            Self::SelectOldTreeConflict => "SELECT_OLD_TREE_CONFLICT",
            Self::EraseOldConflicts => "ERASE_OLD_CONFLICTS",
            Self::PlanPropUpgrade => "PLAN_PROP_UPGRADE",
            Self::InsertPristine => "INSERT_PRISTINE",
            Self::SelectPristine => "SELECT_PRISTINE",
            Self::SelectPristineByMd5 => "SELECT_PRISTINE_BY_MD5",
            Self::UpdatePristineRefcount => "UPDATE_PRISTINE_REFCOUNT",
            Self::SelectUnreferencedPristines => "SELECT_UNREFERENCED_PRISTINES",
            Self::SelectAnyPristineReference => "SELECT_ANY_PRISTINE_REFERENCE",
            Self::DeletePristine => "DELETE_PRISTINE",
            Self::InsertLock => "INSERT_LOCK",
            Self::SelectLock => "SELECT_LOCK",
            Self::DeleteLock => "DELETE_LOCK",
            Self::UpdateLockReposId => "UPDATE_LOCK_REPOS_ID",
            Self::InsertWcLock => "INSERT_WC_LOCK",
            Self::SelectWcLock => "SELECT_WC_LOCK",
            Self::FindWcLock => "FIND_WC_LOCK",
            Self::DeleteWcLock => "DELETE_WC_LOCK",
            Self::LookForWork => "LOOK_FOR_WORK",
            Self::InsertWorkItem => "INSERT_WORK_ITEM",
            Self::SelectWorkItem => "SELECT_WORK_ITEM",
            Self::DeleteWorkItem => "DELETE_WORK_ITEM",
            Self::SelectNodeParentage => "SELECT_NODE_PARENTAGE",
            Self::SelectEmptyActualNodes => "SELECT_EMPTY_ACTUAL_NODES",
            Self::SelectReferencedPristines => "SELECT_REFERENCED_PRISTINES",
            Self::InsertRepository => "INSERT_REPOSITORY",
            Self::SelectRepositoryByRoot => "SELECT_REPOSITORY_BY_ROOT",
            Self::InsertWcRoot => "INSERT_WCROOT",
            Self::SelectWcRoot => "SELECT_WCROOT",
        }
    }

    pub const fn sql(self) -> &'static str {
        match self {
            // Readers index the shared node column list as 0..=18; the lock
            // join appends lock_token..lock_date as 19..=22.
            Self::SelectNodeInfo => {
                "SELECT op_depth, repos_id, repos_path, revision, presence, kind, depth, checksum, \
                 properties, changed_revision, changed_date, changed_author, translated_size, \
                 last_mod_time, symlink_target, dav_cache, moved_here, moved_to, file_external \
                 FROM nodes WHERE wc_id = ?1 AND local_relpath = ?2 \
                 ORDER BY op_depth DESC"
            }
            Self::SelectNodeInfoWithLock => {
                "SELECT op_depth, repos_id, repos_path, revision, presence, kind, depth, checksum, \
                 properties, changed_revision, changed_date, changed_author, translated_size, \
                 last_mod_time, symlink_target, dav_cache, moved_here, moved_to, file_external, \
                 lock.lock_token, lock.lock_owner, lock.lock_comment, lock.lock_date \
                 FROM nodes \
                 LEFT OUTER JOIN lock ON nodes.repos_id = lock.repo_id \
                   AND nodes.repos_path = lock.repos_relpath \
                 WHERE wc_id = ?1 AND local_relpath = ?2 \
                 ORDER BY op_depth DESC"
            }
            Self::SelectBaseNode => {
                "SELECT op_depth, repos_id, repos_path, revision, presence, kind, depth, checksum, \
                 properties, changed_revision, changed_date, changed_author, translated_size, \
                 last_mod_time, symlink_target, dav_cache, moved_here, moved_to, file_external \
                 FROM nodes WHERE wc_id = ?1 AND local_relpath = ?2 AND op_depth = 0"
            }
            Self::SelectWorkingNode => {
                "SELECT op_depth, repos_id, repos_path, revision, presence, kind, depth, checksum, \
                 properties, changed_revision, changed_date, changed_author, translated_size, \
                 last_mod_time, symlink_target, dav_cache, moved_here, moved_to, file_external \
                 FROM nodes WHERE wc_id = ?1 AND local_relpath = ?2 AND op_depth > 0 \
                 ORDER BY op_depth DESC"
            }
            Self::SelectNodeByReposLocation => {
                "SELECT op_depth, repos_id, repos_path, revision, presence, kind, depth, checksum, \
                 properties, changed_revision, changed_date, changed_author, translated_size, \
                 last_mod_time, symlink_target, dav_cache, moved_here, moved_to, file_external \
                 FROM nodes \
                 WHERE wc_id = ?1 AND repos_id = ?2 AND repos_path = ?3 AND revision = ?4 \
                 ORDER BY op_depth ASC"
            }
            Self::SelectBaseNodeChildren => {
                "SELECT local_relpath, op_depth, repos_id, repos_path, revision, presence, kind, depth, checksum, \
                 properties, changed_revision, changed_date, changed_author, translated_size, \
                 last_mod_time, symlink_target, dav_cache, moved_here, moved_to, file_external \
                 FROM nodes WHERE wc_id = ?1 AND parent_relpath = ?2 AND op_depth = 0 \
                 ORDER BY local_relpath"
            }
            Self::SelectWorkingNodeChildren => {
                "SELECT DISTINCT local_relpath FROM nodes \
                 WHERE wc_id = ?1 AND parent_relpath = ?2 AND op_depth > 0 \
                 ORDER BY local_relpath"
            }
            Self::SelectNodeChildren => {
                "SELECT local_relpath, MAX(op_depth) FROM nodes \
                 WHERE wc_id = ?1 AND parent_relpath = ?2 \
                 GROUP BY local_relpath ORDER BY local_relpath"
            }
            Self::SelectBaseDescendants => {
                "SELECT local_relpath FROM nodes \
                 WHERE wc_id = ?1 AND op_depth = 0 AND local_relpath LIKE ?2 ESCAPE '#' \
                 ORDER BY local_relpath"
            }
            Self::SelectNodeDescendants => {
                "SELECT DISTINCT local_relpath FROM nodes \
                 WHERE wc_id = ?1 AND local_relpath LIKE ?2 ESCAPE '#' \
                 ORDER BY local_relpath"
            }
            Self::SelectNodeProps => {
                "SELECT properties FROM nodes WHERE wc_id = ?1 AND local_relpath = ?2 \
                 ORDER BY op_depth DESC"
            }
            Self::SelectBaseProps => {
                "SELECT properties FROM nodes \
                 WHERE wc_id = ?1 AND local_relpath = ?2 AND op_depth = 0"
            }
            Self::SelectWorkingProps => {
                "SELECT properties FROM nodes \
                 WHERE wc_id = ?1 AND local_relpath = ?2 AND op_depth > 0 \
                 ORDER BY op_depth DESC"
            }
            Self::SelectDeletionInfo => {
                "SELECT b.presence, w.op_depth, w.moved_to \
                 FROM nodes w \
                 LEFT OUTER JOIN nodes b ON b.wc_id = w.wc_id \
                   AND b.local_relpath = w.local_relpath AND b.op_depth = 0 \
                 WHERE w.wc_id = ?1 AND w.local_relpath = ?2 AND w.op_depth > 0 \
                   AND w.presence = 'base-deleted' \
                 ORDER BY w.op_depth DESC"
            }
            Self::InsertNode => {
                "INSERT OR REPLACE INTO nodes ( \
                   wc_id, local_relpath, op_depth, parent_relpath, repos_id, repos_path, \
                   revision, presence, kind, depth, checksum, properties, changed_revision, \
                   changed_date, changed_author, translated_size, last_mod_time, \
                   symlink_target, dav_cache, moved_here, moved_to, file_external) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, \
                   ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)"
            }
            Self::ApplyChangesToBaseNode => {
                "INSERT OR REPLACE INTO nodes ( \
                   wc_id, local_relpath, op_depth, parent_relpath, repos_id, repos_path, \
                   revision, presence, kind, depth, checksum, properties, changed_revision, \
                   changed_date, changed_author, translated_size, last_mod_time, \
                   symlink_target, dav_cache, file_external) \
                 VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, \
                   ?15, ?16, ?17, ?18, ?19)"
            }
            Self::UpdateNodeBasePresence => {
                "UPDATE nodes SET presence = ?3 \
                 WHERE wc_id = ?1 AND local_relpath = ?2 AND op_depth = 0"
            }
            Self::UpdateNodeBaseExcluded => {
                "UPDATE nodes SET presence = 'excluded', depth = NULL \
                 WHERE wc_id = ?1 AND local_relpath = ?2 AND op_depth = 0"
            }
            // The subquery keeps op_depth > 0 so a working-layer exclude can
            // never touch the BASE row.
            Self::UpdateNodeWorkingExcluded => {
                "UPDATE nodes SET presence = 'excluded', depth = NULL \
                 WHERE wc_id = ?1 AND local_relpath = ?2 \
                   AND op_depth = (SELECT MAX(op_depth) FROM nodes \
                                   WHERE wc_id = ?1 AND local_relpath = ?2 AND op_depth > 0)"
            }
            Self::InsertWorkingNodeCopyFromBase => {
                "INSERT OR REPLACE INTO nodes ( \
                   wc_id, local_relpath, op_depth, parent_relpath, repos_id, repos_path, \
                   revision, presence, kind, depth, checksum, properties, changed_revision, \
                   changed_date, changed_author, translated_size, last_mod_time, \
                   symlink_target, moved_here) \
                 SELECT wc_id, ?3, ?4, ?5, repos_id, repos_path, revision, ?6, kind, depth, \
                   checksum, properties, changed_revision, changed_date, changed_author, \
                   translated_size, last_mod_time, symlink_target, ?7 \
                 FROM nodes WHERE wc_id = ?1 AND local_relpath = ?2 AND op_depth = 0"
            }
            Self::InsertWorkingNodeCopyFromWorking => {
                "INSERT OR REPLACE INTO nodes ( \
                   wc_id, local_relpath, op_depth, parent_relpath, repos_id, repos_path, \
                   revision, presence, kind, depth, checksum, properties, changed_revision, \
                   changed_date, changed_author, translated_size, last_mod_time, \
                   symlink_target, moved_here) \
                 SELECT wc_id, ?3, ?4, ?5, repos_id, repos_path, revision, ?6, kind, depth, \
                   checksum, properties, changed_revision, changed_date, changed_author, \
                   translated_size, last_mod_time, symlink_target, ?7 \
                 FROM nodes WHERE wc_id = ?1 AND local_relpath = ?2 \
                   AND op_depth = (SELECT MAX(op_depth) FROM nodes \
                                   WHERE wc_id = ?1 AND local_relpath = ?2 AND op_depth > 0)"
            }
            // Shadows every effective row in the subtree with a base-deleted
            // row at the new operation depth ?4.
            Self::InsertDeleteNodesRecursive => {
                "INSERT OR REPLACE INTO nodes ( \
                   wc_id, local_relpath, op_depth, parent_relpath, presence, kind) \
                 SELECT n.wc_id, n.local_relpath, ?4, n.parent_relpath, 'base-deleted', n.kind \
                 FROM nodes n \
                 WHERE n.wc_id = ?1 \
                   AND (n.local_relpath = ?2 OR n.local_relpath LIKE ?3 ESCAPE '#') \
                   AND n.op_depth = (SELECT MAX(m.op_depth) FROM nodes m \
                                     WHERE m.wc_id = n.wc_id \
                                       AND m.local_relpath = n.local_relpath) \
                   AND n.op_depth < ?4 AND n.presence = 'normal'"
            }
            Self::DeleteBaseNode => {
                "DELETE FROM nodes WHERE wc_id = ?1 AND local_relpath = ?2 AND op_depth = 0"
            }
            Self::DeleteWorkingNode => {
                "DELETE FROM nodes WHERE wc_id = ?1 AND local_relpath = ?2 AND op_depth = ?3"
            }
            Self::DeleteWorkingNodes => {
                "DELETE FROM nodes WHERE wc_id = ?1 AND local_relpath = ?2 AND op_depth > 0"
            }
            Self::DeleteAllNodes => {
                "DELETE FROM nodes WHERE wc_id = ?1 AND local_relpath = ?2"
            }
            // Descendants only; the layer root's own rows go through
            // DELETE_WORKING_NODES.
            Self::DeleteWorkingNodesRecursive => {
                "DELETE FROM nodes \
                 WHERE wc_id = ?1 AND local_relpath LIKE ?2 ESCAPE '#' AND op_depth > 0"
            }
            Self::DeleteWorkingNodesAtDepthRecursive => {
                "DELETE FROM nodes \
                 WHERE wc_id = ?1 \
                   AND (local_relpath = ?2 OR local_relpath LIKE ?3 ESCAPE '#') \
                   AND op_depth = ?4"
            }
            // Only the topmost working layer is retargeted; shadowed layers
            // keep their recorded origin.
            Self::UpdateCopyfrom => {
                "UPDATE nodes SET repos_id = ?3, repos_path = ?4, revision = ?5 \
                 WHERE wc_id = ?1 AND local_relpath = ?2 \
                   AND op_depth = (SELECT MAX(op_depth) FROM nodes \
                                   WHERE wc_id = ?1 AND local_relpath = ?2 AND op_depth > 0)"
            }
            Self::UpdateOpDepth => {
                "UPDATE nodes SET op_depth = ?5 \
                 WHERE wc_id = ?1 \
                   AND (local_relpath = ?2 OR local_relpath LIKE ?3 ESCAPE '#') \
                   AND op_depth = ?4"
            }
            Self::UpdateMovedTo => {
                "UPDATE nodes SET moved_to = ?4 \
                 WHERE wc_id = ?1 AND local_relpath = ?2 AND op_depth = ?3"
            }
            Self::ClearDavCacheRecursive => {
                "UPDATE nodes SET dav_cache = NULL \
                 WHERE wc_id = ?1 AND op_depth = 0 AND dav_cache IS NOT NULL \
                   AND (local_relpath = ?2 OR local_relpath LIKE ?3 ESCAPE '#')"
            }
            Self::RecursiveUpdateNodeRepo => {
                "UPDATE nodes SET repos_id = ?5, dav_cache = NULL \
                 WHERE wc_id = ?1 AND op_depth = 0 AND repos_id = ?4 \
                   AND (local_relpath = ?2 OR local_relpath LIKE ?3 ESCAPE '#')"
            }
            Self::SelectActualNode => {
                "SELECT properties, changelist, conflict_old, conflict_new, conflict_working, \
                   prop_reject, older_checksum, left_checksum, right_checksum, \
                   tree_conflict_data \
                 FROM actual_node WHERE wc_id = ?1 AND local_relpath = ?2"
            }
            Self::SelectActualProps => {
                "SELECT properties FROM actual_node WHERE wc_id = ?1 AND local_relpath = ?2"
            }
            Self::InsertActualTextConflict => {
                "INSERT INTO actual_node (wc_id, local_relpath, parent_relpath, \
                   conflict_old, conflict_new, conflict_working, \
                   older_checksum, left_checksum, right_checksum) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
                 ON CONFLICT (wc_id, local_relpath) DO UPDATE SET \
                   conflict_old = excluded.conflict_old, \
                   conflict_new = excluded.conflict_new, \
                   conflict_working = excluded.conflict_working, \
                   older_checksum = excluded.older_checksum, \
                   left_checksum = excluded.left_checksum, \
                   right_checksum = excluded.right_checksum"
            }
            Self::InsertActualPropsConflict => {
                "INSERT INTO actual_node (wc_id, local_relpath, parent_relpath, prop_reject) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT (wc_id, local_relpath) DO UPDATE SET \
                   prop_reject = excluded.prop_reject"
            }
            Self::UpdateActualProps => {
                "INSERT INTO actual_node (wc_id, local_relpath, parent_relpath, properties) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT (wc_id, local_relpath) DO UPDATE SET \
                   properties = excluded.properties"
            }
            Self::UpdateActualChangelist => {
                "INSERT INTO actual_node (wc_id, local_relpath, parent_relpath, changelist) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT (wc_id, local_relpath) DO UPDATE SET \
                   changelist = excluded.changelist"
            }
            Self::ClearTextConflict => {
                "UPDATE actual_node SET conflict_old = NULL, conflict_new = NULL, \
                   conflict_working = NULL, older_checksum = NULL, left_checksum = NULL, \
                   right_checksum = NULL \
                 WHERE wc_id = ?1 AND local_relpath = ?2"
            }
            Self::ClearPropsConflict => {
                "UPDATE actual_node SET prop_reject = NULL \
                 WHERE wc_id = ?1 AND local_relpath = ?2"
            }
            Self::DeleteActualEmpty => {
                "DELETE FROM actual_node \
                 WHERE wc_id = ?1 AND local_relpath = ?2 \
                   AND properties IS NULL AND changelist IS NULL \
                   AND conflict_old IS NULL AND conflict_new IS NULL \
                   AND conflict_working IS NULL AND prop_reject IS NULL \
                   AND older_checksum IS NULL AND left_checksum IS NULL \
                   AND right_checksum IS NULL AND tree_conflict_data IS NULL"
            }
            Self::DeleteActualNodeRecursive => {
                "DELETE FROM actual_node \
                 WHERE wc_id = ?1 \
                   AND (local_relpath = ?2 OR local_relpath LIKE ?3 ESCAPE '#')"
            }
            Self::SelectActualConflictVictims => {
                "SELECT local_relpath FROM actual_node \
                 WHERE wc_id = ?1 AND parent_relpath = ?2 \
                   AND (conflict_old IS NOT NULL OR conflict_new IS NOT NULL \
                        OR conflict_working IS NOT NULL OR prop_reject IS NOT NULL \
                        OR tree_conflict_data IS NOT NULL) \
                   AND (?3 IS NULL OR changelist = ?3) \
                 UNION \
                 SELECT cv.local_relpath FROM conflict_victim cv \
                 WHERE cv.wc_id = ?1 AND cv.parent_relpath = ?2 \
                   AND (?3 IS NULL OR EXISTS ( \
                        SELECT 1 FROM actual_node a \
                        WHERE a.wc_id = cv.wc_id AND a.local_relpath = cv.local_relpath \
                          AND a.changelist = ?3)) \
                 ORDER BY local_relpath"
            }
            Self::SelectConflictDetails => {
                "SELECT operation, action, reason, node_kind, \
                   left_repos_relpath, left_revision, left_kind, \
                   right_repos_relpath, right_revision, right_kind \
                 FROM conflict_victim WHERE wc_id = ?1 AND local_relpath = ?2"
            }
            Self::InsertNewConflict => {
                "INSERT OR REPLACE INTO conflict_victim ( \
                   wc_id, local_relpath, parent_relpath, operation, action, reason, \
                   node_kind, left_repos_relpath, left_revision, left_kind, \
                   right_repos_relpath, right_revision, right_kind) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            }
            Self::DeleteConflictVictim => {
                "DELETE FROM conflict_victim WHERE wc_id = ?1 AND local_relpath = ?2"
            }
            Self::DeleteConflictVictimsRecursive => {
                "DELETE FROM conflict_victim \
                 WHERE wc_id = ?1 \
                   AND (local_relpath = ?2 OR local_relpath LIKE ?3 ESCAPE '#')"
            }
            Self::SelectOldTreeConflict => {
                "SELECT wc_id, local_relpath, parent_relpath, tree_conflict_data \
                 FROM actual_node WHERE tree_conflict_data IS NOT NULL \
                 ORDER BY wc_id, local_relpath"
            }
            Self::EraseOldConflicts => {
                "UPDATE actual_node SET tree_conflict_data = NULL \
                 WHERE tree_conflict_data IS NOT NULL"
            }
            Self::PlanPropUpgrade => {
                "SELECT wc_id, local_relpath FROM actual_node \
                 WHERE tree_conflict_data IS NOT NULL \
                 ORDER BY wc_id, local_relpath LIMIT ?1"
            }
            Self::InsertPristine => {
                "INSERT INTO pristine (checksum, md5_checksum, size, refcount) \
                 VALUES (?1, ?2, ?3, 1) \
                 ON CONFLICT (checksum) DO UPDATE SET refcount = refcount + 1"
            }
            Self::SelectPristine => {
                "SELECT md5_checksum, size, refcount FROM pristine WHERE checksum = ?1"
            }
            Self::SelectPristineByMd5 => {
                "SELECT checksum FROM pristine WHERE md5_checksum = ?1"
            }
            Self::UpdatePristineRefcount => {
                "UPDATE pristine SET refcount = refcount - 1 \
                 WHERE checksum = ?1 AND refcount > 0"
            }
            Self::SelectUnreferencedPristines => {
                "SELECT checksum FROM pristine WHERE refcount = 0 ORDER BY checksum"
            }
            // Refcount is advisory; this union is the authoritative check.
            Self::SelectAnyPristineReference => {
                "SELECT 1 FROM nodes WHERE checksum = ?1 \
                 UNION ALL \
                 SELECT 1 FROM actual_node \
                 WHERE older_checksum = ?1 OR left_checksum = ?1 OR right_checksum = ?1 \
                 LIMIT 1"
            }
            Self::DeletePristine => {
                "DELETE FROM pristine WHERE checksum = ?1 AND refcount = 0"
            }
            Self::InsertLock => {
                "INSERT INTO lock (repo_id, repos_relpath, lock_token, lock_owner, \
                   lock_comment, lock_date) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT (repo_id, repos_relpath) DO UPDATE SET \
                   lock_token = excluded.lock_token, lock_owner = excluded.lock_owner, \
                   lock_comment = excluded.lock_comment, lock_date = excluded.lock_date"
            }
            Self::SelectLock => {
                "SELECT lock_token, lock_owner, lock_comment, lock_date \
                 FROM lock WHERE repo_id = ?1 AND repos_relpath = ?2"
            }
            Self::DeleteLock => {
                "DELETE FROM lock WHERE repo_id = ?1 AND repos_relpath = ?2"
            }
            Self::UpdateLockReposId => {
                "UPDATE lock SET repo_id = ?2 \
                 WHERE repo_id = ?1 \
                   AND (repos_relpath = ?3 OR repos_relpath LIKE ?4 ESCAPE '#')"
            }
            Self::InsertWcLock => {
                "INSERT INTO wc_lock (wc_id, local_dir_relpath, locked_levels) \
                 VALUES (?1, ?2, ?3)"
            }
            Self::SelectWcLock => {
                "SELECT locked_levels FROM wc_lock \
                 WHERE wc_id = ?1 AND local_dir_relpath = ?2"
            }
            Self::FindWcLock => {
                "SELECT local_dir_relpath, locked_levels FROM wc_lock WHERE wc_id = ?1"
            }
            Self::DeleteWcLock => {
                "DELETE FROM wc_lock WHERE wc_id = ?1 AND local_dir_relpath = ?2"
            }
            Self::LookForWork => "SELECT id FROM work_queue LIMIT 1",
            Self::InsertWorkItem => "INSERT INTO work_queue (work) VALUES (?1)",
            Self::SelectWorkItem => "SELECT id, work FROM work_queue ORDER BY id LIMIT 1",
            Self::DeleteWorkItem => "DELETE FROM work_queue WHERE id = ?1",
            Self::SelectNodeParentage => {
                "SELECT local_relpath, op_depth, parent_relpath FROM nodes \
                 WHERE wc_id = ?1 ORDER BY local_relpath, op_depth"
            }
            Self::SelectEmptyActualNodes => {
                "SELECT local_relpath FROM actual_node \
                 WHERE wc_id = ?1 \
                   AND properties IS NULL AND changelist IS NULL \
                   AND conflict_old IS NULL AND conflict_new IS NULL \
                   AND conflict_working IS NULL AND prop_reject IS NULL \
                   AND older_checksum IS NULL AND left_checksum IS NULL \
                   AND right_checksum IS NULL AND tree_conflict_data IS NULL \
                 ORDER BY local_relpath"
            }
            Self::SelectReferencedPristines => {
                "SELECT checksum FROM pristine WHERE refcount > 0 ORDER BY checksum"
            }
            Self::InsertRepository => "INSERT INTO repository (root, uuid) VALUES (?1, ?2)",
            Self::SelectRepositoryByRoot => {
                "SELECT id, uuid FROM repository WHERE root = ?1"
            }
            Self::InsertWcRoot => "INSERT INTO wcroot (local_abspath) VALUES (?1)",
            Self::SelectWcRoot => {
                "SELECT id, local_abspath FROM wcroot ORDER BY id LIMIT 1"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Stmt;

    const ALL: &[Stmt] = &[
        Stmt::SelectNodeInfo,
        Stmt::SelectNodeInfoWithLock,
        Stmt::SelectBaseNode,
        Stmt::SelectWorkingNode,
        Stmt::SelectNodeByReposLocation,
        Stmt::SelectBaseNodeChildren,
        Stmt::SelectWorkingNodeChildren,
        Stmt::SelectNodeChildren,
        Stmt::SelectBaseDescendants,
        Stmt::SelectNodeDescendants,
        Stmt::SelectNodeProps,
        Stmt::SelectBaseProps,
        Stmt::SelectWorkingProps,
        Stmt::SelectDeletionInfo,
        Stmt::InsertNode,
        Stmt::ApplyChangesToBaseNode,
        Stmt::UpdateNodeBasePresence,
        Stmt::UpdateNodeBaseExcluded,
        Stmt::UpdateNodeWorkingExcluded,
        Stmt::InsertWorkingNodeCopyFromBase,
        Stmt::InsertWorkingNodeCopyFromWorking,
        Stmt::InsertDeleteNodesRecursive,
        Stmt::DeleteBaseNode,
        Stmt::DeleteWorkingNode,
        Stmt::DeleteWorkingNodes,
        Stmt::DeleteAllNodes,
        Stmt::DeleteWorkingNodesRecursive,
        Stmt::DeleteWorkingNodesAtDepthRecursive,
        Stmt::UpdateCopyfrom,
        Stmt::UpdateOpDepth,
        Stmt::UpdateMovedTo,
        Stmt::ClearDavCacheRecursive,
        Stmt::RecursiveUpdateNodeRepo,
        Stmt::SelectActualNode,
        Stmt::SelectActualProps,
        Stmt::InsertActualTextConflict,
        Stmt::InsertActualPropsConflict,
        Stmt::UpdateActualProps,
        Stmt::UpdateActualChangelist,
        Stmt::ClearTextConflict,
        Stmt::ClearPropsConflict,
        Stmt::DeleteActualEmpty,
        Stmt::DeleteActualNodeRecursive,
        Stmt::SelectActualConflictVictims,
        Stmt::SelectConflictDetails,
        Stmt::InsertNewConflict,
        Stmt::DeleteConflictVictim,
        Stmt::DeleteConflictVictimsRecursive,
        Stmt::SelectOldTreeConflict,
        Stmt::EraseOldConflicts,
        Stmt::PlanPropUpgrade,
        Stmt::InsertPristine,
        Stmt::SelectPristine,
        Stmt::SelectPristineByMd5,
        Stmt::UpdatePristineRefcount,
        Stmt::SelectUnreferencedPristines,
        Stmt::SelectAnyPristineReference,
        Stmt::DeletePristine,
        Stmt::InsertLock,
        Stmt::SelectLock,
        Stmt::DeleteLock,
        Stmt::UpdateLockReposId,
        Stmt::InsertWcLock,
        Stmt::SelectWcLock,
        Stmt::FindWcLock,
        Stmt::DeleteWcLock,
        Stmt::LookForWork,
        Stmt::InsertWorkItem,
        Stmt::SelectWorkItem,
        Stmt::DeleteWorkItem,
        Stmt::SelectNodeParentage,
        Stmt::SelectEmptyActualNodes,
        Stmt::SelectReferencedPristines,
        Stmt::InsertRepository,
        Stmt::SelectRepositoryByRoot,
        Stmt::InsertWcRoot,
        Stmt::SelectWcRoot,
    ];

    #[test]
    fn names_are_stable_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for stmt in ALL {
            let name = stmt.name();
            assert!(!name.is_empty());
            assert!(
                name.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'),
                "{name} is not an UPPER_SNAKE name"
            );
            assert!(seen.insert(name), "duplicate statement name {name}");
        }
    }

    #[test]
    fn bindings_are_positional_from_one()  {
        for stmt in ALL {
            let sql = stmt.sql();
            assert!(!sql.is_empty(), "{} has empty sql", stmt.name());
            assert!(!sql.contains("?0"), "{} binds from ?1", stmt.name());
        }
    }

    #[test]
    fn every_statement_prepares_against_a_fresh_schema() {
        let mut conn = rusqlite::Connection::open_in_memory().expect("open in-memory db");
        crate::store::support::create_or_upgrade(&mut conn).expect("create schema");
        for stmt in ALL {
            conn.prepare(stmt.sql())
                .unwrap_or_else(|err| panic!("{} does not prepare: {err}", stmt.name()));
        }
    }
}
