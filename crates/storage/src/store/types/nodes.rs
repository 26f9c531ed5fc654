#![forbid(unsafe_code)]

use wc_core::model::{AmbientDepth, NodeKind, Presence, PropMap, Sha1Checksum};
use wc_core::paths::RelPath;

use super::ReposLockInfo;

/// One resolved row of the layered-node relation.
#[derive(Clone, Debug)]
pub struct NodeInfo {
    pub op_depth: i64,
    pub repos_id: Option<i64>,
    pub repos_path: Option<String>,
    pub revision: Option<i64>,
    pub presence: Presence,
    pub kind: NodeKind,
    pub depth: Option<AmbientDepth>,
    pub checksum: Option<Sha1Checksum>,
    pub properties: Option<PropMap>,
    pub changed_revision: Option<i64>,
    pub changed_date: Option<i64>,
    pub changed_author: Option<String>,
    pub translated_size: Option<i64>,
    pub last_mod_time: Option<i64>,
    pub symlink_target: Option<String>,
    pub dav_cache: Option<serde_json::Value>,
    pub moved_here: bool,
    pub moved_to: Option<RelPath>,
    pub file_external: bool,
    /// Populated only by the lock-joined read.
    pub lock: Option<ReposLockInfo>,
}

/// Server-supplied attributes for a BASE row, as checkout/update deliver
/// them.
#[derive(Clone, Debug)]
pub struct BaseNodePayload {
    pub relpath: RelPath,
    pub repos_id: i64,
    pub repos_path: String,
    pub revision: i64,
    pub presence: Presence,
    pub kind: NodeKind,
    pub depth: Option<AmbientDepth>,
    pub checksum: Option<Sha1Checksum>,
    pub properties: Option<PropMap>,
    pub changed_revision: Option<i64>,
    pub changed_date: Option<i64>,
    pub changed_author: Option<String>,
    pub translated_size: Option<i64>,
    pub last_mod_time: Option<i64>,
    pub symlink_target: Option<String>,
    pub dav_cache: Option<serde_json::Value>,
    pub file_external: bool,
}

impl BaseNodePayload {
    pub fn new(
        relpath: RelPath,
        repos_id: i64,
        repos_path: impl Into<String>,
        revision: i64,
        presence: Presence,
        kind: NodeKind,
    ) -> Self {
        Self {
            relpath,
            repos_id,
            repos_path: repos_path.into(),
            revision,
            presence,
            kind,
            depth: None,
            checksum: None,
            properties: None,
            changed_revision: None,
            changed_date: None,
            changed_author: None,
            translated_size: None,
            last_mod_time: None,
            symlink_target: None,
            dav_cache: None,
            file_external: false,
        }
    }
}

/// Whether a scheduled copy materializes descendant rows up front or leaves
/// them to resolver inheritance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyMaterialization {
    Lazy,
    Eager,
}

/// Answer to "what does the topmost delete at P look like".
#[derive(Clone, Debug)]
pub struct DeletionInfo {
    pub base_presence: Option<Presence>,
    pub work_op_depth: i64,
    pub moved_to: Option<RelPath>,
}
