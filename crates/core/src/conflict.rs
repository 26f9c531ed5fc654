#![forbid(unsafe_code)]
//! Typed tree-conflict descriptors.
//!
//! The store persists these as discrete columns; the JSON form below is the
//! legacy opaque blob shape that pre-typed metadata files carried and that
//! the upgrade path still has to parse.

use serde::{Deserialize, Serialize};

use crate::model::NodeKind;

/// The operation that raised the conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictOperation {
    Update,
    Switch,
    Merge,
}

impl ConflictOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Switch => "switch",
            Self::Merge => "merge",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "update" => Some(Self::Update),
            "switch" => Some(Self::Switch),
            "merge" => Some(Self::Merge),
            _ => None,
        }
    }
}

/// What the incoming change tried to do to the victim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictAction {
    Edit,
    Add,
    Delete,
    Replace,
}

impl ConflictAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Add => "add",
            Self::Delete => "delete",
            Self::Replace => "replace",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "edit" => Some(Self::Edit),
            "add" => Some(Self::Add),
            "delete" => Some(Self::Delete),
            "replace" => Some(Self::Replace),
            _ => None,
        }
    }
}

/// Why the local side could not accept the incoming change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictReason {
    Edited,
    Obstructed,
    Deleted,
    Missing,
    Unversioned,
    Added,
    Replaced,
    MovedAway,
    MovedHere,
}

impl ConflictReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Edited => "edited",
            Self::Obstructed => "obstructed",
            Self::Deleted => "deleted",
            Self::Missing => "missing",
            Self::Unversioned => "unversioned",
            Self::Added => "added",
            Self::Replaced => "replaced",
            Self::MovedAway => "moved-away",
            Self::MovedHere => "moved-here",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "edited" => Some(Self::Edited),
            "obstructed" => Some(Self::Obstructed),
            "deleted" => Some(Self::Deleted),
            "missing" => Some(Self::Missing),
            "unversioned" => Some(Self::Unversioned),
            "added" => Some(Self::Added),
            "replaced" => Some(Self::Replaced),
            "moved-away" => Some(Self::MovedAway),
            "moved-here" => Some(Self::MovedHere),
            _ => None,
        }
    }
}

/// One side of a tree conflict: where that version of the node lives in the
/// repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictSide {
    pub repos_relpath: String,
    pub revision: i64,
    pub kind: NodeKindField,
}

/// NodeKind with the wire spelling used by the blob format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKindField {
    File,
    Dir,
    Symlink,
    Unknown,
}

impl From<NodeKind> for NodeKindField {
    fn from(value: NodeKind) -> Self {
        match value {
            NodeKind::File => Self::File,
            NodeKind::Dir => Self::Dir,
            NodeKind::Symlink => Self::Symlink,
            NodeKind::Unknown => Self::Unknown,
        }
    }
}

impl From<NodeKindField> for NodeKind {
    fn from(value: NodeKindField) -> Self {
        match value {
            NodeKindField::File => Self::File,
            NodeKindField::Dir => Self::Dir,
            NodeKindField::Symlink => Self::Symlink,
            NodeKindField::Unknown => Self::Unknown,
        }
    }
}

/// Typed tree-conflict descriptor for one victim path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConflictInfo {
    pub operation: ConflictOperation,
    pub action: ConflictAction,
    pub reason: ConflictReason,
    pub kind: NodeKindField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<ConflictSide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<ConflictSide>,
}

impl TreeConflictInfo {
    /// Parse the legacy opaque blob form (one JSON object per victim).
    pub fn from_legacy_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_legacy_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_blob_round_trip() {
        let info = TreeConflictInfo {
            operation: ConflictOperation::Update,
            action: ConflictAction::Delete,
            reason: ConflictReason::Edited,
            kind: NodeKindField::File,
            left: Some(ConflictSide {
                repos_relpath: "trunk/a".to_string(),
                revision: 4,
                kind: NodeKindField::File,
            }),
            right: Some(ConflictSide {
                repos_relpath: "trunk/a".to_string(),
                revision: 5,
                kind: NodeKindField::Unknown,
            }),
        };
        let blob = info.to_legacy_json();
        let parsed = TreeConflictInfo::from_legacy_json(&blob).expect("parse legacy blob");
        assert_eq!(parsed, info);
    }

    #[test]
    fn legacy_blob_sides_are_optional() {
        let parsed = TreeConflictInfo::from_legacy_json(
            r#"{"operation":"merge","action":"add","reason":"obstructed","kind":"dir"}"#,
        )
        .expect("parse minimal blob");
        assert_eq!(parsed.operation, ConflictOperation::Merge);
        assert!(parsed.left.is_none());
        assert!(parsed.right.is_none());
    }
}
