#![forbid(unsafe_code)]

use wc_core::model::{PropMap, Sha1Checksum};

/// Text-conflict marker files plus the pristine checksums backing them.
#[derive(Clone, Debug, Default)]
pub struct TextConflict {
    pub old: Option<String>,
    pub new: Option<String>,
    pub working: Option<String>,
    pub older_checksum: Option<Sha1Checksum>,
    pub left_checksum: Option<Sha1Checksum>,
    pub right_checksum: Option<Sha1Checksum>,
}

impl TextConflict {
    pub fn markers(
        old: impl Into<String>,
        new: impl Into<String>,
        working: impl Into<String>,
    ) -> Self {
        Self {
            old: Some(old.into()),
            new: Some(new.into()),
            working: Some(working.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.old.is_none() && self.new.is_none() && self.working.is_none()
    }
}

/// The actual-overlay row for one path.
#[derive(Clone, Debug, Default)]
pub struct ActualInfo {
    pub properties: Option<PropMap>,
    pub changelist: Option<String>,
    pub text_conflict: Option<TextConflict>,
    pub prop_reject: Option<String>,
}
