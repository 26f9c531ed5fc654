#![forbid(unsafe_code)]

/// One durable post-commit task. `work` is opaque to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    pub id: i64,
    pub work: Vec<u8>,
}
