#![forbid(unsafe_code)]

use wc_core::paths::RelPath;

/// Server-issued lock token recorded for a repository path.
#[derive(Clone, Debug)]
pub struct ReposLockInfo {
    pub token: String,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub date: Option<i64>,
}

/// Advisory directory lock held by the writing process.
#[derive(Clone, Debug)]
pub struct WcLockInfo {
    pub dir_relpath: RelPath,
    /// 0 locks just the directory, -1 the whole subtree, a positive value
    /// that many levels below it.
    pub locked_levels: i64,
}
