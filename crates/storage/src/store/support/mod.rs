#![forbid(unsafe_code)]

mod pattern;
mod retry;
mod schema;

pub(super) use pattern::subtree_like_pattern;
pub(super) use retry::begin_immediate;
pub(super) use schema::{FORMAT_VERSION, create_or_upgrade};
