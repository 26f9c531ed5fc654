#![forbid(unsafe_code)]

mod conflicts;
mod util;

use rusqlite::{Connection, params};

use super::super::super::StoreError;
use super::{FORMAT_VERSION, OLDEST_SUPPORTED};

/// Run every migration step from `version` up to the compiled-in format.
/// Each step commits in its own transaction, so a crash between steps
/// leaves the file at a coherent intermediate version and a later open
/// resumes from there.
pub(super) fn upgrade(conn: &mut Connection, mut version: i64) -> Result<(), StoreError> {
    while version < FORMAT_VERSION {
        let tx = conn.transaction()?;
        match version {
            1 => conflicts::apply(&tx)?,
            _ => {
                return Err(StoreError::UnsupportedSchema {
                    found: version,
                    oldest_supported: OLDEST_SUPPORTED,
                });
            }
        }
        let next = version + 1;
        tx.execute(
            "UPDATE meta SET value = ?1 WHERE key = 'format'",
            params![next.to_string()],
        )?;
        tx.commit()?;
        version = next;
    }
    Ok(())
}
