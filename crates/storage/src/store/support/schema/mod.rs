#![forbid(unsafe_code)]

mod migrations;
mod sql;

use rusqlite::{Connection, OptionalExtension, params};

use super::super::StoreError;

pub(in crate::store) use sql::CONFLICT_VICTIM_SQL;

/// Compiled-in metadata format. Version 1 carried tree conflicts as opaque
/// blobs on actual_node; version 2 stores them typed in conflict_victim.
pub(in crate::store) const FORMAT_VERSION: i64 = 2;
pub(in crate::store) const OLDEST_SUPPORTED: i64 = 1;

pub(in crate::store) fn create_or_upgrade(conn: &mut Connection) -> Result<(), StoreError> {
    match read_format_version(conn)? {
        None => create(conn),
        Some(found) if found == FORMAT_VERSION => Ok(()),
        Some(found) if found > FORMAT_VERSION => Err(StoreError::SchemaTooNew {
            found,
            supported: FORMAT_VERSION,
        }),
        Some(found) if found < OLDEST_SUPPORTED => Err(StoreError::UnsupportedSchema {
            found,
            oldest_supported: OLDEST_SUPPORTED,
        }),
        Some(found) => migrations::upgrade(conn, found),
    }
}

fn create(conn: &mut Connection) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    tx.execute_batch(&sql::full_schema_sql())?;
    tx.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES ('format', ?1)",
        params![FORMAT_VERSION.to_string()],
    )?;
    tx.commit()?;
    Ok(())
}

fn read_format_version(conn: &Connection) -> Result<Option<i64>, StoreError> {
    let has_meta = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'meta'",
            [],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !has_meta {
        return Ok(None);
    }
    let raw: Option<String> = conn
        .query_row("SELECT value FROM meta WHERE key = 'format'", [], |row| {
            row.get(0)
        })
        .optional()?;
    match raw {
        None => Err(StoreError::Corrupt(
            "meta table has no format row".to_string(),
        )),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| StoreError::Corrupt(format!("meta format is not an integer: {value:?}"))),
    }
}
