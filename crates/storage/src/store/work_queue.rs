#![forbid(unsafe_code)]
//! Durable FIFO of opaque post-commit work. Items run after the writing
//! transaction is durable and before the workcopy counts as consistent;
//! callers drain under the workcopy lock.

use rusqlite::params;

use super::support::begin_immediate;
use super::types::WorkItem;
use super::{Stmt, StoreError, WcDb};

impl WcDb {
    /// Append a work item; ids are monotonic and define replay order.
    pub fn work_enqueue(&mut self, work: &[u8]) -> Result<i64, StoreError> {
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        tx.prepare_cached(Stmt::InsertWorkItem.sql())?
            .execute(params![work])?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    /// The oldest pending item, without removing it.
    pub fn work_peek(&self) -> Result<Option<WorkItem>, StoreError> {
        let mut stmt = self.conn.prepare_cached(Stmt::SelectWorkItem.sql())?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(Some(WorkItem {
                id: row.get(0)?,
                work: row.get(1)?,
            })),
            None => Ok(None),
        }
    }

    /// Retire a completed item.
    pub fn work_done(&mut self, id: i64) -> Result<(), StoreError> {
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let affected = tx
            .prepare_cached(Stmt::DeleteWorkItem.sql())?
            .execute(params![id])?;
        if affected == 0 {
            return Err(StoreError::NotFound {
                entity: "work item",
                path: id.to_string(),
            });
        }
        tx.commit()?;
        Ok(())
    }

    /// Cheap probe used before deciding whether a drain pass is needed.
    pub fn work_pending(&self) -> Result<bool, StoreError> {
        let mut stmt = self.conn.prepare_cached(Stmt::LookForWork.sql())?;
        let mut rows = stmt.query([])?;
        Ok(rows.next()?.is_some())
    }
}
