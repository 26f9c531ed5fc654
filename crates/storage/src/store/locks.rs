#![forbid(unsafe_code)]
//! Two independent lock namespaces: advisory workcopy directory locks the
//! writing process holds, and server-issued repository lock tokens.

use rusqlite::params;
use wc_core::paths::RelPath;

use super::nodes::parse_stored_relpath;
use super::support::begin_immediate;
use super::types::{ReposLockInfo, WcLockInfo};
use super::{Stmt, StoreError, WcDb};

impl WcDb {
    /// Take the advisory lock on `dir`. `locked_levels` of 0 covers just
    /// the directory, -1 the whole subtree, a positive value that many
    /// levels below.
    pub fn wc_lock_acquire(
        &mut self,
        dir: &RelPath,
        locked_levels: i64,
    ) -> Result<(), StoreError> {
        if locked_levels < -1 {
            return Err(StoreError::InvalidArgument(
                "locked_levels must be -1, 0, or positive",
            ));
        }
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let taken = {
            let mut stmt = tx.prepare_cached(Stmt::SelectWcLock.sql())?;
            let mut rows = stmt.query(params![wc_id, dir.as_str()])?;
            rows.next()?.is_some()
        };
        if taken {
            return Err(StoreError::AlreadyExists {
                entity: "wc lock",
                path: dir.as_str().to_string(),
            });
        }
        tx.prepare_cached(Stmt::InsertWcLock.sql())?
            .execute(params![wc_id, dir.as_str(), locked_levels])?;
        tx.commit()?;
        Ok(())
    }

    pub fn wc_lock_release(&mut self, dir: &RelPath) -> Result<(), StoreError> {
        let wc_id = self.wc_id;
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let affected = tx
            .prepare_cached(Stmt::DeleteWcLock.sql())?
            .execute(params![wc_id, dir.as_str()])?;
        if affected == 0 {
            return Err(StoreError::NotFound {
                entity: "wc lock",
                path: dir.as_str().to_string(),
            });
        }
        tx.commit()?;
        Ok(())
    }

    /// The lock row covering `relpath`, walking ancestors and honoring each
    /// row's locked_levels reach.
    pub fn find_wc_lock(&self, relpath: &RelPath) -> Result<Option<WcLockInfo>, StoreError> {
        let rows = {
            let mut stmt = self.conn.prepare_cached(Stmt::FindWcLock.sql())?;
            let mut rows = stmt.query(params![self.wc_id])?;
            let mut out = Vec::<(String, i64)>::new();
            while let Some(row) = rows.next()? {
                out.push((row.get(0)?, row.get(1)?));
            }
            out
        };
        let mut best: Option<WcLockInfo> = None;
        for (dir, locked_levels) in rows {
            let dir = parse_stored_relpath(&dir)?;
            let covers = if &dir == relpath {
                true
            } else if dir.is_ancestor_of(relpath) {
                let distance = relpath.depth() - dir.depth();
                locked_levels == -1 || distance <= locked_levels
            } else {
                false
            };
            if !covers {
                continue;
            }
            // Prefer the nearest covering lock.
            let better = match &best {
                Some(current) => dir.depth() > current.dir_relpath.depth(),
                None => true,
            };
            if better {
                best = Some(WcLockInfo {
                    dir_relpath: dir,
                    locked_levels,
                });
            }
        }
        Ok(best)
    }

    /// Is `relpath` covered by a held directory lock, i.e. writable by this
    /// process under the locking protocol.
    pub fn is_write_locked(&self, relpath: &RelPath) -> Result<bool, StoreError> {
        Ok(self.find_wc_lock(relpath)?.is_some())
    }

    /// Record a server-issued lock token; an existing row for the same
    /// repository path is replaced.
    pub fn repos_lock_set(
        &mut self,
        repo_id: i64,
        repos_relpath: &str,
        lock: &ReposLockInfo,
    ) -> Result<(), StoreError> {
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        tx.prepare_cached(Stmt::InsertLock.sql())?.execute(params![
            repo_id,
            repos_relpath,
            lock.token,
            lock.owner,
            lock.comment,
            lock.date
        ])?;
        tx.commit()?;
        Ok(())
    }

    pub fn repos_lock_get(
        &self,
        repo_id: i64,
        repos_relpath: &str,
    ) -> Result<Option<ReposLockInfo>, StoreError> {
        let mut stmt = self.conn.prepare_cached(Stmt::SelectLock.sql())?;
        let mut rows = stmt.query(params![repo_id, repos_relpath])?;
        match rows.next()? {
            Some(row) => Ok(Some(ReposLockInfo {
                token: row.get(0)?,
                owner: row.get(1)?,
                comment: row.get(2)?,
                date: row.get(3)?,
            })),
            None => Ok(None),
        }
    }

    pub fn repos_lock_remove(
        &mut self,
        repo_id: i64,
        repos_relpath: &str,
    ) -> Result<(), StoreError> {
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let affected = tx
            .prepare_cached(Stmt::DeleteLock.sql())?
            .execute(params![repo_id, repos_relpath])?;
        if affected == 0 {
            return Err(StoreError::NotFound {
                entity: "repository lock",
                path: repos_relpath.to_string(),
            });
        }
        tx.commit()?;
        Ok(())
    }
}
