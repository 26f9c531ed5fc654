#![forbid(unsafe_code)]
//! Content-addressed pristine registry.
//!
//! Only the index lives here; blob files belong to the caller. The refcount
//! is an optimistic counter, so GC re-checks the authoritative union of
//! checksum references before a row may go.

use rusqlite::params;
use wc_core::model::{Md5Checksum, Sha1Checksum};

use super::support::begin_immediate;
use super::types::PristineInfo;
use super::{Stmt, StoreError, WcDb};

impl WcDb {
    /// Register (or re-reference) a blob. The md5 and size are fixed on
    /// first sight; disagreeing later calls are caller bugs.
    pub fn pristine_add_ref(
        &mut self,
        checksum: &Sha1Checksum,
        md5_checksum: &Md5Checksum,
        size: i64,
    ) -> Result<(), StoreError> {
        if size < 0 {
            return Err(StoreError::InvalidArgument("pristine size is negative"));
        }
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let existing = {
            let mut stmt = tx.prepare_cached(Stmt::SelectPristine.sql())?;
            let mut rows = stmt.query(params![checksum.as_str()])?;
            match rows.next()? {
                Some(row) => Some((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                None => None,
            }
        };
        if let Some((recorded_md5, recorded_size)) = existing {
            if recorded_md5 != md5_checksum.as_str() || recorded_size != size {
                return Err(StoreError::ConstraintViolation(
                    "pristine identity differs from the recorded one",
                ));
            }
        }
        tx.prepare_cached(Stmt::InsertPristine.sql())?.execute(params![
            checksum.as_str(),
            md5_checksum.as_str(),
            size
        ])?;
        tx.commit()?;
        self.pristine_cache.borrow_mut().remove(checksum.as_str());
        Ok(())
    }

    /// Drop one reference. The row stays even at refcount zero; removal is
    /// GC's job.
    pub fn pristine_release(&mut self, checksum: &Sha1Checksum) -> Result<(), StoreError> {
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let affected = tx
            .prepare_cached(Stmt::UpdatePristineRefcount.sql())?
            .execute(params![checksum.as_str()])?;
        if affected == 0 {
            let known = {
                let mut stmt = tx.prepare_cached(Stmt::SelectPristine.sql())?;
                let mut rows = stmt.query(params![checksum.as_str()])?;
                rows.next()?.is_some()
            };
            if !known {
                return Err(StoreError::NotFound {
                    entity: "pristine",
                    path: checksum.as_str().to_string(),
                });
            }
            // Already at zero: releasing is a no-op, the counter never goes
            // negative.
        }
        tx.commit()?;
        self.pristine_cache.borrow_mut().remove(checksum.as_str());
        Ok(())
    }

    pub fn pristine_lookup(
        &self,
        checksum: &Sha1Checksum,
    ) -> Result<Option<PristineInfo>, StoreError> {
        if self.cache_config().cache_fulltexts {
            if let Some(hit) = self.pristine_cache.borrow().get(checksum.as_str()) {
                return Ok(Some(hit.clone()));
            }
        }
        let found = {
            let mut stmt = self.conn.prepare_cached(Stmt::SelectPristine.sql())?;
            let mut rows = stmt.query(params![checksum.as_str()])?;
            match rows.next()? {
                Some(row) => {
                    let md5: String = row.get(0)?;
                    let md5_checksum = Md5Checksum::try_new(md5).map_err(|err| {
                        StoreError::Corrupt(format!("malformed pristine md5: {err}"))
                    })?;
                    Some(PristineInfo {
                        md5_checksum,
                        size: row.get(1)?,
                        refcount: row.get(2)?,
                    })
                }
                None => None,
            }
        };
        if self.cache_config().cache_fulltexts {
            if let Some(info) = &found {
                self.pristine_cache
                    .borrow_mut()
                    .insert(checksum.as_str().to_string(), info.clone());
            }
        }
        Ok(found)
    }

    pub fn pristine_lookup_by_md5(
        &self,
        md5_checksum: &Md5Checksum,
    ) -> Result<Option<Sha1Checksum>, StoreError> {
        let mut stmt = self.conn.prepare_cached(Stmt::SelectPristineByMd5.sql())?;
        let mut rows = stmt.query(params![md5_checksum.as_str()])?;
        match rows.next()? {
            Some(row) => {
                let sha: String = row.get(0)?;
                Sha1Checksum::try_new(sha).map(Some).map_err(|err| {
                    StoreError::Corrupt(format!("malformed pristine checksum: {err}"))
                })
            }
            None => Ok(None),
        }
    }

    /// Remove every pristine row with refcount zero and no remaining
    /// reference anywhere in nodes or the actual overlay. Returns the
    /// removed checksums; unlinking the blob files is the caller's half.
    pub fn pristine_gc(&mut self) -> Result<Vec<Sha1Checksum>, StoreError> {
        let cancel = self.cancel.clone();
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let candidates = {
            let mut stmt = tx.prepare_cached(Stmt::SelectUnreferencedPristines.sql())?;
            let mut rows = stmt.query([])?;
            let mut out = Vec::<String>::new();
            while let Some(row) = rows.next()? {
                out.push(row.get(0)?);
            }
            out
        };
        let mut removed = Vec::new();
        for checksum in candidates {
            if cancel.is_cancelled() {
                return Err(StoreError::Interrupted);
            }
            let referenced = {
                let mut stmt = tx.prepare_cached(Stmt::SelectAnyPristineReference.sql())?;
                let mut rows = stmt.query(params![checksum])?;
                rows.next()?.is_some()
            };
            if referenced {
                continue;
            }
            tx.prepare_cached(Stmt::DeletePristine.sql())?
                .execute(params![checksum])?;
            removed.push(Sha1Checksum::try_new(checksum).map_err(|err| {
                StoreError::Corrupt(format!("malformed pristine checksum: {err}"))
            })?);
        }
        tx.commit()?;
        let mut cache = self.pristine_cache.borrow_mut();
        for checksum in &removed {
            cache.remove(checksum.as_str());
        }
        Ok(removed)
    }
}
