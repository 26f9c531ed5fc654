#![forbid(unsafe_code)]
//! Offline integrity checker over the invariants the mutation paths are
//! supposed to keep. A diagnostic aid, not part of the hot path.

use std::collections::HashSet;

use rusqlite::params;
use wc_core::paths::RelPath;

use super::{Stmt, StoreError, WcDb};

#[derive(Clone, Debug)]
pub struct IntegrityIssue {
    pub relpath: String,
    pub detail: String,
}

impl WcDb {
    /// Scan the whole store and report every invariant violation found.
    /// An empty vec means the relational state is coherent.
    pub fn verify(&self) -> Result<Vec<IntegrityIssue>, StoreError> {
        let mut issues = Vec::new();
        self.verify_nodes(&mut issues)?;
        self.verify_actual(&mut issues)?;
        self.verify_pristine(&mut issues)?;
        Ok(issues)
    }

    fn verify_nodes(&self, issues: &mut Vec<IntegrityIssue>) -> Result<(), StoreError> {
        let rows = {
            let mut stmt = self.conn.prepare_cached(Stmt::SelectNodeParentage.sql())?;
            let mut rows = stmt.query(params![self.wc_id])?;
            let mut out = Vec::<(String, i64, Option<String>)>::new();
            while let Some(row) = rows.next()? {
                out.push((row.get(0)?, row.get(1)?, row.get(2)?));
            }
            out
        };
        let present: HashSet<(String, i64)> = rows
            .iter()
            .map(|(relpath, op_depth, _)| (relpath.clone(), *op_depth))
            .collect();
        for (relpath, op_depth, parent_relpath) in rows {
            let path = match RelPath::try_new(relpath.clone()) {
                Ok(path) => path,
                Err(err) => {
                    issues.push(IntegrityIssue {
                        relpath,
                        detail: format!("non-canonical relpath: {err}"),
                    });
                    continue;
                }
            };
            let depth = path.depth();
            if op_depth < 0 || op_depth > depth {
                issues.push(IntegrityIssue {
                    relpath: relpath.clone(),
                    detail: format!("op_depth {op_depth} out of range for path depth {depth}"),
                });
            }
            let expected_parent = path.parent().map(|p| p.as_str().to_string());
            if parent_relpath != expected_parent {
                issues.push(IntegrityIssue {
                    relpath: relpath.clone(),
                    detail: format!(
                        "parent_relpath {parent_relpath:?} is not the textual parent"
                    ),
                });
            }
            // A working row below its layer root needs a covering ancestor
            // row at the same op_depth.
            if op_depth > 0 && depth > op_depth {
                if let Some(parent) = expected_parent {
                    if !present.contains(&(parent, op_depth)) {
                        issues.push(IntegrityIssue {
                            relpath,
                            detail: format!(
                                "working row at op_depth {op_depth} has no covering ancestor"
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn verify_actual(&self, issues: &mut Vec<IntegrityIssue>) -> Result<(), StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(Stmt::SelectEmptyActualNodes.sql())?;
        let mut rows = stmt.query(params![self.wc_id])?;
        while let Some(row) = rows.next()? {
            issues.push(IntegrityIssue {
                relpath: row.get(0)?,
                detail: "actual row with every override null".to_string(),
            });
        }
        Ok(())
    }

    fn verify_pristine(&self, issues: &mut Vec<IntegrityIssue>) -> Result<(), StoreError> {
        let referenced = {
            let mut stmt = self
                .conn
                .prepare_cached(Stmt::SelectReferencedPristines.sql())?;
            let mut rows = stmt.query([])?;
            let mut out = Vec::<String>::new();
            while let Some(row) = rows.next()? {
                out.push(row.get(0)?);
            }
            out
        };
        for checksum in referenced {
            let live = {
                let mut stmt = self
                    .conn
                    .prepare_cached(Stmt::SelectAnyPristineReference.sql())?;
                let mut rows = stmt.query(params![checksum])?;
                rows.next()?.is_some()
            };
            if !live {
                issues.push(IntegrityIssue {
                    relpath: checksum,
                    detail: "pristine refcount positive without a live reference".to_string(),
                });
            }
        }
        Ok(())
    }
}
