#![forbid(unsafe_code)]
//! Working-copy metadata store over a single `wc.db` file.
//!
//! One `WcDb` is one session. Writers take `&mut self` and run inside a
//! single immediate transaction; readers take `&self` and see a WAL
//! snapshot. Concurrent readers open their own session on the same file.

mod actual;
mod error;
mod locks;
mod nodes;
mod pristine;
mod statements;
mod support;
mod types;
mod verify;
mod work_queue;

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Transaction, params};
use wc_core::cache::CacheConfig;
use wc_core::cancel::CancelToken;

pub use error::StoreError;
pub use statements::Stmt;
pub use types::*;
pub use verify::IntegrityIssue;

use support::*;

const DB_NAME: &str = "wc.db";

type CacheWarningHandler = Box<dyn Fn(&str) + Send>;

/// Session parameters beyond the metadata directory itself.
pub struct OpenOptions {
    /// Canonical absolute path of the workcopy root, or None for a detached
    /// session that must not register one.
    pub local_abspath: Option<PathBuf>,
    /// How long Busy is retried before it surfaces to the caller.
    pub busy_deadline: Duration,
    pub cancel: CancelToken,
    pub cache: CacheConfig,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            local_abspath: None,
            busy_deadline: Duration::from_secs(10),
            cancel: CancelToken::new(),
            cache: CacheConfig::default(),
        }
    }
}

pub struct WcDb {
    db_path: PathBuf,
    conn: Connection,
    wc_id: i64,
    busy_deadline: Duration,
    cancel: CancelToken,
    cache: CacheConfig,
    pristine_cache: RefCell<HashMap<String, PristineInfo>>,
    on_cache_warning: Option<CacheWarningHandler>,
}

impl std::fmt::Debug for WcDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WcDb")
            .field("db_path", &self.db_path)
            .field("wc_id", &self.wc_id)
            .finish_non_exhaustive()
    }
}

impl WcDb {
    /// Open or create the metadata store for the workcopy rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        let options = OpenOptions {
            local_abspath: Some(dir.clone()),
            ..OpenOptions::default()
        };
        Self::open_with(dir, options)
    }

    pub fn open_with(dir: impl AsRef<Path>, options: OpenOptions) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let db_path = dir.join(DB_NAME);
        let mut conn = Connection::open(&db_path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; \
             PRAGMA synchronous=NORMAL; \
             PRAGMA busy_timeout=1000; \
             PRAGMA case_sensitive_like=ON;",
        )?;
        create_or_upgrade(&mut conn)?;
        let wc_id = ensure_wcroot(&mut conn, options.local_abspath.as_deref())?;
        Ok(Self {
            db_path,
            conn,
            wc_id,
            busy_deadline: options.busy_deadline,
            cancel: options.cancel,
            cache: options.cache,
            pristine_cache: RefCell::new(HashMap::new()),
            on_cache_warning: None,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn wc_id(&self) -> i64 {
        self.wc_id
    }

    pub fn format_version() -> i64 {
        FORMAT_VERSION
    }

    pub fn cache_config(&self) -> &CacheConfig {
        &self.cache
    }

    /// Route cache-layer degradation somewhere visible. Without a handler
    /// (and without `fail_stop`) a damaged cached value is silently a miss.
    pub fn set_cache_warning_handler(&mut self, handler: impl Fn(&str) + Send + 'static) {
        self.on_cache_warning = Some(Box::new(handler));
    }

    /// Intern a repository by root URL. The uuid is fixed on first sight.
    pub fn ensure_repository(&mut self, root: &str, uuid: &str) -> Result<i64, StoreError> {
        let tx = begin_immediate(&mut self.conn, self.busy_deadline, &self.cancel)?;
        let repo_id = ensure_repository_tx(&tx, root, uuid)?;
        tx.commit()?;
        Ok(repo_id)
    }
}

fn ensure_wcroot(conn: &mut Connection, local_abspath: Option<&Path>) -> Result<i64, StoreError> {
    let requested = local_abspath.map(|p| p.to_string_lossy().into_owned());
    let tx = conn.transaction()?;
    let existing = tx
        .query_row(Stmt::SelectWcRoot.sql(), [], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
        })
        .optional()?;
    let wc_id = match existing {
        Some((id, recorded)) => {
            if let (Some(recorded), Some(requested)) = (recorded.as_deref(), requested.as_deref()) {
                if recorded != requested {
                    return Err(StoreError::InvalidArgument(
                        "workcopy is registered under a different root path",
                    ));
                }
            }
            id
        }
        None => {
            tx.execute(Stmt::InsertWcRoot.sql(), params![requested])?;
            tx.last_insert_rowid()
        }
    };
    tx.commit()?;
    Ok(wc_id)
}

fn ensure_repository_tx(tx: &Transaction<'_>, root: &str, uuid: &str) -> Result<i64, StoreError> {
    let existing = tx
        .query_row(Stmt::SelectRepositoryByRoot.sql(), params![root], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .optional()?;
    if let Some((repo_id, recorded_uuid)) = existing {
        if recorded_uuid != uuid {
            return Err(StoreError::ConstraintViolation(
                "repository uuid differs from the recorded one",
            ));
        }
        return Ok(repo_id);
    }
    tx.execute(Stmt::InsertRepository.sql(), params![root, uuid])?;
    Ok(tx.last_insert_rowid())
}

/// Decode context for dav_cache values: they are a cache, so damage is a
/// warning and a miss rather than an error, unless configured fail_stop.
pub(in crate::store) struct DavDecode<'a> {
    fail_stop: bool,
    handler: Option<&'a CacheWarningHandler>,
}

impl<'a> DavDecode<'a> {
    pub(in crate::store) fn new(
        cache: &CacheConfig,
        handler: Option<&'a CacheWarningHandler>,
    ) -> Self {
        Self {
            fail_stop: cache.fail_stop,
            handler,
        }
    }

    pub(in crate::store) fn decode(
        &self,
        relpath: &str,
        raw: Option<String>,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                if self.fail_stop {
                    return Err(StoreError::Corrupt(format!(
                        "dav_cache at '{relpath}' is not valid JSON: {err}"
                    )));
                }
                if let Some(handler) = self.handler {
                    handler(&format!(
                        "dropping unreadable dav_cache at '{relpath}': {err}"
                    ));
                }
                Ok(None)
            }
        }
    }
}

impl WcDb {
    pub(in crate::store) fn dav_decode(&self) -> DavDecode<'_> {
        DavDecode::new(&self.cache, self.on_cache_warning.as_ref())
    }
}
