#![forbid(unsafe_code)]

use rusqlite::ErrorCode;
use wc_core::model::ChecksumError;
use wc_core::paths::RelPathError;

#[derive(Debug)]
pub enum StoreError {
    /// Lock contention outlived the retry deadline. Retryable.
    Busy,
    /// Cancellation tripped at a transaction boundary. Retryable.
    Interrupted,
    NotFound {
        entity: &'static str,
        path: String,
    },
    AlreadyExists {
        entity: &'static str,
        path: String,
    },
    InvalidPath(RelPathError),
    InvalidArgument(&'static str),
    ConstraintViolation(&'static str),
    Io(std::io::Error),
    NoSpace(std::io::Error),
    PermissionDenied(std::io::Error),
    Sql(rusqlite::Error),
    /// The metadata file is damaged. Fatal to the session.
    Corrupt(String),
    SchemaTooNew {
        found: i64,
        supported: i64,
    },
    UnsupportedSchema {
        found: i64,
        oldest_supported: i64,
    },
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Busy => "BUSY",
            Self::Interrupted => "INTERRUPTED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::InvalidPath(_) => "INVALID_PATH",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::ConstraintViolation(_) => "CONSTRAINT_VIOLATION",
            Self::NoSpace(_) => "NO_SPACE",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::Io(_) | Self::Sql(_) => "INTERNAL",
            Self::Corrupt(_) => "CORRUPT",
            Self::SchemaTooNew { .. } => "SCHEMA_TOO_NEW",
            Self::UnsupportedSchema { .. } => "UNSUPPORTED_SCHEMA",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy | Self::Interrupted)
    }

    pub fn recovery_hint(&self) -> Option<&'static str> {
        match self {
            Self::Busy => Some("another process holds the metadata file: retry later"),
            Self::Interrupted => Some("operation was cancelled: retry when ready"),
            Self::NotFound { .. } => Some("check the path against the recorded tree"),
            Self::AlreadyExists { .. } => Some("release or remove the existing record first"),
            Self::SchemaTooNew { .. } => {
                Some("this workcopy was written by a newer client: upgrade the client")
            }
            Self::UnsupportedSchema { .. } => {
                Some("metadata format predates the supported range: re-checkout")
            }
            Self::Corrupt(_) => Some("metadata file is damaged: re-checkout or restore a backup"),
            Self::NoSpace(_) => Some("the filesystem is full: free space and retry"),
            Self::PermissionDenied(_) => {
                Some("check ownership and permissions of the metadata directory")
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => write!(f, "metadata file is busy"),
            Self::Interrupted => write!(f, "operation cancelled"),
            Self::NotFound { entity, path } => write!(f, "{entity} not found: '{path}'"),
            Self::AlreadyExists { entity, path } => {
                write!(f, "{entity} already exists: '{path}'")
            }
            Self::InvalidPath(err) => write!(f, "invalid path: {err}"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::ConstraintViolation(message) => write!(f, "constraint violation: {message}"),
            Self::Io(err) => write!(f, "io: {err}"),
            Self::NoSpace(err) => write!(f, "no space left: {err}"),
            Self::PermissionDenied(err) => write!(f, "permission denied: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::Corrupt(message) => write!(f, "metadata corrupt: {message}"),
            Self::SchemaTooNew { found, supported } => {
                write!(f, "schema format {found} is newer than supported {supported}")
            }
            Self::UnsupportedSchema {
                found,
                oldest_supported,
            } => {
                write!(
                    f,
                    "schema format {found} predates oldest supported {oldest_supported}"
                )
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        match value.kind() {
            std::io::ErrorKind::StorageFull => Self::NoSpace(value),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(value),
            _ => Self::Io(value),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        let code = match &value {
            rusqlite::Error::SqliteFailure(code, _) => Some(code.code),
            _ => None,
        };
        match code {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => Self::Busy,
            Some(ErrorCode::ConstraintViolation) => {
                Self::ConstraintViolation("sqlite constraint failed")
            }
            Some(ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase) => {
                Self::Corrupt(value.to_string())
            }
            Some(ErrorCode::DiskFull) => Self::NoSpace(std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                value,
            )),
            Some(ErrorCode::PermissionDenied | ErrorCode::ReadOnly) => Self::PermissionDenied(
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, value),
            ),
            _ => Self::Sql(value),
        }
    }
}

impl From<RelPathError> for StoreError {
    fn from(value: RelPathError) -> Self {
        Self::InvalidPath(value)
    }
}

impl From<ChecksumError> for StoreError {
    fn from(_: ChecksumError) -> Self {
        Self::InvalidArgument("malformed checksum")
    }
}
