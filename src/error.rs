use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EoAccessError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("Pool exhausted: no channel became available within {waited:?} (max size {max_size})")]
    PoolExhausted { waited: Duration, max_size: usize },

    #[error("Pool has been disposed")]
    PoolClosed,

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unresolved qualifier variable: ${0}")]
    UnresolvedVariable(String),

    #[error("Composite identifiers with {0} keys cannot be used as a scalar value")]
    UnsupportedCompositeKey(usize),

    #[error("No value for SQL pattern token %({0})s")]
    MissingPatternToken(String),

    #[error("SQL compilation error: {0}")]
    CompilationError(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Maintenance error: {0}")]
    Maintenance(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Coarse failure class, used by callers to decide between retrying, reporting a
/// programming error, or discarding a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Acquisition timed out; retryable.
    PoolExhaustion,
    /// Open/execute/close failure reported by the driver.
    Connection,
    /// Qualifier, model, or pattern problem; not retryable.
    Compilation,
    /// Best-effort cleanup failure; only ever logged.
    Maintenance,
}

/// Dialect-independent classification of a driver state code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlState {
    UniqueViolation,
    UndefinedTable,
    EncodingMismatch,
    Busy,
    Other(String),
}

impl EoAccessError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PoolExhausted { .. } => ErrorKind::PoolExhaustion,
            Self::UnresolvedVariable(_)
            | Self::UnsupportedCompositeKey(_)
            | Self::MissingPatternToken(_)
            | Self::CompilationError(_)
            | Self::ModelError(_)
            | Self::ConfigError(_) => ErrorKind::Compilation,
            Self::Maintenance(_) => ErrorKind::Maintenance,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => ErrorKind::Connection,
            Self::PoolClosed
            | Self::ConnectionError(_)
            | Self::ExecutionError(_)
            | Self::Other(_) => ErrorKind::Connection,
        }
    }

    /// Classify a driver error by its state code. Returns `None` for errors that did not
    /// originate in the driver.
    #[must_use]
    pub fn sql_state(&self) -> Option<SqlState> {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite(err) => Some(classify_sqlite(err)),
            Self::ConnectionError(msg) | Self::ExecutionError(msg) => Some(classify_message(msg)),
            _ => None,
        }
    }

    /// True when the same call may succeed if simply repeated.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::PoolExhaustion)
            || matches!(self.sql_state(), Some(SqlState::Busy))
    }

    /// True when the physical connection should not be reused after this error.
    #[must_use]
    pub fn is_connection_fatal(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::PoolClosed => true,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::CannotOpen
                    | rusqlite::ErrorCode::NotADatabase
                    | rusqlite::ErrorCode::DatabaseCorrupt
                    | rusqlite::ErrorCode::SystemIoFailure
            ),
            _ => false,
        }
    }
}

fn classify_message(msg: &str) -> SqlState {
    let lower = msg.to_ascii_lowercase();
    if lower.contains("unique") || lower.contains("duplicate key") {
        SqlState::UniqueViolation
    } else if lower.contains("no such table")
        || (lower.contains("relation") && lower.contains("does not exist"))
    {
        SqlState::UndefinedTable
    } else if lower.contains("encoding") || lower.contains("utf-8") || lower.contains("utf8") {
        SqlState::EncodingMismatch
    } else if lower.contains("locked") || lower.contains("busy") {
        SqlState::Busy
    } else {
        SqlState::Other(msg.to_string())
    }
}

#[cfg(feature = "sqlite")]
fn classify_sqlite(err: &rusqlite::Error) -> SqlState {
    // SQLITE_CONSTRAINT_UNIQUE / SQLITE_CONSTRAINT_PRIMARYKEY
    const CONSTRAINT_UNIQUE: i32 = 2067;
    const CONSTRAINT_PRIMARYKEY: i32 = 1555;

    match err {
        rusqlite::Error::SqliteFailure(ffi, msg) => match ffi.code {
            rusqlite::ErrorCode::ConstraintViolation
                if matches!(ffi.extended_code, CONSTRAINT_UNIQUE | CONSTRAINT_PRIMARYKEY) =>
            {
                SqlState::UniqueViolation
            }
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                SqlState::Busy
            }
            _ => match msg {
                Some(text) => match classify_message(text) {
                    SqlState::Other(_) => SqlState::Other(ffi.extended_code.to_string()),
                    state => state,
                },
                None => SqlState::Other(ffi.extended_code.to_string()),
            },
        },
        rusqlite::Error::Utf8Error(..) => SqlState::EncodingMismatch,
        other => classify_message(&other.to_string()),
    }
}
