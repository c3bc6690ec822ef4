use std::time::Duration;

use crate::channel::{Connection, ConnectionFactory};
use crate::config::ConnectionDictionary;
use crate::error::EoAccessError;
use crate::types::Dialect;

use super::SqliteConnection;

/// Options applied to every connection a [`SqliteConnectionFactory`] opens.
///
/// `":memory:"` gives each connection its own private database; use a file path for a
/// pool whose channels should see the same data.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub db_path: String,
    pub wal: bool,
    pub busy_timeout: Option<Duration>,
    pub foreign_keys: bool,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            wal: false,
            busy_timeout: Some(Duration::from_secs(5)),
            foreign_keys: true,
        }
    }

    /// Read options from a connection dictionary: `sqlite:<path>` or a bare path, with the
    /// optional `journal_mode` (`wal`) and `busy_timeout` (ms) properties.
    ///
    /// # Errors
    /// Returns `ConfigError` for an empty path or an unparsable timeout.
    pub fn from_dictionary(dictionary: &ConnectionDictionary) -> Result<Self, EoAccessError> {
        let path = dictionary
            .url
            .strip_prefix("sqlite://")
            .or_else(|| dictionary.url.strip_prefix("sqlite:"))
            .unwrap_or(&dictionary.url);
        if path.is_empty() {
            return Err(EoAccessError::ConfigError(
                "SQLite url does not name a database".into(),
            ));
        }
        let mut options = Self::new(path);
        if let Some(mode) = dictionary.properties.get("journal_mode") {
            options.wal = mode.eq_ignore_ascii_case("wal");
        }
        if let Some(ms) = dictionary.properties.get("busy_timeout") {
            let ms: u64 = ms.trim().parse().map_err(|_| {
                EoAccessError::ConfigError(format!("busy_timeout: cannot parse {ms:?}"))
            })?;
            options.busy_timeout = Some(Duration::from_millis(ms));
        }
        Ok(options)
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.opts.busy_timeout = timeout;
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.opts.foreign_keys = enabled;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build the factory a pool opens channels with.
    #[must_use]
    pub fn build(self) -> SqliteConnectionFactory {
        SqliteConnectionFactory::new(self.finish())
    }
}

/// Opens [`SqliteConnection`]s with fixed options.
#[derive(Debug, Clone)]
pub struct SqliteConnectionFactory {
    options: SqliteOptions,
}

impl SqliteConnectionFactory {
    #[must_use]
    pub fn new(options: SqliteOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }
}

impl ConnectionFactory for SqliteConnectionFactory {
    fn connect(&self) -> Result<Box<dyn Connection>, EoAccessError> {
        Ok(Box::new(SqliteConnection::open(&self.options)?))
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }
}
