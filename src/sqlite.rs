// SQLite backend: a `Connection` over rusqlite plus the factory a pool opens it with.
//
// - config: options, builder, and the connection factory
// - params: conversion from crate values to rusqlite values
// - query: reading rows into a `ResultSet`

mod config;
mod params;
mod query;

use crate::channel::Connection;
use crate::error::EoAccessError;
use crate::results::ResultSet;
use crate::types::Value;

pub use config::{SqliteConnectionFactory, SqliteOptions, SqliteOptionsBuilder};

/// A single rusqlite connection; `None` once closed.
pub struct SqliteConnection {
    conn: Option<rusqlite::Connection>,
}

impl SqliteConnection {
    /// Open a connection and apply the connection-level pragmas from `options`.
    ///
    /// # Errors
    /// Returns `ConnectionError` if the database cannot be opened or configured.
    pub fn open(options: &SqliteOptions) -> Result<Self, EoAccessError> {
        let conn = rusqlite::Connection::open(&options.db_path).map_err(|e| {
            EoAccessError::ConnectionError(format!(
                "failed to open SQLite database {}: {e}",
                options.db_path
            ))
        })?;
        if let Some(timeout) = options.busy_timeout {
            conn.busy_timeout(timeout)
                .map_err(|e| EoAccessError::ConnectionError(format!("busy_timeout: {e}")))?;
        }
        let mut pragmas = String::new();
        if options.wal {
            pragmas.push_str("PRAGMA journal_mode = WAL;");
        }
        if options.foreign_keys {
            pragmas.push_str("PRAGMA foreign_keys = ON;");
        }
        if !pragmas.is_empty() {
            conn.execute_batch(&pragmas)
                .map_err(|e| EoAccessError::ConnectionError(format!("pragma setup: {e}")))?;
        }
        Ok(Self { conn: Some(conn) })
    }

    fn handle(&mut self) -> Result<&mut rusqlite::Connection, EoAccessError> {
        self.conn
            .as_mut()
            .ok_or_else(|| EoAccessError::ConnectionError("SQLite connection is closed".into()))
    }
}

impl Connection for SqliteConnection {
    fn query(
        &mut self,
        sql: &str,
        params: &[Value],
        results: &mut ResultSet,
    ) -> Result<(), EoAccessError> {
        let values = params::Params::convert(params)?;
        let conn = self.handle()?;
        let mut stmt = conn.prepare(sql)?;
        query::fill_result_set(&mut stmt, values.as_values(), results)
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize, EoAccessError> {
        let values = params::Params::convert(params)?;
        let conn = self.handle()?;
        let mut stmt = conn.prepare(sql)?;
        Ok(stmt.execute(&values.as_refs()[..])?)
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), EoAccessError> {
        Ok(self.handle()?.execute_batch(sql)?)
    }

    fn begin(&mut self) -> Result<(), EoAccessError> {
        Ok(self.handle()?.execute_batch("BEGIN")?)
    }

    fn commit(&mut self) -> Result<(), EoAccessError> {
        Ok(self.handle()?.execute_batch("COMMIT")?)
    }

    fn rollback(&mut self) -> Result<(), EoAccessError> {
        Ok(self.handle()?.execute_batch("ROLLBACK")?)
    }

    fn is_autocommit(&self) -> bool {
        self.conn
            .as_ref()
            .is_none_or(rusqlite::Connection::is_autocommit)
    }

    fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    fn close(&mut self) -> Result<(), EoAccessError> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| EoAccessError::Sqlite(e)),
            None => Ok(()),
        }
    }
}
