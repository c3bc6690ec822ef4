//! A channel owns one connection and runs statements on it.
//!
//! Channel operations do not return `Result`: a failure is stored on the channel and the
//! operation returns `None`/`false`. Callers inspect it with
//! [`Channel::consume_last_error`], which also clears it. Transaction control is the
//! exception and returns its error directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::EoAccessError;
use crate::expression::{ExpressionFactory, SqlExpression};
use crate::qualifier::Qualifier;
use crate::results::{Record, ResultSet};
use crate::types::{Dialect, Value};

mod connection;

pub use connection::{Connection, ConnectionFactory};

pub struct Channel {
    id: u64,
    /// Identity of the pool that opened this channel; `None` for standalone channels.
    pool_id: Option<u64>,
    connection: Box<dyn Connection>,
    dialect: Dialect,
    started_at: Instant,
    last_error: Option<EoAccessError>,
    revoked: Arc<AtomicBool>,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("pool", &self.pool_id)
            .field("dialect", &self.dialect)
            .field("age", &self.age())
            .field("last_error", &self.last_error)
            .field("revoked", &self.is_revoked())
            .finish_non_exhaustive()
    }
}

impl Channel {
    /// Wrap an open connection. Pools create channels through their factory; this is public
    /// for callers that manage a single connection themselves.
    #[must_use]
    pub fn new(id: u64, connection: Box<dyn Connection>, dialect: Dialect) -> Self {
        Self {
            id,
            pool_id: None,
            connection,
            dialect,
            started_at: Instant::now(),
            last_error: None,
            revoked: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn owned_by(mut self, pool_id: u64) -> Self {
        self.pool_id = Some(pool_id);
        self
    }

    pub(crate) fn pool_id(&self) -> Option<u64> {
        self.pool_id
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Expression factory for this channel's dialect.
    #[must_use]
    pub fn expression_factory(&self) -> ExpressionFactory {
        ExpressionFactory::new(self.dialect)
    }

    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    #[must_use]
    pub fn age(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Pretend the channel was opened `by` earlier than it was.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn backdate(&mut self, by: Duration) {
        if let Some(earlier) = self.started_at.checked_sub(by) {
            self.started_at = earlier;
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    /// True once the owning pool has been disposed.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::Acquire)
    }

    pub(crate) fn revocation(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.revoked)
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        !self.connection.is_closed() && !self.connection.is_autocommit()
    }

    /// The error left by the last operation, without clearing it.
    #[must_use]
    pub fn last_error(&self) -> Option<&EoAccessError> {
        self.last_error.as_ref()
    }

    /// Take the error left by the last operation.
    pub fn consume_last_error(&mut self) -> Option<EoAccessError> {
        self.last_error.take()
    }

    pub(crate) fn record_error(&mut self, error: EoAccessError) {
        tracing::debug!(channel = self.id, error = %error, "channel operation failed");
        self.last_error = Some(error);
    }

    fn start_operation(&mut self) -> Result<(), EoAccessError> {
        self.last_error = None;
        if self.is_revoked() {
            return Err(EoAccessError::PoolClosed);
        }
        Ok(())
    }

    /// Run literal SQL and return its rows.
    pub fn perform_sql(&mut self, sql: &str) -> Option<ResultSet> {
        self.run_query(sql, &[], &[])
    }

    /// Run a compiled SELECT.
    ///
    /// Rows are keyed by the expression's selected keys when it has them. Rows read before a
    /// failure are returned and the failure is kept as the last error.
    pub fn evaluate_query(&mut self, expression: &SqlExpression<'_>) -> Option<ResultSet> {
        let params = match bind_values(expression) {
            Ok(params) => params,
            Err(err) => {
                self.record_error(err);
                return None;
            }
        };
        self.run_query(expression.statement(), &params, expression.selected_keys())
    }

    /// Run a compiled INSERT/UPDATE/DELETE and return the number of rows changed.
    pub fn evaluate_update(&mut self, expression: &SqlExpression<'_>) -> Option<usize> {
        if let Err(err) = self.start_operation() {
            self.record_error(err);
            return None;
        }
        let params = match bind_values(expression) {
            Ok(params) => params,
            Err(err) => {
                self.record_error(err);
                return None;
            }
        };
        let sql = expression.statement();
        tracing::debug!(channel = self.id, sql, "update");
        tracing::trace!(channel = self.id, ?params, "binds");
        match self.connection.execute(sql, &params) {
            Ok(count) => Some(count),
            Err(err) => {
                self.record_error(err);
                None
            }
        }
    }

    /// Insert one row into `table`; true when exactly one row was written.
    pub fn insert_row(&mut self, table: &str, row: &Record) -> bool {
        let compiled = self.expression_factory().insert_into_table(table, row);
        self.expect_one_row(compiled)
    }

    /// Update the row matching `qualifier`; true when exactly one row changed.
    pub fn update_row(&mut self, table: &str, row: &Record, qualifier: &Qualifier) -> bool {
        let compiled = self
            .expression_factory()
            .update_table(table, row, Some(qualifier));
        self.expect_one_row(compiled)
    }

    pub fn delete_rows(&mut self, table: &str, qualifier: &Qualifier) -> Option<usize> {
        match self
            .expression_factory()
            .delete_from_table(table, Some(qualifier))
        {
            Ok(expression) => self.evaluate_update(&expression),
            Err(err) => {
                self.record_error(err);
                None
            }
        }
    }

    fn expect_one_row(&mut self, compiled: Result<SqlExpression<'_>, EoAccessError>) -> bool {
        let expression = match compiled {
            Ok(expression) => expression,
            Err(err) => {
                self.record_error(err);
                return false;
            }
        };
        match self.evaluate_update(&expression) {
            Some(1) => true,
            Some(count) => {
                self.record_error(EoAccessError::ExecutionError(format!(
                    "expected to change one row, changed {count}"
                )));
                false
            }
            None => false,
        }
    }

    /// # Errors
    /// Returns `PoolClosed` for a revoked channel, or the driver error.
    pub fn begin(&mut self) -> Result<(), EoAccessError> {
        self.start_operation()?;
        tracing::debug!(channel = self.id, "begin");
        self.connection.begin()
    }

    /// # Errors
    /// Returns `PoolClosed` for a revoked channel, or the driver error.
    pub fn commit(&mut self) -> Result<(), EoAccessError> {
        self.start_operation()?;
        tracing::debug!(channel = self.id, "commit");
        self.connection.commit()
    }

    /// # Errors
    /// Returns `PoolClosed` for a revoked channel, or the driver error.
    pub fn rollback(&mut self) -> Result<(), EoAccessError> {
        self.start_operation()?;
        tracing::debug!(channel = self.id, "rollback");
        self.connection.rollback()
    }

    /// Run a parameterless script, e.g. schema setup.
    ///
    /// # Errors
    /// Returns `PoolClosed` for a revoked channel, or the driver error.
    pub fn execute_batch(&mut self, sql: &str) -> Result<(), EoAccessError> {
        self.start_operation()?;
        self.connection.execute_batch(sql)
    }

    /// Rollback used by the pool on release; ignores revocation.
    pub(crate) fn force_rollback(&mut self) -> Result<(), EoAccessError> {
        self.connection.rollback()
    }

    pub(crate) fn close(&mut self) -> Result<(), EoAccessError> {
        self.connection.close()
    }

    fn run_query(&mut self, sql: &str, params: &[Value], keys: &[String]) -> Option<ResultSet> {
        if let Err(err) = self.start_operation() {
            self.record_error(err);
            return None;
        }
        tracing::debug!(channel = self.id, sql, "query");
        tracing::trace!(channel = self.id, ?params, "binds");
        let mut results = ResultSet::with_capacity(16);
        if !keys.is_empty() {
            results.set_column_names(Arc::new(keys.to_vec()));
        }
        match self.connection.query(sql, params, &mut results) {
            Ok(()) => Some(results),
            Err(err) => {
                let partial = !results.is_empty();
                self.record_error(err);
                partial.then_some(results)
            }
        }
    }
}

fn bind_values(expression: &SqlExpression<'_>) -> Result<Vec<Value>, EoAccessError> {
    expression
        .bind_variables()
        .iter()
        .map(|bind| match &bind.value {
            Value::Variable(name) => Err(EoAccessError::UnresolvedVariable(name.clone())),
            value => Ok(value.clone()),
        })
        .collect()
}
