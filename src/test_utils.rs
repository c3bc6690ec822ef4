//! In-memory connection doubles for exercising pools and channels without a database.
//!
//! A [`MockConnectionFactory`] shares one [`MockState`] with every connection it opens, so a
//! test keeps a handle to the state, moves the factory into a pool, and then scripts failures
//! and inspects counters through the state.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::channel::{Connection, ConnectionFactory};
use crate::error::EoAccessError;
use crate::results::ResultSet;
use crate::types::{Dialect, Value};

type ScriptedRows = (Vec<String>, Vec<Vec<Value>>);

/// Counters and scripted behaviour shared by a factory and its connections.
#[derive(Debug, Default)]
pub struct MockState {
    opened: AtomicUsize,
    closed: AtomicUsize,
    rollbacks: AtomicUsize,
    failing_opens: AtomicUsize,
    failing_rollbacks: AtomicBool,
    generation: AtomicU64,
    rows_affected: AtomicUsize,
    fail_queries_after: Mutex<Option<usize>>,
    results: Mutex<VecDeque<ScriptedRows>>,
    statements: Mutex<Vec<String>>,
}

impl MockState {
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    /// Fail the next `count` connection opens.
    pub fn fail_next_opens(&self, count: usize) {
        self.failing_opens.store(count, Ordering::SeqCst);
    }

    pub fn fail_rollbacks(&self, fail: bool) {
        self.failing_rollbacks.store(fail, Ordering::SeqCst);
    }

    /// Make every connection opened so far report itself closed.
    pub fn break_open_connections(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Rows returned by the next query; queries with nothing queued return no rows.
    pub fn push_result(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns = columns.iter().map(ToString::to_string).collect();
        self.results.lock().push_back((columns, rows));
    }

    /// Make queries fail after delivering `rows` rows, or succeed again with `None`.
    pub fn fail_queries_after(&self, rows: Option<usize>) {
        *self.fail_queries_after.lock() = rows;
    }

    pub fn set_rows_affected(&self, rows: usize) {
        self.rows_affected.store(rows, Ordering::SeqCst);
    }

    /// Every statement run so far, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    fn record(&self, sql: &str) {
        self.statements.lock().push(sql.to_string());
    }
}

#[derive(Debug)]
pub struct MockConnection {
    state: Arc<MockState>,
    generation: u64,
    closed: bool,
    autocommit: bool,
}

impl MockConnection {
    fn check_open(&self) -> Result<(), EoAccessError> {
        if self.is_closed() {
            return Err(EoAccessError::ConnectionError("connection is closed".into()));
        }
        Ok(())
    }
}

impl Connection for MockConnection {
    fn query(
        &mut self,
        sql: &str,
        _params: &[Value],
        results: &mut ResultSet,
    ) -> Result<(), EoAccessError> {
        self.check_open()?;
        self.state.record(sql);
        let (columns, rows) = self.state.results.lock().pop_front().unwrap_or_default();
        if results
            .get_column_names()
            .is_none_or(|names| names.len() != columns.len())
        {
            results.set_column_names(Arc::new(columns));
        }
        let fail_after = *self.state.fail_queries_after.lock();
        for (index, row) in rows.into_iter().enumerate() {
            if fail_after.is_some_and(|limit| index >= limit) {
                break;
            }
            results.add_row_values(row);
        }
        match fail_after {
            Some(_) => Err(EoAccessError::ExecutionError(format!("scripted failure: {sql}"))),
            None => Ok(()),
        }
    }

    fn execute(&mut self, sql: &str, _params: &[Value]) -> Result<usize, EoAccessError> {
        self.check_open()?;
        self.state.record(sql);
        if self.state.fail_queries_after.lock().is_some() {
            return Err(EoAccessError::ExecutionError(format!("scripted failure: {sql}")));
        }
        Ok(self.state.rows_affected.load(Ordering::SeqCst))
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), EoAccessError> {
        self.execute(sql, &[]).map(|_| ())
    }

    fn begin(&mut self) -> Result<(), EoAccessError> {
        self.check_open()?;
        self.autocommit = false;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), EoAccessError> {
        self.check_open()?;
        self.autocommit = true;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), EoAccessError> {
        self.state.rollbacks.fetch_add(1, Ordering::SeqCst);
        if self.state.failing_rollbacks.load(Ordering::SeqCst) {
            return Err(EoAccessError::ConnectionError("scripted rollback failure".into()));
        }
        self.autocommit = true;
        Ok(())
    }

    fn is_autocommit(&self) -> bool {
        self.autocommit
    }

    fn is_closed(&self) -> bool {
        self.closed || self.generation < self.state.generation.load(Ordering::SeqCst)
    }

    fn close(&mut self) -> Result<(), EoAccessError> {
        if !self.closed {
            self.closed = true;
            self.state.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Opens [`MockConnection`]s sharing one [`MockState`].
#[derive(Debug, Clone)]
pub struct MockConnectionFactory {
    state: Arc<MockState>,
    dialect: Dialect,
}

impl Default for MockConnectionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnectionFactory {
    #[must_use]
    pub fn new() -> Self {
        let state = MockState::default();
        state.set_rows_affected(1);
        Self {
            state: Arc::new(state),
            dialect: Dialect::Sqlite,
        }
    }

    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    #[must_use]
    pub fn state(&self) -> Arc<MockState> {
        Arc::clone(&self.state)
    }
}

impl ConnectionFactory for MockConnectionFactory {
    fn connect(&self) -> Result<Box<dyn Connection>, EoAccessError> {
        let failing = self
            .state
            .failing_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(EoAccessError::ConnectionError("scripted open failure".into()));
        }
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
            generation: self.state.generation.load(Ordering::SeqCst),
            closed: false,
            autocommit: true,
        }))
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}
