use crate::error::EoAccessError;
use crate::results::ResultSet;
use crate::types::{Dialect, Value};

/// One physical database connection.
///
/// Implementations are driven by exactly one thread at a time; the pool never shares a
/// connection between channels.
pub trait Connection: Send {
    /// Run a query and append its rows to `results`.
    ///
    /// Rows read before a failure stay in `results`. When `results` already carries as many
    /// column names as the statement returns, those names are kept as the record keys.
    ///
    /// # Errors
    /// Returns the driver error that stopped the read.
    fn query(
        &mut self,
        sql: &str,
        params: &[Value],
        results: &mut ResultSet,
    ) -> Result<(), EoAccessError>;

    /// Run a statement and return the number of rows it changed.
    ///
    /// # Errors
    /// Returns the driver error.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize, EoAccessError>;

    /// Run several semicolon-separated statements without parameters.
    ///
    /// # Errors
    /// Returns the driver error.
    fn execute_batch(&mut self, sql: &str) -> Result<(), EoAccessError>;

    /// Leave autocommit mode.
    ///
    /// # Errors
    /// Returns the driver error.
    fn begin(&mut self) -> Result<(), EoAccessError>;

    /// # Errors
    /// Returns the driver error.
    fn commit(&mut self) -> Result<(), EoAccessError>;

    /// # Errors
    /// Returns the driver error.
    fn rollback(&mut self) -> Result<(), EoAccessError>;

    /// `false` while a transaction is open.
    fn is_autocommit(&self) -> bool;

    fn is_closed(&self) -> bool;

    /// Close the physical connection. Closing twice is a no-op.
    ///
    /// # Errors
    /// Returns the driver error; the connection counts as closed either way.
    fn close(&mut self) -> Result<(), EoAccessError>;
}

/// Opens connections for a pool.
pub trait ConnectionFactory: Send + Sync {
    /// Open a new physical connection. Called without any pool lock held.
    ///
    /// # Errors
    /// Returns a connection-level error when the database cannot be reached.
    fn connect(&self) -> Result<Box<dyn Connection>, EoAccessError>;

    /// Dialect spoken by the connections this factory opens.
    fn dialect(&self) -> Dialect;
}
