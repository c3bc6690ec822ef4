//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types so that a single
//! `use eo_access::prelude::*;` is enough to build a model, compile queries and run them.

pub use crate::channel::{Channel, Connection, ConnectionFactory};
pub use crate::config::{ConnectionDictionary, PoolConfig};
pub use crate::database::{
    DataSource, DatabaseChannel, FetchResults, FetchedObject, FetchedRows, Transaction,
};
pub use crate::error::{EoAccessError, ErrorKind, SqlState};
pub use crate::expression::{BindVariable, ExpressionFactory, SqlExpression};
pub use crate::fetch::{FetchSpecification, FetchSpecificationBuilder};
pub use crate::model::{
    Attribute, Entity, Join, JoinSemantic, Model, ObjectRegistry, Relationship,
};
pub use crate::pool::{Pool, PoolMetrics, PoolStatus};
pub use crate::qualifier::{Operator, Qualifier, SortDirection, SortOrdering, like_pattern};
pub use crate::results::{Record, ResultSet};
pub use crate::types::{Dialect, TimeRange, Value};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteConnectionFactory, SqliteOptions, SqliteOptionsBuilder};
