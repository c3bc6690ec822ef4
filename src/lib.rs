//! Entity-based SQL access: a metadata model of entities, attributes and relationships; a
//! compiler from qualifiers and fetch specifications to dialect-specific SQL with bind
//! variables; and a bounded, self-maintaining channel pool to run it on.
//!
//! ```rust
//! use eo_access::prelude::*;
//!
//! let person = Entity::builder("Person")
//!     .external_name("person")
//!     .attribute(Attribute::builder("id").external_type("INTEGER").finish())
//!     .attribute(Attribute::builder("name").column_name("k").finish())
//!     .primary_key("id")
//!     .build()
//!     .unwrap();
//! let model = Model::connect([person]).unwrap();
//!
//! let spec = FetchSpecification::builder("Person")
//!     .qualifier(Qualifier::equal("name", "Donald"))
//!     .build();
//! let expr = ExpressionFactory::new(Dialect::Sqlite).select(&model, &spec).unwrap();
//! assert!(expr.statement().ends_with("WHERE BASE.k = ?"));
//! assert_eq!(expr.bind_variables().len(), 1);
//! ```

pub mod channel;
pub mod config;
pub mod database;
pub mod error;
pub mod expression;
pub mod fetch;
pub mod model;
pub mod pool;
pub mod prelude;
pub mod qualifier;
pub mod results;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;

pub use channel::{Channel, Connection, ConnectionFactory};
pub use config::{ConnectionDictionary, PoolConfig};
pub use database::{DataSource, DatabaseChannel, FetchResults, FetchedObject, FetchedRows};
pub use error::{EoAccessError, ErrorKind, SqlState};
pub use expression::{BindVariable, ExpressionFactory, SqlExpression};
pub use fetch::FetchSpecification;
pub use model::{Attribute, Entity, Model, ObjectRegistry, Relationship};
pub use pool::{Pool, PoolMetrics, PoolStatus};
pub use qualifier::{Operator, Qualifier, SortDirection, SortOrdering};
pub use results::{Record, ResultSet};
pub use types::{Dialect, TimeRange, Value};
