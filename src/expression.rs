//! Compile qualifiers, fetch specifications, and row changes into SQL text plus an ordered
//! bind list.
//!
//! One [`SqlExpression`] is built per statement and then handed to a channel. Nothing is
//! shared between expressions, so any number of them can be compiled concurrently.
//!
//! ```rust
//! use eo_access::prelude::*;
//!
//! let person = Entity::builder("Person")
//!     .external_name("person")
//!     .attribute(Attribute::builder("id").external_type("INTEGER"))
//!     .attribute(Attribute::builder("name").column_name("k"))
//!     .primary_key("id")
//!     .build()
//!     .unwrap();
//! let model = Model::connect([person]).unwrap();
//!
//! let spec = FetchSpecification::builder("Person")
//!     .qualifier(Qualifier::equal("name", "value"))
//!     .build();
//! let expr = ExpressionFactory::new(Dialect::Sqlite).select(&model, &spec).unwrap();
//! assert_eq!(
//!     expr.statement(),
//!     "SELECT BASE.id, BASE.k FROM \"person\" AS BASE WHERE BASE.k = ?"
//! );
//! assert_eq!(expr.bind_variables()[0].value, Value::Text("value".into()));
//! ```

use std::collections::BTreeMap;

use crate::error::EoAccessError;
use crate::fetch::FetchSpecification;
use crate::model::{Attribute, Entity, Model, Relationship};
use crate::qualifier::Qualifier;
use crate::results::Record;
use crate::types::{Dialect, Value};

mod alias;
mod dml;
mod pattern;
mod qualifier;
mod select;
mod value;

use alias::AliasTable;

pub use alias::BASE_ALIAS;

/// One positional parameter of a compiled statement.
#[derive(Debug, Clone, PartialEq)]
pub struct BindVariable {
    /// Attribute the value is compared with or written to, when known.
    pub attribute: Option<Attribute>,
    pub value: Value,
    /// Placeholder text as it appears in the statement.
    pub placeholder: String,
    /// Column name plus a per-expression counter, or the placeholder variable's own name.
    pub name: String,
}

/// Creates expressions configured for one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpressionFactory {
    pub dialect: Dialect,
    /// `true`: `LEFT JOIN ... ON` in the FROM clause. `false`: comma-separated tables with the
    /// join conditions appended to the WHERE clause.
    pub includes_joins_in_from_clause: bool,
    /// When off every value is inlined as a literal.
    pub use_bind_variables: bool,
}

impl Default for ExpressionFactory {
    fn default() -> Self {
        Self::new(Dialect::default())
    }
}

impl ExpressionFactory {
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            includes_joins_in_from_clause: true,
            use_bind_variables: true,
        }
    }

    #[must_use]
    pub fn with_joins_in_from_clause(mut self, include: bool) -> Self {
        self.includes_joins_in_from_clause = include;
        self
    }

    #[must_use]
    pub fn with_bind_variables(mut self, use_binds: bool) -> Self {
        self.use_bind_variables = use_binds;
        self
    }

    /// An empty expression for compiling fragments by hand.
    #[must_use]
    pub fn expression<'m>(
        &self,
        model: Option<&'m Model>,
        entity: Option<&'m Entity>,
    ) -> SqlExpression<'m> {
        SqlExpression::new(*self, model, entity, None)
    }

    /// A statement that is executed exactly as written.
    #[must_use]
    pub fn raw(&self, sql: impl Into<String>) -> SqlExpression<'static> {
        let mut expr = SqlExpression::new(*self, None, None, None);
        expr.statement = sql.into();
        expr
    }

    /// Compile a SELECT for `spec` against its entity in `model`.
    ///
    /// # Errors
    /// Returns `ModelError` for an unknown entity, or any compilation error from the
    /// qualifier, attribute list, or custom pattern.
    pub fn select<'m>(
        &self,
        model: &'m Model,
        spec: &FetchSpecification,
    ) -> Result<SqlExpression<'m>, EoAccessError> {
        let entity = model.entity_named(&spec.entity_name)?;
        let mut expr = SqlExpression::new(*self, Some(model), Some(entity.as_ref()), None);
        expr.prepare_select(spec)?;
        Ok(expr)
    }

    /// Compile a SELECT against a bare table; keys are column names.
    ///
    /// # Errors
    /// See [`ExpressionFactory::select`].
    pub fn select_from_table(
        &self,
        table: &str,
        spec: &FetchSpecification,
    ) -> Result<SqlExpression<'static>, EoAccessError> {
        let mut expr = SqlExpression::new(*self, None, None, Some(table));
        expr.prepare_select(spec)?;
        Ok(expr)
    }

    /// # Errors
    /// Returns compilation errors from value formatting.
    pub fn insert<'m>(
        &self,
        entity: &'m Entity,
        row: &Record,
    ) -> Result<SqlExpression<'m>, EoAccessError> {
        let mut expr = SqlExpression::new(*self, None, Some(entity), None).without_aliases();
        expr.prepare_insert(row)?;
        Ok(expr)
    }

    /// # Errors
    /// Returns compilation errors from value formatting or the qualifier.
    pub fn update<'m>(
        &self,
        entity: &'m Entity,
        row: &Record,
        qualifier: Option<&Qualifier>,
    ) -> Result<SqlExpression<'m>, EoAccessError> {
        let mut expr = SqlExpression::new(*self, None, Some(entity), None).without_aliases();
        expr.prepare_update(row, qualifier)?;
        Ok(expr)
    }

    /// # Errors
    /// Returns compilation errors from the qualifier.
    pub fn delete<'m>(
        &self,
        entity: &'m Entity,
        qualifier: Option<&Qualifier>,
    ) -> Result<SqlExpression<'m>, EoAccessError> {
        let mut expr = SqlExpression::new(*self, None, Some(entity), None).without_aliases();
        expr.prepare_delete(qualifier)?;
        Ok(expr)
    }

    /// # Errors
    /// Returns compilation errors from value formatting.
    pub fn insert_into_table(
        &self,
        table: &str,
        row: &Record,
    ) -> Result<SqlExpression<'static>, EoAccessError> {
        let mut expr = SqlExpression::new(*self, None, None, Some(table)).without_aliases();
        expr.prepare_insert(row)?;
        Ok(expr)
    }

    /// # Errors
    /// Returns compilation errors from value formatting or the qualifier.
    pub fn update_table(
        &self,
        table: &str,
        row: &Record,
        qualifier: Option<&Qualifier>,
    ) -> Result<SqlExpression<'static>, EoAccessError> {
        let mut expr = SqlExpression::new(*self, None, None, Some(table)).without_aliases();
        expr.prepare_update(row, qualifier)?;
        Ok(expr)
    }

    /// # Errors
    /// Returns compilation errors from the qualifier.
    pub fn delete_from_table(
        &self,
        table: &str,
        qualifier: Option<&Qualifier>,
    ) -> Result<SqlExpression<'static>, EoAccessError> {
        let mut expr = SqlExpression::new(*self, None, None, Some(table)).without_aliases();
        expr.prepare_delete(qualifier)?;
        Ok(expr)
    }
}

/// A statement under construction, and afterwards its compiled form.
#[derive(Debug)]
pub struct SqlExpression<'m> {
    factory: ExpressionFactory,
    model: Option<&'m Model>,
    entity: Option<&'m Entity>,
    table: Option<String>,
    use_aliases: bool,
    statement: String,
    bind_variables: Vec<BindVariable>,
    aliases: AliasTable<'m>,
    bind_counter: usize,
    selected_keys: Vec<String>,
    warnings: Vec<String>,
}

impl<'m> SqlExpression<'m> {
    fn new(
        factory: ExpressionFactory,
        model: Option<&'m Model>,
        entity: Option<&'m Entity>,
        table: Option<&str>,
    ) -> Self {
        Self {
            factory,
            model,
            entity,
            table: table.map(str::to_string),
            use_aliases: true,
            statement: String::new(),
            bind_variables: Vec::new(),
            aliases: AliasTable::new(),
            bind_counter: 0,
            selected_keys: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn without_aliases(mut self) -> Self {
        self.use_aliases = false;
        self
    }

    #[must_use]
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Bind values in the order their placeholders appear in [`Self::statement`].
    #[must_use]
    pub fn bind_variables(&self) -> &[BindVariable] {
        &self.bind_variables
    }

    /// Relationship path (`""` for the base entity) to table alias.
    #[must_use]
    pub fn aliases(&self) -> &BTreeMap<String, String> {
        self.aliases.aliases()
    }

    /// Alias of `path`, allocating one if the path has not been seen yet.
    pub fn alias_for_path(&mut self, path: &str) -> String {
        self.aliases.alias_for_path(path)
    }

    /// Relationship resolved for a relationship path during compilation.
    #[must_use]
    pub fn relationship_for_path(&self, path: &str) -> Option<&'m Relationship> {
        self.aliases.hop(path).map(|hop| hop.relationship)
    }

    /// Keys for the columns of a SELECT, positionally: attribute names when the entity is
    /// known, column names otherwise.
    #[must_use]
    pub fn selected_keys(&self) -> &[String] {
        &self.selected_keys
    }

    /// Key paths or relationships that could not be resolved while compiling.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    #[must_use]
    pub fn entity(&self) -> Option<&'m Entity> {
        self.entity
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.factory.dialect
    }

    fn warn(&mut self, message: String) {
        tracing::warn!(statement_entity = self.entity.map(Entity::name), "{message}");
        self.warnings.push(message);
    }

    /// Quoted table reference for the statement's single table.
    fn table_sql(&self) -> String {
        match (self.entity, &self.table) {
            (Some(entity), _) => entity.qualified_table_name(self.factory.dialect),
            (None, Some(table)) => self.factory.dialect.quote_identifier(table),
            (None, None) => String::new(),
        }
    }

    /// Unquoted table name, as given by the model or caller.
    fn base_table_name(&self) -> String {
        match (self.entity, &self.table) {
            (Some(entity), _) => entity.external_name().to_string(),
            (None, Some(table)) => table.clone(),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests;
