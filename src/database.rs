//! Entity-level access on top of a pool: fetch pipelines with relationship prefetching,
//! single-row writes, and transactions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::channel::Channel;
use crate::error::EoAccessError;
use crate::expression::ExpressionFactory;
use crate::fetch::FetchSpecification;
use crate::model::{Entity, Model, ObjectRegistry, Relationship};
use crate::pool::Pool;
use crate::qualifier::{Operator, Qualifier, SortOrdering};
use crate::results::Record;
use crate::types::Value;

/// Join tuples per prefetch query. Keeps bound IN lists well under SQLite's variable limit.
pub const DEFAULT_PREFETCH_BATCH_SIZE: usize = 500;

/// A fetched row together with the relationships prefetched for it.
#[derive(Debug, Clone)]
pub struct FetchedObject {
    pub record: Record,
    /// Prefetched destination objects, by relationship name.
    pub related: HashMap<String, Vec<FetchedObject>>,
}

impl FetchedObject {
    #[must_use]
    pub fn new(record: Record) -> Self {
        Self {
            record,
            related: HashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.record.get(key)
    }

    /// Objects prefetched through `relationship`; empty when it was not prefetched.
    #[must_use]
    pub fn related(&self, relationship: &str) -> &[FetchedObject] {
        self.related.get(relationship).map_or(&[], Vec::as_slice)
    }
}

impl From<Record> for FetchedObject {
    fn from(record: Record) -> Self {
        Self::new(record)
    }
}

/// Rows of a fetch, either still as plain records or materialized with their prefetched
/// relationships.
#[derive(Debug)]
pub enum FetchedRows {
    Streaming(std::vec::IntoIter<Record>),
    Materialized(Vec<FetchedObject>),
}

/// The outcome of a fetch.
///
/// `error` is set when the read failed after some rows were already obtained; those rows
/// are still returned.
#[derive(Debug)]
pub struct FetchResults {
    pub rows: FetchedRows,
    pub error: Option<EoAccessError>,
}

impl FetchResults {
    fn streaming(records: Vec<Record>, error: Option<EoAccessError>) -> Self {
        Self {
            rows: FetchedRows::Streaming(records.into_iter()),
            error,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match &self.rows {
            FetchedRows::Streaming(records) => records.len(),
            FetchedRows::Materialized(objects) => objects.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_materialized(&self) -> bool {
        matches!(self.rows, FetchedRows::Materialized(_))
    }

    /// Take the error that cut the fetch short, if any.
    pub fn take_error(&mut self) -> Option<EoAccessError> {
        self.error.take()
    }

    /// Collect every row as a [`FetchedObject`], dropping the partial-read error.
    #[must_use]
    pub fn into_objects(self) -> Vec<FetchedObject> {
        self.into_iter().collect()
    }
}

/// Iterator over the rows of a [`FetchResults`].
#[derive(Debug)]
pub enum FetchIter {
    Streaming(std::vec::IntoIter<Record>),
    Materialized(std::vec::IntoIter<FetchedObject>),
}

impl Iterator for FetchIter {
    type Item = FetchedObject;

    fn next(&mut self) -> Option<FetchedObject> {
        match self {
            FetchIter::Streaming(records) => records.next().map(FetchedObject::new),
            FetchIter::Materialized(objects) => objects.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            FetchIter::Streaming(records) => records.size_hint(),
            FetchIter::Materialized(objects) => objects.size_hint(),
        }
    }
}

impl IntoIterator for FetchResults {
    type Item = FetchedObject;
    type IntoIter = FetchIter;

    fn into_iter(self) -> FetchIter {
        match self.rows {
            FetchedRows::Streaming(records) => FetchIter::Streaming(records),
            FetchedRows::Materialized(objects) => FetchIter::Materialized(objects.into_iter()),
        }
    }
}

/// Runs entity-level operations on channels drawn from a pool.
///
/// # Examples
/// ```rust,no_run
/// use std::sync::Arc;
/// use eo_access::prelude::*;
///
/// # fn main() -> Result<(), EoAccessError> {
/// # let json = r#"{ "entities": [] }"#;
/// let model = Arc::new(Model::from_json(json)?);
/// let pool = Pool::new(
///     SqliteConnectionFactory::builder("app.db").build(),
///     PoolConfig::default(),
/// )?;
/// let db = DatabaseChannel::new(pool, model);
///
/// let spec = FetchSpecification::builder("Person")
///     .qualifier(Qualifier::equal("name", "Donald"))
///     .prefetch("toManager")
///     .build();
/// for person in db.fetch(&spec)? {
///     println!("{:?} reports to {:?}", person.get("name"), person.related("toManager"));
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseChannel {
    pool: Pool,
    model: Arc<Model>,
    factory: ExpressionFactory,
    prefetch_batch_size: usize,
}

impl DatabaseChannel {
    #[must_use]
    pub fn new(pool: Pool, model: Arc<Model>) -> Self {
        let factory = ExpressionFactory::new(pool.dialect());
        Self {
            pool,
            model,
            factory,
            prefetch_batch_size: DEFAULT_PREFETCH_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_expression_factory(mut self, factory: ExpressionFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Cap the number of parent join tuples sent in one prefetch query (minimum 1).
    #[must_use]
    pub fn with_prefetch_batch_size(mut self, size: usize) -> Self {
        self.prefetch_batch_size = size.max(1);
        self
    }

    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    #[must_use]
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Fetch the rows `spec` selects, prefetching its relationship paths.
    ///
    /// # Errors
    /// Compilation errors, acquisition errors, and SQL errors that produced no rows. A
    /// failure after some rows were read is reported through [`FetchResults::error`].
    pub fn fetch(&self, spec: &FetchSpecification) -> Result<FetchResults, EoAccessError> {
        self.run(|db, channel| db.fetch_on(channel, spec))
    }

    /// Insert one row; keys are attribute names.
    ///
    /// # Errors
    /// Unknown entity, compilation errors, or a statement that did not insert exactly one row.
    pub fn insert(&self, entity_name: &str, row: &Record) -> Result<(), EoAccessError> {
        self.run(|db, channel| db.insert_on(channel, entity_name, row))
    }

    /// Update the rows matching `qualifier`; returns the number changed.
    ///
    /// # Errors
    /// Unknown entity, compilation errors, or the driver error.
    pub fn update(
        &self,
        entity_name: &str,
        row: &Record,
        qualifier: &Qualifier,
    ) -> Result<usize, EoAccessError> {
        self.run(|db, channel| db.update_on(channel, entity_name, row, qualifier))
    }

    /// Delete the rows matching `qualifier`; returns the number removed.
    ///
    /// # Errors
    /// Unknown entity, compilation errors, or the driver error.
    pub fn delete(&self, entity_name: &str, qualifier: &Qualifier) -> Result<usize, EoAccessError> {
        self.run(|db, channel| db.delete_on(channel, entity_name, qualifier))
    }

    /// Run `f` inside a transaction on a single channel: committed when `f` succeeds,
    /// rolled back when it fails.
    ///
    /// # Errors
    /// Errors from `begin`/`commit`, or the error `f` returned.
    pub fn transaction<R>(
        &self,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<R, EoAccessError>,
    ) -> Result<R, EoAccessError> {
        self.run(|db, channel| {
            channel.begin()?;
            let outcome = f(&mut Transaction {
                db,
                channel: &mut *channel,
            });
            match outcome {
                Ok(value) => {
                    channel.commit()?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback_err) = channel.rollback() {
                        tracing::warn!(error = %rollback_err, "rollback after failed transaction");
                    }
                    Err(err)
                }
            }
        })
    }

    fn run<R>(
        &self,
        f: impl FnOnce(&Self, &mut Channel) -> Result<R, EoAccessError>,
    ) -> Result<R, EoAccessError> {
        let mut channel = self.pool.acquire()?;
        let result = f(self, &mut channel);
        match &result {
            Err(err) if err.is_connection_fatal() => self.pool.release_after_error(channel, err),
            _ => self.pool.release(channel, true),
        }
        result
    }

    fn fetch_on(
        &self,
        channel: &mut Channel,
        spec: &FetchSpecification,
    ) -> Result<FetchResults, EoAccessError> {
        let (records, error) = self.fetch_records(channel, spec)?;
        if spec.prefetch_paths.is_empty() || error.is_some() {
            return Ok(FetchResults::streaming(records, error));
        }
        let entity = Arc::clone(self.model.entity_named(&spec.entity_name)?);
        let mut objects: Vec<FetchedObject> = records.into_iter().map(FetchedObject::new).collect();
        for path in &spec.prefetch_paths {
            self.prefetch(channel, &entity, objects.iter_mut().collect(), path)?;
        }
        Ok(FetchResults {
            rows: FetchedRows::Materialized(objects),
            error: None,
        })
    }

    /// Returns the rows read plus the error that interrupted reading, if rows were read
    /// before it.
    fn fetch_records(
        &self,
        channel: &mut Channel,
        spec: &FetchSpecification,
    ) -> Result<(Vec<Record>, Option<EoAccessError>), EoAccessError> {
        let expression = self.factory.select(&self.model, spec)?;
        let rows = channel.evaluate_query(&expression);
        let error = channel.consume_last_error();
        match (rows, error) {
            (Some(rows), error) => Ok((rows.into_records(), error)),
            (None, Some(err)) => Err(err),
            (None, None) => Ok((Vec::new(), None)),
        }
    }

    /// Attach the objects reached by `path` to every object in `objects`.
    fn prefetch(
        &self,
        channel: &mut Channel,
        entity: &Entity,
        mut objects: Vec<&mut FetchedObject>,
        path: &str,
    ) -> Result<(), EoAccessError> {
        if objects.is_empty() {
            return Ok(());
        }
        let (name, rest) = match path.split_once('.') {
            Some((name, rest)) => (name, Some(rest)),
            None => (path, None),
        };
        let relationship = entity.relationship(name).ok_or_else(|| {
            EoAccessError::ModelError(format!(
                "cannot prefetch {path}: {} has no relationship {name}",
                entity.name()
            ))
        })?;
        let hops = self
            .model
            .relationship_hops(entity, relationship)
            .ok_or_else(|| {
                EoAccessError::ModelError(format!("cannot resolve relationship {name}"))
            })?;
        let destination = match hops.last() {
            Some((_, last)) => Arc::clone(self.destination(last)?),
            None => return Ok(()),
        };

        if !objects.iter().all(|object| object.related.contains_key(name)) {
            let parents: Vec<&Record> = objects.iter().map(|object| &object.record).collect();
            let related = self.fetch_through(channel, &hops, &parents)?;
            for (object, children) in objects.iter_mut().zip(related) {
                object.related.insert(
                    name.to_string(),
                    children.into_iter().map(FetchedObject::new).collect(),
                );
            }
        }

        if let Some(rest) = rest {
            let children: Vec<&mut FetchedObject> = objects
                .iter_mut()
                .flat_map(|object| object.related.get_mut(name).into_iter().flatten())
                .collect();
            self.prefetch(channel, &destination, children, rest)?;
        }
        Ok(())
    }

    /// Follow `hops` from each parent; the result is aligned with `parents`.
    fn fetch_through(
        &self,
        channel: &mut Channel,
        hops: &[(&Entity, &Relationship)],
        parents: &[&Record],
    ) -> Result<Vec<Vec<Record>>, EoAccessError> {
        let mut reached: Vec<Vec<Record>> = parents.iter().map(|p| vec![(*p).clone()]).collect();
        for (_, relationship) in hops {
            let frontier: Vec<&Record> = reached.iter().flatten().collect();
            let mut fetched = self.fetch_hop(channel, relationship, &frontier)?.into_iter();
            let mut next = Vec::with_capacity(reached.len());
            for group in &reached {
                let mut children = Vec::new();
                for _ in group {
                    children.extend(fetched.next().unwrap_or_default());
                }
                next.push(children);
            }
            reached = next;
        }
        Ok(reached)
    }

    /// Destinations of `relationship` for every parent, fetched in batches of at most
    /// `prefetch_batch_size` join tuples; the result is aligned with `parents`.
    fn fetch_hop(
        &self,
        channel: &mut Channel,
        relationship: &Relationship,
        parents: &[&Record],
    ) -> Result<Vec<Vec<Record>>, EoAccessError> {
        let destination = self.destination(relationship)?;
        let joins = relationship.joins();
        let parent_keys: Vec<Option<String>> = parents
            .iter()
            .map(|parent| join_key(parent, joins.iter().map(|j| j.source_attribute.as_str())))
            .collect();

        let mut seen = HashSet::new();
        let mut tuples: Vec<Vec<Value>> = Vec::new();
        for (parent, key) in parents.iter().zip(&parent_keys) {
            if key.as_ref().is_some_and(|key| seen.insert(key.clone())) {
                tuples.push(
                    joins
                        .iter()
                        .map(|j| parent.get(&j.source_attribute).cloned().unwrap_or(Value::Null))
                        .collect(),
                );
            }
        }
        if tuples.is_empty() {
            return Ok(vec![Vec::new(); parents.len()]);
        }

        let mut grouped: HashMap<String, Vec<Record>> = HashMap::new();
        let mut rows = 0;
        for batch in tuples.chunks(self.prefetch_batch_size) {
            let spec = FetchSpecification::builder(destination.name())
                .qualifier(hop_qualifier(relationship, batch))
                .build();
            let (records, error) = self.fetch_records(channel, &spec)?;
            if let Some(err) = error {
                return Err(err);
            }
            rows += records.len();
            for record in records {
                let key = join_key(
                    &record,
                    joins.iter().map(|j| j.destination_attribute.as_str()),
                );
                if let Some(key) = key {
                    grouped.entry(key).or_default().push(record);
                }
            }
        }
        tracing::debug!(
            relationship = relationship.name(),
            parents = parents.len(),
            batches = tuples.len().div_ceil(self.prefetch_batch_size),
            rows,
            "prefetched relationship"
        );

        Ok(parent_keys
            .iter()
            .map(|key| {
                key.as_ref()
                    .and_then(|key| grouped.get(key))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect())
    }

    fn destination(&self, relationship: &Relationship) -> Result<&Arc<Entity>, EoAccessError> {
        self.model.destination_entity(relationship).ok_or_else(|| {
            EoAccessError::ModelError(format!(
                "relationship {} has no destination entity",
                relationship.name()
            ))
        })
    }

    fn insert_on(
        &self,
        channel: &mut Channel,
        entity_name: &str,
        row: &Record,
    ) -> Result<(), EoAccessError> {
        let entity = self.model.entity_named(entity_name)?;
        let expression = self.factory.insert(entity, row)?;
        match channel.evaluate_update(&expression) {
            Some(1) => Ok(()),
            Some(count) => Err(EoAccessError::ExecutionError(format!(
                "insert into {entity_name} changed {count} rows"
            ))),
            None => Err(recorded_error(channel)),
        }
    }

    fn update_on(
        &self,
        channel: &mut Channel,
        entity_name: &str,
        row: &Record,
        qualifier: &Qualifier,
    ) -> Result<usize, EoAccessError> {
        let entity = self.model.entity_named(entity_name)?;
        let expression = self.factory.update(entity, row, Some(qualifier))?;
        channel
            .evaluate_update(&expression)
            .ok_or_else(|| recorded_error(channel))
    }

    fn delete_on(
        &self,
        channel: &mut Channel,
        entity_name: &str,
        qualifier: &Qualifier,
    ) -> Result<usize, EoAccessError> {
        let entity = self.model.entity_named(entity_name)?;
        let expression = self.factory.delete(entity, Some(qualifier))?;
        channel
            .evaluate_update(&expression)
            .ok_or_else(|| recorded_error(channel))
    }
}

/// `IN (...)` over the destination attribute for a single join, an OR of ANDs otherwise.
fn hop_qualifier(relationship: &Relationship, tuples: &[Vec<Value>]) -> Qualifier {
    match relationship.joins() {
        [join] => Qualifier::key_value(
            join.destination_attribute.clone(),
            Operator::Contains,
            Value::Array(tuples.iter().flatten().cloned().collect()),
        ),
        joins => Qualifier::or(tuples.iter().map(|tuple| {
            Qualifier::and(
                joins
                    .iter()
                    .zip(tuple)
                    .map(|(j, value)| Qualifier::equal(j.destination_attribute.clone(), value.clone())),
            )
        })),
    }
}

fn recorded_error(channel: &mut Channel) -> EoAccessError {
    channel
        .consume_last_error()
        .unwrap_or_else(|| EoAccessError::ExecutionError("statement failed".into()))
}

/// Key identifying a row by the values of `attributes`; `None` when any is null or missing.
fn join_key<'a>(record: &Record, attributes: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut key = String::new();
    for attribute in attributes {
        let part = record.get(attribute)?.group_key()?;
        if !key.is_empty() {
            key.push('\u{1f}');
        }
        key.push_str(&part);
    }
    Some(key)
}

/// Operations bound to the channel of a running [`DatabaseChannel::transaction`].
pub struct Transaction<'a> {
    db: &'a DatabaseChannel,
    channel: &'a mut Channel,
}

impl Transaction<'_> {
    /// # Errors
    /// See [`DatabaseChannel::fetch`].
    pub fn fetch(&mut self, spec: &FetchSpecification) -> Result<FetchResults, EoAccessError> {
        self.db.fetch_on(self.channel, spec)
    }

    /// # Errors
    /// See [`DatabaseChannel::insert`].
    pub fn insert(&mut self, entity_name: &str, row: &Record) -> Result<(), EoAccessError> {
        self.db.insert_on(self.channel, entity_name, row)
    }

    /// # Errors
    /// See [`DatabaseChannel::update`].
    pub fn update(
        &mut self,
        entity_name: &str,
        row: &Record,
        qualifier: &Qualifier,
    ) -> Result<usize, EoAccessError> {
        self.db.update_on(self.channel, entity_name, row, qualifier)
    }

    /// # Errors
    /// See [`DatabaseChannel::delete`].
    pub fn delete(&mut self, entity_name: &str, qualifier: &Qualifier) -> Result<usize, EoAccessError> {
        self.db.delete_on(self.channel, entity_name, qualifier)
    }

    /// The underlying channel, for statements outside the entity layer.
    pub fn channel(&mut self) -> &mut Channel {
        self.channel
    }
}

/// Fetch and write access scoped to one entity.
#[derive(Debug, Clone)]
pub struct DataSource {
    database: DatabaseChannel,
    entity: Arc<Entity>,
}

impl DataSource {
    /// # Errors
    /// Returns `ModelError` if the model has no entity `entity_name`.
    pub fn new(database: DatabaseChannel, entity_name: &str) -> Result<Self, EoAccessError> {
        let entity = Arc::clone(database.model().entity_named(entity_name)?);
        Ok(Self { database, entity })
    }

    #[must_use]
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    #[must_use]
    pub fn database(&self) -> &DatabaseChannel {
        &self.database
    }

    /// # Errors
    /// See [`DatabaseChannel::fetch`]; a partial read is reported as its error.
    pub fn fetch_objects(
        &self,
        qualifier: Option<Qualifier>,
        orderings: Vec<SortOrdering>,
    ) -> Result<Vec<FetchedObject>, EoAccessError> {
        let mut builder = FetchSpecification::builder(self.entity.name());
        if let Some(qualifier) = qualifier {
            builder = builder.qualifier(qualifier);
        }
        for ordering in orderings {
            builder = builder.sort(ordering);
        }
        self.fetch_specification(&builder.build())
    }

    /// # Errors
    /// See [`DataSource::fetch_objects`].
    pub fn fetch_specification(
        &self,
        spec: &FetchSpecification,
    ) -> Result<Vec<FetchedObject>, EoAccessError> {
        let mut results = self.database.fetch(spec)?;
        if let Some(err) = results.take_error() {
            return Err(err);
        }
        Ok(results.into_objects())
    }

    /// Objects whose attributes equal every value in `values`.
    ///
    /// # Errors
    /// See [`DataSource::fetch_objects`].
    pub fn find_by_matching_all(&self, values: &Record) -> Result<Vec<FetchedObject>, EoAccessError> {
        self.fetch_objects(Some(Qualifier::matching_all(values)), Vec::new())
    }

    /// Objects matching at least one value in `values`.
    ///
    /// # Errors
    /// See [`DataSource::fetch_objects`].
    pub fn find_by_matching_any(&self, values: &Record) -> Result<Vec<FetchedObject>, EoAccessError> {
        self.fetch_objects(Some(Qualifier::matching_any(values)), Vec::new())
    }

    /// Construct typed objects through `registry`.
    ///
    /// # Errors
    /// Fetch errors, or `ModelError` when `registry` cannot build this entity.
    pub fn fetch_objects_with<T>(
        &self,
        registry: &ObjectRegistry<T>,
        qualifier: Option<Qualifier>,
    ) -> Result<Vec<T>, EoAccessError> {
        self.fetch_objects(qualifier, Vec::new())?
            .into_iter()
            .map(|object| registry.construct(&self.entity, object))
            .collect()
    }

    /// # Errors
    /// See [`DatabaseChannel::insert`].
    pub fn insert_object(&self, row: &Record) -> Result<(), EoAccessError> {
        self.database.insert(self.entity.name(), row)
    }

    /// Write the non-key values of `row` to the row identified by its primary key values.
    ///
    /// # Errors
    /// `ModelError` if `row` lacks a primary key value or has nothing else to write, plus
    /// the errors of [`DatabaseChannel::update`].
    pub fn update_object(&self, row: &Record) -> Result<usize, EoAccessError> {
        let keys = self.entity.primary_key_names();
        if keys.is_empty() {
            return Err(EoAccessError::ModelError(format!(
                "{} has no primary key",
                self.entity.name()
            )));
        }
        let mut key_values = Vec::with_capacity(keys.len());
        for key in keys {
            let value = row.get(key).ok_or_else(|| {
                EoAccessError::ModelError(format!(
                    "cannot update {}: missing primary key {key}",
                    self.entity.name()
                ))
            })?;
            key_values.push(Qualifier::equal(key.clone(), value.clone()));
        }
        let changes = Record::from_pairs(
            row.iter()
                .filter(|(name, _)| !keys.iter().any(|key| key.as_str() == *name))
                .map(|(name, value)| (name.to_string(), value.clone())),
        );
        self.database
            .update(self.entity.name(), &changes, &Qualifier::and(key_values))
    }

    /// # Errors
    /// See [`DatabaseChannel::delete`].
    pub fn delete_matching(&self, qualifier: &Qualifier) -> Result<usize, EoAccessError> {
        self.database.delete(self.entity.name(), qualifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::test_utils::{MockConnectionFactory, MockState};

    fn person_model() -> Arc<Model> {
        let person = Entity::builder("Person")
            .external_name("person")
            .attribute(crate::model::Attribute::for_column("id"))
            .attribute(crate::model::Attribute::for_column("name"))
            .primary_key("id")
            .build()
            .unwrap();
        Arc::new(Model::connect([person]).unwrap())
    }

    fn database() -> (DatabaseChannel, Arc<MockState>) {
        let factory = MockConnectionFactory::new();
        let state = factory.state();
        let pool = Pool::new(factory, PoolConfig::default()).unwrap();
        (DatabaseChannel::new(pool, person_model()), state)
    }

    #[test]
    fn fetch_without_prefetch_streams_records() {
        let (db, mock) = database();
        mock.push_result(
            &["id", "name"],
            vec![
                vec![Value::Int(1), Value::from("Donald")],
                vec![Value::Int(2), Value::from("Daisy")],
            ],
        );
        let results = db.fetch(&FetchSpecification::builder("Person").build()).unwrap();
        assert!(!results.is_materialized());
        assert_eq!(results.len(), 2);
        let names: Vec<_> = results
            .into_iter()
            .map(|object| object.get("name").cloned())
            .collect();
        assert_eq!(
            names,
            vec![Some(Value::from("Donald")), Some(Value::from("Daisy"))]
        );
    }

    #[test]
    fn partial_read_keeps_rows_and_error() {
        let (db, mock) = database();
        mock.push_result(
            &["id", "name"],
            vec![
                vec![Value::Int(1), Value::from("Donald")],
                vec![Value::Int(2), Value::from("Daisy")],
            ],
        );
        mock.fail_queries_after(Some(1));
        let mut results = db.fetch(&FetchSpecification::builder("Person").build()).unwrap();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results.take_error(),
            Some(EoAccessError::ExecutionError(_))
        ));
    }

    #[test]
    fn failed_read_without_rows_is_an_error() {
        let (db, mock) = database();
        mock.fail_queries_after(Some(0));
        let result = db.fetch(&FetchSpecification::builder("Person").build());
        assert!(result.is_err());
        assert_eq!(db.pool().status().available, 1);
    }

    #[test]
    fn insert_requires_one_row() {
        let (db, mock) = database();
        let row = Record::from_pairs([("name", Value::from("Donald"))]);
        db.insert("Person", &row).unwrap();
        mock.set_rows_affected(0);
        assert!(db.insert("Person", &row).is_err());
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let (db, mock) = database();
        let result: Result<(), _> = db.transaction(|tx| {
            tx.insert("Person", &Record::from_pairs([("name", Value::from("Huey"))]))?;
            Err(EoAccessError::Other("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(mock.rollbacks(), 1);
    }

    #[test]
    fn update_object_requires_primary_key() {
        let (db, _) = database();
        let source = DataSource::new(db, "Person").unwrap();
        let err = source
            .update_object(&Record::from_pairs([("name", Value::from("Louie"))]))
            .unwrap_err();
        assert!(matches!(err, EoAccessError::ModelError(_)));
        assert!(DataSource::new(source.database().clone(), "Nobody").is_err());
    }

    #[test]
    fn join_key_skips_nulls() {
        let record = Record::from_pairs([("a", Value::Int(1)), ("b", Value::Null)]);
        assert_eq!(join_key(&record, ["a"].into_iter()), Some("i:1".into()));
        assert_eq!(join_key(&record, ["a", "b"].into_iter()), None);
        assert_eq!(join_key(&record, ["c"].into_iter()), None);
    }
}
