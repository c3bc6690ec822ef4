use std::collections::HashMap;
use std::sync::Arc;

use crate::database::FetchedObject;
use crate::error::EoAccessError;

use super::Entity;

/// Builds an application object from a fetched row (and its prefetched relations).
pub type Constructor<T> = Arc<dyn Fn(&Entity, FetchedObject) -> T + Send + Sync>;

/// Maps entity names to constructors.
///
/// Passed explicitly to whatever materializes objects, so there is no global class lookup.
pub struct ObjectRegistry<T> {
    constructors: HashMap<String, Constructor<T>>,
    fallback: Option<Constructor<T>>,
}

impl<T> Default for ObjectRegistry<T> {
    fn default() -> Self {
        Self {
            constructors: HashMap::new(),
            fallback: None,
        }
    }
}

impl<T> std::fmt::Debug for ObjectRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.constructors.keys().collect();
        names.sort();
        f.debug_struct("ObjectRegistry")
            .field("entities", &names)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl<T> ObjectRegistry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn register<F>(mut self, entity_name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&Entity, FetchedObject) -> T + Send + Sync + 'static,
    {
        self.constructors
            .insert(entity_name.into(), Arc::new(constructor));
        self
    }

    /// Constructor used for entities without a registered one.
    #[must_use]
    pub fn with_fallback<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&Entity, FetchedObject) -> T + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(constructor));
        self
    }

    #[must_use]
    pub fn contains(&self, entity_name: &str) -> bool {
        self.constructors.contains_key(entity_name)
    }

    /// # Errors
    /// Returns `ModelError` if neither a constructor nor a fallback exists for the entity.
    pub fn construct(&self, entity: &Entity, object: FetchedObject) -> Result<T, EoAccessError> {
        let constructor = self
            .constructors
            .get(entity.name())
            .or(self.fallback.as_ref())
            .ok_or_else(|| {
                EoAccessError::ModelError(format!(
                    "no constructor registered for entity {}",
                    entity.name()
                ))
            })?;
        Ok(constructor(entity, object))
    }
}
