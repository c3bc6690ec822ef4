//! Entity metadata consumed by the expression builder.
//!
//! Metadata is assembled from builders (or a JSON [`ModelDescription`]) and then connected
//! once with [`Model::connect`]; after that it is read-only and freely shared.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EoAccessError;

mod attribute;
mod description;
mod entity;
mod registry;
mod relationship;

pub use attribute::{Attribute, AttributeBuilder};
pub use description::{
    AttributeDescription, EntityDescription, ModelDescription, RelationshipDescription,
};
pub use entity::{Entity, EntityBuilder};
pub use registry::{Constructor, ObjectRegistry};
pub use relationship::{Join, JoinSemantic, Relationship, RelationshipBuilder};

// Guards against flattened relationships that (indirectly) refer to themselves.
const MAX_FLATTENING_DEPTH: usize = 16;

/// A connected set of entities.
#[derive(Debug, Clone, Default)]
pub struct Model {
    entities: HashMap<String, Arc<Entity>>,
}

impl Model {
    /// Resolve every relationship against its destination entity.
    ///
    /// This is the only place destinations are looked up by name; compiled queries rely on
    /// the checks done here.
    ///
    /// # Errors
    /// Returns `EoAccessError::ModelError` for duplicate entities, unknown destinations,
    /// join attributes missing on either side, or flattened paths that do not resolve.
    pub fn connect<I>(entities: I) -> Result<Self, EoAccessError>
    where
        I: IntoIterator<Item = Entity>,
    {
        let mut by_name: HashMap<String, Entity> = HashMap::new();
        for entity in entities {
            let name = entity.name().to_string();
            if by_name.insert(name.clone(), entity).is_some() {
                return Err(EoAccessError::ModelError(format!("duplicate entity {name}")));
            }
        }

        for entity in by_name.values() {
            for rel in entity.relationships().iter().filter(|r| !r.is_flattened()) {
                validate_joins(&by_name, entity, rel)?;
            }
        }

        let mut resolved: Vec<(String, Relationship)> = Vec::new();
        for entity in by_name.values() {
            for rel in entity.relationships().iter().filter(|r| r.is_flattened()) {
                let destination = flattened_destination(&by_name, entity, rel, 0)?;
                if !rel.destination.is_empty() && rel.destination != destination {
                    return Err(EoAccessError::ModelError(format!(
                        "{}.{}: declared destination {} but path leads to {destination}",
                        entity.name(),
                        rel.name(),
                        rel.destination
                    )));
                }
                let mut rel = rel.clone();
                rel.destination = destination;
                resolved.push((entity.name().to_string(), rel));
            }
        }
        for (entity_name, rel) in resolved {
            if let Some(entity) = by_name.get_mut(&entity_name) {
                entity.replace_relationship(rel);
            }
        }

        tracing::debug!(entities = by_name.len(), "model connected");
        Ok(Self {
            entities: by_name
                .into_iter()
                .map(|(name, entity)| (name, Arc::new(entity)))
                .collect(),
        })
    }

    /// Parse a JSON model description and connect it.
    ///
    /// # Errors
    /// Returns `ModelError` for malformed JSON or anything [`Model::connect`] rejects.
    pub fn from_json(json: &str) -> Result<Self, EoAccessError> {
        let description: ModelDescription = serde_json::from_str(json)
            .map_err(|e| EoAccessError::ModelError(format!("invalid model description: {e}")))?;
        description.into_model()
    }

    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&Arc<Entity>> {
        self.entities.get(name)
    }

    /// # Errors
    /// Returns `ModelError` when no entity has this name.
    pub fn entity_named(&self, name: &str) -> Result<&Arc<Entity>, EoAccessError> {
        self.entity(name)
            .ok_or_else(|| EoAccessError::ModelError(format!("unknown entity {name}")))
    }

    pub fn entities(&self) -> impl Iterator<Item = &Arc<Entity>> {
        self.entities.values()
    }

    #[must_use]
    pub fn destination_entity(&self, relationship: &Relationship) -> Option<&Arc<Entity>> {
        self.entities.get(relationship.destination())
    }

    /// Expand a relationship into the plain (non-flattened) hops it stands for, each paired
    /// with its source entity.
    #[must_use]
    pub fn relationship_hops<'a>(
        &'a self,
        source: &'a Entity,
        relationship: &'a Relationship,
    ) -> Option<Vec<(&'a Entity, &'a Relationship)>> {
        let mut hops = Vec::new();
        self.collect_hops(source, relationship, 0, &mut hops)
            .then_some(hops)
    }

    fn collect_hops<'a>(
        &'a self,
        source: &'a Entity,
        relationship: &'a Relationship,
        depth: usize,
        hops: &mut Vec<(&'a Entity, &'a Relationship)>,
    ) -> bool {
        if depth > MAX_FLATTENING_DEPTH {
            return false;
        }
        let Some(path) = relationship.relationship_path() else {
            hops.push((source, relationship));
            return true;
        };
        let mut current = source;
        for component in path.split('.') {
            let Some(rel) = current.relationship(component) else {
                return false;
            };
            if !self.collect_hops(current, rel, depth + 1, hops) {
                return false;
            }
            let Some(next) = self.destination_entity(rel) else {
                return false;
            };
            current = next.as_ref();
        }
        true
    }
}

fn validate_joins(
    entities: &HashMap<String, Entity>,
    source: &Entity,
    rel: &Relationship,
) -> Result<(), EoAccessError> {
    let destination = entities.get(rel.destination()).ok_or_else(|| {
        EoAccessError::ModelError(format!(
            "{}.{}: unknown destination entity {:?}",
            source.name(),
            rel.name(),
            rel.destination()
        ))
    })?;
    if rel.joins().is_empty() {
        return Err(EoAccessError::ModelError(format!(
            "{}.{}: relationship has no joins",
            source.name(),
            rel.name()
        )));
    }
    for join in rel.joins() {
        if source.attribute(&join.source_attribute).is_none() {
            return Err(EoAccessError::ModelError(format!(
                "{}.{}: join source {} is not an attribute of {}",
                source.name(),
                rel.name(),
                join.source_attribute,
                source.name()
            )));
        }
        if destination.attribute(&join.destination_attribute).is_none() {
            return Err(EoAccessError::ModelError(format!(
                "{}.{}: join destination {} is not an attribute of {}",
                source.name(),
                rel.name(),
                join.destination_attribute,
                destination.name()
            )));
        }
    }
    Ok(())
}

fn flattened_destination(
    entities: &HashMap<String, Entity>,
    source: &Entity,
    rel: &Relationship,
    depth: usize,
) -> Result<String, EoAccessError> {
    let Some(path) = rel.relationship_path() else {
        return Ok(rel.destination().to_string());
    };
    if depth > MAX_FLATTENING_DEPTH {
        return Err(EoAccessError::ModelError(format!(
            "{}.{}: flattened relationship is cyclic",
            source.name(),
            rel.name()
        )));
    }
    let mut current = source;
    let mut destination = String::new();
    for component in path.split('.') {
        let hop = current.relationship(component).ok_or_else(|| {
            EoAccessError::ModelError(format!(
                "{}.{}: {component} is not a relationship of {}",
                source.name(),
                rel.name(),
                current.name()
            ))
        })?;
        destination = flattened_destination(entities, current, hop, depth + 1)?;
        current = entities.get(&destination).ok_or_else(|| {
            EoAccessError::ModelError(format!(
                "{}.{}: unknown destination entity {destination:?}",
                source.name(),
                rel.name()
            ))
        })?;
    }
    Ok(destination)
}
