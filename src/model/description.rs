use serde::Deserialize;

use crate::config::ConnectionDictionary;
use crate::error::EoAccessError;

use super::{Attribute, Entity, JoinSemantic, Model, Relationship};

/// Serialized form of a model, e.g. loaded from a JSON file next to the application.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescription {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub connection: Option<ConnectionDictionary>,
    pub entities: Vec<EntityDescription>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDescription {
    pub name: String,
    #[serde(default, alias = "tableName")]
    pub external_name: Option<String>,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDescription>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDescription>,
    #[serde(default)]
    pub primary_key_names: Vec<String>,
    #[serde(default)]
    pub class_properties: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDescription {
    pub name: String,
    #[serde(default)]
    pub column_name: Option<String>,
    #[serde(default)]
    pub external_type: Option<String>,
    #[serde(default = "default_allows_null")]
    pub allows_null: bool,
    #[serde(default)]
    pub read_format: Option<String>,
    #[serde(default)]
    pub write_format: Option<String>,
}

fn default_allows_null() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDescription {
    pub name: String,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub is_to_many: bool,
    #[serde(default)]
    pub joins: Vec<JoinDescription>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub join_semantic: JoinSemantic,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDescription {
    pub source_attribute: String,
    pub destination_attribute: String,
}

impl ModelDescription {
    /// Build every entity and connect them.
    ///
    /// # Errors
    /// Returns `ModelError` from entity building or [`Model::connect`].
    pub fn into_model(self) -> Result<Model, EoAccessError> {
        let entities = self
            .entities
            .into_iter()
            .map(EntityDescription::into_entity)
            .collect::<Result<Vec<_>, _>>()?;
        Model::connect(entities)
    }
}

impl EntityDescription {
    fn into_entity(self) -> Result<Entity, EoAccessError> {
        let mut builder = Entity::builder(self.name);
        if let Some(table) = self.external_name {
            builder = builder.external_name(table);
        }
        if let Some(schema) = self.schema_name {
            builder = builder.schema_name(schema);
        }
        for attr in self.attributes {
            let mut ab = Attribute::builder(attr.name).allows_null(attr.allows_null);
            if let Some(column) = attr.column_name {
                ab = ab.column_name(column);
            }
            if let Some(t) = attr.external_type {
                ab = ab.external_type(t);
            }
            if let Some(f) = attr.read_format {
                ab = ab.read_format(f);
            }
            if let Some(f) = attr.write_format {
                ab = ab.write_format(f);
            }
            builder = builder.attribute(ab);
        }
        for rel in self.relationships {
            let mut rb = Relationship::builder(rel.name)
                .to_many(rel.is_to_many)
                .join_semantic(rel.join_semantic);
            if let Some(dest) = rel.destination {
                rb = rb.destination(dest);
            }
            if let Some(path) = rel.definition {
                rb = rb.flattened(path);
            }
            for join in rel.joins {
                rb = rb.join(join.source_attribute, join.destination_attribute);
            }
            builder = builder.relationship(rb);
        }
        for pk in self.primary_key_names {
            builder = builder.primary_key(pk);
        }
        if let Some(props) = self.class_properties {
            builder = builder.class_properties(props);
        }
        builder.build()
    }
}
