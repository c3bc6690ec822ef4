use std::collections::HashMap;

use crate::error::EoAccessError;
use crate::types::Dialect;

use super::attribute::Attribute;
use super::relationship::Relationship;

/// Table-level metadata: attributes, relationships, and primary key.
///
/// Built once through [`EntityBuilder`]; lookups are served from indexes computed at build
/// time and nothing is memoized afterwards.
#[derive(Debug, Clone)]
pub struct Entity {
    name: String,
    external_name: String,
    schema_name: Option<String>,
    attributes: Vec<Attribute>,
    relationships: Vec<Relationship>,
    primary_key_names: Vec<String>,
    class_property_names: Vec<String>,
    attribute_index: HashMap<String, usize>,
    relationship_index: HashMap<String, usize>,
}

impl Entity {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> EntityBuilder {
        EntityBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table name, without schema.
    #[must_use]
    pub fn external_name(&self) -> &str {
        &self.external_name
    }

    #[must_use]
    pub fn schema_name(&self) -> Option<&str> {
        self.schema_name.as_deref()
    }

    /// Quoted `schema.table` (or just `table`) for use in SQL.
    #[must_use]
    pub fn qualified_table_name(&self, dialect: Dialect) -> String {
        match &self.schema_name {
            Some(schema) => format!(
                "{}.{}",
                dialect.quote_identifier(schema),
                dialect.quote_identifier(&self.external_name)
            ),
            None => dialect.quote_identifier(&self.external_name),
        }
    }

    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    #[must_use]
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attribute_index.get(name).map(|&i| &self.attributes[i])
    }

    #[must_use]
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationship_index
            .get(name)
            .map(|&i| &self.relationships[i])
    }

    #[must_use]
    pub fn primary_key_names(&self) -> &[String] {
        &self.primary_key_names
    }

    pub fn primary_key_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.primary_key_names
            .iter()
            .filter_map(|name| self.attribute(name))
    }

    /// Attribute and relationship names exposed on objects of this entity.
    #[must_use]
    pub fn class_property_names(&self) -> &[String] {
        &self.class_property_names
    }

    /// Attributes fetched by default: class properties plus primary keys, in declaration order.
    pub fn fetched_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| {
            self.class_property_names.iter().any(|n| n == a.name())
                || self.primary_key_names.iter().any(|n| n == a.name())
        })
    }

    pub(crate) fn replace_relationship(&mut self, relationship: Relationship) {
        if let Some(&i) = self.relationship_index.get(relationship.name()) {
            self.relationships[i] = relationship;
        }
    }
}

/// Fluent builder for [`Entity`].
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    name: String,
    external_name: Option<String>,
    schema_name: Option<String>,
    attributes: Vec<Attribute>,
    relationships: Vec<Relationship>,
    primary_key_names: Vec<String>,
    class_property_names: Option<Vec<String>>,
}

impl EntityBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            external_name: None,
            schema_name: None,
            attributes: Vec::new(),
            relationships: Vec::new(),
            primary_key_names: Vec::new(),
            class_property_names: None,
        }
    }

    #[must_use]
    pub fn external_name(mut self, table: impl Into<String>) -> Self {
        self.external_name = Some(table.into());
        self
    }

    #[must_use]
    pub fn schema_name(mut self, schema: impl Into<String>) -> Self {
        self.schema_name = Some(schema.into());
        self
    }

    #[must_use]
    pub fn attribute(mut self, attribute: impl Into<Attribute>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    #[must_use]
    pub fn relationship(mut self, relationship: impl Into<Relationship>) -> Self {
        self.relationships.push(relationship.into());
        self
    }

    #[must_use]
    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key_names.push(name.into());
        self
    }

    /// Restrict class properties; by default every attribute and relationship is one.
    #[must_use]
    pub fn class_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.class_property_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Validate names and compute lookup indexes.
    ///
    /// # Errors
    /// Returns `EoAccessError::ModelError` for duplicate attribute or relationship names,
    /// or primary keys / class properties that name nothing.
    pub fn build(self) -> Result<Entity, EoAccessError> {
        let mut attribute_index = HashMap::with_capacity(self.attributes.len());
        for (i, attr) in self.attributes.iter().enumerate() {
            if attribute_index.insert(attr.name().to_string(), i).is_some() {
                return Err(EoAccessError::ModelError(format!(
                    "entity {}: duplicate attribute {}",
                    self.name,
                    attr.name()
                )));
            }
        }

        let mut relationship_index = HashMap::with_capacity(self.relationships.len());
        for (i, rel) in self.relationships.iter().enumerate() {
            if attribute_index.contains_key(rel.name())
                || relationship_index.insert(rel.name().to_string(), i).is_some()
            {
                return Err(EoAccessError::ModelError(format!(
                    "entity {}: duplicate property {}",
                    self.name,
                    rel.name()
                )));
            }
        }

        for pk in &self.primary_key_names {
            if !attribute_index.contains_key(pk) {
                return Err(EoAccessError::ModelError(format!(
                    "entity {}: primary key {pk} is not an attribute",
                    self.name
                )));
            }
        }

        let class_property_names = match self.class_property_names {
            Some(names) => {
                if let Some(unknown) = names.iter().find(|n| {
                    !attribute_index.contains_key(n.as_str())
                        && !relationship_index.contains_key(n.as_str())
                }) {
                    return Err(EoAccessError::ModelError(format!(
                        "entity {}: class property {unknown} is not a property",
                        self.name
                    )));
                }
                names
            }
            None => self
                .attributes
                .iter()
                .map(|a| a.name().to_string())
                .chain(self.relationships.iter().map(|r| r.name().to_string()))
                .collect(),
        };

        Ok(Entity {
            external_name: self.external_name.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            schema_name: self.schema_name,
            attributes: self.attributes,
            relationships: self.relationships,
            primary_key_names: self.primary_key_names,
            class_property_names,
            attribute_index,
            relationship_index,
        })
    }
}
