use serde::Deserialize;

/// How a join participates when it is written into the WHERE clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinSemantic {
    #[default]
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

impl JoinSemantic {
    /// Legacy comparison operator for WHERE-embedded joins.
    #[must_use]
    pub fn operator(self) -> &'static str {
        match self {
            JoinSemantic::Inner => "=",
            JoinSemantic::LeftOuter => "*=",
            JoinSemantic::RightOuter => "=*",
            JoinSemantic::FullOuter => "*=*",
        }
    }
}

/// Pairs one source attribute with one destination attribute, by attribute name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub source_attribute: String,
    pub destination_attribute: String,
}

impl Join {
    #[must_use]
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source_attribute: source.into(),
            destination_attribute: destination.into(),
        }
    }
}

/// A navigable link from one entity to another.
///
/// A flattened relationship carries a `definition` (a dotted relationship path) instead of
/// joins; its destination is filled in when the model is connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub(crate) name: String,
    pub(crate) to_many: bool,
    pub(crate) joins: Vec<Join>,
    pub(crate) destination: String,
    pub(crate) definition: Option<String>,
    pub(crate) join_semantic: JoinSemantic,
}

impl Relationship {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> RelationshipBuilder {
        RelationshipBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_to_many(&self) -> bool {
        self.to_many
    }

    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Name of the destination entity.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    #[must_use]
    pub fn is_flattened(&self) -> bool {
        self.definition.is_some()
    }

    /// The relationship path a flattened relationship stands for.
    #[must_use]
    pub fn relationship_path(&self) -> Option<&str> {
        self.definition.as_deref()
    }

    #[must_use]
    pub fn join_semantic(&self) -> JoinSemantic {
        self.join_semantic
    }
}

#[derive(Debug, Clone)]
pub struct RelationshipBuilder {
    rel: Relationship,
}

impl RelationshipBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            rel: Relationship {
                name: name.into(),
                to_many: false,
                joins: Vec::new(),
                destination: String::new(),
                definition: None,
                join_semantic: JoinSemantic::default(),
            },
        }
    }

    #[must_use]
    pub fn destination(mut self, entity: impl Into<String>) -> Self {
        self.rel.destination = entity.into();
        self
    }

    #[must_use]
    pub fn to_many(mut self, to_many: bool) -> Self {
        self.rel.to_many = to_many;
        self
    }

    #[must_use]
    pub fn join(mut self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        self.rel.joins.push(Join::new(source, destination));
        self
    }

    /// Make this a flattened relationship over `path` (e.g. `"toRoles.toPerson"`).
    #[must_use]
    pub fn flattened(mut self, path: impl Into<String>) -> Self {
        self.rel.definition = Some(path.into());
        self
    }

    #[must_use]
    pub fn join_semantic(mut self, semantic: JoinSemantic) -> Self {
        self.rel.join_semantic = semantic;
        self
    }

    #[must_use]
    pub fn finish(self) -> Relationship {
        self.rel
    }
}

impl From<RelationshipBuilder> for Relationship {
    fn from(builder: RelationshipBuilder) -> Self {
        builder.finish()
    }
}
