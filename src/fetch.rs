use crate::qualifier::{Qualifier, SortOrdering};

/// Everything needed to fetch rows of one entity.
///
/// ```rust
/// use eo_access::prelude::*;
///
/// let spec = FetchSpecification::builder("Person")
///     .qualifier(Qualifier::key_value("lastName", Operator::Like, "D*"))
///     .sort(SortOrdering::ascending("firstName"))
///     .limit(10)
///     .prefetch("toAddress")
///     .build();
/// assert_eq!(spec.fetch_limit, Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchSpecification {
    pub entity_name: String,
    pub qualifier: Option<Qualifier>,
    pub sort_orderings: Vec<SortOrdering>,
    pub fetch_limit: Option<usize>,
    pub fetch_offset: Option<usize>,
    pub distinct: bool,
    pub locks: bool,
    /// Custom SQL with `%(token)s` placeholders used instead of the generated layout.
    pub raw_sql_pattern: Option<String>,
    /// Relationship paths whose destinations are fetched in batches alongside the rows.
    pub prefetch_paths: Vec<String>,
    /// Attribute names to select; empty means the entity's default attributes.
    pub fetch_attributes: Vec<String>,
}

impl FetchSpecification {
    #[must_use]
    pub fn builder(entity_name: impl Into<String>) -> FetchSpecificationBuilder {
        FetchSpecificationBuilder {
            spec: FetchSpecification {
                entity_name: entity_name.into(),
                ..FetchSpecification::default()
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchSpecificationBuilder {
    spec: FetchSpecification,
}

impl FetchSpecificationBuilder {
    #[must_use]
    pub fn qualifier(mut self, qualifier: Qualifier) -> Self {
        self.spec.qualifier = Some(qualifier);
        self
    }

    #[must_use]
    pub fn sort(mut self, ordering: SortOrdering) -> Self {
        self.spec.sort_orderings.push(ordering);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.spec.fetch_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.spec.fetch_offset = Some(offset);
        self
    }

    #[must_use]
    pub fn distinct(mut self, distinct: bool) -> Self {
        self.spec.distinct = distinct;
        self
    }

    #[must_use]
    pub fn locks(mut self, locks: bool) -> Self {
        self.spec.locks = locks;
        self
    }

    #[must_use]
    pub fn raw_sql_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.spec.raw_sql_pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn prefetch(mut self, path: impl Into<String>) -> Self {
        self.spec.prefetch_paths.push(path.into());
        self
    }

    #[must_use]
    pub fn attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.fetch_attributes = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn build(self) -> FetchSpecification {
        self.spec
    }
}
