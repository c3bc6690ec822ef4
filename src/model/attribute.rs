/// Column-level metadata for one entity property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    column_name: String,
    external_type: Option<String>,
    allows_null: bool,
    read_format: Option<String>,
    write_format: Option<String>,
}

impl Attribute {
    /// Start building an attribute; the column name defaults to the attribute name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> AttributeBuilder {
        AttributeBuilder::new(name)
    }

    /// Attribute standing for a bare column in model-less statements.
    #[must_use]
    pub fn for_column(column: impl Into<String>) -> Self {
        AttributeBuilder::new(column).finish()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    #[must_use]
    pub fn external_type(&self) -> Option<&str> {
        self.external_type.as_deref()
    }

    #[must_use]
    pub fn allows_null(&self) -> bool {
        self.allows_null
    }

    /// SQL template applied when the column is selected; `%P` is the column reference.
    #[must_use]
    pub fn read_format(&self) -> Option<&str> {
        self.read_format.as_deref()
    }

    /// SQL template applied when the column is written; `%V` is the value.
    #[must_use]
    pub fn write_format(&self) -> Option<&str> {
        self.write_format.as_deref()
    }

    /// Integer and boolean columns are written inline instead of bound.
    #[must_use]
    pub fn inlines_values(&self) -> bool {
        self.external_type.as_deref().is_some_and(|t| {
            let upper = t.trim().to_ascii_uppercase();
            upper.starts_with("INT") || upper.starts_with("BOOL")
        })
    }

    #[must_use]
    pub fn is_date_only(&self) -> bool {
        self.external_type
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("DATE"))
    }
}

/// Fluent builder for [`Attribute`].
#[derive(Debug, Clone)]
pub struct AttributeBuilder {
    attr: Attribute,
}

impl AttributeBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            attr: Attribute {
                column_name: name.clone(),
                name,
                external_type: None,
                allows_null: true,
                read_format: None,
                write_format: None,
            },
        }
    }

    #[must_use]
    pub fn column_name(mut self, column: impl Into<String>) -> Self {
        self.attr.column_name = column.into();
        self
    }

    #[must_use]
    pub fn external_type(mut self, external_type: impl Into<String>) -> Self {
        self.attr.external_type = Some(external_type.into());
        self
    }

    #[must_use]
    pub fn allows_null(mut self, allows_null: bool) -> Self {
        self.attr.allows_null = allows_null;
        self
    }

    #[must_use]
    pub fn read_format(mut self, format: impl Into<String>) -> Self {
        self.attr.read_format = Some(format.into());
        self
    }

    #[must_use]
    pub fn write_format(mut self, format: impl Into<String>) -> Self {
        self.attr.write_format = Some(format.into());
        self
    }

    #[must_use]
    pub fn finish(self) -> Attribute {
        self.attr
    }
}

impl From<AttributeBuilder> for Attribute {
    fn from(builder: AttributeBuilder) -> Self {
        builder.finish()
    }
}
