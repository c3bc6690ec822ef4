//! Predicate trees over entity key paths.

use std::collections::HashMap;

use crate::error::EoAccessError;
use crate::results::Record;
use crate::types::Value;

/// Comparison operators available to key/value and key/key qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    /// Membership; compiles to `IN`.
    Contains,
    /// Shell-style pattern (`*`, `?`).
    Like,
    CaseInsensitiveLike,
}

impl Operator {
    /// SQL token for this operator against a non-null operand.
    #[must_use]
    pub fn sql_token(self) -> &'static str {
        match self {
            Operator::EqualTo => "=",
            Operator::NotEqualTo => "<>",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqualTo => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqualTo => "<=",
            Operator::Contains => "IN",
            Operator::Like | Operator::CaseInsensitiveLike => "LIKE",
        }
    }

    /// SQL token when the right-hand side is NULL.
    #[must_use]
    pub fn null_token(self) -> &'static str {
        match self {
            Operator::EqualTo => "IS",
            Operator::NotEqualTo => "IS NOT",
            other => other.sql_token(),
        }
    }

    #[must_use]
    pub fn is_like(self) -> bool {
        matches!(self, Operator::Like | Operator::CaseInsensitiveLike)
    }
}

/// A predicate tree.
///
/// ```rust
/// use eo_access::prelude::*;
///
/// let q = Qualifier::and([
///     Qualifier::key_value("lastName", Operator::Like, "D*"),
///     Qualifier::key_value("toAddress.city", Operator::EqualTo, "Duckburg"),
/// ]);
/// assert_eq!(q.keys(), ["lastName", "toAddress.city"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Qualifier {
    /// `key <op> value`
    KeyValue {
        key: String,
        op: Operator,
        value: Value,
    },
    /// `left <op> right`, both sides key paths
    KeyComparison {
        left: String,
        op: Operator,
        right: String,
    },
    And(Vec<Qualifier>),
    Or(Vec<Qualifier>),
    Not(Box<Qualifier>),
    /// SQL fragments; `Value::Raw` parts are spliced verbatim, other values go through the
    /// normal value path.
    Raw(Vec<Value>),
    /// Tautology (`true`) or contradiction (`false`).
    Boolean(bool),
}

impl Qualifier {
    #[must_use]
    pub fn key_value(key: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Qualifier::KeyValue {
            key: key.into(),
            op,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn equal(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::key_value(key, Operator::EqualTo, value)
    }

    #[must_use]
    pub fn key_comparison(left: impl Into<String>, op: Operator, right: impl Into<String>) -> Self {
        Qualifier::KeyComparison {
            left: left.into(),
            op,
            right: right.into(),
        }
    }

    #[must_use]
    pub fn and(children: impl IntoIterator<Item = Qualifier>) -> Self {
        Qualifier::And(children.into_iter().collect())
    }

    #[must_use]
    pub fn or(children: impl IntoIterator<Item = Qualifier>) -> Self {
        Qualifier::Or(children.into_iter().collect())
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Qualifier) -> Self {
        Qualifier::Not(Box::new(child))
    }

    #[must_use]
    pub fn raw(parts: impl IntoIterator<Item = Value>) -> Self {
        Qualifier::Raw(parts.into_iter().collect())
    }

    /// Every key equals its value.
    #[must_use]
    pub fn matching_all(values: &Record) -> Self {
        Qualifier::And(Self::equalities(values))
    }

    /// At least one key equals its value.
    #[must_use]
    pub fn matching_any(values: &Record) -> Self {
        Qualifier::Or(Self::equalities(values))
    }

    fn equalities(values: &Record) -> Vec<Qualifier> {
        values
            .iter()
            .map(|(key, value)| Self::equal(key, value.clone()))
            .collect()
    }

    /// All key paths mentioned, in first-seen order and without duplicates.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys(&self, keys: &mut Vec<String>) {
        match self {
            Qualifier::KeyValue { key, .. } => push_unique(keys, key),
            Qualifier::KeyComparison { left, right, .. } => {
                push_unique(keys, left);
                push_unique(keys, right);
            }
            Qualifier::And(children) | Qualifier::Or(children) => {
                for child in children {
                    child.collect_keys(keys);
                }
            }
            Qualifier::Not(child) => child.collect_keys(keys),
            Qualifier::Raw(_) | Qualifier::Boolean(_) => {}
        }
    }

    /// Names of `Value::Variable` placeholders still present.
    #[must_use]
    pub fn variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.visit_values(&mut |v| {
            if let Value::Variable(name) = v
                && !names.contains(name)
            {
                names.push(name.clone());
            }
        });
        names
    }

    fn visit_values(&self, f: &mut dyn FnMut(&Value)) {
        match self {
            Qualifier::KeyValue { value, .. } => f(value),
            Qualifier::Raw(parts) => parts.iter().for_each(|p| f(p)),
            Qualifier::And(children) | Qualifier::Or(children) => {
                children.iter().for_each(|c| c.visit_values(f));
            }
            Qualifier::Not(child) => child.visit_values(f),
            Qualifier::KeyComparison { .. } | Qualifier::Boolean(_) => {}
        }
    }

    /// Substitute `Value::Variable` placeholders.
    ///
    /// A key/value node whose variable has no binding is dropped (it compiles to nothing)
    /// unless `requires_all` is set.
    ///
    /// # Errors
    /// Returns `UnresolvedVariable` for the first missing binding when `requires_all` is set.
    pub fn with_bindings(
        &self,
        bindings: &HashMap<String, Value>,
        requires_all: bool,
    ) -> Result<Qualifier, EoAccessError> {
        Ok(match self {
            Qualifier::KeyValue { key, op, value } => match value {
                Value::Variable(name) => match bindings.get(name) {
                    Some(bound) => Qualifier::KeyValue {
                        key: key.clone(),
                        op: *op,
                        value: bound.clone(),
                    },
                    None if requires_all => {
                        return Err(EoAccessError::UnresolvedVariable(name.clone()));
                    }
                    None => Qualifier::And(Vec::new()),
                },
                _ => self.clone(),
            },
            Qualifier::Raw(parts) => {
                let mut out = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        Value::Variable(name) => match bindings.get(name) {
                            Some(bound) => out.push(bound.clone()),
                            None if requires_all => {
                                return Err(EoAccessError::UnresolvedVariable(name.clone()));
                            }
                            None => out.push(part.clone()),
                        },
                        other => out.push(other.clone()),
                    }
                }
                Qualifier::Raw(out)
            }
            Qualifier::And(children) => Qualifier::And(
                children
                    .iter()
                    .map(|c| c.with_bindings(bindings, requires_all))
                    .collect::<Result<_, _>>()?,
            ),
            Qualifier::Or(children) => Qualifier::Or(
                children
                    .iter()
                    .map(|c| c.with_bindings(bindings, requires_all))
                    .collect::<Result<_, _>>()?,
            ),
            Qualifier::Not(child) => {
                Qualifier::Not(Box::new(child.with_bindings(bindings, requires_all)?))
            }
            Qualifier::KeyComparison { .. } | Qualifier::Boolean(_) => self.clone(),
        })
    }
}

fn push_unique(keys: &mut Vec<String>, key: &str) {
    if !keys.iter().any(|existing| existing == key) {
        keys.push(key.to_string());
    }
}

/// Translate a shell-style pattern into a SQL LIKE pattern (`*` to `%`, `?` to `_`).
#[must_use]
pub fn like_pattern(pattern: &str) -> String {
    pattern
        .chars()
        .map(|c| match c {
            '*' => '%',
            '?' => '_',
            other => other,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
    CaseInsensitiveAscending,
    CaseInsensitiveDescending,
}

impl SortDirection {
    #[must_use]
    pub fn is_case_insensitive(self) -> bool {
        matches!(
            self,
            SortDirection::CaseInsensitiveAscending | SortDirection::CaseInsensitiveDescending
        )
    }

    #[must_use]
    pub fn sql_token(self) -> &'static str {
        match self {
            SortDirection::Ascending | SortDirection::CaseInsensitiveAscending => "ASC",
            SortDirection::Descending | SortDirection::CaseInsensitiveDescending => "DESC",
        }
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrdering {
    pub key: String,
    pub direction: SortDirection,
}

impl SortOrdering {
    #[must_use]
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }

    #[must_use]
    pub fn ascending(key: impl Into<String>) -> Self {
        Self::new(key, SortDirection::Ascending)
    }

    #[must_use]
    pub fn descending(key: impl Into<String>) -> Self {
        Self::new(key, SortDirection::Descending)
    }
}
