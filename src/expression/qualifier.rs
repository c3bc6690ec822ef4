use crate::error::EoAccessError;
use crate::model::{Attribute, Entity};
use crate::qualifier::{like_pattern, Operator, Qualifier};
use crate::types::{TimeRange, Value};

use super::alias::{ResolvedHop, BASE_ALIAS};
use super::SqlExpression;

const ALWAYS_TRUE: &str = "1 = 1";
const ALWAYS_FALSE: &str = "1 = 2";

impl<'m> SqlExpression<'m> {
    /// Compile a qualifier to WHERE-clause text, appending its bind values.
    ///
    /// Returns an empty string for a qualifier with nothing left to test (an empty `And`,
    /// or a `Not` over one).
    ///
    /// # Errors
    /// Returns `UnsupportedCompositeKey` for multi-key identifiers, `CompilationError` for
    /// operands an operator cannot take, and errors from value formatting.
    pub fn sql_for_qualifier(&mut self, qualifier: &Qualifier) -> Result<String, EoAccessError> {
        match qualifier {
            Qualifier::KeyValue { key, op, value } => self.sql_for_key_value(key, *op, value),
            Qualifier::KeyComparison { left, op, right } => {
                let (left, _) = self.sql_for_key_path(left);
                let (right, _) = self.sql_for_key_path(right);
                Ok(format!("{left} {} {right}", op.sql_token()))
            }
            Qualifier::And(children) => self.sql_for_junction(children, " AND "),
            Qualifier::Or(children) => self.sql_for_junction(children, " OR "),
            Qualifier::Not(child) => {
                let inner = self.sql_for_qualifier(child)?;
                if inner.is_empty() {
                    Ok(inner)
                } else {
                    Ok(format!("NOT ({inner})"))
                }
            }
            Qualifier::Raw(parts) => {
                let mut sql = String::new();
                for part in parts {
                    sql.push_str(&self.sql_for_value(part, None)?);
                }
                Ok(sql)
            }
            Qualifier::Boolean(true) => Ok(ALWAYS_TRUE.to_string()),
            Qualifier::Boolean(false) => Ok(ALWAYS_FALSE.to_string()),
        }
    }

    fn sql_for_junction(
        &mut self,
        children: &[Qualifier],
        separator: &str,
    ) -> Result<String, EoAccessError> {
        let mut parts = Vec::with_capacity(children.len());
        for child in children {
            let sql = self.sql_for_qualifier(child)?;
            if !sql.is_empty() {
                parts.push(format!("({sql})"));
            }
        }
        Ok(parts.join(separator))
    }

    fn sql_for_key_value(
        &mut self,
        key: &str,
        op: Operator,
        value: &Value,
    ) -> Result<String, EoAccessError> {
        let (column, attribute) = self.sql_for_key_path(key);
        let value = value.unwrap_global_id()?;
        match (op, value) {
            (_, Value::Range(range)) => self.sql_for_range(&column, op, range, attribute),
            (Operator::Contains, Value::Array(items)) if items.is_empty() => {
                Ok(ALWAYS_FALSE.to_string())
            }
            (Operator::Contains, Value::Array(_)) => {
                let list = self.sql_for_value(value, attribute)?;
                Ok(format!("{column} IN {list}"))
            }
            (Operator::Contains, scalar) => {
                let item = self.sql_for_value(scalar, attribute)?;
                Ok(format!("{column} IN ({item})"))
            }
            (_, Value::Array(_)) => Err(EoAccessError::CompilationError(format!(
                "{key}: a list operand requires the contains operator"
            ))),
            (_, Value::Null) => Ok(format!("{column} {} NULL", op.null_token())),
            (Operator::Like, Value::Text(pattern)) => {
                let value = self.sql_for_value(&Value::Text(like_pattern(pattern)), attribute)?;
                Ok(format!("{column} LIKE {value}"))
            }
            (Operator::CaseInsensitiveLike, operand) => {
                let operand = match operand {
                    Value::Text(pattern) => Value::Text(like_pattern(pattern)),
                    other => other.clone(),
                };
                let value = self.sql_for_value(&operand, attribute)?;
                Ok(format!("UPPER({column}) LIKE UPPER({value})"))
            }
            (op, operand) => {
                let value = self.sql_for_value(operand, attribute)?;
                Ok(format!("{column} {} {value}", op.sql_token()))
            }
        }
    }

    /// Ranges are half-open: `[start, end)`.
    fn sql_for_range(
        &mut self,
        column: &str,
        op: Operator,
        range: &TimeRange,
        attribute: Option<&'m Attribute>,
    ) -> Result<String, EoAccessError> {
        match op {
            Operator::EqualTo | Operator::Contains => {
                if range.is_empty() {
                    return Ok(ALWAYS_FALSE.to_string());
                }
                if range.is_unbounded() {
                    return Ok(ALWAYS_TRUE.to_string());
                }
                let mut parts = Vec::with_capacity(2);
                if let Some(start) = range.start {
                    let v = self.sql_for_value(&Value::Timestamp(start), attribute)?;
                    parts.push(format!("{column} >= {v}"));
                }
                if let Some(end) = range.end {
                    let v = self.sql_for_value(&Value::Timestamp(end), attribute)?;
                    parts.push(format!("{column} < {v}"));
                }
                Ok(parts.join(" AND "))
            }
            Operator::NotEqualTo => {
                if range.is_empty() {
                    return Ok(ALWAYS_TRUE.to_string());
                }
                if range.is_unbounded() {
                    return Ok(ALWAYS_FALSE.to_string());
                }
                let mut parts = Vec::with_capacity(2);
                if let Some(start) = range.start {
                    let v = self.sql_for_value(&Value::Timestamp(start), attribute)?;
                    parts.push(format!("{column} < {v}"));
                }
                if let Some(end) = range.end {
                    let v = self.sql_for_value(&Value::Timestamp(end), attribute)?;
                    parts.push(format!("{column} >= {v}"));
                }
                Ok(parts.join(" OR "))
            }
            Operator::GreaterThan | Operator::GreaterThanOrEqualTo => match range.end {
                Some(end) => {
                    let v = self.sql_for_value(&Value::Timestamp(end), attribute)?;
                    Ok(format!("{column} >= {v}"))
                }
                None => Ok(ALWAYS_FALSE.to_string()),
            },
            Operator::LessThan | Operator::LessThanOrEqualTo => match range.start {
                Some(start) => {
                    let v = self.sql_for_value(&Value::Timestamp(start), attribute)?;
                    Ok(format!("{column} < {v}"))
                }
                None => Ok(ALWAYS_FALSE.to_string()),
            },
            Operator::Like | Operator::CaseInsensitiveLike => Err(EoAccessError::CompilationError(
                "a time range cannot be matched with LIKE".into(),
            )),
        }
    }

    /// Column reference for a key path, plus the attribute it ends on when known.
    ///
    /// Paths that do not resolve are recorded in [`SqlExpression::warnings`] and emitted as
    /// written.
    pub fn sql_for_key_path(&mut self, key: &str) -> (String, Option<&'m Attribute>) {
        let Some(entity) = self.entity else {
            let column = self.quote_column(key);
            return (self.qualify_column(BASE_ALIAS, column), None);
        };

        let Some((prefix, attribute_name)) = key.rsplit_once('.') else {
            return match entity.attribute(key) {
                Some(attribute) => (self.column_ref(BASE_ALIAS, attribute), Some(attribute)),
                None => {
                    self.warn(format!("{key} is not an attribute of {}", entity.name()));
                    (key.to_string(), None)
                }
            };
        };

        if !self.use_aliases {
            self.warn(format!("{key}: relationship paths need a joined statement"));
            return (key.to_string(), None);
        }
        let Some((path, destination)) = self.resolve_relationship_prefix(entity, prefix) else {
            return (key.to_string(), None);
        };
        match destination.attribute(attribute_name) {
            Some(attribute) => {
                let alias = self.aliases.alias_for_path(&path);
                (self.column_ref(&alias, attribute), Some(attribute))
            }
            None => {
                self.warn(format!(
                    "{key}: {attribute_name} is not an attribute of {}",
                    destination.name()
                ));
                (key.to_string(), None)
            }
        }
    }

    /// Walk a dotted relationship prefix, expanding flattened relationships into their
    /// hops. Returns the expanded path and the entity it ends on.
    pub(crate) fn resolve_relationship_prefix(
        &mut self,
        entity: &'m Entity,
        prefix: &str,
    ) -> Option<(String, &'m Entity)> {
        if let Some((path, destination)) = self.aliases.cached_prefix(prefix) {
            return Some((path.clone(), *destination));
        }
        let Some(model) = self.model else {
            self.warn(format!("{prefix}: relationship paths need a model"));
            return None;
        };

        let mut current = entity;
        let mut path = String::new();
        for name in prefix.split('.') {
            let Some(relationship) = current.relationship(name) else {
                self.warn(format!(
                    "{prefix}: {name} is not a relationship of {}",
                    current.name()
                ));
                return None;
            };
            let Some(hops) = model.relationship_hops(current, relationship) else {
                self.warn(format!("{prefix}: {name} does not resolve"));
                return None;
            };
            for (source, hop) in hops {
                let Some(destination) = model.destination_entity(hop) else {
                    self.warn(format!(
                        "{prefix}: unknown destination {}",
                        hop.destination()
                    ));
                    return None;
                };
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(hop.name());
                self.aliases.insert_hop(
                    &path,
                    ResolvedHop {
                        source,
                        relationship: hop,
                        destination: destination.as_ref(),
                    },
                );
                self.aliases.alias_for_path(&path);
                current = destination.as_ref();
            }
        }
        self.aliases.cache_prefix(prefix, path.clone(), current);
        Some((path, current))
    }

    pub(crate) fn column_ref(&self, alias: &str, attribute: &Attribute) -> String {
        let column = self.quote_column(attribute.column_name());
        self.qualify_column(alias, column)
    }

    fn qualify_column(&self, alias: &str, column: String) -> String {
        if self.use_aliases {
            format!("{alias}.{column}")
        } else {
            column
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::expression::ExpressionFactory;
    use crate::types::Dialect;

    fn person() -> Entity {
        Entity::builder("Person")
            .external_name("person")
            .attribute(Attribute::builder("id").external_type("INTEGER"))
            .attribute(Attribute::builder("name").column_name("k"))
            .attribute(Attribute::builder("born").external_type("TIMESTAMP"))
            .primary_key("id")
            .build()
            .unwrap()
    }

    fn ts(day: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn key_value_binds_one_value() {
        let entity = person();
        let mut expr = ExpressionFactory::default().expression(None, Some(&entity));
        let sql = expr
            .sql_for_qualifier(&Qualifier::equal("name", "value"))
            .unwrap();
        assert_eq!(sql, "BASE.k = ?");
        assert_eq!(expr.bind_variables().len(), 1);
        assert_eq!(expr.bind_variables()[0].value, Value::Text("value".into()));
        assert_eq!(expr.bind_variables()[0].name, "k0");
    }

    #[test]
    fn empty_contains_is_false() {
        let entity = person();
        let mut expr = ExpressionFactory::default().expression(None, Some(&entity));
        let q = Qualifier::key_value("id", Operator::Contains, Value::Array(vec![]));
        assert_eq!(expr.sql_for_qualifier(&q).unwrap(), "1 = 2");
        assert!(expr.bind_variables().is_empty());
    }

    #[test]
    fn contains_builds_in_list() {
        let entity = person();
        let mut expr = ExpressionFactory::default().expression(None, Some(&entity));
        let q = Qualifier::key_value(
            "name",
            Operator::Contains,
            Value::Array(vec!["a".into(), "b".into()]),
        );
        assert_eq!(expr.sql_for_qualifier(&q).unwrap(), "BASE.k IN (?, ?)");
        assert_eq!(expr.bind_variables().len(), 2);

        let q = Qualifier::key_value("id", Operator::Contains, Value::Int(4));
        assert_eq!(expr.sql_for_qualifier(&q).unwrap(), "BASE.id IN (4)");
    }

    #[test]
    fn empty_children_are_dropped() {
        let entity = person();
        let mut expr = ExpressionFactory::default().expression(None, Some(&entity));
        let q = Qualifier::and([Qualifier::equal("name", "x"), Qualifier::and([])]);
        assert_eq!(expr.sql_for_qualifier(&q).unwrap(), "(BASE.k = ?)");

        let q = Qualifier::not(Qualifier::and([]));
        assert_eq!(expr.sql_for_qualifier(&q).unwrap(), "");
    }

    #[test]
    fn or_and_not_nest_with_parentheses() {
        let entity = person();
        let mut expr = ExpressionFactory::default().expression(None, Some(&entity));
        let q = Qualifier::not(Qualifier::or([
            Qualifier::equal("id", 1),
            Qualifier::equal("name", Value::Null),
        ]));
        assert_eq!(
            expr.sql_for_qualifier(&q).unwrap(),
            "NOT ((BASE.id = 1) OR (BASE.k IS NULL))"
        );
    }

    #[test]
    fn like_translates_wildcards() {
        let entity = person();
        let mut expr = ExpressionFactory::default().expression(None, Some(&entity));
        let q = Qualifier::key_value("name", Operator::Like, "Du*k?");
        assert_eq!(expr.sql_for_qualifier(&q).unwrap(), "BASE.k LIKE ?");
        assert_eq!(expr.bind_variables()[0].value, Value::Text("Du%k_".into()));

        let q = Qualifier::key_value("name", Operator::CaseInsensitiveLike, "d*");
        assert_eq!(
            expr.sql_for_qualifier(&q).unwrap(),
            "UPPER(BASE.k) LIKE UPPER(?)"
        );
    }

    #[test]
    fn time_ranges_are_half_open() {
        let entity = person();
        let mut expr = ExpressionFactory::default().expression(None, Some(&entity));
        let range = TimeRange::between(ts(1), ts(2));

        let q = Qualifier::equal("born", range);
        assert_eq!(
            expr.sql_for_qualifier(&q).unwrap(),
            "BASE.born >= ? AND BASE.born < ?"
        );
        let q = Qualifier::key_value("born", Operator::NotEqualTo, range);
        assert_eq!(
            expr.sql_for_qualifier(&q).unwrap(),
            "BASE.born < ? OR BASE.born >= ?"
        );
        let values: Vec<_> = expr.bind_variables().iter().map(|b| &b.value).collect();
        assert_eq!(
            values,
            [
                &Value::Timestamp(ts(1)),
                &Value::Timestamp(ts(2)),
                &Value::Timestamp(ts(1)),
                &Value::Timestamp(ts(2)),
            ]
        );

        let empty = TimeRange::between(ts(2), ts(2));
        assert_eq!(
            expr.sql_for_qualifier(&Qualifier::equal("born", empty))
                .unwrap(),
            "1 = 2"
        );
        let open_end = TimeRange::new(Some(ts(1)), None);
        assert_eq!(
            expr.sql_for_qualifier(&Qualifier::key_value(
                "born",
                Operator::GreaterThan,
                open_end
            ))
            .unwrap(),
            "1 = 2"
        );
    }

    #[test]
    fn composite_identifiers_are_rejected() {
        let entity = person();
        let mut expr = ExpressionFactory::default().expression(None, Some(&entity));
        let id = Value::GlobalId(vec![("a".into(), Value::Int(1)), ("b".into(), Value::Int(2))]);
        let err = expr
            .sql_for_qualifier(&Qualifier::equal("id", id))
            .unwrap_err();
        assert!(matches!(err, EoAccessError::UnsupportedCompositeKey(2)));

        let single = Value::GlobalId(vec![("id".into(), Value::Int(9))]);
        assert_eq!(
            expr.sql_for_qualifier(&Qualifier::equal("id", single))
                .unwrap(),
            "BASE.id = 9"
        );
    }

    #[test]
    fn raw_parts_go_through_bind_decision() {
        let mut expr = ExpressionFactory::new(Dialect::Sqlite).expression(None, None);
        let q = Qualifier::raw([
            Value::Raw("length(name) > ".into()),
            Value::Int(3),
        ]);
        assert_eq!(expr.sql_for_qualifier(&q).unwrap(), "length(name) > ?");
        assert_eq!(expr.bind_variables()[0].value, Value::Int(3));
    }

    #[test]
    fn unknown_key_warns_and_passes_through() {
        let entity = person();
        let mut expr = ExpressionFactory::default().expression(None, Some(&entity));
        let sql = expr
            .sql_for_qualifier(&Qualifier::equal("nickname", "x"))
            .unwrap();
        assert_eq!(sql, "nickname = ?");
        assert_eq!(expr.warnings().len(), 1);
    }
}
