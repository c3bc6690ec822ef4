use crate::error::EoAccessError;
use crate::model::Attribute;
use crate::types::Value;

use super::{BindVariable, SqlExpression};

const BIND_PLACEHOLDER: &str = "?";

// Lower-case identifiers that still need quoting when used as a column.
const RESERVED_COLUMNS: &[&str] = &[
    "all", "and", "any", "as", "asc", "between", "by", "case", "check", "column", "create",
    "cross", "default", "delete", "desc", "distinct", "drop", "else", "end", "from", "full",
    "group", "having", "in", "index", "inner", "insert", "into", "is", "join", "key", "left",
    "like", "limit", "not", "null", "offset", "on", "or", "order", "outer", "primary",
    "references", "right", "select", "set", "table", "then", "to", "union", "update", "user",
    "using", "value", "values", "when", "where",
];

impl SqlExpression<'_> {
    /// Column name as written in SQL: bare when it is a plain lower-case identifier,
    /// dialect-quoted otherwise.
    #[must_use]
    pub fn quote_column(&self, column: &str) -> String {
        let plain = column
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
            && column
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if plain && !RESERVED_COLUMNS.contains(&column) {
            column.to_string()
        } else {
            self.factory.dialect.quote_identifier(column)
        }
    }

    /// Render `value` as an inline SQL literal.
    ///
    /// # Errors
    /// Returns `UnresolvedVariable` for placeholders, `UnsupportedCompositeKey` for
    /// multi-key identifiers, and `CompilationError` for values with no literal form.
    pub fn format_value(
        &self,
        value: &Value,
        attribute: Option<&Attribute>,
    ) -> Result<String, EoAccessError> {
        let dialect = self.factory.dialect;
        Ok(match value {
            Value::Null => "NULL".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) if f.is_finite() => f.to_string(),
            Value::Float(f) => {
                return Err(EoAccessError::CompilationError(format!(
                    "{f} has no SQL literal"
                )));
            }
            Value::Text(s) => quote_string(s),
            Value::Bool(b) => dialect.bool_literal(*b).to_string(),
            Value::Timestamp(ts) => quote_string(
                &dialect.format_timestamp(ts, attribute.is_some_and(Attribute::is_date_only)),
            ),
            Value::Date(d) => quote_string(&d.format("%Y-%m-%d").to_string()),
            Value::Json(json) => quote_string(&json.to_string()),
            Value::Blob(bytes) => dialect.blob_literal(bytes),
            Value::Array(items) => {
                let parts = items
                    .iter()
                    .map(|item| self.format_value(item, attribute))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("({})", parts.join(", "))
            }
            Value::Raw(sql) => sql.clone(),
            Value::Variable(name) => return Err(EoAccessError::UnresolvedVariable(name.clone())),
            Value::GlobalId(_) => self.format_value(value.unwrap_global_id()?, attribute)?,
            Value::Range(_) => {
                return Err(EoAccessError::CompilationError(
                    "a time range is only valid as a qualifier operand".into(),
                ));
            }
        })
    }

    /// SQL for a value in statement position: a placeholder when the value is bound,
    /// otherwise its literal.
    ///
    /// # Errors
    /// See [`SqlExpression::format_value`].
    pub fn sql_for_value(
        &mut self,
        value: &Value,
        attribute: Option<&Attribute>,
    ) -> Result<String, EoAccessError> {
        match value {
            Value::Raw(sql) => Ok(sql.clone()),
            Value::Null => Ok("NULL".to_string()),
            Value::Variable(name) => Ok(self.add_bind(value.clone(), attribute, Some(name))),
            Value::GlobalId(_) => {
                let inner = value.unwrap_global_id()?.clone();
                self.sql_for_value(&inner, attribute)
            }
            Value::Array(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(self.sql_for_value(item, attribute)?);
                }
                Ok(format!("({})", parts.join(", ")))
            }
            Value::Range(_) => self.format_value(value, attribute),
            // A DATE column compares as text, so the bind must carry the date alone.
            Value::Timestamp(ts) if attribute.is_some_and(Attribute::is_date_only) => {
                self.sql_for_value(&Value::Date(ts.date()), attribute)
            }
            _ if !self.factory.use_bind_variables
                || attribute.is_some_and(Attribute::inlines_values) =>
            {
                self.format_value(value, attribute)
            }
            _ => Ok(self.add_bind(value.clone(), attribute, None)),
        }
    }

    /// Value SQL wrapped in the attribute's write format (`%V`), for INSERT/UPDATE.
    pub(crate) fn sql_for_written_value(
        &mut self,
        value: &Value,
        attribute: Option<&Attribute>,
    ) -> Result<String, EoAccessError> {
        let sql = self.sql_for_value(value, attribute)?;
        Ok(match attribute.and_then(Attribute::write_format) {
            Some(format) => format.replace("%V", &sql),
            None => sql,
        })
    }

    fn add_bind(
        &mut self,
        value: Value,
        attribute: Option<&Attribute>,
        variable: Option<&str>,
    ) -> String {
        let name = match variable {
            Some(variable) => variable.to_string(),
            None => format!(
                "{}{}",
                attribute.map_or("value", Attribute::column_name),
                self.bind_counter
            ),
        };
        self.bind_counter += 1;
        self.bind_variables.push(BindVariable {
            attribute: attribute.cloned(),
            value,
            placeholder: BIND_PLACEHOLDER.to_string(),
            name,
        });
        BIND_PLACEHOLDER.to_string()
    }
}

/// Single-quoted string literal with quotes and backslashes doubled.
pub(crate) fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::expression::ExpressionFactory;
    use crate::types::Dialect;

    fn expr(dialect: Dialect) -> SqlExpression<'static> {
        ExpressionFactory::new(dialect).expression(None, None)
    }

    #[test]
    fn quotes_strings() {
        assert_eq!(quote_string("O'Brien"), "'O''Brien'");
        assert_eq!(quote_string(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn formats_literals_per_dialect() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        let sqlite = expr(Dialect::Sqlite);
        assert_eq!(sqlite.format_value(&Value::Bool(true), None).unwrap(), "TRUE");
        assert_eq!(
            sqlite.format_value(&Value::Timestamp(ts), None).unwrap(),
            "'2024-03-01 12:30:00'"
        );
        assert_eq!(
            sqlite.format_value(&Value::Blob(vec![0xAB, 0x01]), None).unwrap(),
            "X'AB01'"
        );

        let sybase = expr(Dialect::Sybase);
        assert_eq!(sybase.format_value(&Value::Bool(false), None).unwrap(), "0");
        assert_eq!(
            sybase.format_value(&Value::Timestamp(ts), None).unwrap(),
            "'2024-03-01T12:30:00.000'"
        );

        let date_attr = Attribute::builder("born").external_type("DATE").finish();
        assert_eq!(
            sqlite
                .format_value(&Value::Timestamp(ts), Some(&date_attr))
                .unwrap(),
            "'2024-03-01'"
        );
    }

    #[test]
    fn arrays_and_raw_values() {
        let e = expr(Dialect::Sqlite);
        let list = Value::Array(vec![Value::Int(1), Value::Text("x".into())]);
        assert_eq!(e.format_value(&list, None).unwrap(), "(1, 'x')");
        assert_eq!(
            e.format_value(&Value::Raw("CURRENT_TIMESTAMP".into()), None)
                .unwrap(),
            "CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn variables_have_no_literal() {
        let e = expr(Dialect::Sqlite);
        let err = e
            .format_value(&Value::Variable("name".into()), None)
            .unwrap_err();
        assert!(matches!(err, EoAccessError::UnresolvedVariable(n) if n == "name"));
    }

    #[test]
    fn bind_decision() {
        let mut e = expr(Dialect::Sqlite);
        let id = Attribute::builder("id").external_type("INTEGER").finish();
        let name = Attribute::builder("name").column_name("k").finish();

        assert_eq!(e.sql_for_value(&Value::Int(7), Some(&id)).unwrap(), "7");
        assert_eq!(
            e.sql_for_value(&Value::Text("v".into()), Some(&name))
                .unwrap(),
            "?"
        );
        assert_eq!(
            e.sql_for_value(&Value::Variable("who".into()), Some(&name))
                .unwrap(),
            "?"
        );

        let names: Vec<_> = e.bind_variables().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["k0", "who"]);
    }

    #[test]
    fn date_only_timestamps_bind_as_dates() {
        let mut e = expr(Dialect::Sqlite);
        let day = Attribute::builder("day").external_type("DATE").finish();
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        assert_eq!(e.sql_for_value(&Value::Timestamp(ts), Some(&day)).unwrap(), "?");
        assert_eq!(e.bind_variables()[0].value, Value::Date(ts.date()));

        let mut literal = ExpressionFactory::new(Dialect::Sqlite)
            .with_bind_variables(false)
            .expression(None, None);
        assert_eq!(
            literal.sql_for_value(&Value::Timestamp(ts), Some(&day)).unwrap(),
            "'2024-01-01'"
        );
    }

    #[test]
    fn literals_when_binds_disabled() {
        let mut e = ExpressionFactory::new(Dialect::Sqlite)
            .with_bind_variables(false)
            .expression(None, None);
        assert_eq!(
            e.sql_for_value(&Value::Text("v".into()), None).unwrap(),
            "'v'"
        );
        assert!(e.bind_variables().is_empty());
    }

    #[test]
    fn column_quoting() {
        let e = expr(Dialect::Sqlite);
        assert_eq!(e.quote_column("last_name"), "last_name");
        assert_eq!(e.quote_column("lastName"), "\"lastName\"");
        assert_eq!(e.quote_column("order"), "\"order\"");
        assert_eq!(expr(Dialect::Sybase).quote_column("user"), "[user]");
    }
}
