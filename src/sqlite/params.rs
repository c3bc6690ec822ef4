use rusqlite::types::Value as SqliteValue;

use crate::error::EoAccessError;
use crate::types::Value;

/// Convert a single bind value to a rusqlite value.
///
/// # Errors
/// Returns `UnresolvedVariable` for placeholders and `CompilationError` for values that
/// cannot be bound (raw SQL, lists, ranges).
pub(crate) fn value_to_sqlite_value(value: &Value) -> Result<SqliteValue, EoAccessError> {
    Ok(match value {
        Value::Null => SqliteValue::Null,
        Value::Int(i) => SqliteValue::Integer(*i),
        Value::Float(f) => SqliteValue::Real(*f),
        Value::Text(s) => SqliteValue::Text(s.clone()),
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::Timestamp(dt) => SqliteValue::Text(dt.format("%F %T%.f").to_string()),
        Value::Date(d) => SqliteValue::Text(d.format("%Y-%m-%d").to_string()),
        Value::Json(json) => SqliteValue::Text(json.to_string()),
        Value::Blob(bytes) => SqliteValue::Blob(bytes.clone()),
        Value::GlobalId(_) => value_to_sqlite_value(value.unwrap_global_id()?)?,
        Value::Variable(name) => return Err(EoAccessError::UnresolvedVariable(name.clone())),
        Value::Raw(_) | Value::Array(_) | Value::Range(_) => {
            return Err(EoAccessError::CompilationError(format!(
                "{value:?} cannot be bound as a parameter"
            )));
        }
    })
}

/// Bind values converted for rusqlite.
pub(crate) struct Params(Vec<SqliteValue>);

impl Params {
    pub(crate) fn convert(params: &[Value]) -> Result<Self, EoAccessError> {
        params
            .iter()
            .map(value_to_sqlite_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Params)
    }

    pub(crate) fn as_values(&self) -> &[SqliteValue] {
        &self.0
    }

    pub(crate) fn as_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.0.iter().map(|v| v as &dyn rusqlite::ToSql).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn converts_scalars() {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        let params = Params::convert(&[
            Value::Bool(true),
            Value::Timestamp(ts),
            Value::GlobalId(vec![("id".into(), Value::Int(3))]),
        ])
        .unwrap();
        assert_eq!(
            params.as_values(),
            [
                SqliteValue::Integer(1),
                SqliteValue::Text("2024-05-06 07:08:09".into()),
                SqliteValue::Integer(3),
            ]
        );
    }

    #[test]
    fn rejects_unbindable_values() {
        assert!(matches!(
            value_to_sqlite_value(&Value::Variable("x".into())),
            Err(EoAccessError::UnresolvedVariable(_))
        ));
        assert!(value_to_sqlite_value(&Value::Array(vec![])).is_err());
    }
}
