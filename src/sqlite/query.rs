use std::sync::Arc;

use rusqlite::types::Value as SqliteValue;
use rusqlite::{Statement, ToSql};

use crate::error::EoAccessError;
use crate::results::ResultSet;
use crate::types::Value;

/// Extract a `Value` from a `SQLite` row.
fn extract_value(row: &rusqlite::Row, idx: usize) -> Result<Value, EoAccessError> {
    let value: SqliteValue = row.get(idx)?;
    Ok(match value {
        SqliteValue::Null => Value::Null,
        SqliteValue::Integer(i) => Value::Int(i),
        SqliteValue::Real(f) => Value::Float(f),
        SqliteValue::Text(s) => Value::Text(s),
        SqliteValue::Blob(b) => Value::Blob(b),
    })
}

/// Run `stmt` and append its rows to `results`.
///
/// Column names already set on `results` are kept when their count matches the statement's;
/// otherwise the statement's own column names are used. Rows read before an error stay in
/// `results`.
pub(crate) fn fill_result_set(
    stmt: &mut Statement,
    params: &[SqliteValue],
    results: &mut ResultSet,
) -> Result<(), EoAccessError> {
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
    let col_count = stmt.column_count();
    if results
        .get_column_names()
        .is_none_or(|names| names.len() != col_count)
    {
        let column_names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect();
        results.set_column_names(Arc::new(column_names));
    }

    let mut rows_iter = stmt.query(&param_refs[..])?;
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(extract_value(row, i)?);
        }
        results.add_row_values(row_values);
    }
    Ok(())
}
