use std::collections::HashMap;
use std::sync::Arc;

use crate::types::Value;

mod record;

pub use record::Record;

/// Rows read by one statement.
///
/// Column names are shared by every row so they are stored once.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<Record>,
    /// The number of rows read (for SELECT) or affected (for DML)
    pub rows_affected: usize,
    column_names: Option<Arc<Vec<String>>>,
    column_index: Option<Arc<HashMap<String, usize>>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            rows_affected: 0,
            column_names: None,
            column_index: None,
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index = Some(Arc::new(record::build_index(&column_names)));
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row to the result set. Rows added before column names are set are dropped.
    pub fn add_row_values(&mut self, row_values: Vec<Value>) {
        if let (Some(column_names), Some(index)) = (&self.column_names, &self.column_index) {
            self.results.push(Record::with_cache(
                Arc::clone(column_names),
                row_values,
                Arc::clone(index),
            ));
            self.rows_affected += 1;
        }
    }

    /// Add an already built record
    pub fn add_row(&mut self, row: Record) {
        if self.column_names.is_none() {
            self.set_column_names(Arc::clone(&row.keys));
        }
        self.results.push(row);
        self.rows_affected += 1;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Take the rows, leaving the set empty.
    pub fn into_records(self) -> Vec<Record> {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_names() {
        let mut rs = ResultSet::with_capacity(2);
        rs.set_column_names(Arc::new(vec!["id".into(), "name".into()]));
        rs.add_row_values(vec![Value::Int(1), Value::Text("Donald".into())]);
        rs.add_row_values(vec![Value::Int(2), Value::Text("Daisy".into())]);

        assert_eq!(rs.len(), 2);
        assert!(Arc::ptr_eq(&rs.results[0].keys, &rs.results[1].keys));
        assert_eq!(rs.results[1].get("name").and_then(Value::as_text), Some("Daisy"));
        assert_eq!(rs.results[0].get("missing"), None);
    }

    #[test]
    fn rows_without_columns_are_ignored() {
        let mut rs = ResultSet::default();
        rs.add_row_values(vec![Value::Int(1)]);
        assert!(rs.is_empty());
    }
}
