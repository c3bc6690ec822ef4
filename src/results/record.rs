use std::collections::HashMap;
use std::sync::Arc;

use crate::types::Value;

/// An ordered-key record.
///
/// Result rows and the column maps handed to insert/update share this shape: keys keep the
/// order they were produced in (select list order for rows, caller order for column maps).
#[derive(Debug, Clone)]
pub struct Record {
    /// The keys for this record (shared across all rows of one result set)
    pub keys: Arc<Vec<String>>,
    /// The values, positionally matching `keys`
    pub values: Vec<Value>,
    // Internal cache for faster key lookups
    #[doc(hidden)]
    pub(crate) key_index_cache: Arc<HashMap<String, usize>>,
}

impl Record {
    /// Create a new record
    ///
    /// # Arguments
    ///
    /// * `keys` - The ordered keys
    /// * `values` - The values for this record
    #[must_use]
    pub fn new(keys: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        let cache = Arc::new(build_index(&keys));
        Self {
            keys,
            values,
            key_index_cache: cache,
        }
    }

    pub(crate) fn with_cache(
        keys: Arc<Vec<String>>,
        values: Vec<Value>,
        key_index_cache: Arc<HashMap<String, usize>>,
    ) -> Self {
        Self {
            keys,
            values,
            key_index_cache,
        }
    }

    /// Build a record from ordered key/value pairs.
    ///
    /// ```rust
    /// use eo_access::prelude::*;
    ///
    /// let row = Record::from_pairs([("lastname", "Duck"), ("firstname", "Donald")]);
    /// assert_eq!(row.keys[0], "lastname");
    /// assert_eq!(row.get("firstname").and_then(Value::as_text), Some("Donald"));
    /// ```
    #[must_use]
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let (keys, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(Arc::new(keys), values)
    }

    /// Get the index of a key
    #[must_use]
    pub fn get_key_index(&self, key: &str) -> Option<usize> {
        if let Some(&idx) = self.key_index_cache.get(key) {
            return Some(idx);
        }
        self.keys.iter().position(|k| k == key)
    }

    /// Get a value by key, or None if the key is absent
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.get_key_index(key).and_then(|idx| self.values.get(idx))
    }

    /// Get a value by position
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Iterate `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.keys.iter().map(String::as_str).zip(self.values.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub(crate) fn build_index(keys: &[String]) -> HashMap<String, usize> {
    keys.iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}
