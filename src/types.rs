use chrono::{NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Values that appear in qualifiers, bind lists, insert/update rows, and result records.
///
/// The first group mirrors what a driver can store; the second group only exists while a
/// statement is being compiled:
/// ```rust
/// use eo_access::prelude::*;
///
/// let values = vec![
///     Value::Int(1),
///     Value::Text("Duck".into()),
///     Value::Array(vec![Value::Int(1), Value::Int(2)]),
///     Value::Raw("CURRENT_TIMESTAMP".into()),
/// ];
/// # let _ = values;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value
    Null,
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// Calendar date without time
    Date(NaiveDate),
    /// JSON value
    Json(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
    /// Collection, rendered as `( v1, v2 )` and used by IN lists
    Array(Vec<Value>),
    /// SQL text that is always inlined verbatim, never bound
    Raw(String),
    /// Named placeholder that has not been bound yet
    Variable(String),
    /// Composite identifier: primary key name/value pairs
    GlobalId(Vec<(String, Value)>),
    /// Half-open time range `[start, end)`
    Range(TimeRange),
}

impl Value {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let Value::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Timestamp view of the value. SQLite hands dates back as text, so `%F %T` and plain
    /// `%F` strings are parsed too; a bare date reads as midnight.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            Value::Date(d) => d.and_hms_opt(0, 0, 0),
            Value::Text(s) => NaiveDateTime::parse_from_str(s, "%F %T%.f")
                .ok()
                .or_else(|| NaiveDate::parse_from_str(s, "%F").ok()?.and_hms_opt(0, 0, 0)),
            _ => None,
        }
    }

    /// A single-key composite identifier stands in for its only value.
    ///
    /// # Errors
    /// Returns `UnsupportedCompositeKey` for identifiers with more than one key.
    pub fn unwrap_global_id(&self) -> Result<&Value, crate::error::EoAccessError> {
        match self {
            Value::GlobalId(pairs) if pairs.len() == 1 => pairs[0].1.unwrap_global_id(),
            Value::GlobalId(pairs) => Err(crate::error::EoAccessError::UnsupportedCompositeKey(
                pairs.len(),
            )),
            other => Ok(other),
        }
    }

    /// Key used to group rows by join value when batching prefetches.
    pub(crate) fn group_key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Int(i) => Some(format!("i:{i}")),
            Value::Float(f) => Some(format!("f:{f}")),
            Value::Text(s) => Some(format!("s:{s}")),
            Value::Bool(b) => Some(format!("i:{}", i64::from(*b))),
            Value::Timestamp(t) => Some(format!("t:{t}")),
            Value::Date(d) => Some(format!("d:{d}")),
            Value::Blob(b) => Some(format!("b:{b:?}")),
            Value::GlobalId(pairs) if pairs.len() == 1 => pairs[0].1.group_key(),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Timestamp(value)
    }
}

impl From<TimeRange> for Value {
    fn from(value: TimeRange) -> Self {
        Value::Range(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A half-open interval of timestamps; either side may be unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl TimeRange {
    #[must_use]
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn between(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Empty when both bounds exist and the range holds no instant.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s >= e)
    }

    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// The SQL dialect a channel speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `SQLite`
    #[default]
    Sqlite,
    /// `PostgreSQL`
    Postgres,
    /// Sybase / SQL Server (bracket quoting, legacy `*=` join syntax)
    Sybase,
}

impl Dialect {
    /// Quote an identifier with the dialect's delimiters.
    #[must_use]
    pub fn quote_identifier(self, name: &str) -> String {
        match self {
            Dialect::Sqlite | Dialect::Postgres => format!("\"{}\"", name.replace('"', "\"\"")),
            Dialect::Sybase => format!("[{}]", name.replace(']', "]]")),
        }
    }

    /// Paging clause for the given limit/offset; empty when neither is set.
    #[must_use]
    pub fn limit_clause(self, limit: Option<usize>, offset: Option<usize>) -> String {
        match self {
            Dialect::Sqlite | Dialect::Postgres => match (limit, offset) {
                (None, None) => String::new(),
                (Some(limit), None) => format!("LIMIT {limit}"),
                (Some(limit), Some(offset)) => format!("LIMIT {limit} OFFSET {offset}"),
                // SQLite requires a LIMIT before OFFSET; -1 means unbounded.
                (None, Some(offset)) if self == Dialect::Sqlite => {
                    format!("LIMIT -1 OFFSET {offset}")
                }
                (None, Some(offset)) => format!("OFFSET {offset}"),
            },
            Dialect::Sybase => match (limit, offset) {
                (None, None) => String::new(),
                (limit, offset) => {
                    let mut clause = format!("OFFSET {} ROWS", offset.unwrap_or(0));
                    if let Some(limit) = limit {
                        clause.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
                    }
                    clause
                }
            },
        }
    }

    #[must_use]
    pub fn lock_clause(self) -> &'static str {
        match self {
            Dialect::Postgres => "FOR UPDATE",
            Dialect::Sqlite | Dialect::Sybase => "",
        }
    }

    #[must_use]
    pub fn blob_literal(self, bytes: &[u8]) -> String {
        let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
        match self {
            Dialect::Sqlite => format!("X'{hex}'"),
            Dialect::Postgres => format!("'\\x{hex}'::bytea"),
            Dialect::Sybase => format!("0x{hex}"),
        }
    }

    #[must_use]
    pub fn bool_literal(self, value: bool) -> &'static str {
        match (self, value) {
            (Dialect::Sybase, true) => "1",
            (Dialect::Sybase, false) => "0",
            (_, true) => "TRUE",
            (_, false) => "FALSE",
        }
    }

    /// Timestamp literal text (without quotes); `date_only` drops the time part.
    #[must_use]
    pub fn format_timestamp(self, ts: &NaiveDateTime, date_only: bool) -> String {
        if date_only {
            ts.format("%Y-%m-%d").to_string()
        } else {
            match self {
                Dialect::Sybase => ts.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
                Dialect::Sqlite | Dialect::Postgres => ts.format("%F %T%.f").to_string(),
            }
        }
    }
}
