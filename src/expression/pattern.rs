use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::EoAccessError;

use super::BindVariable;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%\(([A-Za-z_][A-Za-z0-9_]*)\)s").expect("pattern token regex is valid")
});

/// SQL for one `%(name)s` token, and the binds its text carries.
#[derive(Debug, Clone, Default)]
pub(crate) struct PatternToken {
    pub sql: String,
    pub binds: Vec<BindVariable>,
}

impl PatternToken {
    pub(crate) fn text(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: Vec::new(),
        }
    }

    pub(crate) fn with_binds(sql: impl Into<String>, binds: &[BindVariable]) -> Self {
        Self {
            sql: sql.into(),
            binds: binds.to_vec(),
        }
    }
}

/// Replace every `%(name)s` in `pattern` and collect binds in the order the tokens occur.
///
/// A token that appears twice contributes its binds twice.
pub(crate) fn substitute(
    pattern: &str,
    tokens: &HashMap<&str, PatternToken>,
) -> Result<(String, Vec<BindVariable>), EoAccessError> {
    let mut sql = String::with_capacity(pattern.len());
    let mut binds = Vec::new();
    let mut last = 0;
    for captures in TOKEN.captures_iter(pattern) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let token = tokens
            .get(name.as_str())
            .ok_or_else(|| EoAccessError::MissingPatternToken(name.as_str().to_string()))?;
        sql.push_str(&pattern[last..whole.start()]);
        sql.push_str(&token.sql);
        binds.extend(token.binds.iter().cloned());
        last = whole.end();
    }
    sql.push_str(&pattern[last..]);
    Ok((sql, binds))
}
