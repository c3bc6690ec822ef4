use std::collections::HashMap;

use crate::error::EoAccessError;
use crate::fetch::FetchSpecification;
use crate::model::Attribute;
use crate::qualifier::SortOrdering;
use crate::types::Dialect;

use super::alias::{parent_path, ResolvedHop, BASE_ALIAS};
use super::pattern::{self, PatternToken};
use super::SqlExpression;

/// FROM/WHERE pieces produced by the join assembly.
struct JoinedTables {
    /// Everything after `FROM`.
    tables: String,
    /// Join conditions destined for WHERE; empty when joins live in the FROM clause.
    conditions: String,
}

impl<'m> SqlExpression<'m> {
    pub(crate) fn prepare_select(&mut self, spec: &FetchSpecification) -> Result<(), EoAccessError> {
        let dialect = self.factory.dialect;
        let columns = self.select_columns(spec);

        let qualifier_start = self.bind_variables.len();
        let qualifier = match &spec.qualifier {
            Some(qualifier) => self.sql_for_qualifier(qualifier)?,
            None => String::new(),
        };
        let qualifier_binds = self.bind_variables[qualifier_start..].to_vec();

        let mut orderings = self.sql_for_orderings(&spec.sort_orderings);
        let limit = dialect.limit_clause(spec.fetch_limit, spec.fetch_offset);
        if dialect == Dialect::Sybase && !limit.is_empty() && orderings.is_empty() {
            // OFFSET/FETCH is only valid after an ORDER BY.
            orderings = "(SELECT NULL)".to_string();
        }
        let lock = if spec.locks { dialect.lock_clause() } else { "" };
        let select = if spec.distinct {
            "SELECT DISTINCT"
        } else {
            "SELECT"
        };

        // Joins last: every relationship path is known once the other clauses are compiled.
        let joined = self.joined_tables();
        let where_clause = combine_where(&qualifier, &joined.conditions);

        let Some(raw_pattern) = &spec.raw_sql_pattern else {
            let mut sql = format!("{select} {columns} FROM {}", joined.tables);
            for (keyword, clause) in [
                ("WHERE ", where_clause.as_str()),
                ("ORDER BY ", orderings.as_str()),
                ("", limit.as_str()),
                ("", lock),
            ] {
                if !clause.is_empty() {
                    sql.push(' ');
                    sql.push_str(keyword);
                    sql.push_str(clause);
                }
            }
            self.statement = sql;
            return Ok(());
        };

        let prefixed = |prefix: &str, clause: &str| {
            if clause.is_empty() {
                String::new()
            } else {
                format!("{prefix}{clause}")
            }
        };
        let mut tokens: HashMap<&str, PatternToken> = HashMap::new();
        tokens.insert("select", PatternToken::text(select));
        tokens.insert("columns", PatternToken::text(columns));
        tokens.insert("tables", PatternToken::text(joined.tables));
        tokens.insert("joins", PatternToken::text(joined.conditions.clone()));
        tokens.insert("limit", PatternToken::text(limit));
        tokens.insert("lock", PatternToken::text(lock));
        tokens.insert("orderby", PatternToken::text(prefixed("ORDER BY ", &orderings)));
        tokens.insert("orderings", PatternToken::text(orderings));
        tokens.insert("basetable", PatternToken::text(self.base_table_name()));
        tokens.insert(
            "qualifier",
            PatternToken::with_binds(qualifier.clone(), &qualifier_binds),
        );
        tokens.insert(
            "where",
            PatternToken::with_binds(prefixed("WHERE ", &where_clause), &qualifier_binds),
        );
        tokens.insert(
            "andQualifier",
            PatternToken::with_binds(prefixed("AND ", &qualifier), &qualifier_binds),
        );
        tokens.insert(
            "orQualifier",
            PatternToken::with_binds(prefixed("OR ", &qualifier), &qualifier_binds),
        );

        let (sql, binds) = pattern::substitute(raw_pattern, &tokens)?;
        self.statement = sql;
        self.bind_variables.truncate(qualifier_start);
        self.bind_variables.extend(binds);
        Ok(())
    }

    fn select_columns(&mut self, spec: &FetchSpecification) -> String {
        let mut columns = Vec::new();
        let mut keys = Vec::new();
        match self.entity {
            Some(entity) => {
                let mut attributes: Vec<&'m Attribute> = Vec::new();
                if spec.fetch_attributes.is_empty() {
                    attributes.extend(entity.fetched_attributes());
                } else {
                    for name in &spec.fetch_attributes {
                        match entity.attribute(name) {
                            Some(attribute) => attributes.push(attribute),
                            None => {
                                self.warn(format!("{name} is not an attribute of {}", entity.name()))
                            }
                        }
                    }
                }
                for attribute in attributes {
                    let reference = self.column_ref(BASE_ALIAS, attribute);
                    columns.push(match attribute.read_format() {
                        Some(format) => format.replace("%P", &reference),
                        None => reference,
                    });
                    keys.push(attribute.name().to_string());
                }
            }
            None => {
                for name in &spec.fetch_attributes {
                    let (reference, _) = self.sql_for_key_path(name);
                    columns.push(reference);
                    keys.push(name.clone());
                }
            }
        }
        self.selected_keys = keys;
        if columns.is_empty() {
            "*".to_string()
        } else {
            columns.join(", ")
        }
    }

    fn sql_for_orderings(&mut self, orderings: &[SortOrdering]) -> String {
        let mut parts = Vec::with_capacity(orderings.len());
        for ordering in orderings {
            let (column, _) = self.sql_for_key_path(&ordering.key);
            let direction = ordering.direction.sql_token();
            parts.push(if ordering.direction.is_case_insensitive() {
                format!("UPPER({column}) {direction}")
            } else {
                format!("{column} {direction}")
            });
        }
        parts.join(", ")
    }

    fn joined_tables(&mut self) -> JoinedTables {
        let base = self.table_sql();
        let paths: Vec<String> = self
            .aliases
            .joined_paths()
            .into_iter()
            .map(str::to_string)
            .collect();

        if self.factory.includes_joins_in_from_clause {
            let mut tables = format!("{base} AS {BASE_ALIAS}");
            for path in &paths {
                let Some(hop) = self.aliases.hop(path).copied() else {
                    continue;
                };
                let parent = self.aliases.alias_for_path(parent_path(path));
                let alias = self.aliases.alias_for_path(path);
                let conditions = self.join_conditions(&hop, &parent, &alias, "=");
                tables.push_str(&format!(
                    " LEFT JOIN {} AS {alias} ON ({})",
                    hop.destination.qualified_table_name(self.factory.dialect),
                    conditions.join(" AND ")
                ));
            }
            return JoinedTables {
                tables,
                conditions: String::new(),
            };
        }

        let mut tables = vec![format!("{base} {BASE_ALIAS}")];
        let mut conditions = Vec::new();
        for path in &paths {
            let Some(hop) = self.aliases.hop(path).copied() else {
                continue;
            };
            let parent = self.aliases.alias_for_path(parent_path(path));
            let alias = self.aliases.alias_for_path(path);
            tables.push(format!(
                "{} {alias}",
                hop.destination.qualified_table_name(self.factory.dialect)
            ));
            let operator = hop.relationship.join_semantic().operator();
            conditions.extend(self.join_conditions(&hop, &parent, &alias, operator));
        }
        JoinedTables {
            tables: tables.join(", "),
            conditions: conditions.join(" AND "),
        }
    }

    fn join_conditions(
        &self,
        hop: &ResolvedHop<'m>,
        parent: &str,
        alias: &str,
        operator: &str,
    ) -> Vec<String> {
        hop.relationship
            .joins()
            .iter()
            .map(|join| {
                let source = hop
                    .source
                    .attribute(&join.source_attribute)
                    .map_or(join.source_attribute.as_str(), Attribute::column_name);
                let destination = hop
                    .destination
                    .attribute(&join.destination_attribute)
                    .map_or(join.destination_attribute.as_str(), Attribute::column_name);
                format!(
                    "{parent}.{} {operator} {alias}.{}",
                    self.quote_column(source),
                    self.quote_column(destination)
                )
            })
            .collect()
    }
}

fn combine_where(qualifier: &str, join_conditions: &str) -> String {
    match (qualifier.is_empty(), join_conditions.is_empty()) {
        (true, _) => join_conditions.to_string(),
        (false, true) => qualifier.to_string(),
        (false, false) => format!("({qualifier}) AND {join_conditions}"),
    }
}
