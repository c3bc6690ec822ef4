use crate::error::EoAccessError;
use crate::model::Attribute;
use crate::qualifier::Qualifier;
use crate::results::Record;

use super::SqlExpression;

impl<'m> SqlExpression<'m> {
    pub(crate) fn prepare_insert(&mut self, row: &Record) -> Result<(), EoAccessError> {
        let table = self.table_sql();
        if row.is_empty() {
            self.statement = format!("INSERT INTO {table} DEFAULT VALUES");
            return Ok(());
        }
        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for (key, value) in row.iter() {
            let (column, attribute) = self.written_column(key);
            columns.push(column);
            values.push(self.sql_for_written_value(value, attribute)?);
        }
        self.statement = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            values.join(", ")
        );
        Ok(())
    }

    pub(crate) fn prepare_update(
        &mut self,
        row: &Record,
        qualifier: Option<&Qualifier>,
    ) -> Result<(), EoAccessError> {
        if row.is_empty() {
            return Err(EoAccessError::CompilationError(
                "update row has no columns".into(),
            ));
        }
        let table = self.table_sql();
        let mut assignments = Vec::with_capacity(row.len());
        for (key, value) in row.iter() {
            let (column, attribute) = self.written_column(key);
            let value = self.sql_for_written_value(value, attribute)?;
            assignments.push(format!("{column} = {value}"));
        }
        let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
        self.push_where(&mut sql, qualifier)?;
        self.statement = sql;
        Ok(())
    }

    pub(crate) fn prepare_delete(&mut self, qualifier: Option<&Qualifier>) -> Result<(), EoAccessError> {
        let mut sql = format!("DELETE FROM {}", self.table_sql());
        self.push_where(&mut sql, qualifier)?;
        self.statement = sql;
        Ok(())
    }

    fn push_where(
        &mut self,
        sql: &mut String,
        qualifier: Option<&Qualifier>,
    ) -> Result<(), EoAccessError> {
        if let Some(qualifier) = qualifier {
            let clause = self.sql_for_qualifier(qualifier)?;
            if !clause.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clause);
            }
        }
        Ok(())
    }

    fn written_column(&mut self, key: &str) -> (String, Option<&'m Attribute>) {
        match self.entity {
            Some(entity) => match entity.attribute(key) {
                Some(attribute) => (self.quote_column(attribute.column_name()), Some(attribute)),
                None => {
                    self.warn(format!("{key} is not an attribute of {}", entity.name()));
                    (self.quote_column(key), None)
                }
            },
            None => (self.quote_column(key), None),
        }
    }
}
