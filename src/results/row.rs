use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DbError;
use crate::types::DatabaseValue;

/// A row returned by query execution.
///
/// Columns keep the order the backend reported them in. Names are unique
/// within a row, and rows from the same query share one copy of the column
/// names and of the name lookup table.
#[derive(Debug, Clone)]
pub struct DatabaseRow {
    column_names: Arc<Vec<String>>,
    values: Vec<DatabaseValue>,
    column_index: Arc<HashMap<String, usize>>,
}

impl DatabaseRow {
    /// Create a standalone row.
    ///
    /// # Errors
    /// Returns `DbError::ExecutionError` if a column name repeats or the
    /// number of values differs from the number of columns.
    pub fn new(column_names: Vec<String>, values: Vec<DatabaseValue>) -> Result<Self, DbError> {
        let column_names = Arc::new(column_names);
        let column_index = Arc::new(build_column_index(&column_names)?);
        Self::from_shared(column_names, column_index, values)
    }

    pub(crate) fn from_shared(
        column_names: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        values: Vec<DatabaseValue>,
    ) -> Result<Self, DbError> {
        if values.len() != column_names.len() {
            return Err(DbError::ExecutionError(format!(
                "row has {} value(s) for {} column(s)",
                values.len(),
                column_names.len()
            )));
        }
        Ok(Self {
            column_names,
            values,
            column_index,
        })
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn values(&self) -> &[DatabaseValue] {
        &self.values
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index.get(column_name).copied()
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&DatabaseValue> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&DatabaseValue> {
        self.values.get(index)
    }

    #[must_use]
    pub fn contains(&self, column_name: &str) -> bool {
        self.column_index.contains_key(column_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatabaseValue)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    #[must_use]
    pub fn into_values(self) -> Vec<DatabaseValue> {
        self.values
    }
}

impl PartialEq for DatabaseRow {
    fn eq(&self, other: &Self) -> bool {
        self.column_names == other.column_names && self.values == other.values
    }
}

pub(crate) fn build_column_index(
    column_names: &[String],
) -> Result<HashMap<String, usize>, DbError> {
    let mut index = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        if index.insert(name.clone(), i).is_some() {
            return Err(DbError::ExecutionError(format!(
                "duplicate column name `{name}` in result row"
            )));
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_by_name_and_index() {
        let row = DatabaseRow::new(
            vec!["id".into(), "name".into()],
            vec![DatabaseValue::Int(1), DatabaseValue::Text("alice".into())],
        )
        .unwrap();
        assert_eq!(row.get("name").and_then(DatabaseValue::as_text), Some("alice"));
        assert_eq!(row.get_by_index(0), Some(&DatabaseValue::Int(1)));
        assert_eq!(row.get("missing"), None);
        let cols: Vec<&str> = row.iter().map(|(c, _)| c).collect();
        assert_eq!(cols, ["id", "name"]);
    }

    #[test]
    fn rejects_duplicate_columns() {
        let err = DatabaseRow::new(
            vec!["a".into(), "a".into()],
            vec![DatabaseValue::Int(1), DatabaseValue::Int(2)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate column name `a`"));
    }

    #[test]
    fn rejects_value_count_mismatch() {
        assert!(DatabaseRow::new(vec!["a".into()], vec![]).is_err());
    }
}
