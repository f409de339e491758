use std::collections::HashMap;
use std::sync::Arc;

use super::row::{DatabaseRow, build_column_index};
use crate::error::DbError;
use crate::types::DatabaseValue;

/// Accumulates the rows of one statement so they share column metadata.
///
/// Backends create one builder per executed statement, push each decoded row
/// and hand the finished `Vec` to the caller.
#[derive(Debug)]
pub struct RowSetBuilder {
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
    rows: Vec<DatabaseRow>,
}

impl RowSetBuilder {
    /// Start a row set for the given columns.
    ///
    /// # Errors
    /// Returns `DbError::ExecutionError` if a column name repeats.
    pub fn new(column_names: Vec<String>) -> Result<Self, DbError> {
        Self::with_capacity(column_names, 0)
    }

    /// Start a row set with preallocated capacity
    ///
    /// # Errors
    /// Returns `DbError::ExecutionError` if a column name repeats.
    pub fn with_capacity(column_names: Vec<String>, capacity: usize) -> Result<Self, DbError> {
        let column_index = Arc::new(build_column_index(&column_names)?);
        Ok(Self {
            column_names: Arc::new(column_names),
            column_index,
            rows: Vec::with_capacity(capacity),
        })
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    /// Append one row's values in column order.
    ///
    /// # Errors
    /// Returns `DbError::ExecutionError` if the value count is wrong.
    pub fn push(&mut self, values: Vec<DatabaseValue>) -> Result<(), DbError> {
        let row = DatabaseRow::from_shared(
            Arc::clone(&self.column_names),
            Arc::clone(&self.column_index),
            values,
        )?;
        self.rows.push(row);
        Ok(())
    }

    #[must_use]
    pub fn finish(self) -> Vec<DatabaseRow> {
        self.rows
    }
}
