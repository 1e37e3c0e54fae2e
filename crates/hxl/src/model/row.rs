//! A single data row sharing its column list with the rest of the dataset.

use std::sync::Arc;

use super::tags::{Column, TagPattern};
use crate::datatypes;

/// One logical record: raw string values aligned with a shared column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Columns for the dataset this row belongs to.
    pub columns: Arc<[Column]>,
    /// Raw values, one per column. Clones of a row share them.
    pub values: Arc<[String]>,
    /// Zero-based position among the data rows.
    pub row_number: usize,
}

impl Row {
    /// Create a row, padding or truncating values to the column count.
    pub fn new(columns: Arc<[Column]>, mut values: Vec<String>, row_number: usize) -> Self {
        values.resize(columns.len(), String::new());
        Self {
            columns,
            values: values.into(),
            row_number,
        }
    }

    /// Create a row over values already aligned with the columns.
    pub(crate) fn shared(columns: Arc<[Column]>, values: Arc<[String]>, row_number: usize) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self {
            columns,
            values,
            row_number,
        }
    }

    /// Iterate over (column, value) pairs in column order.
    pub fn cells(&self) -> impl Iterator<Item = (&Column, &str)> {
        self.columns
            .iter()
            .zip(self.values.iter().map(String::as_str))
    }

    /// First value whose column matches the pattern, empty or not.
    pub fn get(&self, pattern: &TagPattern) -> Option<&str> {
        self.cells()
            .find(|(column, _)| pattern.matches(column))
            .map(|(_, value)| value)
    }

    /// All values whose column matches the pattern, in column order.
    pub fn get_all(&self, pattern: &TagPattern) -> Vec<&str> {
        self.cells()
            .filter(|(column, _)| pattern.matches(column))
            .map(|(_, value)| value)
            .collect()
    }

    /// Normalised values at every column matching any of the patterns.
    pub fn key(&self, patterns: &[TagPattern]) -> Vec<String> {
        self.cells()
            .filter(|(column, _)| TagPattern::matches_any(patterns, column))
            .map(|(column, value)| datatypes::normalise(value, Some(column)))
            .collect()
    }
}
