//! In-memory HXL datasets and the row-source abstraction.

use std::sync::Arc;

use indexmap::IndexSet;

use super::row::Row;
use super::tags::{Column, TagPattern};
use crate::datatypes;

/// A pull-based stream of rows that also knows its columns.
///
/// Validation consumes a source exactly once, in order.
pub trait DataSource: Iterator<Item = Row> {
    /// Columns shared by every row in the stream.
    fn columns(&self) -> &[Column];
}

/// Tagged tabular data held in memory.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Arc<[Column]>,
    rows: Vec<Arc<[String]>>,
}

impl Dataset {
    /// Create a dataset. Rows are padded or truncated to the column count.
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                Arc::from(row)
            })
            .collect();
        Self {
            columns: columns.into(),
            rows,
        }
    }

    /// Build a dataset from tagspecs and string rows.
    ///
    /// Handy for small fixtures: `Dataset::from_tags(&["#org", "#adm1"], &[&["WFP", "Coast"]])`.
    pub fn from_tags(tags: &[&str], rows: &[&[&str]]) -> crate::Result<Self> {
        let columns = tags
            .iter()
            .map(|spec| Column::parse(spec))
            .collect::<crate::Result<Vec<_>>>()?;
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|v| (*v).to_string()).collect())
            .collect();
        Ok(Self::new(columns, rows))
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of data rows (excluding header and hashtag rows).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Display tags for every column.
    pub fn tags(&self) -> Vec<String> {
        self.columns.iter().map(Column::display_tag).collect()
    }

    /// Text headers for every column (empty when missing).
    pub fn headers(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.header.clone().unwrap_or_default())
            .collect()
    }

    /// Stream the rows as a [`DataSource`].
    pub fn rows(&self) -> Rows<'_> {
        Rows {
            columns: Arc::clone(&self.columns),
            raw: self.rows.iter().enumerate(),
        }
    }

    /// Distinct non-empty values at columns matching the pattern, in first-seen order.
    pub fn value_set(&self, pattern: &TagPattern) -> IndexSet<String> {
        let indices: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| pattern.matches(c))
            .map(|(i, _)| i)
            .collect();

        let mut values = IndexSet::new();
        for row in &self.rows {
            for &i in &indices {
                let value = &row[i];
                if !datatypes::is_empty(value) {
                    values.insert(datatypes::normalise_space(value));
                }
            }
        }
        values
    }
}

/// Row iterator over a [`Dataset`].
pub struct Rows<'a> {
    columns: Arc<[Column]>,
    raw: std::iter::Enumerate<std::slice::Iter<'a, Arc<[String]>>>,
}

impl Iterator for Rows<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.raw
            .next()
            .map(|(n, values)| Row::shared(Arc::clone(&self.columns), Arc::clone(values), n))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl DataSource for Rows<'_> {
    fn columns(&self) -> &[Column] {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_share_columns() {
        let data = Dataset::from_tags(
            &["#org", "#adm1"],
            &[&["WFP", "Coast"], &["UNICEF", "Nairobi"]],
        )
        .unwrap();
        let rows: Vec<Row> = data.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].row_number, 1);
        assert!(Arc::ptr_eq(&rows[0].columns, &rows[1].columns));
        assert_eq!(data.rows().columns().len(), 2);

        // rows borrow the dataset's storage rather than copying it
        let again: Vec<Row> = data.rows().collect();
        assert!(Arc::ptr_eq(&rows[0].values, &again[0].values));
    }

    #[test]
    fn test_value_set() {
        let data = Dataset::from_tags(
            &["#sector+en", "#sector+es"],
            &[&["Health", "Salud"], &["Health ", ""], &["WASH", "Agua"]],
        )
        .unwrap();
        let values = data.value_set(&TagPattern::parse("#sector+en").unwrap());
        assert_eq!(values.into_iter().collect::<Vec<_>>(), vec!["Health", "WASH"]);
        let all = data.value_set(&TagPattern::parse("#sector").unwrap());
        assert_eq!(all.len(), 4);
    }
}
