//! Tagged columns, rows and datasets.

mod dataset;
mod row;
mod tags;

pub use dataset::{DataSource, Dataset, Rows};
pub use row::Row;
pub use tags::{Column, TagPattern, display_patterns};
