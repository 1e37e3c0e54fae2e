//! Validation of Humanitarian Exchange Language (HXL) tagged data.
//!
//! HXL marks the columns of a spreadsheet with hashtags such as `#adm1+code`
//! or `#affected`. A schema declares rules against those hashtags: required
//! columns, datatypes, numeric ranges, patterns, allowed values, uniqueness,
//! and cross-row checks such as correlated codes and consistent datatypes.
//!
//! # Example
//!
//! ```no_run
//! use hxl::{HxlReader, Schema};
//!
//! let data = HxlReader::new().load("3w.csv").unwrap();
//! let mut schema = Schema::load("schema.csv")
//!     .unwrap()
//!     .with_callback(|e| println!("row {:?}: {}", e.row_number(), e));
//!
//! if !schema.validate(data.rows()) {
//!     println!("Dataset has errors");
//! }
//! ```

pub mod datatypes;
pub mod error;
pub mod input;
pub mod model;
pub mod validation;

pub use error::{HxlError, Result};
pub use input::{HxlReader, ReaderConfig};
pub use model::{Column, DataSource, Dataset, Row, TagPattern};
pub use validation::{
    DataType, Schema, SchemaRule, Severity, ValidationError, ValidationReport,
};
