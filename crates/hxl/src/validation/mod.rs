//! Schema validation for HXL data.
//!
//! A [`Schema`] holds [`SchemaRule`]s. Each rule targets the columns matching
//! one tag pattern and reports problems as [`ValidationError`] values through
//! a callback.

mod error;
mod loader;
mod matcher;
mod report;
mod rule;
mod schema;
mod types;

pub use error::{Severity, ValidationError};
pub use loader::to_boolean;
pub use matcher::{find_closest_match, get_common_prefix_len, get_edit_distance};
pub use report::{ReportSummary, SeverityCounts, ValidationReport};
pub use rule::{Callback, SchemaRule};
pub use schema::Schema;
pub use types::DataType;
