//! Reading HXL datasets from files and URLs.

mod parser;

pub use parser::{HxlReader, ReaderConfig};
