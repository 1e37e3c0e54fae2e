//! HXL reader for delimited text with delimiter and hashtag-row detection.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{HxlError, Result};
use crate::model::{Column, Dataset};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b',', b'\t', b';', b'|'];

/// Reader configuration.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<u8>,
    /// How many leading rows to search for the hashtag row.
    pub max_scan_rows: usize,
    /// Quote character.
    pub quote: u8,
    /// Timeout for remote datasets.
    pub http_timeout: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            max_scan_rows: 25,
            quote: b'"',
            http_timeout: Duration::from_secs(30),
        }
    }
}

/// Reads HXL-tagged CSV/TSV into a [`Dataset`].
///
/// Free-text rows may precede the hashtag row; the row directly above it is
/// kept as the column headers. Untagged columns are dropped.
pub struct HxlReader {
    config: ReaderConfig,
}

impl HxlReader {
    /// Create a reader with default configuration.
    pub fn new() -> Self {
        Self {
            config: ReaderConfig::default(),
        }
    }

    /// Create a reader with custom configuration.
    pub fn with_config(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Read from a local path or an `http(s)://` URL.
    pub fn load(&self, location: &str) -> Result<Dataset> {
        if location.starts_with("http://") || location.starts_with("https://") {
            self.read_url(location)
        } else {
            self.read_path(location)
        }
    }

    /// Read a local file.
    pub fn read_path(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| HxlError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents).map_err(|e| HxlError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let dataset = self.read_bytes(&contents)?;
        info!(
            "Read {} rows and {} columns from {}",
            dataset.row_count(),
            dataset.column_count(),
            path.display()
        );
        Ok(dataset)
    }

    /// Fetch and read a remote dataset.
    pub fn read_url(&self, url: &str) -> Result<Dataset> {
        let http_error = |source| HxlError::Http {
            url: url.to_string(),
            source,
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(self.config.http_timeout)
            .build()
            .map_err(http_error)?;
        let body = client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::bytes)
            .map_err(http_error)?;

        let dataset = self.read_bytes(&body)?;
        info!("Read {} rows from {}", dataset.row_count(), url);
        Ok(dataset)
    }

    /// Parse bytes directly.
    pub fn read_bytes(&self, bytes: &[u8]) -> Result<Dataset> {
        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(bytes, self.config.max_scan_rows, self.config.quote)?,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let mut records = reader.records();
        let mut previous: Option<Vec<String>> = None;
        let mut tag_row = None;

        for row_idx in 0..self.config.max_scan_rows {
            let Some(result) = records.next() else {
                break;
            };
            let record: Vec<String> = result?.iter().map(|s| s.to_string()).collect();
            if let Some(columns) = parse_tag_row(record.iter().map(String::as_str)) {
                debug!("Found hashtag row at row {}", row_idx + 1);
                tag_row = Some(columns);
                break;
            }
            previous = Some(record);
        }

        let Some(tag_row) = tag_row else {
            return Err(HxlError::NoHashtagRow(self.config.max_scan_rows));
        };

        // Attach headers and remember which raw positions survive.
        let headers = previous.unwrap_or_default();
        let mut positions = Vec::new();
        let mut columns = Vec::new();
        for (position, column) in tag_row {
            let column = match headers.get(position).map(|h| h.trim()) {
                Some(header) if !header.is_empty() => column.with_header(header),
                _ => column,
            };
            positions.push(position);
            columns.push(column);
        }

        let mut rows = Vec::new();
        for result in records {
            let record = result?;
            rows.push(
                positions
                    .iter()
                    .map(|&p| record.get(p).unwrap_or_default().to_string())
                    .collect(),
            );
        }

        Ok(Dataset::new(columns, rows))
    }
}

impl Default for HxlReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Interpret a record as a hashtag row: every non-blank cell must be a tagspec.
fn parse_tag_row<'a>(cells: impl IntoIterator<Item = &'a str>) -> Option<Vec<(usize, Column)>> {
    let mut columns = Vec::new();
    for (position, cell) in cells.into_iter().enumerate() {
        if cell.trim().is_empty() {
            continue;
        }
        columns.push((position, Column::parse(cell).ok()?));
    }
    if columns.is_empty() {
        None
    } else {
        Some(columns)
    }
}

/// Pick the delimiter that yields the widest hashtag row within the scan window.
///
/// Ties keep the order of [`DELIMITERS`]. With no hashtag row under any
/// candidate, falls back to comma and lets the scan report the miss.
fn detect_delimiter(bytes: &[u8], max_scan_rows: usize, quote: u8) -> Result<u8> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(HxlError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let score = tagged_width(bytes, delim, max_scan_rows, quote);
        debug!("Delimiter {:?} tags {} columns", delim as char, score);
        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Number of tagged cells in the first hashtag row found with `delimiter`, or 0.
fn tagged_width(bytes: &[u8], delimiter: u8, max_scan_rows: usize, quote: u8) -> usize {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .quote(quote)
        .flexible(true)
        .from_reader(bytes);

    reader
        .records()
        .take(max_scan_rows)
        .map_while(|r| r.ok())
        .find_map(|record| parse_tag_row(record.iter()))
        .map_or(0, |columns| columns.len())
}
