//! Building schemas from HXL-tagged schema spreadsheets.
//!
//! Each row of a schema dataset declares one rule. The `#valid_tag` column
//! names the pattern to validate; the other `#valid_*` columns set its
//! constraints. Rows without a `#valid_tag` are skipped.

use regex::Regex;
use tracing::{debug, info, warn};

use super::error::Severity;
use super::rule::SchemaRule;
use super::schema::Schema;
use super::types::DataType;
use crate::error::{HxlError, Result};
use crate::input::HxlReader;
use crate::model::{Dataset, Row, TagPattern};

const DEFAULT_SCHEMA: &str = include_str!("../../resources/default-schema.csv");

/// Patterns for the schema spreadsheet's own columns.
struct SchemaColumns {
    tag: TagPattern,
    min_occur: TagPattern,
    max_occur: TagPattern,
    data_type: TagPattern,
    min_value: TagPattern,
    max_value: TagPattern,
    regex: TagPattern,
    required: TagPattern,
    unique: TagPattern,
    unique_key: TagPattern,
    correlation: TagPattern,
    severity: TagPattern,
    description: TagPattern,
    case_sensitive: TagPattern,
    consistent_datatypes: TagPattern,
    value_list: TagPattern,
    value_url: TagPattern,
    target_tag: TagPattern,
}

impl SchemaColumns {
    fn new() -> Result<Self> {
        Ok(Self {
            tag: TagPattern::parse("#valid_tag")?,
            min_occur: TagPattern::parse("#valid_required+min")?,
            max_occur: TagPattern::parse("#valid_required+max")?,
            data_type: TagPattern::parse("#valid_datatype-consistent")?,
            min_value: TagPattern::parse("#valid_value+min")?,
            max_value: TagPattern::parse("#valid_value+max")?,
            regex: TagPattern::parse("#valid_value+regex")?,
            required: TagPattern::parse("#valid_required-min-max")?,
            unique: TagPattern::parse("#valid_unique-key")?,
            unique_key: TagPattern::parse("#valid_unique+key")?,
            correlation: TagPattern::parse("#valid_correlation")?,
            severity: TagPattern::parse("#valid_severity")?,
            description: TagPattern::parse("#description")?,
            case_sensitive: TagPattern::parse("#valid_value+case")?,
            consistent_datatypes: TagPattern::parse("#valid_datatype+consistent")?,
            value_list: TagPattern::parse("#valid_value+list")?,
            value_url: TagPattern::parse("#valid_value+url")?,
            target_tag: TagPattern::parse("#valid_value+target_tag")?,
        })
    }
}

impl Schema {
    /// Build a schema from a dataset of rule rows.
    ///
    /// Any malformed field aborts parsing with an error.
    pub fn parse(dataset: &Dataset) -> Result<Self> {
        let columns = SchemaColumns::new()?;
        let mut schema = Schema::new();

        for row in dataset.rows() {
            let Some(tag) = field(&row, &columns.tag) else {
                debug!("Skipping schema row {} without #valid_tag", row.row_number);
                continue;
            };
            let rule = parse_rule(&row, tag, &columns)?;
            schema.add_rule(rule);
        }

        info!("Parsed schema with {} rules", schema.rules.len());
        Ok(schema)
    }

    /// Read and parse a schema from a local path or URL.
    pub fn load(location: &str) -> Result<Self> {
        info!("Loading schema from {}", location);
        let dataset = HxlReader::new().load(location)?;
        Self::parse(&dataset)
    }

    /// The built-in schema of common HXL conventions.
    pub fn default_schema() -> Result<Self> {
        let dataset = HxlReader::new().read_bytes(DEFAULT_SCHEMA.as_bytes())?;
        Self::parse(&dataset)
    }
}

fn parse_rule(row: &Row, tag: &str, columns: &SchemaColumns) -> Result<SchemaRule> {
    let mut rule = SchemaRule::parse(tag)?;

    rule.min_occur = to_int(row, &columns.min_occur)?;
    rule.max_occur = to_int(row, &columns.max_occur)?;
    rule.data_type = field(row, &columns.data_type)
        .map(str::parse::<DataType>)
        .transpose()?;
    rule.min_value = to_float(row, &columns.min_value)?;
    rule.max_value = to_float(row, &columns.max_value)?;
    rule.regex = field(row, &columns.regex).map(Regex::new).transpose()?;
    rule.required = to_boolean(field(row, &columns.required))?;
    rule.unique = to_boolean(field(row, &columns.unique))?;
    rule.unique_key = field(row, &columns.unique_key)
        .map(TagPattern::parse_list)
        .transpose()?;
    rule.correlation_key = field(row, &columns.correlation)
        .map(TagPattern::parse_list)
        .transpose()?;
    rule.severity = field(row, &columns.severity)
        .map(parse_severity)
        .unwrap_or_default();
    rule.description = field(row, &columns.description).map(str::to_string);
    rule.case_sensitive = to_boolean(field(row, &columns.case_sensitive))?;
    rule.consistent_datatypes = to_boolean(field(row, &columns.consistent_datatypes))?;

    if let Some(list) = field(row, &columns.value_list) {
        rule.enumeration = Some(list.split('|').map(|v| v.trim().to_string()).collect());
    } else if let Some(url) = field(row, &columns.value_url) {
        let target = field(row, &columns.target_tag).unwrap_or(tag);
        rule.enumeration = Some(load_allowed_values(url, target)?);
    }

    rule.init();
    Ok(rule)
}

/// Collect the allowed values for a rule from another dataset.
fn load_allowed_values(location: &str, target_tag: &str) -> Result<Vec<String>> {
    let pattern = TagPattern::parse(target_tag)?;
    let dataset = HxlReader::new().load(location)?;
    let values: Vec<String> = dataset.value_set(&pattern).into_iter().collect();
    debug!(
        "Loaded {} allowed values for {} from {}",
        values.len(),
        pattern,
        location
    );
    Ok(values)
}

/// Trimmed, non-empty value of the first matching column.
fn field<'a>(row: &'a Row, pattern: &TagPattern) -> Option<&'a str> {
    row.get(pattern).map(str::trim).filter(|v| !v.is_empty())
}

fn to_int(row: &Row, pattern: &TagPattern) -> Result<Option<usize>> {
    field(row, pattern)
        .map(|v| {
            v.parse::<usize>().map_err(|_| HxlError::InvalidNumber {
                field: pattern.to_string(),
                value: v.to_string(),
            })
        })
        .transpose()
}

fn to_float(row: &Row, pattern: &TagPattern) -> Result<Option<f64>> {
    field(row, pattern)
        .map(|v| {
            v.parse::<f64>().map_err(|_| HxlError::InvalidNumber {
                field: pattern.to_string(),
                value: v.to_string(),
            })
        })
        .transpose()
}

/// Parse a schema true/false field. Absent means false.
pub fn to_boolean(value: Option<&str>) -> Result<bool> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_lowercase().as_str() {
        "" | "0" | "n" | "no" | "f" | "false" => Ok(false),
        "y" | "yes" | "t" | "true" => Ok(true),
        _ => Err(HxlError::InvalidBoolean(value.to_string())),
    }
}

fn parse_severity(value: &str) -> Severity {
    value.parse().unwrap_or_else(|other| {
        warn!("Unknown severity '{}', using error", other);
        Severity::Error
    })
}
