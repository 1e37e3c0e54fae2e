//! Validation findings delivered to the schema callback.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{Column, Row, TagPattern};

/// Severity level declared on a rule.
///
/// Severity is informational: every finding fails validation regardless.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational only, may not require action.
    Info,
    /// Potential issue that should be reviewed.
    Warning,
    /// Definite issue that should be addressed.
    #[default]
    Error,
}

impl Severity {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(other.to_string()),
        }
    }
}

/// One problem found while validating, with enough context to locate it.
#[derive(Debug, Clone)]
pub struct ValidationError {
    message: String,
    pattern: TagPattern,
    severity: Severity,
    description: Option<String>,
    value: Option<String>,
    row: Option<Row>,
    column: Option<Column>,
    suggested_value: Option<String>,
}

impl ValidationError {
    pub(crate) fn new(
        message: impl Into<String>,
        pattern: TagPattern,
        severity: Severity,
        description: Option<String>,
    ) -> Self {
        Self {
            message: message.into(),
            pattern,
            severity,
            description,
            value: None,
            row: None,
            column: None,
            suggested_value: None,
        }
    }

    pub(crate) fn with_value(mut self, value: Option<&str>) -> Self {
        self.value = value.map(str::to_string);
        self
    }

    pub(crate) fn at(mut self, row: Option<&Row>, column: Option<&Column>) -> Self {
        self.row = row.cloned();
        self.column = column.cloned();
        self
    }

    pub(crate) fn with_suggestion(mut self, suggested_value: Option<String>) -> Self {
        self.suggested_value = suggested_value;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Tag pattern of the rule that produced this error.
    pub fn pattern(&self) -> &TagPattern {
        &self.pattern
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Description of the rule, if the schema gave one.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The offending value, as it appeared in the data.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn row(&self) -> Option<&Row> {
        self.row.as_ref()
    }

    /// Zero-based data row number, when the error is tied to a row.
    pub fn row_number(&self) -> Option<usize> {
        self.row.as_ref().map(|r| r.row_number)
    }

    pub fn column(&self) -> Option<&Column> {
        self.column.as_ref()
    }

    /// A likely correction for the value.
    pub fn suggested_value(&self) -> Option<&str> {
        self.suggested_value.as_deref()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.as_deref() {
            Some(value) if !value.is_empty() => write!(f, "{}={} ", self.pattern, value)?,
            _ => write!(f, "{} ", self.pattern)?,
        }
        write!(f, "- {}", self.message)
    }
}

impl std::error::Error for ValidationError {}
