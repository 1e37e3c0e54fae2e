//! Collected results of a validation run.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::{Severity, ValidationError};

/// Every error from one validation run, with summary counts.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// True when no rule failed.
    pub valid: bool,
    /// Errors in the order they were reported.
    pub errors: Vec<ValidationError>,
    pub summary: ReportSummary,
}

/// Summary of a validation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total number of errors.
    pub total_errors: usize,
    /// Errors by the severity of the rule that raised them.
    pub errors_by_severity: SeverityCounts,
    /// Errors by rule tag pattern, in first-seen order.
    pub errors_by_pattern: IndexMap<String, usize>,
}

/// Counts of errors by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl ValidationReport {
    pub fn new(valid: bool, errors: Vec<ValidationError>) -> Self {
        let mut summary = ReportSummary {
            total_errors: errors.len(),
            ..ReportSummary::default()
        };
        for error in &errors {
            match error.severity() {
                Severity::Error => summary.errors_by_severity.error += 1,
                Severity::Warning => summary.errors_by_severity.warning += 1,
                Severity::Info => summary.errors_by_severity.info += 1,
            }
            *summary
                .errors_by_pattern
                .entry(error.pattern().to_string())
                .or_insert(0) += 1;
        }
        Self {
            valid,
            errors,
            summary,
        }
    }

    /// Errors raised by rules of a given severity.
    pub fn errors_with_severity(&self, severity: Severity) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.severity() == severity)
    }

    /// Render the report as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        let errors: Vec<serde_json::Value> = self
            .errors
            .iter()
            .map(|e| {
                json!({
                    "message": e.message(),
                    "pattern": e.pattern().to_string(),
                    "severity": e.severity(),
                    "description": e.description(),
                    "value": e.value(),
                    "row": e.row_number(),
                    "column": e.column().map(|c| c.display_tag()),
                    "suggested_value": e.suggested_value(),
                })
            })
            .collect();

        json!({
            "valid": self.valid,
            "summary": self.summary,
            "errors": errors,
        })
    }
}
