//! Value normalisation and datatype recognition.
//!
//! HXL cells are always strings. These helpers decide whether a string looks
//! like a number or a date, and reduce values to a canonical form so that
//! `" Coast "`, `"coast"` and `"COAST"` compare equal.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::Column;

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?$").unwrap());

// Partial dates that chrono cannot turn into a calendar day.
static PARTIAL_DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\d{4}$").unwrap(),                   // year
        Regex::new(r"^\d{4}-\d{1,2}$").unwrap(),           // year-month
        Regex::new(r"(?i)^\d{4}-?w\d{1,2}$").unwrap(),     // ISO week
        Regex::new(r"(?i)^\d{4}-?q[1-4]$").unwrap(),       // quarter
    ]
});

// Order matters: day-first wins for ambiguous numeric dates.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Datatype inferred from a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferredType {
    /// Blank or whitespace only.
    Empty,
    /// A date in a `#date` column.
    Date,
    /// A numeric literal.
    Number,
    /// Anything else.
    String,
}

impl InferredType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferredType::Empty => "empty",
            InferredType::Date => "date",
            InferredType::Number => "number",
            InferredType::String => "string",
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim and collapse internal whitespace runs to a single space.
pub fn normalise_space(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-normalise and lowercase.
pub fn normalise_string(s: &str) -> String {
    normalise_space(s).to_lowercase()
}

/// Check if a value is blank.
pub fn is_empty(s: &str) -> bool {
    s.trim().is_empty()
}

/// Check if a value is a numeric literal (`nan` and `inf` are not).
pub fn is_number(s: &str) -> bool {
    NUMBER.is_match(s.trim())
}

/// Render a number canonically, dropping a fractional part of zero.
pub fn normalise_number(s: &str) -> Option<String> {
    if !is_number(s) {
        return None;
    }
    let n: f64 = s.trim().parse().ok()?;
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Some(format!("{}", n as i64))
    } else {
        Some(format!("{n}"))
    }
}

/// Parse a full calendar date, ignoring any time component.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = normalise_space(s);
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&s, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(&s, format) {
            return Some(datetime.date());
        }
    }
    DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.date_naive())
}

fn is_partial_date(s: &str) -> bool {
    let s = s.trim();
    PARTIAL_DATE_PATTERNS.iter().any(|pattern| pattern.is_match(s))
}

/// Check if a value looks like a date of some sort.
pub fn is_date(s: &str) -> bool {
    !is_empty(s) && (is_partial_date(s) || parse_date(s).is_some())
}

/// Render a full date as `YYYY-MM-DD`; partial dates are string-normalised.
pub fn normalise_date(s: &str) -> Option<String> {
    if let Some(date) = parse_date(s) {
        Some(date.format("%Y-%m-%d").to_string())
    } else if is_partial_date(s) {
        Some(normalise_string(s))
    } else {
        None
    }
}

fn is_date_column(column: Option<&Column>) -> bool {
    column.is_some_and(|c| c.tag == "#date")
}

/// Infer the datatype of a value, using the column to recognise dates.
pub fn type_of(s: &str, column: Option<&Column>) -> InferredType {
    if is_empty(s) {
        InferredType::Empty
    } else if is_date_column(column) && is_date(s) {
        InferredType::Date
    } else if is_number(s) {
        InferredType::Number
    } else {
        InferredType::String
    }
}

/// Normalise a value according to its inferred type.
pub fn normalise(s: &str, column: Option<&Column>) -> String {
    if is_date_column(column) {
        if let Some(date) = normalise_date(s) {
            return date;
        }
    }
    normalise_number(s).unwrap_or_else(|| normalise_string(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_space() {
        assert_eq!(normalise_space("  Coast \t Region\n"), "Coast Region");
        assert_eq!(normalise_string("  Coast  REGION "), "coast region");
        assert_eq!(normalise_space(""), "");
    }

    #[test]
    fn test_is_empty() {
        assert!(is_empty(""));
        assert!(is_empty("  \t"));
        assert!(!is_empty("0"));
    }

    #[test]
    fn test_is_number() {
        assert!(is_number("200"));
        assert!(is_number(" -1.5 "));
        assert!(is_number(".5"));
        assert!(is_number("1e6"));
        assert!(is_number("001"));
        assert!(!is_number("abc"));
        assert!(!is_number("nan"));
        assert!(!is_number("inf"));
        assert!(!is_number("1,000"));
        assert!(!is_number(""));
    }

    #[test]
    fn test_normalise_number() {
        assert_eq!(normalise_number("001").as_deref(), Some("1"));
        assert_eq!(normalise_number("2.50").as_deref(), Some("2.5"));
        assert_eq!(normalise_number("1e3").as_deref(), Some("1000"));
        assert_eq!(normalise_number("x"), None);
    }

    #[test]
    fn test_is_date() {
        assert!(is_date("2015-03-01"));
        assert!(is_date("01/03/2015"));
        assert!(is_date("1 March 2015"));
        assert!(is_date("Mar 1, 2015"));
        assert!(is_date("2015-03-01T10:15:00"));
        assert!(is_date("2015-03-01T10:15:00+03:00"));
        assert!(is_date("2015"));
        assert!(is_date("2015-03"));
        assert!(is_date("2015-W09"));
        assert!(is_date("2015Q1"));
        assert!(!is_date("yesterday"));
        assert!(!is_date("2015-13-45"));
        assert!(!is_date(""));
    }

    #[test]
    fn test_normalise_date_is_day_first() {
        assert_eq!(normalise_date("01/03/2015").as_deref(), Some("2015-03-01"));
        assert_eq!(normalise_date("13/03/2015").as_deref(), Some("2015-03-13"));
        assert_eq!(normalise_date("03/13/2015").as_deref(), Some("2015-03-13"));
        assert_eq!(normalise_date("2015-Q1").as_deref(), Some("2015-q1"));
        assert_eq!(normalise_date("never"), None);
    }

    #[test]
    fn test_type_of() {
        let date = Column::new("#date");
        let affected = Column::new("#affected");
        assert_eq!(type_of("", None), InferredType::Empty);
        assert_eq!(type_of("200", Some(&affected)), InferredType::Number);
        assert_eq!(type_of("abc", Some(&affected)), InferredType::String);
        assert_eq!(type_of("2015-03-01", Some(&date)), InferredType::Date);
        assert_eq!(type_of("2015-03-01", Some(&affected)), InferredType::String);
        assert_eq!(InferredType::Number.to_string(), "number");
    }

    #[test]
    fn test_normalise() {
        let date = Column::new("#date");
        assert_eq!(normalise(" Coast ", None), "coast");
        assert_eq!(normalise("001", None), "1");
        assert_eq!(normalise("1 March 2015", Some(&date)), "2015-03-01");
        assert_eq!(normalise("1 March 2015", None), "1 march 2015");
    }
}
