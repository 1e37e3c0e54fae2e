//! Datatypes a schema rule can require.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::datatypes;
use crate::error::HxlError;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@]+@[^@]+$").unwrap());

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9xX()\s-]{5,}$").unwrap());

/// Declared datatype for a rule's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Free text; anything passes.
    Text,
    /// Numeric literal.
    Number,
    /// URL with both a scheme and a host.
    Url,
    /// Something with a single `@` and text on both sides.
    Email,
    /// Digits, spaces, hyphens, parentheses and extension marks, optional leading `+`.
    Phone,
    /// Any recognisable date.
    Date,
}

impl DataType {
    /// Every supported datatype.
    pub const ALL: [DataType; 6] = [
        DataType::Text,
        DataType::Number,
        DataType::Url,
        DataType::Email,
        DataType::Phone,
        DataType::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::Number => "number",
            DataType::Url => "url",
            DataType::Email => "email",
            DataType::Phone => "phone",
            DataType::Date => "date",
        }
    }

    /// The check function for this datatype.
    pub fn checker(&self) -> fn(&str) -> bool {
        match self {
            DataType::Text => |_| true,
            DataType::Number => datatypes::is_number,
            DataType::Url => is_url,
            DataType::Email => |v| EMAIL.is_match(v),
            DataType::Phone => |v| PHONE.is_match(v),
            DataType::Date => datatypes::is_date,
        }
    }

    /// Test a (normalised) value against this datatype.
    pub fn is_valid(&self, value: &str) -> bool {
        (self.checker())(value)
    }

    /// Message reported when a value fails the check.
    pub fn error_message(&self) -> &'static str {
        match self {
            DataType::Text => "Expected text",
            DataType::Number => "Expected a number",
            DataType::Url => "Expected a URL",
            DataType::Email => "Expected an email address",
            DataType::Phone => "Expected a phone number",
            DataType::Date => "Expected a date of some sort",
        }
    }
}

/// Needs an explicit `scheme://host`; the url crate would otherwise accept
/// `http:example.com` and supply the host itself.
fn is_url(value: &str) -> bool {
    let value = value.trim();
    let Ok(parsed) = url::Url::parse(value) else {
        return false;
    };
    let has_authority = value
        .get(parsed.scheme().len()..)
        .is_some_and(|rest| rest.starts_with("://"));
    has_authority && parsed.host_str().is_some_and(|h| !h.is_empty())
}

impl FromStr for DataType {
    type Err = HxlError;

    /// Case-insensitive; characters outside `[a-z_-]` are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name: String = s
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase() || *c == '_' || *c == '-')
            .collect();
        DataType::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| HxlError::UnknownDataType(s.to_string()))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
