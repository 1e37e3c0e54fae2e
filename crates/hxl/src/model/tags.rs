//! Hashtags, attributes and tag patterns.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{HxlError, Result};

static TAGSPEC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(#[a-z][a-z0-9_]*)((?:\s*\+\s*[a-z][a-z0-9_]*)*)\s*$").unwrap()
});

static PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*#?([a-z][a-z0-9_]*|\*)((?:\s*[+-]\s*[a-z][a-z0-9_]*)*)\s*(!)?\s*$").unwrap()
});

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([+-])\s*([a-z][a-z0-9_]*)").unwrap());

/// A tagged column: hashtag, attributes and the optional text header above it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Lowercase hashtag including the leading `#`.
    pub tag: String,
    /// Lowercase attributes without the leading `+`, in declaration order.
    pub attributes: Vec<String>,
    /// Free-text header from the row above the hashtags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

impl Column {
    /// Create a column with a bare hashtag.
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into().trim().to_lowercase();
        let tag = if tag.starts_with('#') {
            tag
        } else {
            format!("#{tag}")
        };
        Self {
            tag,
            attributes: Vec::new(),
            header: None,
        }
    }

    /// Parse a tagspec such as `#affected +f +children`.
    pub fn parse(spec: &str) -> Result<Self> {
        let lowered = spec.to_lowercase();
        let caps = TAGSPEC
            .captures(&lowered)
            .ok_or_else(|| HxlError::InvalidTagPattern(spec.to_string()))?;

        let mut column = Column::new(&caps[1]);
        for attr in ATTRIBUTE.captures_iter(&caps[2]) {
            column.add_attribute(&attr[2]);
        }
        Ok(column)
    }

    /// Set the text header.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    /// Add an attribute (ignored if already present).
    pub fn with_attribute(mut self, attribute: &str) -> Self {
        self.add_attribute(attribute);
        self
    }

    fn add_attribute(&mut self, attribute: &str) {
        let attribute = attribute.trim().trim_start_matches('+').to_lowercase();
        if !attribute.is_empty() && !self.has_attribute(&attribute) {
            self.attributes.push(attribute);
        }
    }

    /// Check whether the column carries an attribute.
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
    }

    /// Hashtag plus attributes, e.g. `#adm1+code`.
    pub fn display_tag(&self) -> String {
        let mut s = self.tag.clone();
        for attribute in &self.attributes {
            s.push('+');
            s.push_str(attribute);
        }
        s
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_tag())
    }
}

/// A predicate selecting columns by hashtag and attributes.
///
/// `#adm1+code-v_iso!` matches columns tagged `#adm1` that carry `+code`,
/// do not carry `+v_iso`, and (because of `!`) carry nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagPattern {
    tag: String,
    include_attributes: Vec<String>,
    exclude_attributes: Vec<String>,
    is_absolute: bool,
}

impl TagPattern {
    /// Parse a single tag pattern.
    pub fn parse(s: &str) -> Result<Self> {
        let lowered = s.to_lowercase();
        let caps = PATTERN
            .captures(&lowered)
            .ok_or_else(|| HxlError::InvalidTagPattern(s.to_string()))?;

        let mut include_attributes = Vec::new();
        let mut exclude_attributes = Vec::new();
        for attr in ATTRIBUTE.captures_iter(&caps[2]) {
            let name = attr[2].to_string();
            if &attr[1] == "+" {
                include_attributes.push(name);
            } else {
                exclude_attributes.push(name);
            }
        }

        Ok(Self {
            tag: format!("#{}", &caps[1]),
            include_attributes,
            exclude_attributes,
            is_absolute: caps.get(3).is_some(),
        })
    }

    /// Parse a comma-separated list of tag patterns. Blank entries are skipped.
    pub fn parse_list(s: &str) -> Result<Vec<Self>> {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// The hashtag (with `#`), or `#*` for the wildcard.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Test whether a column satisfies this pattern.
    pub fn matches(&self, column: &Column) -> bool {
        if self.tag != "#*" && self.tag != column.tag {
            return false;
        }
        if !self.include_attributes.iter().all(|a| column.has_attribute(a)) {
            return false;
        }
        if self.exclude_attributes.iter().any(|a| column.has_attribute(a)) {
            return false;
        }
        if self.is_absolute {
            return column
                .attributes
                .iter()
                .all(|a| self.include_attributes.contains(a));
        }
        true
    }

    /// Test whether a column satisfies any pattern in a list.
    pub fn matches_any(patterns: &[TagPattern], column: &Column) -> bool {
        patterns.iter().any(|p| p.matches(column))
    }

    /// Index of the first column matching this pattern.
    pub fn find_column(&self, columns: &[Column]) -> Option<usize> {
        columns.iter().position(|c| self.matches(c))
    }
}

impl FromStr for TagPattern {
    type Err = HxlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TagPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)?;
        for a in &self.include_attributes {
            write!(f, "+{a}")?;
        }
        for a in &self.exclude_attributes {
            write!(f, "-{a}")?;
        }
        if self.is_absolute {
            f.write_str("!")?;
        }
        Ok(())
    }
}

/// Render a pattern list as `#a, #b+c`.
pub fn display_patterns(patterns: &[TagPattern]) -> String {
    patterns
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
