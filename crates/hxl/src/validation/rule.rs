//! A single validation rule bound to a tag pattern.

use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use super::error::{Severity, ValidationError};
use super::matcher::find_closest_match;
use super::types::DataType;
use crate::datatypes::{self, InferredType};
use crate::error::Result;
use crate::model::{Column, Row, TagPattern, display_patterns};

/// Receives every validation error as it is found.
pub type Callback = Box<dyn FnMut(ValidationError)>;

/// Enumerations longer than this are not spelled out in error messages.
const MAX_LISTED_VALUES: usize = 7;

/// Where a value was seen, kept until the end of the stream.
///
/// Holds the row by reference count, so tracking a value never copies the row.
#[derive(Debug, Clone)]
struct Occurrence {
    row: Row,
    index: usize,
}

impl Occurrence {
    fn new(row: &Row, index: usize) -> Self {
        Self {
            row: row.clone(),
            index,
        }
    }

    fn column(&self) -> &Column {
        &self.row.columns[self.index]
    }

    fn value(&self) -> &str {
        &self.row.values[self.index]
    }
}

/// Accumulated state for one validation run.
#[derive(Debug, Default)]
struct RuleState {
    initialised: bool,
    /// Normalised enum value -> original spelling.
    enum_map: Option<IndexMap<String, String>>,
    unique_values: HashSet<String>,
    unique_keys: HashSet<Vec<String>>,
    /// display tag -> correlation key -> normalised value -> occurrences
    correlations: IndexMap<String, IndexMap<Vec<String>, IndexMap<String, Vec<Occurrence>>>>,
    /// display tag -> inferred type -> occurrences
    consistency: IndexMap<String, IndexMap<InferredType, Vec<Occurrence>>>,
    /// Normalised value -> closest enum value (or none)
    suggestions: HashMap<String, Option<String>>,
}

/// Validation rule for the columns matching one tag pattern.
///
/// All constraints are optional. Per-value checks run as rows arrive;
/// correlation and datatype consistency are resolved by [`SchemaRule::finish`]
/// once the whole stream has been seen. A rule accumulates state, so use a
/// fresh rule for each stream.
pub struct SchemaRule {
    tag_pattern: TagPattern,
    /// Minimum number of matching columns, and of non-empty matching values per row.
    pub min_occur: Option<usize>,
    /// Maximum number of non-empty matching values per row.
    pub max_occur: Option<usize>,
    /// At least one matching column, and a non-empty value in every row.
    pub required: bool,
    pub data_type: Option<DataType>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    /// Must match at the start of the value.
    pub regex: Option<Regex>,
    /// Closed set of allowed values.
    pub enumeration: Option<Vec<String>>,
    /// Compare values exactly rather than lowercased.
    pub case_sensitive: bool,
    /// No value may repeat across the stream.
    pub unique: bool,
    /// Patterns whose joint values must be unique per row.
    pub unique_key: Option<Vec<TagPattern>>,
    /// Patterns whose values should determine this rule's value.
    pub correlation_key: Option<Vec<TagPattern>>,
    /// Every non-empty value should infer to the same datatype.
    pub consistent_datatypes: bool,
    pub severity: Severity,
    pub description: Option<String>,
    callback: Option<Callback>,
    state: RuleState,
}

impl SchemaRule {
    /// Create an unconstrained rule for a pattern.
    pub fn new(tag_pattern: TagPattern) -> Self {
        Self {
            tag_pattern,
            min_occur: None,
            max_occur: None,
            required: false,
            data_type: None,
            min_value: None,
            max_value: None,
            regex: None,
            enumeration: None,
            case_sensitive: false,
            unique: false,
            unique_key: None,
            correlation_key: None,
            consistent_datatypes: false,
            severity: Severity::Error,
            description: None,
            callback: None,
            state: RuleState::default(),
        }
    }

    /// Create a rule from a tag pattern string such as `#adm1+code`.
    pub fn parse(tag_pattern: &str) -> Result<Self> {
        Ok(Self::new(TagPattern::parse(tag_pattern)?))
    }

    pub fn tag_pattern(&self) -> &TagPattern {
        &self.tag_pattern
    }

    /// Require a matching column and a value in every row.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Forbid repeated values.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Compare values case-sensitively.
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    /// Expect one datatype across the whole stream.
    pub fn consistent_datatypes(mut self) -> Self {
        self.consistent_datatypes = true;
        self
    }

    pub fn with_min_occur(mut self, min_occur: usize) -> Self {
        self.min_occur = Some(min_occur);
        self
    }

    pub fn with_max_occur(mut self, max_occur: usize) -> Self {
        self.max_occur = Some(max_occur);
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn with_min_value(mut self, min_value: f64) -> Self {
        self.min_value = Some(min_value);
        self
    }

    pub fn with_max_value(mut self, max_value: f64) -> Self {
        self.max_value = Some(max_value);
        self
    }

    /// Set the pattern values must match.
    pub fn with_regex(mut self, pattern: &str) -> Result<Self> {
        self.regex = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Set the allowed values.
    pub fn with_enumeration<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enumeration = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Set composite-uniqueness patterns from a comma-separated list.
    pub fn with_unique_key(mut self, patterns: &str) -> Result<Self> {
        self.unique_key = Some(TagPattern::parse_list(patterns)?);
        Ok(self)
    }

    /// Set correlation patterns from a comma-separated list.
    pub fn with_correlation_key(mut self, patterns: &str) -> Result<Self> {
        self.correlation_key = Some(TagPattern::parse_list(patterns)?);
        Ok(self)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the callback that receives this rule's errors.
    pub fn with_callback(mut self, callback: impl FnMut(ValidationError) + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Swap in a new callback, returning the previous one.
    pub fn replace_callback(&mut self, callback: Option<Callback>) -> Option<Callback> {
        std::mem::replace(&mut self.callback, callback)
    }

    /// Prepare derived lookup structures. Call after setting fields and before use;
    /// the validation methods call it automatically, and repeat calls do nothing.
    pub fn init(&mut self) {
        if self.state.initialised {
            return;
        }

        if let Some(values) = &self.enumeration {
            let enum_map = values
                .iter()
                .map(|v| (self.normalise_value(v), v.clone()))
                .collect();
            self.state.enum_map = Some(enum_map);
        }

        if let Some(key) = &mut self.unique_key {
            if !key.contains(&self.tag_pattern) {
                key.push(self.tag_pattern.clone());
            }
        }

        // Values are lowercased when case-insensitive, so the pattern must be too.
        if !self.case_sensitive {
            if let Some(pattern) = self.regex.as_ref().map(|r| r.as_str().to_string()) {
                match RegexBuilder::new(&pattern).case_insensitive(true).build() {
                    Ok(insensitive) => self.regex = Some(insensitive),
                    Err(e) => warn!(
                        "Keeping case-sensitive pattern for {}: {}",
                        self.tag_pattern, e
                    ),
                }
            }
        }

        self.state.initialised = true;
    }

    /// Check that the columns needed by this rule are present.
    pub fn validate_columns(&mut self, columns: &[Column]) -> bool {
        self.init();

        let min_occur = self.min_occur.unwrap_or(0);
        if !self.required && min_occur == 0 {
            return true;
        }

        let seen = columns.iter().filter(|c| self.tag_pattern.matches(c)).count();
        if (self.required && seen < 1) || seen < min_occur {
            let message = if seen == 0 {
                "column with this hashtag required but not found".to_string()
            } else {
                format!(
                    "not enough columns with this hashtag (expected {min_occur} but found {seen})"
                )
            };
            return self.report(self.error(message));
        }

        true
    }

    /// Apply the rule to every matching value in a row, then to the row as a whole.
    pub fn validate_row(&mut self, row: &Row) -> bool {
        self.init();

        let matching: Vec<usize> = row
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| self.tag_pattern.matches(c))
            .map(|(i, _)| i)
            .collect();
        let first_column = matching.first().map(|&i| &row.columns[i]);
        let last_column = matching.last().map(|&i| &row.columns[i]);

        let mut result = true;
        let mut number_seen = 0;
        for &i in &matching {
            let value = &row.values[i];
            result &= self.validate(value, Some(row), Some(&row.columns[i]));
            if !datatypes::is_empty(value) {
                number_seen += 1;
            }
        }

        if self.required && number_seen < 1 {
            let message = format!("A value for {} was required.", self.tag_pattern);
            result = self.report(self.error(message).at(Some(row), first_column));
        }
        if let Some(min_occur) = self.min_occur {
            if number_seen < min_occur {
                let message =
                    format!("Expected at least {min_occur} instance(s) but found {number_seen}");
                result = self.report(self.error(message).at(Some(row), last_column));
            }
        }
        if let Some(max_occur) = self.max_occur {
            if number_seen > max_occur {
                let message =
                    format!("Expected at most {max_occur} instance(s) but found {number_seen}");
                result = self.report(self.error(message).at(Some(row), last_column));
            }
        }

        if let Some(patterns) = &self.unique_key {
            let key = row.key(patterns);
            if !self.state.unique_keys.insert(key) {
                let message = format!(
                    "Duplicate row according to tag patterns [{}]",
                    display_patterns(patterns)
                );
                result = self.report(self.error(message).at(Some(row), first_column));
            }
        }

        if self.correlation_key.is_some() {
            self.track_correlation(row, &matching);
        }
        if self.consistent_datatypes {
            self.track_datatypes(row, &matching);
        }

        result
    }

    /// Apply the rule to a single value. Empty values always pass.
    pub fn validate(&mut self, raw_value: &str, row: Option<&Row>, column: Option<&Column>) -> bool {
        self.init();

        if datatypes::is_empty(raw_value) {
            return true;
        }
        let value = self.normalise_value(raw_value);

        // every check runs, even after a failure
        let mut result = true;
        result &= self.test_type(&value, raw_value, row, column);
        result &= self.test_range(&value, raw_value, row, column);
        result &= self.test_pattern(&value, raw_value, row, column);
        result &= self.test_enumeration(&value, raw_value, row, column);
        result &= self.test_unique(&value, raw_value, row, column);
        result
    }

    /// Resolve the whole-dataset checks. Call exactly once, after the last row.
    pub fn finish(&mut self) -> bool {
        self.init();

        let mut result = self.finish_correlations();
        if self.consistent_datatypes {
            result &= self.finish_consistency();
        }
        result
    }

    fn normalise_value(&self, raw_value: &str) -> String {
        if self.case_sensitive {
            datatypes::normalise_space(raw_value)
        } else {
            datatypes::normalise_string(raw_value)
        }
    }

    fn error(&self, message: impl Into<String>) -> ValidationError {
        ValidationError::new(
            message,
            self.tag_pattern.clone(),
            self.severity,
            self.description.clone(),
        )
    }

    /// Hand an error to the callback. Always returns false.
    fn report(&mut self, error: ValidationError) -> bool {
        if let Some(callback) = self.callback.as_mut() {
            callback(error);
        }
        false
    }

    fn test_type(&mut self, value: &str, raw: &str, row: Option<&Row>, column: Option<&Column>) -> bool {
        let Some(data_type) = self.data_type else {
            return true;
        };
        if data_type.is_valid(value) {
            return true;
        }
        let error = self
            .error(data_type.error_message())
            .with_value(Some(raw))
            .at(row, column);
        self.report(error)
    }

    fn test_range(&mut self, value: &str, raw: &str, row: Option<&Row>, column: Option<&Column>) -> bool {
        if self.min_value.is_none() && self.max_value.is_none() {
            return true;
        }
        let Ok(number) = value.parse::<f64>() else {
            debug!("Non-numeric value '{}' for range check on {}", raw, self.tag_pattern);
            return false;
        };

        let mut result = true;
        if let Some(min_value) = self.min_value {
            if number < min_value {
                let error = self
                    .error(format!("Value is less than {min_value}"))
                    .with_value(Some(raw))
                    .at(row, column);
                result = self.report(error);
            }
        }
        if let Some(max_value) = self.max_value {
            if number > max_value {
                let error = self
                    .error(format!("Value is greater than {max_value}"))
                    .with_value(Some(raw))
                    .at(row, column);
                result = self.report(error);
            }
        }
        result
    }

    fn test_pattern(&mut self, value: &str, raw: &str, row: Option<&Row>, column: Option<&Column>) -> bool {
        let Some(regex) = &self.regex else {
            return true;
        };
        if regex.find(value).is_some_and(|m| m.start() == 0) {
            return true;
        }
        let message = format!("Failed to match pattern {}", regex.as_str());
        let error = self.error(message).with_value(Some(raw)).at(row, column);
        self.report(error)
    }

    fn test_enumeration(
        &mut self,
        value: &str,
        raw: &str,
        row: Option<&Row>,
        column: Option<&Column>,
    ) -> bool {
        let Some(enum_map) = &self.state.enum_map else {
            return true;
        };
        if enum_map.contains_key(value) {
            return true;
        }

        let suggested_value = match self.state.suggestions.get(value) {
            Some(cached) => cached.clone(),
            None => {
                let closest = find_closest_match(value, enum_map.keys().map(String::as_str))
                    .and_then(|key| enum_map.get(key).cloned());
                self.state
                    .suggestions
                    .insert(value.to_string(), closest.clone());
                closest
            }
        };

        let message = match &self.enumeration {
            Some(values) if values.len() <= MAX_LISTED_VALUES => {
                format!("Must be one of [{}]", values.join(", "))
            }
            _ => "Not in allowed values".to_string(),
        };
        let error = self
            .error(message)
            .with_value(Some(raw))
            .at(row, column)
            .with_suggestion(suggested_value);
        self.report(error)
    }

    fn test_unique(&mut self, value: &str, raw: &str, row: Option<&Row>, column: Option<&Column>) -> bool {
        if !self.unique {
            return true;
        }
        let normalised = datatypes::normalise(value, column);
        if self.state.unique_values.insert(normalised) {
            return true;
        }
        let error = self
            .error("Found duplicate value")
            .with_value(Some(raw))
            .at(row, column);
        self.report(error)
    }

    /// Record the first non-empty matching value under its correlation key.
    fn track_correlation(&mut self, row: &Row, matching: &[usize]) {
        let Some(patterns) = &self.correlation_key else {
            return;
        };

        // The rule's own columns never count towards its key.
        let key: Vec<String> = row
            .cells()
            .filter(|(c, _)| TagPattern::matches_any(patterns, c) && !self.tag_pattern.matches(c))
            .map(|(c, v)| datatypes::normalise(v, Some(c)))
            .collect();

        let Some(&i) = matching
            .iter()
            .find(|&&i| !datatypes::is_empty(&row.values[i]))
        else {
            return;
        };
        let column = &row.columns[i];
        let value = &row.values[i];

        self.state
            .correlations
            .entry(column.display_tag())
            .or_default()
            .entry(key)
            .or_default()
            .entry(datatypes::normalise(value, Some(column)))
            .or_default()
            .push(Occurrence::new(row, i));
    }

    /// Record the inferred datatype of every non-empty matching value.
    fn track_datatypes(&mut self, row: &Row, matching: &[usize]) {
        for &i in matching {
            let value = &row.values[i];
            if datatypes::is_empty(value) {
                continue;
            }
            let column = &row.columns[i];
            let inferred = datatypes::type_of(value, Some(column));
            self.state
                .consistency
                .entry(column.display_tag())
                .or_default()
                .entry(inferred)
                .or_default()
                .push(Occurrence::new(row, i));
        }
    }

    /// For each correlation key seen with more than one value, flag every value
    /// except the most frequent one (ties go to the value seen first).
    fn finish_correlations(&mut self) -> bool {
        let Some(patterns) = &self.correlation_key else {
            return true;
        };
        let message = format!(
            "wrong value for related column(s) {}",
            display_patterns(patterns)
        );

        let mut errors = Vec::new();
        for keys in self.state.correlations.values() {
            for values in keys.values() {
                if values.len() < 2 {
                    continue;
                }
                let ranked = rank_by_count(values);
                let expected = ranked[0].1[0].value().to_string();
                for (_, occurrences) in &ranked[1..] {
                    for occurrence in occurrences.iter() {
                        errors.push(
                            self.error(message.as_str())
                                .with_value(Some(occurrence.value()))
                                .at(Some(&occurrence.row), Some(occurrence.column()))
                                .with_suggestion(Some(expected.clone())),
                        );
                    }
                }
            }
        }

        let result = errors.is_empty();
        for error in errors {
            self.report(error);
        }
        result
    }

    /// For each hashtag with more than one inferred datatype, flag every value
    /// not of the most common type (ties go to the type seen first).
    fn finish_consistency(&mut self) -> bool {
        let mut errors = Vec::new();
        for types in self.state.consistency.values() {
            if types.len() < 2 {
                continue;
            }
            let ranked = rank_by_count(types);
            let expected = *ranked[0].0;
            for (inferred, occurrences) in &ranked[1..] {
                for occurrence in occurrences.iter() {
                    errors.push(
                        self.error(format!("inconsistent datatype {inferred} (expected {expected})"))
                            .with_value(Some(occurrence.value()))
                            .at(Some(&occurrence.row), Some(occurrence.column())),
                    );
                }
            }
        }

        let result = errors.is_empty();
        for error in errors {
            self.report(error);
        }
        result
    }
}

/// Entries sorted by occurrence count, most frequent first. The sort is stable,
/// so equal counts keep insertion order.
fn rank_by_count<K>(map: &IndexMap<K, Vec<Occurrence>>) -> Vec<(&K, &Vec<Occurrence>)> {
    let mut ranked: Vec<_> = map.iter().collect();
    ranked.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    ranked
}

impl fmt::Display for SchemaRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<HXL schema rule: {}>", self.tag_pattern)
    }
}

impl fmt::Debug for SchemaRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRule")
            .field("tag_pattern", &self.tag_pattern)
            .field("min_occur", &self.min_occur)
            .field("max_occur", &self.max_occur)
            .field("required", &self.required)
            .field("data_type", &self.data_type)
            .field("min_value", &self.min_value)
            .field("max_value", &self.max_value)
            .field("regex", &self.regex)
            .field("enumeration", &self.enumeration)
            .field("case_sensitive", &self.case_sensitive)
            .field("unique", &self.unique)
            .field("unique_key", &self.unique_key)
            .field("correlation_key", &self.correlation_key)
            .field("consistent_datatypes", &self.consistent_datatypes)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}
