//! Ordered rule sets and the three-phase validation run.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info};

use super::error::ValidationError;
use super::report::ValidationReport;
use super::rule::{Callback, SchemaRule};
use crate::model::{Column, DataSource, Row};

/// A collection of rules applied together to one stream of rows.
///
/// Validation runs in three phases: the header is checked against every rule,
/// then each row is passed to every rule whose columns are present, and finally
/// every rule resolves its whole-dataset checks. Rule order only affects the
/// order errors are reported in.
#[derive(Default)]
pub struct Schema {
    /// Rules in declaration order.
    pub rules: Vec<SchemaRule>,
    callback: Option<Callback>,
    /// Indices of rules whose required columns are missing.
    impossible_rules: HashSet<usize>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a schema from a list of rules.
    pub fn with_rules(rules: Vec<SchemaRule>) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    /// Add a rule, builder style.
    pub fn with_rule(mut self, rule: SchemaRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set the callback that receives every error found by any rule.
    pub fn with_callback(mut self, callback: impl FnMut(ValidationError) + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Replace the schema callback. With `None`, rules report through their own callbacks.
    pub fn set_callback(&mut self, callback: Option<Callback>) {
        self.callback = callback;
    }

    pub fn add_rule(&mut self, rule: SchemaRule) {
        self.rules.push(rule);
    }

    /// Whether the rule at `index` failed the column phase.
    pub fn is_impossible(&self, index: usize) -> bool {
        self.impossible_rules.contains(&index)
    }

    /// Validate a whole stream. Returns true only if every phase of every rule passed.
    pub fn validate<S: DataSource>(&mut self, source: S) -> bool {
        info!("Validating with {} schema rules", self.rules.len());

        let mut result = self.validate_columns(source.columns());

        let mut row_count = 0;
        for row in source {
            result &= self.validate_row(&row);
            row_count += 1;
        }

        result &= self.finish();

        info!(
            "Validated {} rows: {}",
            row_count,
            if result { "valid" } else { "invalid" }
        );
        result
    }

    /// Run the column phase, marking rules whose columns are missing as impossible.
    pub fn validate_columns(&mut self, columns: &[Column]) -> bool {
        self.impossible_rules.clear();

        let mut result = true;
        for (index, rule) in self.rules.iter_mut().enumerate() {
            if !with_schema_callback(&mut self.callback, rule, |r| r.validate_columns(columns)) {
                debug!("Skipping rows for {}: columns not present", rule.tag_pattern());
                self.impossible_rules.insert(index);
                result = false;
            }
        }
        result
    }

    /// Run one row through every rule that is still possible.
    pub fn validate_row(&mut self, row: &Row) -> bool {
        let mut result = true;
        for (index, rule) in self.rules.iter_mut().enumerate() {
            if self.impossible_rules.contains(&index) {
                continue;
            }
            result &= with_schema_callback(&mut self.callback, rule, |r| r.validate_row(row));
        }
        result
    }

    /// Resolve deferred checks on every rule, impossible ones included.
    pub fn finish(&mut self) -> bool {
        let mut result = true;
        for rule in &mut self.rules {
            result &= with_schema_callback(&mut self.callback, rule, SchemaRule::finish);
        }
        result
    }

    /// Validate a stream and collect every error into a report.
    ///
    /// The schema callback is bypassed for the duration of the run.
    pub fn report<S: DataSource>(&mut self, source: S) -> ValidationReport {
        let collected: Rc<RefCell<Vec<ValidationError>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&collected);
        let previous = self
            .callback
            .replace(Box::new(move |e| sink.borrow_mut().push(e)));

        let valid = self.validate(source);
        self.callback = previous;

        ValidationReport::new(valid, collected.take())
    }
}

/// Run `f` on a rule with the schema callback swapped in, then swap it back.
///
/// Without a schema callback the rule keeps its own.
fn with_schema_callback<T>(
    callback: &mut Option<Callback>,
    rule: &mut SchemaRule,
    f: impl FnOnce(&mut SchemaRule) -> T,
) -> T {
    let Some(schema_callback) = callback.take() else {
        return f(rule);
    };
    let previous = rule.replace_callback(Some(schema_callback));
    let result = f(rule);
    *callback = rule.replace_callback(previous);
    result
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<HXL schema")?;
        for rule in &self.rules {
            writeln!(f, "  {rule}")?;
        }
        write!(f, ">")
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("rules", &self.rules)
            .field("impossible_rules", &self.impossible_rules)
            .finish_non_exhaustive()
    }
}
