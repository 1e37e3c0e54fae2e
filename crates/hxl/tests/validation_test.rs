//! End-to-end tests: read tagged files, load schemas, validate.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use tempfile::NamedTempFile;

use hxl::validation::Callback;
use hxl::{HxlError, HxlReader, Schema, Severity, ValidationError};

/// Helper to create a temporary file with given content.
fn create_test_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

fn collector() -> (Callback, Rc<RefCell<Vec<ValidationError>>>) {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    (Box::new(move |e| sink.borrow_mut().push(e)), errors)
}

/// A small 3W (who, what, where) dataset with a preamble row.
fn create_3w_data() -> NamedTempFile {
    create_test_file(
        "Kenya 3W report,,,,\n\
         Organisation,Sector,Province,Province code,People affected\n\
         #org,#sector,#adm1+name,#adm1+code,#affected\n\
         WFP,Food Security,Coast,001,1200\n\
         UNICEF,Helth,Coast,001,800\n\
         WFP,Food Security,Coast,002,lots\n\
         ,Education,Nairobi,003,-5\n",
    )
}

fn create_3w_schema() -> NamedTempFile {
    create_test_file(
        "#valid_tag,#valid_required,#valid_datatype,#valid_value+min,#valid_value+list,#valid_correlation,#valid_severity\n\
         #org,true,,,,,error\n\
         #sector,,,,Food Security|Health|Education|WASH,,warning\n\
         #adm1+code,,,,,#adm1+name,error\n\
         #affected,,number,0,,,error\n",
    )
}

// =============================================================================
// Reading
// =============================================================================

#[test]
fn test_read_skips_preamble() {
    let file = create_3w_data();
    let data = HxlReader::new().read_path(file.path()).unwrap();

    assert_eq!(data.row_count(), 4);
    assert_eq!(
        data.tags(),
        vec!["#org", "#sector", "#adm1+name", "#adm1+code", "#affected"]
    );
    assert_eq!(data.headers()[0], "Organisation");
}

#[test]
fn test_read_missing_file() {
    let result = HxlReader::new().load("/nonexistent/path/data.csv");
    assert!(matches!(result, Err(HxlError::Io { .. })));
}

#[test]
fn test_read_without_hashtags() {
    let file = create_test_file("a,b\n1,2\n3,4\n");
    let result = HxlReader::new().read_path(file.path());
    assert!(matches!(result, Err(HxlError::NoHashtagRow(_))));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_validate_3w() {
    let data_file = create_3w_data();
    let schema_file = create_3w_schema();

    let data = HxlReader::new().read_path(data_file.path()).unwrap();
    let mut schema = Schema::load(schema_file.path().to_str().unwrap()).unwrap();
    let (callback, errors) = collector();
    schema.set_callback(Some(callback));

    assert!(!schema.validate(data.rows()));

    let errors = errors.borrow();
    let messages: Vec<(Option<usize>, &str)> = errors
        .iter()
        .map(|e| (e.row_number(), e.message()))
        .collect();
    assert_eq!(
        messages,
        vec![
            (Some(1), "Must be one of [Food Security, Health, Education, WASH]"),
            (Some(2), "Expected a number"),
            (Some(3), "A value for #org was required."),
            (Some(3), "Value is less than 0"),
            (Some(2), "wrong value for related column(s) #adm1+name"),
        ]
    );

    assert_eq!(errors[0].suggested_value(), Some("Health"));
    assert_eq!(errors[0].severity(), Severity::Warning);
    assert_eq!(errors[4].value(), Some("002"));
    assert_eq!(errors[4].suggested_value(), Some("001"));
}

#[test]
fn test_fresh_schemas_report_same_errors() {
    let data_file = create_3w_data();
    let schema_file = create_3w_schema();
    let data = HxlReader::new().read_path(data_file.path()).unwrap();

    let run = || {
        let mut schema = Schema::load(schema_file.path().to_str().unwrap()).unwrap();
        let report = schema.report(data.rows());
        let errors: Vec<_> = report
            .errors
            .iter()
            .map(|e| {
                (
                    e.row_number(),
                    e.message().to_string(),
                    e.value().map(str::to_string),
                    e.suggested_value().map(str::to_string),
                )
            })
            .collect();
        (report.valid, errors)
    };

    let (first_valid, first) = run();
    let (second_valid, second) = run();
    assert!(!first_valid && !second_valid);
    assert_eq!(first.len(), 5);
    assert_eq!(first, second);
}

#[test]
fn test_missing_required_column_reported_once() {
    let data_file = create_test_file("#sector,#affected\nHealth,10\nWASH,20\n");
    let schema_file = create_3w_schema();

    let data = HxlReader::new().read_path(data_file.path()).unwrap();
    let mut schema = Schema::load(schema_file.path().to_str().unwrap()).unwrap();
    let report = schema.report(data.rows());

    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(
        report.errors[0].message(),
        "column with this hashtag required but not found"
    );
    assert!(schema.is_impossible(0));
}

#[test]
fn test_report_json() {
    let data_file = create_3w_data();
    let schema_file = create_3w_schema();

    let data = HxlReader::new().read_path(data_file.path()).unwrap();
    let mut schema = Schema::load(schema_file.path().to_str().unwrap()).unwrap();
    let report = schema.report(data.rows());

    assert_eq!(report.summary.total_errors, 5);
    assert_eq!(report.summary.errors_by_severity.warning, 1);
    assert_eq!(report.summary.errors_by_pattern["#affected"], 2);

    let json = report.to_json();
    assert_eq!(json["valid"], false);
    assert_eq!(json["errors"][1]["column"], "#affected");
    assert_eq!(json["errors"][1]["value"], "lots");
}

#[test]
fn test_allowed_values_from_file() {
    let values_file = create_test_file("Sector,Code\n#sector,#sector+code\nHealth,HEA\nEducation,EDU\n");
    let schema_file = create_test_file(&format!(
        "#valid_tag,#valid_value+url,#valid_value+target_tag\n\
         #sector,{},#sector+code\n",
        values_file.path().display()
    ));
    let data_file = create_test_file("#sector\nHEA\nedu\nWAS\n");

    let data = HxlReader::new().read_path(data_file.path()).unwrap();
    let mut schema = Schema::load(schema_file.path().to_str().unwrap()).unwrap();
    let report = schema.report(data.rows());

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].value(), Some("WAS"));
}

#[test]
fn test_allowed_values_default_to_rule_tag() {
    let values_file = create_test_file("#org\nWFP\nUNICEF\n");
    let schema_file = create_test_file(&format!(
        "#valid_tag,#valid_value+url\n#org,{}\n",
        values_file.path().display()
    ));

    let schema = Schema::load(schema_file.path().to_str().unwrap()).unwrap();
    assert_eq!(
        schema.rules[0].enumeration,
        Some(vec!["WFP".to_string(), "UNICEF".to_string()])
    );
}

#[test]
fn test_default_schema() {
    let data_file = create_test_file(
        "#country+code,#geo+lat,#geo+lon,#affected,#contact+email\n\
         KEN,-1.29,36.82,100,info@example.org\n\
         Kenya,95,36.82,50,not an address\n",
    );
    let data = HxlReader::new().read_path(data_file.path()).unwrap();
    let mut schema = Schema::default_schema().unwrap();
    let report = schema.report(data.rows());

    assert!(!report.valid);
    let patterns: Vec<String> = report.errors.iter().map(|e| e.pattern().to_string()).collect();
    assert!(patterns.contains(&"#country+code".to_string()));
    assert!(patterns.contains(&"#geo+lat".to_string()));
    assert!(patterns.contains(&"#contact+email".to_string()));
    assert!(!patterns.contains(&"#affected".to_string()));
}
