//! Integration tests driving catalog functions through the registry

use portflow::config::{parse_config, ConfigMap};
use portflow::dataflow::memory::{MemoryInput, MemoryOutput};
use portflow::{Entry, FileEntry, FunctionError, FunctionRegistry, Record, Value};
use serde_json::json;
use std::fs;

fn config(value: serde_json::Value) -> ConfigMap {
    value.as_object().cloned().expect("config must be an object")
}

fn run(key: &str, config: &ConfigMap, input: &mut MemoryInput) -> (Result<(), FunctionError>, MemoryOutput) {
    let registry = FunctionRegistry::with_builtins();
    let mut function = registry.new_function(key).expect("builtin function");
    let mut output = MemoryOutput::new();
    let result = function.execute(input, &mut output, config);
    (result, output)
}

fn files(entries: &[(&str, &str)]) -> MemoryInput {
    MemoryInput::with_entries(
        entries
            .iter()
            .map(|(name, text)| Entry::from(FileEntry::from_bytes(*name, *text))),
    )
}

#[test]
fn test_parse_csv_with_header() {
    let config = config(json!({
        "hasHeaderRow": true,
        "columns": [{"columnName": "age", "datatype": "integer", "fieldName": "age"}]
    }));
    let mut input = files(&[("people.csv", "age\n30\n")]);

    let (result, output) = run("parseCSV", &config, &mut input);

    result.unwrap();
    assert_eq!(output.records("default"), &[Record::new().with("age", 30i64)]);
    assert_eq!(output.close_count(), 1);
}

#[test]
fn test_split_on_field_by_balance() {
    let config = parse_config(
        r#"
defaultOutputPort: ok
rules:
  - field: balance
    op: "<="
    value: 50.00
    valueType: literal
    outputPort: poor
"#,
    )
    .unwrap();
    let mut input = MemoryInput::with_records(vec![
        Record::new().with("balance", 40.0),
        Record::new().with("balance", 60.0),
    ]);

    let (result, output) = run("splitOnField", &config, &mut input);

    result.unwrap();
    assert_eq!(output.records("poor"), &[Record::new().with("balance", 40.0)]);
    assert_eq!(output.records("ok"), &[Record::new().with("balance", 60.0)]);
}

#[test]
fn test_parse_fixed_length() {
    let config = config(json!({
        "columns": [{"start": 0, "length": 3, "datatype": "string", "fieldName": "code"}]
    }));
    let mut input = files(&[("codes.txt", "ABC  rest\n")]);

    let (result, output) = run("parseFixedLength", &config, &mut input);

    result.unwrap();
    assert_eq!(output.records("default"), &[Record::new().with("code", "ABC")]);
}

#[test]
fn test_split_on_field_js_by_age() {
    let config = config(json!({
        "defaultOutputPort": "minor",
        "rules": [{"jsCondition": "age >= 18", "outputPort": "adult"}]
    }));
    let mut input = MemoryInput::with_records(vec![
        Record::new().with("age", 17i64),
        Record::new().with("age", 18i64),
    ]);

    let (result, output) = run("splitOnFieldJS", &config, &mut input);

    result.unwrap();
    assert_eq!(output.records("minor"), &[Record::new().with("age", 17i64)]);
    assert_eq!(output.records("adult"), &[Record::new().with("age", 18i64)]);
}

#[test]
fn test_unknown_key() {
    let registry = FunctionRegistry::with_builtins();
    assert!(registry.new_function("fakeBCC").is_none());
}

#[test]
fn test_generate_then_parse_reproduces_records() {
    let opened = chrono::DateTime::parse_from_rfc3339("2024-03-05T10:30:00+02:00").unwrap();
    let closed = chrono::DateTime::parse_from_rfc3339("1999-12-31T23:59:59Z").unwrap();
    let originals = vec![
        Record::new()
            .with("name", "Smith, \"JJ\"")
            .with("age", 41i64)
            .with("balance", 0.1 + 0.2)
            .with("opened", opened),
        Record::new()
            .with("name", "Ann")
            .with("age", 7i64)
            .with("balance", 60.0)
            .with("opened", closed),
    ];

    let writer_config = config(json!({
        "header": "true",
        "headerValue": ["name", "age", "balance", "opened"],
        "delimiter": ";",
        "filename": "people.csv"
    }));
    let mut input = MemoryInput::with_records(originals.clone());
    let (result, written) = run("generateCSV", &writer_config, &mut input);
    result.unwrap();

    let contents = String::from_utf8(written.file("default", "people.csv").unwrap().to_vec()).unwrap();
    let parser_config = config(json!({
        "hasHeaderRow": true,
        "delimiter": ";",
        "columns": [
            {"columnName": "name", "datatype": "string", "fieldName": "name"},
            {"columnName": "age", "datatype": "integer", "fieldName": "age"},
            {"columnName": "balance", "datatype": "decimal", "fieldName": "balance"},
            {"columnName": "opened", "datatype": "date", "format": "", "fieldName": "opened"}
        ]
    }));
    let mut input = files(&[("people.csv", contents.as_str())]);
    let (result, parsed) = run("parseCSV", &parser_config, &mut input);
    result.unwrap();

    assert_eq!(parsed.records("default"), originals.as_slice());
    match parsed.records("default")[0].get("balance") {
        Some(Value::Float(f)) => assert_eq!(f.to_bits(), (0.1f64 + 0.2).to_bits()),
        other => panic!("expected float, got {:?}", other),
    }
    match parsed.records("default")[0].get("opened") {
        Some(Value::DateTime(dt)) => assert_eq!(dt.offset().local_minus_utc(), 2 * 3600),
        other => panic!("expected date, got {:?}", other),
    }
}

#[test]
fn test_route_then_write_to_disk() {
    let router_config = config(json!({
        "defaultOutputPort": "other",
        "rules": [{"jsCondition": "data.extension == 'csv'", "outputPort": "csv"}]
    }));
    let mut input = files(&[("a.csv", "1,2\n"), ("b.txt", "hello")]);
    let (result, routed) = run("fileRouter", &router_config, &mut input);
    result.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let disk_config = config(json!({"destinationFolder": dir.path().to_string_lossy()}));
    let mut input = MemoryInput::with_entries(routed.files("csv").iter().map(|file| {
        Entry::from(FileEntry::from_bytes(file.filename.clone(), file.contents.clone()))
    }));
    let (result, _) = run("writeFileToDisk", &disk_config, &mut input);
    result.unwrap();

    assert_eq!(fs::read_to_string(dir.path().join("a.csv")).unwrap(), "1,2\n");
    assert!(!dir.path().join("b.txt").exists());
}

#[test]
fn test_transform_data_then_route() {
    let derive_config = config(json!({
        "rules": [
            {"jsExpression": "first + ' ' + last", "outputField": "fullName"},
            {"jsExpression": "balance * 2", "outputField": "doubled"}
        ]
    }));
    let mut input = MemoryInput::with_records(vec![Record::new()
        .with("first", "Ada")
        .with("last", "Lovelace")
        .with("balance", 30i64)]);
    let (result, derived) = run("transformData", &derive_config, &mut input);
    result.unwrap();

    let record = derived.records("default")[0].clone();
    assert_eq!(record.get("fullName"), Some(&Value::from("Ada Lovelace")));
    assert_eq!(record.get("doubled"), Some(&Value::Int(60)));

    let split_config = config(json!({
        "defaultOutputPort": "low",
        "rules": [{"field": "doubled", "op": ">", "value": "balance", "valueType": "field", "outputPort": "high"}]
    }));
    let mut input = MemoryInput::with_records(vec![record]);
    let (result, routed) = run("splitOnField", &split_config, &mut input);
    result.unwrap();
    assert_eq!(routed.records("high").len(), 1);
}

#[test]
fn test_skip_policy_keeps_good_entries() {
    let config = config(json!({
        "onEntryError": "skip",
        "columns": [{"start": 0, "length": 2, "datatype": "integer", "fieldName": "n"}]
    }));
    let mut input = files(&[("bad.txt", "xx\n"), ("good.txt", "12\n")]);

    let (result, output) = run("parseFixedLength", &config, &mut input);

    result.unwrap();
    assert_eq!(output.records("default"), &[Record::new().with("n", 12i64)]);
}

#[test]
fn test_instances_run_concurrently() {
    let registry = std::sync::Arc::new(FunctionRegistry::with_builtins());
    let config = std::sync::Arc::new(config(json!({
        "defaultOutputPort": "minor",
        "rules": [{"jsCondition": "age >= 18", "outputPort": "adult"}]
    })));

    let handles: Vec<_> = (0..4i64)
        .map(|i| {
            let registry = std::sync::Arc::clone(&registry);
            let config = std::sync::Arc::clone(&config);
            std::thread::spawn(move || {
                let mut function = registry.new_function("splitOnFieldJS").unwrap();
                let mut input = MemoryInput::with_records(vec![Record::new().with("age", 16 + i)]);
                let mut output = MemoryOutput::new();
                function.execute(&mut input, &mut output, &config).unwrap();
                output.records("adult").len()
            })
        })
        .collect();

    let adults: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(adults, 2);
}
