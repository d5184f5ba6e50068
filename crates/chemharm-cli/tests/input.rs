//! Integration tests for the JSON table format.

use std::fs;

use chemharm_cli::input::{HarmonizedDocument, parse_table, read_table};
use chemharm_harmonize::HarmonizationPipeline;
use chemharm_model::{ColumnRole, RawValue};

const SURVEY: &str = r#"{
  "columns": [
    { "name": "Monster", "role": "sample_info", "values": ["A", "B", "C"] },
    { "name": "Chloride", "unit": "mg/l", "values": ["12,5", null, "<0,5"] },
    { "name": "Natrium", "unit": "mg/l", "values": [8, 9.5, "n.a."] }
  ]
}"#;

#[test]
fn reads_table_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("survey.json");
    fs::write(&path, SURVEY).unwrap();

    let table = read_table(&path).unwrap();
    assert_eq!(table.column_count(), 3);
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.columns()[0].role, ColumnRole::SampleInfo);
    assert_eq!(table.columns()[1].role, ColumnRole::Feature);
    assert_eq!(
        table.columns()[1].values[2].raw,
        RawValue::Text("<0,5".to_string())
    );
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let error = read_table(&path).unwrap_err();
    assert!(error.to_string().contains("absent.json"));
}

#[test]
fn ragged_and_duplicate_columns_are_rejected() {
    let ragged = r#"{"columns": [
        {"name": "A", "values": [1, 2]},
        {"name": "B", "values": [1]}
    ]}"#;
    assert!(parse_table(ragged).is_err());

    let duplicate = r#"{"columns": [
        {"name": "A", "values": [1]},
        {"name": "A", "values": [2]}
    ]}"#;
    assert!(parse_table(duplicate).is_err());
}

#[test]
fn harmonized_output_reads_back_unchanged() {
    let pipeline = HarmonizationPipeline::default();
    let first = pipeline.run(parse_table(SURVEY).unwrap()).unwrap();

    let document = HarmonizedDocument {
        table: &first.table,
        report: &first.report,
    };
    let json: serde_json::Value = serde_json::to_value(&document).unwrap();
    assert!(json["report"]["columns"].is_array());

    let table = parse_table(&json["table"].to_string()).unwrap();
    let chloride = &table.columns()[1];
    assert_eq!(chloride.values[0].value, Some(12.5));
    assert!(chloride.values[2].below_detection_limit);

    let second = pipeline.run(table).unwrap();
    assert_eq!(second.table, first.table);
}
