use chemharm_model::{Cell, Column, ModelError, Table};

#[test]
fn rejects_ragged_columns() {
    let error = Table::new(vec![
        Column::feature("Cl", vec![Cell::number(1.0), Cell::number(2.0)]),
        Column::feature("Na", vec![Cell::number(1.0)]),
    ])
    .unwrap_err();
    assert!(matches!(
        error,
        ModelError::RaggedColumn {
            expected: 2,
            found: 1,
            ..
        }
    ));
}

#[test]
fn rejects_duplicate_headers() {
    let error = Table::new(vec![
        Column::feature("Cl", vec![Cell::missing()]),
        Column::feature("Cl", vec![Cell::missing()]),
    ])
    .unwrap_err();
    assert!(matches!(error, ModelError::DuplicateColumn(name) if name == "Cl"));
}

#[test]
fn merge_candidates_group_shared_names() {
    let mut chloride = Column::feature("Chloride", vec![Cell::missing()]);
    chloride.name = "Cl".to_string();
    let table = Table::new(vec![
        Column::sample_info("site", vec![Cell::text("A")]),
        Column::feature("Cl", vec![Cell::number(1.0)]),
        chloride,
        Column::feature("Na", vec![Cell::number(3.0)]),
    ])
    .expect("table");

    assert_eq!(
        table.merge_candidates(),
        vec![vec!["Cl".to_string(), "Chloride".to_string()]]
    );
}

#[test]
fn deserialization_validates_shape() {
    let json = r#"{"columns": [
        {"name": "a", "source_name": "a", "values": [{"raw": {"kind": "missing"}, "value": null}]},
        {"name": "b", "source_name": "b", "values": []}
    ]}"#;
    let result: Result<Table, _> = serde_json::from_str(json);
    assert!(result.is_err());
}

#[test]
fn round_trips_through_json() {
    let table = Table::new(vec![
        Column::feature("NO3", vec![Cell::text("<0,5"), Cell::number(4.2)]).with_unit("mg/l"),
    ])
    .expect("table");
    let json = serde_json::to_string(&table).expect("serialize");
    let back: Table = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, table);
}
