use std::sync::Arc;

use approx::assert_relative_eq;
use chemharm_harmonize::{
    DetectionLimitPolicy, HarmonizationPipeline, HarmonizeConfig, HarmonizeError, Harmonized,
};
use chemharm_map::MappingDictionary;
use chemharm_model::{
    Cell, Column, ColumnFate, ConversionOutcome, MatchMethod, MatchStrategy, Stage, Table,
};
use chemharm_units::{LookupError, MolarMassLookup, TargetUnits};
use proptest::prelude::*;

fn feature(name: &str, unit: Option<&str>, values: Vec<Cell>) -> Column {
    let column = Column::feature(name, values);
    match unit {
        Some(unit) => column.with_unit(unit),
        None => column,
    }
}

fn numbers(values: &[Option<f64>]) -> Vec<Cell> {
    values.iter().copied().map(Cell::from).collect()
}

fn run(config: HarmonizeConfig, columns: Vec<Column>) -> Harmonized {
    let table = Table::new(columns).unwrap();
    HarmonizationPipeline::new(config).run(table).unwrap()
}

/// A small survey export: a duplicate chloride column, a misspelled
/// nitrate header, an unknown metal and a conductivity column.
fn survey() -> (HarmonizeConfig, Arc<MappingDictionary>, Table) {
    let dictionary =
        MappingDictionary::from_pairs([("chloride", "Cl"), ("nitraat", "NO3")]).unwrap();
    let config = HarmonizeConfig::from_toml_str(
        r#"
        match_method = ["exact", "fuzzy"]
        fuzzy_threshold = 85
        remove_strings = ["icpms"]
        strip_parentheses = true
        merge_columns = [["Chloride", "Chloride (2)"]]
        drop_columns = ["opmerking"]
        target_units = "mmol/l"
        "#,
    )
    .unwrap();
    let table = Table::new(vec![
        Column::sample_info("Monster", vec!["P1".into(), "P2".into(), "P3".into()]),
        feature(
            "Chloride",
            Some("mg/l"),
            vec!["12,5".into(), Cell::missing(), "<0,5".into()],
        ),
        feature(
            "Chloride (2)",
            Some("mg/l"),
            numbers(&[Some(11.0), Some(7.0), None]),
        ),
        feature("nitrat", Some("mg N/l"), numbers(&[Some(14.007), None, None])),
        feature(
            "Kobalt icpms",
            Some("mg/l"),
            numbers(&[Some(1.0), Some(2.0), Some(3.0)]),
        ),
        feature(
            "Geleidbaarheid",
            Some("uS/cm"),
            numbers(&[Some(500.0), Some(510.0), Some(520.0)]),
        ),
        Column::sample_info("opmerking", vec!["".into(), "".into(), "x".into()]),
    ])
    .unwrap();
    (config, Arc::new(dictionary), table)
}

fn run_survey() -> Harmonized {
    let (config, dictionary, table) = survey();
    HarmonizationPipeline::new(config)
        .with_dictionary(dictionary)
        .run(table)
        .unwrap()
}

#[test]
fn merge_fills_only_missing_cells() {
    let out = run(
        HarmonizeConfig::default().with_merge_group(["A", "B"]),
        vec![
            feature("A", None, numbers(&[Some(1.0), None, Some(3.0)])),
            feature("B", None, numbers(&[None, Some(2.0), Some(9.0)])),
        ],
    );
    assert_eq!(out.table.column_count(), 1);
    assert_eq!(
        out.table.columns()[0].numeric_values(),
        vec![Some(1.0), Some(2.0), Some(3.0)]
    );
    assert_eq!(out.report.merges[0].filled, 1);
    assert_eq!(
        out.report.column("B").unwrap().fate,
        ColumnFate::MergedInto("A".to_string())
    );
}

#[test]
fn merge_fill_uses_group_order() {
    let out = run(
        HarmonizeConfig::default().with_merge_group(["A", "C", "B"]),
        vec![
            feature("A", None, numbers(&[None, None])),
            feature("B", None, numbers(&[Some(1.0), Some(2.0)])),
            feature("C", None, numbers(&[Some(5.0), None])),
        ],
    );
    assert_eq!(
        out.table.columns()[0].numeric_values(),
        vec![Some(5.0), Some(2.0)]
    );
    assert_eq!(out.report.merges[0].donors, vec!["C", "B"]);
}

#[test]
fn merge_converts_donor_units() {
    let out = run(
        HarmonizeConfig::default()
            .with_merge_group(["Cl", "Cl ug"])
            .with_merge_group(["Fe", "Fe kiemgetal"]),
        vec![
            feature("Cl", Some("mg/l"), numbers(&[None, Some(1.0)])),
            feature("Cl ug", Some("ug/l"), numbers(&[Some(500.0), Some(9.0)])),
            feature("Fe", Some("mg/l"), numbers(&[None, None])),
            feature("Fe kiemgetal", Some("cfu/100ml"), numbers(&[Some(3.0), None])),
        ],
    );
    let cl = out.table.by_source("Cl").unwrap();
    assert_relative_eq!(cl.values[0].value.unwrap(), 0.5, epsilon = 1e-12);
    assert_eq!(cl.values[1].value, Some(1.0));

    let fe = out.table.by_source("Fe").unwrap();
    assert_eq!(fe.numeric_values(), vec![None, None]);
    assert_eq!(out.report.merges[1].skipped_donors, vec!["Fe kiemgetal"]);
    assert_eq!(
        out.report.column("Fe kiemgetal").unwrap().fate,
        ColumnFate::Dropped
    );
}

#[test]
fn configuration_errors_are_fatal() {
    let columns = || {
        Table::new(vec![
            feature("A", None, numbers(&[Some(1.0)])),
            feature("B", None, numbers(&[Some(2.0)])),
            feature("C", None, numbers(&[Some(3.0)])),
        ])
        .unwrap()
    };
    let fails = |config: HarmonizeConfig| HarmonizationPipeline::new(config).run(columns());

    let ambiguous = HarmonizeConfig::default()
        .with_merge_group(["A", "B"])
        .with_merge_group(["B", "C"]);
    assert!(matches!(
        fails(ambiguous),
        Err(HarmonizeError::AmbiguousMergeGroup { column }) if column == "B"
    ));

    assert!(matches!(
        fails(HarmonizeConfig::default().with_merge_group(["A"])),
        Err(HarmonizeError::MergeGroupTooSmall { .. })
    ));
    assert!(matches!(
        fails(HarmonizeConfig::default().with_drop_column("Z")),
        Err(HarmonizeError::UnknownColumn { context: "drop_columns", column }) if column == "Z"
    ));
    assert!(matches!(
        fails(HarmonizeConfig::default().with_override_unit("Q", "mg/l")),
        Err(HarmonizeError::UnknownColumn { context: "override_units", .. })
    ));

    let error = fails(
        HarmonizeConfig::default().with_target_units(TargetUnits::Literal("furlongs".into())),
    )
    .unwrap_err();
    assert!(matches!(&error, HarmonizeError::InvalidTargetUnit { spec } if spec == "furlongs"));
    assert!(error.is_recoverable());
    assert!(error.suggestion().is_some());
}

#[test]
fn detection_limit_markers_survive_conversion() {
    let columns = || vec![feature("Cl", Some("mg/l"), vec!["<0,5".into(), "1,5".into()])];

    let plain = run(HarmonizeConfig::default(), columns());
    let cell = &plain.table.columns()[0].values[0];
    assert_eq!(cell.value, Some(0.5));
    assert!(cell.below_detection_limit);

    let converted = run(
        HarmonizeConfig::default().with_target_units(TargetUnits::Literal("mmol/l".into())),
        columns(),
    );
    let cells = &converted.table.columns()[0].values;
    assert!(cells[0].below_detection_limit);
    assert!(!cells[1].below_detection_limit);
    assert_relative_eq!(cells[0].value.unwrap(), 0.5 / 35.45, epsilon = 1e-12);
    assert_relative_eq!(cells[1].value.unwrap(), 1.5 / 35.45, epsilon = 1e-12);

    let halved = run(
        HarmonizeConfig::default().with_detection_limit(DetectionLimitPolicy::Halve),
        columns(),
    );
    let cell = &halved.table.columns()[0].values[0];
    assert_eq!(cell.value, Some(0.25));
    assert!(cell.below_detection_limit);
}

#[test]
fn unresolved_substance_keeps_values() {
    let out = run(
        HarmonizeConfig::default().with_target_units(TargetUnits::Literal("mmol/l".into())),
        vec![feature("Kobalt", Some("mg/l"), numbers(&[Some(1.0), Some(2.0)]))],
    );
    let column = &out.table.columns()[0];
    assert_eq!(column.numeric_values(), vec![Some(1.0), Some(2.0)]);
    assert_eq!(column.unit.as_deref(), Some("mg/l"));
    assert_eq!(
        out.report.column("Kobalt").unwrap().conversion,
        ConversionOutcome::UnresolvedMolarMass {
            substance: "Kobalt".to_string()
        }
    );
}

struct CobaltDatabase;

impl MolarMassLookup for CobaltDatabase {
    fn molar_mass(&self, identity: &str) -> Result<Option<f64>, LookupError> {
        Ok(identity.eq_ignore_ascii_case("kobalt").then_some(58.933))
    }
}

#[test]
fn external_lookup_resolves_substances() {
    let table = Table::new(vec![feature(
        "Kobalt",
        Some("mg/l"),
        numbers(&[Some(58.933)]),
    )])
    .unwrap();
    let out = HarmonizationPipeline::new(
        HarmonizeConfig::default().with_target_units(TargetUnits::Literal("mmol/l".into())),
    )
    .with_lookup(Arc::new(CobaltDatabase))
    .run(table)
    .unwrap();
    assert_relative_eq!(
        out.table.columns()[0].values[0].value.unwrap(),
        1.0,
        epsilon = 1e-12
    );
    assert_eq!(out.table.columns()[0].unit.as_deref(), Some("mmol/l"));
}

#[test]
fn basis_change_to_explicit_target() {
    let out = run(
        HarmonizeConfig::default().with_target_units(TargetUnits::Literal("mg/l NO3".into())),
        vec![feature("Nitraat", Some("mg N/l"), numbers(&[Some(14.007)]))],
    );
    let column = &out.table.columns()[0];
    assert_relative_eq!(column.values[0].value.unwrap(), 62.004, epsilon = 1e-9);
    assert_eq!(column.unit.as_deref(), Some("mg/l NO3"));
}

#[test]
fn per_substance_targets_and_overrides() {
    let config = HarmonizeConfig::from_toml_str(
        r#"
        target_units = "per-substance"
        default_target_unit = "mmol/l"

        [override_units]
        Fe = "umol/l"
        "#,
    )
    .unwrap();
    let out = run(
        config,
        vec![
            feature("Zn", Some("mg/l"), numbers(&[Some(0.05)])),
            feature("Cl", Some("mg/l"), numbers(&[Some(10.0)])),
            feature("Fe", Some("mg/l"), numbers(&[Some(0.558)])),
        ],
    );
    let value = |name: &str| out.table.column(name).unwrap().values[0].value.unwrap();
    let unit = |name: &str| out.table.column(name).unwrap().unit.clone().unwrap();

    assert_relative_eq!(value("Zn"), 50.0, epsilon = 1e-9);
    assert_eq!(unit("Zn"), "ug/l");
    assert_relative_eq!(value("Cl"), 0.282_087, epsilon = 1e-6);
    assert_eq!(unit("Cl"), "mmol/l");
    assert_relative_eq!(value("Fe"), 0.558 / 55.845 * 1e3, epsilon = 1e-9);
    assert_eq!(unit("Fe"), "umol/l");
}

#[test]
fn overrides_alone_convert_only_their_columns() {
    let out = run(
        HarmonizeConfig::default().with_override_unit("Cl", "mmol/l"),
        vec![
            feature("Cl", Some("mg/l"), numbers(&[Some(35.45)])),
            feature("Na", Some("mg/l"), numbers(&[Some(22.99)])),
        ],
    );
    assert_relative_eq!(
        out.table.column("Cl").unwrap().values[0].value.unwrap(),
        1.0,
        epsilon = 1e-12
    );
    assert_eq!(
        out.table.column("Na").unwrap().values[0].value,
        Some(22.99)
    );
    assert_eq!(
        out.report.column("Na").unwrap().conversion,
        ConversionOutcome::NotRequested
    );
}

#[test]
fn survey_is_renamed_merged_and_converted() {
    let out = run_survey();

    assert_eq!(out.report.stages, Stage::ALL.to_vec());
    let names: Vec<&str> = out.table.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Monster", "Cl", "NO3", "Kobalt", "Geleidbaarheid"]);

    let nitrate = out.report.column("nitrat").unwrap();
    let matched = nitrate.name_match.as_ref().unwrap();
    assert_eq!(matched.method, MatchMethod::Fuzzy);
    assert_eq!(matched.matched_key.as_deref(), Some("nitraat"));
    assert!(matched.score >= 85.0 && matched.score < 100.0);

    let cobalt = out.report.column("Kobalt icpms").unwrap();
    assert_eq!(cobalt.match_method(), MatchMethod::None);
    assert_eq!(cobalt.output_name, "Kobalt");

    let chloride = out.table.column("Cl").unwrap();
    assert_relative_eq!(chloride.values[0].value.unwrap(), 12.5 / 35.45, epsilon = 1e-12);
    assert_relative_eq!(chloride.values[1].value.unwrap(), 7.0 / 35.45, epsilon = 1e-12);
    assert!(chloride.values[2].below_detection_limit);
    assert_eq!(out.report.merges[0].filled, 1);

    assert!(out.table.by_source("opmerking").is_none());
    assert_eq!(
        out.report.column("opmerking").unwrap().fate,
        ColumnFate::Dropped
    );
    assert!(out.report.merge_candidates.is_empty());

    let outcomes = out.report.count_by_outcome();
    assert_eq!(outcomes.get("success"), Some(&2));
    assert_eq!(outcomes.get("unresolved_molar_mass"), Some(&1));
    assert_eq!(outcomes.get("skipped_unknown_unit"), Some(&1));
}

#[test]
fn survey_summary() {
    let out = run_survey();
    insta::assert_snapshot!(out.report.summary_lines().join("\n"), @r"
    Monster -> Monster [none] unit=- not_requested
    Chloride -> Cl [exact] unit=mg/l success
    Chloride (2) -> Cl [exact] unit=- not_requested merged_into=Chloride
    nitrat -> NO3 [fuzzy] unit=mg/l N success
    Kobalt icpms -> Kobalt [none] unit=mg/l unresolved_molar_mass
    Geleidbaarheid -> Geleidbaarheid [none] unit=uS/cm skipped_unknown_unit
    opmerking -> opmerking [none] unit=- not_requested dropped
    ");
}

#[test]
fn duplicate_aliases_are_reported_not_merged() {
    let dictionary =
        MappingDictionary::from_pairs([("chloride", "Cl"), ("chloor", "Cl")]).unwrap();
    let table = Table::new(vec![
        feature("Chloride", Some("mg/l"), numbers(&[Some(1.0)])),
        feature("Chloor", Some("mg/l"), numbers(&[Some(2.0)])),
    ])
    .unwrap();
    let out = HarmonizationPipeline::default()
        .with_dictionary(Arc::new(dictionary))
        .run(table)
        .unwrap();
    assert_eq!(out.table.column_count(), 2);
    assert_eq!(
        out.report.merge_candidates,
        vec![vec!["Chloride".to_string(), "Chloor".to_string()]]
    );
}

#[test]
fn units_can_come_from_headers() {
    let out = run(
        HarmonizeConfig::default()
            .with_infer_units_from_names(true)
            .with_target_units(TargetUnits::Literal("mmol/l".into())),
        vec![
            feature("Na (mg/l)", None, numbers(&[Some(22.99)])),
            feature("Nitraat (totaal)", None, numbers(&[Some(1.0)])),
        ],
    );
    let sodium = out.table.by_source("Na (mg/l)").unwrap();
    assert_eq!(sodium.name, "Na");
    assert_relative_eq!(sodium.values[0].value.unwrap(), 1.0, epsilon = 1e-12);
    assert_eq!(
        out.report.column("Na (mg/l)").unwrap().raw_unit.as_deref(),
        Some("mg/l")
    );

    let nitrate = out.table.by_source("Nitraat (totaal)").unwrap();
    assert_eq!(nitrate.name, "Nitraat (totaal)");
    assert!(nitrate.unit.is_none());
    assert_eq!(
        out.report.column("Nitraat (totaal)").unwrap().conversion,
        ConversionOutcome::SkippedUnknownUnit
    );
}

#[test]
fn overrides_may_name_the_header_without_its_unit() {
    let dictionary = MappingDictionary::from_pairs([("na", "Natrium")]).unwrap();
    let table = Table::new(vec![feature("Na (mg/l)", None, numbers(&[Some(22.99)]))]).unwrap();
    let out = HarmonizationPipeline::new(
        HarmonizeConfig::default()
            .with_infer_units_from_names(true)
            .with_override_unit("Na", "mmol/l"),
    )
    .with_dictionary(Arc::new(dictionary))
    .run(table)
    .unwrap();

    let sodium = out.table.by_source("Na (mg/l)").unwrap();
    assert_eq!(sodium.name, "Natrium");
    assert_relative_eq!(sodium.values[0].value.unwrap(), 1.0, epsilon = 1e-12);
    assert!(matches!(
        out.report.column("Na (mg/l)").unwrap().conversion,
        ConversionOutcome::Success { .. }
    ));
}

#[test]
fn second_run_with_empty_config_changes_nothing() {
    let first = run_survey();
    let second = HarmonizationPipeline::default()
        .run(first.table.clone())
        .unwrap();
    assert_eq!(second.table, first.table);
    assert!(second.report.merges.is_empty());
}

#[test]
fn sample_info_passes_through() {
    let out = run(
        HarmonizeConfig::default()
            .with_match_method(vec![MatchStrategy::Exact])
            .with_target_units(TargetUnits::Literal("mmol/l".into())),
        vec![
            Column::sample_info("Datum", vec!["1,5".into()]).with_unit("mg/l"),
            feature("Cl", Some("mg/l"), numbers(&[Some(35.45)])),
        ],
    );
    let info = out.table.by_source("Datum").unwrap();
    assert_eq!(info.values[0], Cell::text("1,5"));
    assert_eq!(info.unit.as_deref(), Some("mg/l"));
    assert_eq!(
        out.report.column("Datum").unwrap().conversion,
        ConversionOutcome::NotRequested
    );
}

#[test]
fn config_file_drives_a_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("harmonize.toml");
    std::fs::write(
        &path,
        "target_units = \"ug/l\"\ndrop_columns = [\"x\"]\n",
    )
    .unwrap();
    let config = HarmonizeConfig::from_path(&path).unwrap();
    let out = run(
        config,
        vec![
            feature("Zn", Some("mg/l"), numbers(&[Some(0.2)])),
            feature("x", None, numbers(&[Some(1.0)])),
        ],
    );
    assert_eq!(out.table.column_count(), 1);
    assert_relative_eq!(
        out.table.columns()[0].values[0].value.unwrap(),
        200.0,
        epsilon = 1e-9
    );

    let missing = HarmonizeConfig::from_path(&dir.path().join("absent.toml"));
    assert!(matches!(missing, Err(HarmonizeError::Io { .. })));
}

#[test]
fn report_serializes_outcomes() {
    let out = run_survey();
    let json = serde_json::to_value(&out.report).unwrap();
    let cobalt = &json["columns"][4];
    assert_eq!(cobalt["original_name"], "Kobalt icpms");
    assert_eq!(cobalt["conversion"]["outcome"], "unresolved_molar_mass");
    assert_eq!(cobalt["conversion"]["substance"], "Kobalt");
    assert_eq!(json["columns"][2]["fate"]["fate"], "merged_into");
    assert_eq!(json["columns"][2]["fate"]["into"], "Chloride");
}

proptest! {
    #[test]
    fn merge_takes_survivor_then_donor(
        rows in prop::collection::vec(
            (prop::option::of(-1e6..1e6f64), prop::option::of(-1e6..1e6f64)),
            0..40,
        )
    ) {
        let survivor: Vec<Option<f64>> = rows.iter().map(|(a, _)| *a).collect();
        let donor: Vec<Option<f64>> = rows.iter().map(|(_, b)| *b).collect();
        let out = run(
            HarmonizeConfig::default().with_merge_group(["A", "B"]),
            vec![
                feature("A", None, numbers(&survivor)),
                feature("B", None, numbers(&donor)),
            ],
        );
        let expected: Vec<Option<f64>> = rows.iter().map(|(a, b)| a.or(*b)).collect();
        prop_assert_eq!(out.table.columns()[0].numeric_values(), expected);
        let filled = rows.iter().filter(|(a, b)| a.is_none() && b.is_some()).count();
        prop_assert_eq!(out.report.merges[0].filled, filled);
    }
}
