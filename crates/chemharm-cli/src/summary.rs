use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use chemharm_harmonize::Harmonized;
use chemharm_map::MatchEngine;
use chemharm_model::{
    ColumnFate, ColumnReport, ConversionOutcome, HarmonizationReport, MatchMethod, MatchResult,
    ParsedUnit, QuantityKind,
};
use chemharm_units::MassSource;

use crate::types::{MassRow, UnitRow};

pub fn print_harmonize_summary(harmonized: &Harmonized) {
    let report = &harmonized.report;
    println!(
        "Columns: {} in, {} out, {} rows",
        report.columns.len(),
        harmonized.table.column_count(),
        harmonized.table.row_count()
    );

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Output"),
        header_cell("Match"),
        header_cell("Score"),
        header_cell("Unit"),
        header_cell("Outcome"),
        header_cell("Detail"),
        header_cell("Fate"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    for column in &report.columns {
        table.add_row(column_row(column));
    }
    println!("{table}");

    if !report.merges.is_empty() {
        print_merges(report);
    }
    for group in &report.merge_candidates {
        println!("Shared alias (not merged): {}", group.join(", "));
    }
    let outcomes = report
        .count_by_outcome()
        .into_iter()
        .map(|(code, count)| format!("{code} {count}"))
        .collect::<Vec<_>>()
        .join(", ");
    println!("Outcomes: {outcomes}");
}

fn column_row(column: &ColumnReport) -> Vec<Cell> {
    let score = match &column.name_match {
        Some(result) if result.is_match() => Cell::new(format!("{:.0}", result.score)),
        _ => dim_cell("-"),
    };
    let unit = match &column.unit {
        Some(unit) => unit_cell(unit),
        None => dim_cell("-"),
    };
    vec![
        Cell::new(&column.original_name),
        Cell::new(&column.output_name).add_attribute(Attribute::Bold),
        method_cell(column.match_method()),
        score,
        unit,
        outcome_cell(&column.conversion),
        detail_cell(&column.conversion),
        fate_cell(&column.fate),
    ]
}

fn print_merges(report: &HarmonizationReport) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Survivor"),
        header_cell("Donors"),
        header_cell("Filled"),
        header_cell("Skipped"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for merge in &report.merges {
        let skipped = if merge.skipped_donors.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(merge.skipped_donors.join(", ")).fg(Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(&merge.survivor).add_attribute(Attribute::Bold),
            Cell::new(merge.donors.join(", ")),
            count_cell(merge.filled, Color::Green),
            skipped,
        ]);
    }
    println!("Merges:");
    println!("{table}");
}

pub fn print_matches(results: &[MatchResult]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Input"),
        header_cell("Alias"),
        header_cell("Key"),
        header_cell("Match"),
        header_cell("Score"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 4, CellAlignment::Right);
    for result in results {
        let key = match &result.matched_key {
            Some(key) => Cell::new(key),
            None => dim_cell("-"),
        };
        table.add_row(vec![
            Cell::new(&result.input),
            Cell::new(&result.alias).add_attribute(Attribute::Bold),
            key,
            method_cell(result.method),
            Cell::new(format!("{:.1}", result.score)),
        ]);
    }
    println!("{table}");
    let counts = MatchEngine::count_by_method(results)
        .into_iter()
        .map(|(method, count)| format!("{method} {count}"))
        .collect::<Vec<_>>()
        .join(", ");
    println!("Methods: {counts}");
}

pub fn print_units(rows: &[UnitRow], target: Option<&str>) {
    let mut table = Table::new();
    let mut header = vec![
        header_cell("Input"),
        header_cell("Kind"),
        header_cell("Base"),
        header_cell("Measured"),
        header_cell("Reference"),
        header_cell("Factor"),
        header_cell("Rule"),
    ];
    if let Some(target) = target {
        header.push(header_cell(&format!("Factor to {target}")));
    }
    table.set_header(header);
    apply_table_style(&mut table);
    align_column(&mut table, 5, CellAlignment::Right);
    for row in rows {
        let unit = &row.unit;
        let mut cells = vec![
            Cell::new(&unit.raw),
            kind_cell(unit.quantity_kind),
            optional_cell(Some(unit.base_unit.as_str()).filter(|base| !base.is_empty())),
            optional_cell(unit.measured_substance.as_deref()),
            optional_cell(unit.substance_ref.as_deref()),
            Cell::new(format_factor(unit.factor)),
            optional_cell(unit.rule.as_deref()),
        ];
        match &row.conversion {
            Some(Ok(factor)) => cells.push(Cell::new(format_factor(*factor)).fg(Color::Green)),
            Some(Err(message)) => cells.push(Cell::new(message).fg(Color::Red)),
            None => {}
        }
        table.add_row(cells);
    }
    println!("{table}");
}

pub fn print_molar_masses(rows: &[MassRow]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Substance"),
        header_cell("g/mol"),
        header_cell("Source"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for row in rows {
        let (mass, source) = match &row.resolved {
            Ok((mass, source)) => (Cell::new(format!("{mass:.4}")), Cell::new(source_label(*source))),
            Err(message) => (dim_cell("-"), Cell::new(message).fg(Color::Red)),
        };
        table.add_row(vec![Cell::new(&row.substance), mass, source]);
    }
    println!("{table}");
}

fn format_factor(factor: f64) -> String {
    if factor != 0.0 && (factor.abs() < 1e-3 || factor.abs() >= 1e6) {
        format!("{factor:.4e}")
    } else {
        format!("{factor:.6}")
    }
}

fn source_label(source: MassSource) -> &'static str {
    match source {
        MassSource::Cache => "cache",
        MassSource::Table => "table",
        MassSource::Formula => "formula",
        MassSource::External => "external",
    }
}

fn method_cell(method: MatchMethod) -> Cell {
    match method {
        MatchMethod::Exact => Cell::new(method).fg(Color::Green),
        MatchMethod::Ascii | MatchMethod::Regex => Cell::new(method).fg(Color::Cyan),
        MatchMethod::Fuzzy => Cell::new(method).fg(Color::Yellow),
        MatchMethod::None => dim_cell(method),
    }
}

fn kind_cell(kind: QuantityKind) -> Cell {
    let label = match kind {
        QuantityKind::Mass => "mass",
        QuantityKind::Molar => "molar",
        QuantityKind::VolumeRatio => "volume ratio",
        QuantityKind::Dimensionless => "dimensionless",
        QuantityKind::Unknown => return Cell::new("unknown").fg(Color::Yellow),
    };
    Cell::new(label)
}

fn unit_cell(unit: &ParsedUnit) -> Cell {
    if unit.is_known() {
        Cell::new(unit.label())
    } else {
        Cell::new(&unit.raw).fg(Color::Yellow)
    }
}

fn outcome_cell(outcome: &ConversionOutcome) -> Cell {
    match outcome {
        ConversionOutcome::Success { .. } => Cell::new(outcome.code()).fg(Color::Green),
        ConversionOutcome::NotRequested => dim_cell(outcome.code()),
        _ => Cell::new(outcome.code())
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
    }
}

fn detail_cell(outcome: &ConversionOutcome) -> Cell {
    match outcome {
        ConversionOutcome::Success { factor, target } => {
            Cell::new(format!("x{} -> {target}", format_factor(*factor)))
        }
        ConversionOutcome::UnresolvedMolarMass { substance } => Cell::new(substance),
        ConversionOutcome::IncompatibleUnit { from, to } => Cell::new(format!("{from} -> {to}")),
        _ => dim_cell("-"),
    }
}

fn fate_cell(fate: &ColumnFate) -> Cell {
    match fate {
        ColumnFate::Kept => dim_cell("kept"),
        ColumnFate::MergedInto(survivor) => Cell::new(format!("-> {survivor}")).fg(Color::Blue),
        ColumnFate::Dropped => Cell::new("dropped").fg(Color::DarkYellow),
    }
}

fn optional_cell(value: Option<&str>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
