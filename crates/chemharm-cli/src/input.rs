//! JSON table documents read and written by the CLI.
//!
//! Input columns carry plain JSON values:
//!
//! ```json
//! {
//!   "columns": [
//!     { "name": "Monster", "role": "sample_info", "values": ["A", "B"] },
//!     { "name": "Chloride", "unit": "mg/l", "values": ["12,5", null] }
//!   ]
//! }
//! ```
//!
//! Values may also be full cell objects, so a harmonized table written by
//! `chemharm harmonize` can be fed back in unchanged.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chemharm_model::{Cell, Column, ColumnRole, HarmonizationReport, Table};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct TableInput {
    columns: Vec<ColumnInput>,
}

#[derive(Debug, Deserialize)]
struct ColumnInput {
    name: String,
    #[serde(default)]
    source_name: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    role: ColumnRole,
    values: Vec<Value>,
}

/// Harmonized output document.
#[derive(Debug, Serialize)]
pub struct HarmonizedDocument<'a> {
    pub table: &'a Table,
    pub report: &'a HarmonizationReport,
}

pub fn read_table(path: &Path) -> Result<Table> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read table {}", path.display()))?;
    parse_table(&text).with_context(|| format!("parse table {}", path.display()))
}

pub fn parse_table(json: &str) -> Result<Table> {
    let input: TableInput = serde_json::from_str(json).context("invalid table JSON")?;
    let columns = input
        .columns
        .into_iter()
        .map(column_from_input)
        .collect::<Result<Vec<_>>>()?;
    Ok(Table::new(columns)?)
}

fn column_from_input(input: ColumnInput) -> Result<Column> {
    let values = input
        .values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            cell_from_value(value)
                .with_context(|| format!("column '{}' row {}", input.name, row + 1))
        })
        .collect::<Result<Vec<_>>>()?;
    let mut column = Column::new(input.name, input.role, values);
    if let Some(source_name) = input.source_name {
        column.source_name = source_name;
    }
    column.unit = input.unit.filter(|unit| !unit.trim().is_empty());
    Ok(column)
}

fn cell_from_value(value: Value) -> Result<Cell> {
    match value {
        Value::Null => Ok(Cell::missing()),
        Value::String(text) => Ok(Cell::text(text)),
        Value::Number(number) => match number.as_f64() {
            Some(number) => Ok(Cell::number(number)),
            None => bail!("number {number} is out of range"),
        },
        Value::Object(_) => serde_json::from_value(value).context("invalid cell object"),
        Value::Bool(_) | Value::Array(_) => bail!("unsupported value {value}"),
    }
}
