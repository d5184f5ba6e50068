use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::error::{ModelError, Result};
use crate::unit::ParsedUnit;

/// Whether a column describes the sample or a measured feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    #[serde(alias = "sampleinfo")]
    SampleInfo,
    #[default]
    Feature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Current column name (the alias once renamed).
    pub name: String,
    /// Header as delivered by ingestion. Merge, drop and override
    /// configuration refers to this name.
    pub source_name: String,
    /// Raw unit string, if any.
    #[serde(default)]
    pub unit: Option<String>,
    /// Parsed unit, filled during unit resolution.
    #[serde(default)]
    pub parsed_unit: Option<ParsedUnit>,
    #[serde(default)]
    pub role: ColumnRole,
    pub values: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, role: ColumnRole, values: Vec<Cell>) -> Self {
        let name = name.into();
        Self {
            source_name: name.clone(),
            name,
            unit: None,
            parsed_unit: None,
            role,
            values,
        }
    }

    pub fn feature(name: impl Into<String>, values: Vec<Cell>) -> Self {
        Self::new(name, ColumnRole::Feature, values)
    }

    pub fn sample_info(name: impl Into<String>, values: Vec<Cell>) -> Self {
        Self::new(name, ColumnRole::SampleInfo, values)
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn is_feature(&self) -> bool {
        self.role == ColumnRole::Feature
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Numeric values in row order, `None` where missing or non-numeric.
    pub fn numeric_values(&self) -> Vec<Option<f64>> {
        self.values.iter().map(|cell| cell.value).collect()
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|cell| cell.is_missing()).count()
    }
}

/// A rectangular table of named columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableDocument")]
pub struct Table {
    columns: Vec<Column>,
}

#[derive(Deserialize)]
struct TableDocument {
    columns: Vec<Column>,
}

impl TryFrom<TableDocument> for Table {
    type Error = ModelError;

    fn try_from(document: TableDocument) -> Result<Self> {
        Self::new(document.columns)
    }
}

impl Table {
    /// Builds a table, rejecting ragged columns and duplicate source names.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let expected = columns.first().map_or(0, Column::len);
        let mut seen = BTreeSet::new();
        for column in &columns {
            if column.len() != expected {
                return Err(ModelError::RaggedColumn {
                    column: column.source_name.clone(),
                    expected,
                    found: column.len(),
                });
            }
            if !seen.insert(column.source_name.as_str()) {
                return Err(ModelError::DuplicateColumn(column.source_name.clone()));
            }
        }
        Ok(Self { columns })
    }

    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Finds a column by its current name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Finds a column by the header it was imported with.
    pub fn by_source(&self, source_name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|column| column.source_name == source_name)
    }

    pub fn source_position(&self, source_name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.source_name == source_name)
    }

    pub fn column_mut(&mut self, index: usize) -> Option<&mut Column> {
        self.columns.get_mut(index)
    }

    /// Removes the columns whose source names are listed, keeping order.
    pub fn remove_sources(&mut self, source_names: &BTreeSet<String>) -> Vec<Column> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.columns)
            .into_iter()
            .partition(|column| source_names.contains(&column.source_name));
        self.columns = kept;
        removed
    }

    /// Groups of feature columns that share one current name.
    pub fn merge_candidates(&self) -> Vec<Vec<String>> {
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();
        for column in self.columns.iter().filter(|column| column.is_feature()) {
            match groups.iter_mut().find(|(name, _)| *name == column.name) {
                Some((_, members)) => members.push(column.source_name.clone()),
                None => groups.push((column.name.clone(), vec![column.source_name.clone()])),
            }
        }
        groups
            .into_iter()
            .filter_map(|(_, members)| (members.len() > 1).then_some(members))
            .collect()
    }
}
