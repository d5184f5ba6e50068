//! Audit trail of one harmonization run.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::matching::{MatchMethod, MatchResult};
use crate::table::ColumnRole;
use crate::unit::ParsedUnit;

/// Pipeline stages, in the only order they may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Imported,
    Renamed,
    Merged,
    UnitResolved,
    Converted,
    Reported,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Imported,
        Stage::Renamed,
        Stage::Merged,
        Stage::UnitResolved,
        Stage::Converted,
        Stage::Reported,
    ];

    /// The stage that must follow this one.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Imported => Some(Stage::Renamed),
            Stage::Renamed => Some(Stage::Merged),
            Stage::Merged => Some(Stage::UnitResolved),
            Stage::UnitResolved => Some(Stage::Converted),
            Stage::Converted => Some(Stage::Reported),
            Stage::Reported => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Imported => "imported",
            Stage::Renamed => "renamed",
            Stage::Merged => "merged",
            Stage::UnitResolved => "unit_resolved",
            Stage::Converted => "converted",
            Stage::Reported => "reported",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of converting one feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Success { factor: f64, target: String },
    UnresolvedMolarMass { substance: String },
    IncompatibleUnit { from: String, to: String },
    SkippedUnknownUnit,
    /// Sample-info columns and runs without a target unit.
    NotRequested,
}

impl ConversionOutcome {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::UnresolvedMolarMass { .. } => "unresolved_molar_mass",
            Self::IncompatibleUnit { .. } => "incompatible_unit",
            Self::SkippedUnknownUnit => "skipped_unknown_unit",
            Self::NotRequested => "not_requested",
        }
    }

    /// True for outcomes a reviewer should look at.
    pub fn is_flagged(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedMolarMass { .. } | Self::IncompatibleUnit { .. } | Self::SkippedUnknownUnit
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fate", content = "into", rename_all = "snake_case")]
pub enum ColumnFate {
    Kept,
    MergedInto(String),
    Dropped,
}

/// Everything recorded about one input column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnReport {
    pub original_name: String,
    pub output_name: String,
    pub role: ColumnRole,
    pub name_match: Option<MatchResult>,
    pub raw_unit: Option<String>,
    pub unit: Option<ParsedUnit>,
    pub conversion: ConversionOutcome,
    pub fate: ColumnFate,
}

impl ColumnReport {
    pub fn new(original_name: impl Into<String>, role: ColumnRole) -> Self {
        let original_name = original_name.into();
        Self {
            output_name: original_name.clone(),
            original_name,
            role,
            name_match: None,
            raw_unit: None,
            unit: None,
            conversion: ConversionOutcome::NotRequested,
            fate: ColumnFate::Kept,
        }
    }

    pub fn match_method(&self) -> MatchMethod {
        self.name_match
            .as_ref()
            .map_or(MatchMethod::None, |result| result.method)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub survivor: String,
    pub donors: Vec<String>,
    /// Cells of the survivor filled from donors.
    pub filled: usize,
    /// Donors left unused because their unit could not be converted.
    #[serde(default)]
    pub skipped_donors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarmonizationReport {
    pub columns: Vec<ColumnReport>,
    pub merges: Vec<MergeRecord>,
    /// Feature columns sharing one alias after renaming.
    pub merge_candidates: Vec<Vec<String>>,
    pub stages: Vec<Stage>,
}

impl HarmonizationReport {
    pub fn column(&self, original_name: &str) -> Option<&ColumnReport> {
        self.columns
            .iter()
            .find(|column| column.original_name == original_name)
    }

    pub fn column_mut(&mut self, original_name: &str) -> Option<&mut ColumnReport> {
        self.columns
            .iter_mut()
            .find(|column| column.original_name == original_name)
    }

    pub fn count_by_outcome(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for column in &self.columns {
            *counts.entry(column.conversion.code()).or_insert(0) += 1;
        }
        counts
    }

    pub fn count_by_method(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for column in self.columns.iter().filter(|c| c.role == ColumnRole::Feature) {
            *counts.entry(column.match_method().as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn flagged(&self) -> impl Iterator<Item = &ColumnReport> {
        self.columns
            .iter()
            .filter(|column| column.conversion.is_flagged())
    }

    /// One line per column, for logs and plain-text output.
    pub fn summary_lines(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| {
                let fate = match &column.fate {
                    ColumnFate::Kept => String::new(),
                    ColumnFate::MergedInto(survivor) => format!(" merged_into={survivor}"),
                    ColumnFate::Dropped => " dropped".to_string(),
                };
                let unit = column
                    .unit
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ParsedUnit::label);
                format!(
                    "{} -> {} [{}] unit={} {}{}",
                    column.original_name,
                    column.output_name,
                    column.match_method(),
                    unit,
                    column.conversion.code(),
                    fate
                )
            })
            .collect()
    }
}
