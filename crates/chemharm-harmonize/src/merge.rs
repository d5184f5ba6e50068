//! Merging of duplicate or split columns.

use std::collections::BTreeSet;

use chemharm_model::{Cell, Column, Table};

use crate::error::{HarmonizeError, Result};

/// Checks merge groups against the table before anything is changed.
///
/// Every group needs two or more names, every name must exist as a source
/// column, and no name may appear twice across all groups.
pub fn validate_groups(groups: &[Vec<String>], table: &Table) -> Result<()> {
    let mut seen = BTreeSet::new();
    for group in groups {
        if group.len() < 2 {
            return Err(HarmonizeError::MergeGroupTooSmall {
                group: group.clone(),
            });
        }
        for name in group {
            if !seen.insert(name.as_str()) {
                return Err(HarmonizeError::AmbiguousMergeGroup {
                    column: name.clone(),
                });
            }
            if table.by_source(name).is_none() {
                return Err(HarmonizeError::unknown_column("merge_columns", name));
            }
        }
    }
    Ok(())
}

/// Fills every missing cell of `survivor` from `donor`, scaling numeric
/// values by `factor`. Cells already present in the survivor are never
/// touched, so calling this once per donor in group order takes the first
/// non-missing value per row.
///
/// Returns the number of cells filled.
pub fn fill_missing(survivor: &mut Column, donor: &Column, factor: f64) -> usize {
    let mut filled = 0;
    for (target, source) in survivor.values.iter_mut().zip(&donor.values) {
        if target.is_missing() && !source.is_missing() {
            *target = scaled(source, factor);
            filled += 1;
        }
    }
    filled
}

fn scaled(cell: &Cell, factor: f64) -> Cell {
    let mut cell = cell.clone();
    if let Some(value) = cell.value.as_mut() {
        *value *= factor;
    }
    cell
}
