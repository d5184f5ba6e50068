//! Conversion between parsed units.

use std::collections::BTreeMap;

use chemharm_model::{ParsedUnit, QuantityKind};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Result, UnitError};
use crate::molar_mass::{MolarMassResolver, formula_for_name};
use crate::parser::UnitParser;

/// Requested output unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TargetUnits {
    Literal(String),
    /// Per-substance canonical units with a global fallback.
    PerSubstance,
}

impl From<String> for TargetUnits {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "per-substance" | "per-substance default" | "per-feature" => Self::PerSubstance,
            _ => Self::Literal(value),
        }
    }
}

impl From<TargetUnits> for String {
    fn from(value: TargetUnits) -> Self {
        match value {
            TargetUnits::Literal(unit) => unit,
            TargetUnits::PerSubstance => "per-substance".to_string(),
        }
    }
}

/// Canonical units for trace constituents, by symbol; everything else
/// uses the fallback unit.
const CANONICAL_UNITS: [(&str, &str); 12] = [
    ("Al", "ug/l"),
    ("As", "ug/l"),
    ("B", "ug/l"),
    ("Cd", "ug/l"),
    ("Co", "ug/l"),
    ("Cr", "ug/l"),
    ("Cu", "ug/l"),
    ("Hg", "ug/l"),
    ("Ni", "ug/l"),
    ("Pb", "ug/l"),
    ("Se", "ug/l"),
    ("Zn", "ug/l"),
];

/// Chooses the target unit per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPlan {
    pub target: TargetUnits,
    /// Explicit target per substance alias or original column name.
    pub overrides: BTreeMap<String, String>,
    /// Used by [`TargetUnits::PerSubstance`] when no canonical unit exists.
    pub fallback: String,
    canonical: BTreeMap<String, String>,
}

impl TargetPlan {
    pub fn new(target: TargetUnits) -> Self {
        Self {
            target,
            overrides: BTreeMap::new(),
            fallback: "mg/l".to_string(),
            canonical: CANONICAL_UNITS
                .iter()
                .map(|(substance, unit)| ((*substance).to_string(), (*unit).to_string()))
                .collect(),
        }
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: BTreeMap<String, String>) -> Self {
        self.overrides = overrides;
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Target for a column known under `names` (alias first). Overrides
    /// always win. Canonical units also apply to names such as `Zink`
    /// that stand for a symbol.
    pub fn unit_for(&self, names: &[&str]) -> &str {
        if let Some(unit) = names.iter().find_map(|name| self.overrides.get(*name)) {
            return unit;
        }
        match &self.target {
            TargetUnits::Literal(unit) => unit.as_str(),
            TargetUnits::PerSubstance => names
                .iter()
                .find_map(|name| {
                    self.canonical
                        .get(*name)
                        .or_else(|| self.canonical.get(formula_for_name(name)?))
                })
                .map_or(self.fallback.as_str(), String::as_str),
        }
    }

    /// Every unit string this plan can hand out.
    pub fn unit_specs(&self) -> Vec<&str> {
        let mut specs: Vec<&str> = self.overrides.values().map(String::as_str).collect();
        match &self.target {
            TargetUnits::Literal(unit) => specs.push(unit),
            TargetUnits::PerSubstance => {
                specs.push(&self.fallback);
                specs.extend(self.canonical.values().map(String::as_str));
            }
        }
        specs
    }
}

#[derive(Debug, Clone, Default)]
pub struct UnitConverter {
    parser: UnitParser,
}

impl UnitConverter {
    pub fn new(parser: UnitParser) -> Self {
        Self { parser }
    }

    pub fn parser(&self) -> &UnitParser {
        &self.parser
    }

    pub fn parse_target(&self, spec: &str) -> Result<ParsedUnit> {
        let unit = self.parser.parse(spec);
        if unit.is_known() {
            Ok(unit)
        } else {
            Err(UnitError::InvalidTarget {
                spec: spec.to_string(),
            })
        }
    }

    /// Converts one value from `from` into the unit described by `to_spec`.
    pub fn convert(
        &self,
        value: f64,
        from: &ParsedUnit,
        to_spec: &str,
        resolver: &mut MolarMassResolver,
    ) -> Result<f64> {
        let to = self.parse_target(to_spec)?;
        Ok(value * self.factor(from, &to, resolver)?)
    }

    /// Multiplier taking values in `from` to values in `to`.
    ///
    /// A source that names no substance converts on its own basis. A basis
    /// change from measured substance M to target substance T assumes one
    /// M per T, so only molar masses on the mass sides are needed.
    pub fn factor(
        &self,
        from: &ParsedUnit,
        to: &ParsedUnit,
        resolver: &mut MolarMassResolver,
    ) -> Result<f64> {
        if !from.is_known() {
            return Err(UnitError::UnknownUnit {
                raw: from.raw.clone(),
            });
        }
        if !to.is_known() {
            return Err(UnitError::InvalidTarget {
                spec: to.raw.clone(),
            });
        }
        let (from_kind, to_kind) = (from.quantity_kind, to.quantity_kind);
        if from_kind.is_concentration() && to_kind.is_concentration() {
            return concentration_factor(from, to, resolver);
        }
        if from_kind == to_kind {
            return Ok(from.factor / to.factor);
        }
        Err(incompatible(from, to))
    }
}

fn incompatible(from: &ParsedUnit, to: &ParsedUnit) -> UnitError {
    UnitError::Incompatible {
        from: from.label(),
        to: to.label(),
    }
}

fn concentration_factor(
    from: &ParsedUnit,
    to: &ParsedUnit,
    resolver: &mut MolarMassResolver,
) -> Result<f64> {
    let measured = from
        .measured_substance
        .as_deref()
        .or(from.substance_ref.as_deref());
    let reference = from.substance_ref.as_deref().or(measured);
    let target_basis = to
        .substance_ref
        .as_deref()
        .or(to.measured_substance.as_deref())
        .or(reference);

    let basis_change = matches!((measured, target_basis), (Some(m), Some(t)) if m != t);
    let same_kind = from.quantity_kind == to.quantity_kind;
    trace!(
        from = %from.label(),
        to = %to.label(),
        measured,
        target_basis,
        basis_change,
        "concentration conversion"
    );

    if !basis_change && same_kind {
        return Ok(from.factor / to.factor);
    }
    let measured = measured.ok_or_else(|| UnitError::UnresolvedMolarMass {
        substance: "unspecified".to_string(),
    })?;

    // Amount of the measured substance, in mol/l per unit of value.
    let moles = match from.quantity_kind {
        QuantityKind::Mass => from.factor / resolver.resolve(measured)?,
        _ => from.factor,
    };
    let target = match to.quantity_kind {
        QuantityKind::Mass => moles * resolver.resolve(target_basis.unwrap_or(measured))?,
        _ => moles,
    };
    Ok(target / to.factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_units_deserialize_symbolic_values() {
        assert_eq!(
            TargetUnits::from("per-substance default".to_string()),
            TargetUnits::PerSubstance
        );
        assert_eq!(
            TargetUnits::from("mmol/l".to_string()),
            TargetUnits::Literal("mmol/l".to_string())
        );
    }

    #[test]
    fn plan_prefers_overrides_then_canonical_units() {
        let plan = TargetPlan::new(TargetUnits::PerSubstance).with_overrides(BTreeMap::from([(
            "Fe".to_string(),
            "umol/l".to_string(),
        )]));
        assert_eq!(plan.unit_for(&["Fe", "IJzer"]), "umol/l");
        assert_eq!(plan.unit_for(&["Zn", "Zink"]), "ug/l");
        assert_eq!(plan.unit_for(&["Cl", "Chloride"]), "mg/l");
        assert_eq!(plan.unit_for(&["Zinc", "zn_totaal"]), "ug/l");
        assert_eq!(plan.unit_for(&["Arseen"]), "ug/l");
        assert_eq!(plan.unit_for(&["Natrium"]), "mg/l");

        let literal = TargetPlan::new(TargetUnits::Literal("mmol/l".to_string()));
        assert_eq!(literal.unit_for(&["Zn"]), "mmol/l");
    }
}
