//! Structured form of a free-text unit string.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Physical category of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityKind {
    /// Mass per volume, e.g. `mg/l`.
    Mass,
    /// Amount of substance per volume, e.g. `mmol/l`.
    Molar,
    /// Volume per volume, e.g. `ml/l`.
    VolumeRatio,
    /// Scaled or unscaled ratios such as `%`, `ppm` or `mg/kg`.
    Dimensionless,
    Unknown,
}

impl QuantityKind {
    /// Mass and molar concentrations convert into each other.
    pub fn is_concentration(self) -> bool {
        matches!(self, Self::Mass | Self::Molar)
    }
}

/// SI prefix on the numerator unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalePrefix {
    Kilo,
    #[default]
    None,
    Milli,
    Micro,
    Nano,
    Pico,
}

impl ScalePrefix {
    pub fn factor(self) -> f64 {
        match self {
            Self::Kilo => 1e3,
            Self::None => 1.0,
            Self::Milli => 1e-3,
            Self::Micro => 1e-6,
            Self::Nano => 1e-9,
            Self::Pico => 1e-12,
        }
    }

    /// Parses the ASCII prefix letter (`k`, `m`, `u`, `n`, `p` or empty).
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "" => Some(Self::None),
            "k" => Some(Self::Kilo),
            "m" => Some(Self::Milli),
            "u" => Some(Self::Micro),
            "n" => Some(Self::Nano),
            "p" => Some(Self::Pico),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Kilo => "k",
            Self::None => "",
            Self::Milli => "m",
            Self::Micro => "u",
            Self::Nano => "n",
            Self::Pico => "p",
        }
    }
}

/// Volume unit in a concentration denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeUnit {
    CubicMeter,
    Liter,
    Deciliter,
    Centiliter,
    Milliliter,
    Microliter,
}

impl VolumeUnit {
    pub fn liters(self) -> f64 {
        match self {
            Self::CubicMeter => 1e3,
            Self::Liter => 1.0,
            Self::Deciliter => 1e-1,
            Self::Centiliter => 1e-2,
            Self::Milliliter => 1e-3,
            Self::Microliter => 1e-6,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::CubicMeter => "m3",
            Self::Liter => "l",
            Self::Deciliter => "dl",
            Self::Centiliter => "cl",
            Self::Milliliter => "ml",
            Self::Microliter => "ul",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "m3" => Some(Self::CubicMeter),
            "l" => Some(Self::Liter),
            "dl" => Some(Self::Deciliter),
            "cl" => Some(Self::Centiliter),
            "ml" => Some(Self::Milliliter),
            "ul" => Some(Self::Microliter),
            _ => None,
        }
    }
}

/// A unit string decomposed into its physical components.
///
/// For concentrations, `measured_substance` is the species whose mass (or
/// amount) the number counts and `substance_ref` the species the value is
/// reported relative to. `mg N/l NO3` measures nitrogen on a nitrate basis;
/// `mg/l NO3` has both set to `NO3`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedUnit {
    /// Unit string as supplied, before substitutions.
    pub raw: String,
    pub quantity_kind: QuantityKind,
    /// Canonical unit without substances, e.g. `mg/l`. Empty when unknown.
    pub base_unit: String,
    pub scale_prefix: ScalePrefix,
    pub volume: Option<VolumeUnit>,
    /// Magnitude relative to the kind's base unit (g/l, mol/l, l/l or 1).
    pub factor: f64,
    pub measured_substance: Option<String>,
    pub substance_ref: Option<String>,
    /// Name of the grammar rule that produced this parse.
    pub rule: Option<String>,
}

impl ParsedUnit {
    /// An unrecognized unit; the raw string is kept verbatim.
    pub fn unknown(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            quantity_kind: QuantityKind::Unknown,
            base_unit: String::new(),
            scale_prefix: ScalePrefix::None,
            volume: None,
            factor: 1.0,
            measured_substance: None,
            substance_ref: None,
            rule: None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.quantity_kind != QuantityKind::Unknown
    }

    /// True when measured and reference substance differ.
    pub fn has_basis_change(&self) -> bool {
        match (&self.measured_substance, &self.substance_ref) {
            (Some(measured), Some(reference)) => measured != reference,
            _ => false,
        }
    }

    /// Copy with both substances set to `substance` when the unit names none.
    #[must_use]
    pub fn with_default_substance(&self, substance: &str) -> Self {
        let mut unit = self.clone();
        if unit.measured_substance.is_none() && unit.substance_ref.is_none() {
            unit.measured_substance = Some(substance.to_string());
            unit.substance_ref = Some(substance.to_string());
        }
        unit
    }

    /// Rendering used for output column units.
    pub fn label(&self) -> String {
        if !self.is_known() {
            return self.raw.clone();
        }
        match (&self.measured_substance, &self.substance_ref) {
            (Some(measured), Some(reference)) if measured != reference => {
                match self.base_unit.split_once('/') {
                    Some((numerator, denominator)) => {
                        format!("{numerator} {measured}/{denominator} {reference}")
                    }
                    None => format!("{} {measured} {reference}", self.base_unit),
                }
            }
            (_, Some(substance)) | (Some(substance), None) => {
                format!("{} {substance}", self.base_unit)
            }
            (None, None) => self.base_unit.clone(),
        }
    }
}

impl fmt::Display for ParsedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mass_unit() -> ParsedUnit {
        ParsedUnit {
            raw: "mg N/l NO3".to_string(),
            quantity_kind: QuantityKind::Mass,
            base_unit: "mg/l".to_string(),
            scale_prefix: ScalePrefix::Milli,
            volume: Some(VolumeUnit::Liter),
            factor: 1e-3,
            measured_substance: Some("N".to_string()),
            substance_ref: Some("NO3".to_string()),
            rule: Some("mass_dual_basis".to_string()),
        }
    }

    #[test]
    fn label_keeps_both_substances() {
        assert_eq!(mass_unit().label(), "mg N/l NO3");
        assert!(mass_unit().has_basis_change());
    }

    #[test]
    fn default_substance_only_fills_blank_units() {
        let unit = mass_unit().with_default_substance("Cl");
        assert_eq!(unit.measured_substance.as_deref(), Some("N"));

        let mut plain = mass_unit();
        plain.measured_substance = None;
        plain.substance_ref = None;
        let filled = plain.with_default_substance("Cl");
        assert_eq!(filled.label(), "mg/l Cl");
        assert!(!filled.has_basis_change());
    }

    #[test]
    fn unknown_label_is_raw() {
        assert_eq!(ParsedUnit::unknown("cfu/100ml").label(), "cfu/100ml");
    }
}
