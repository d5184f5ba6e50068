//! Ordered rule table for unit strings.
//!
//! Rules are tried top to bottom and the first full match wins. The
//! concentration rules come in five substance layouts each for mass and
//! molar numerators:
//!
//! | layout      | example        | measured | reference |
//! |-------------|----------------|----------|-----------|
//! | `dual`      | `mg N/l NO3`   | N        | NO3       |
//! | `compound`  | `mg/l NO3 N`   | N        | NO3       |
//! | `measured`  | `mg N/l`       | N        | N         |
//! | `reference` | `mg/l NO3`     | NO3      | NO3       |
//! | `plain`     | `mg/l`         | -        | -         |
//!
//! Tokens are expected after substitution, so `µg` arrives as `ug` and
//! `NO3-N` as `NO3 N`. The compound layout also accepts the element first
//! (`mg/l N-NO3`); the parser puts a lone element symbol on the measured
//! side whichever position it takes.
//!
//! Volume denominators may carry a count, as in `mg/100ml` or `ug/10 l`.

use std::sync::LazyLock;

use chemharm_model::QuantityKind;
use regex::Regex;

/// Where substance tokens sit in a concentration rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstanceLayout {
    Dual,
    Compound,
    Measured,
    Reference,
    Plain,
}

/// What a rule's captures describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleShape {
    /// Captures `num`, `den` and the substances of the layout.
    Concentration {
        kind: QuantityKind,
        layout: SubstanceLayout,
    },
    /// Captures `num` and `den` volumes.
    VolumeRatio,
    /// Captures `num` and `den` masses.
    MassRatio,
    /// Captures a ratio `word`.
    NamedRatio,
}

#[derive(Debug)]
pub struct UnitRule {
    pub name: &'static str,
    pub example: &'static str,
    pub shape: RuleShape,
    pub pattern: Regex,
}

const DIV: &str = r"\s*[/.,]\s*";
const AS: &str = r"(?:as\s+)?";

fn mass(group: &str) -> String {
    format!(r"(?P<{group}>(?i:[kmunp]?g))")
}

fn mole(group: &str) -> String {
    format!(r"(?P<{group}>(?i:[mun]?mol))")
}

fn volume(group: &str) -> String {
    format!(r"(?P<{group}>(?i:m3|[mudc]?l))")
}

/// Volume denominator with an optional leading `count`.
fn per_volume(group: &str) -> String {
    format!(r"(?:(?P<count>\d+)\s*)?{}", volume(group))
}

fn substance(group: &str) -> String {
    format!(r"(?P<{group}>[A-Z][A-Za-z0-9]*)")
}

fn anchored(body: &str) -> Regex {
    Regex::new(&format!(r"^\s*{body}\s*$")).expect("valid unit grammar rule")
}

fn concentration_body(numerator: &str, layout: SubstanceLayout) -> String {
    let den = per_volume("den");
    let measured = substance("measured");
    let reference = substance("reference");
    match layout {
        SubstanceLayout::Dual => {
            format!(r"{numerator}\s+{measured}{DIV}{den}\s+{AS}{reference}")
        }
        SubstanceLayout::Compound => {
            format!(r"{numerator}{DIV}{den}\s+{AS}{reference}\s+{measured}")
        }
        SubstanceLayout::Measured => format!(r"{numerator}\s+{measured}{DIV}{den}"),
        SubstanceLayout::Reference => format!(r"{numerator}{DIV}{den}\s+{AS}{reference}"),
        SubstanceLayout::Plain => format!(r"{numerator}{DIV}{den}"),
    }
}

const CONCENTRATION_RULES: [(&str, &str, QuantityKind, SubstanceLayout); 10] = [
    ("mass_dual_basis", "mg N/l NO3", QuantityKind::Mass, SubstanceLayout::Dual),
    ("mass_compound_basis", "mg/l NO3-N", QuantityKind::Mass, SubstanceLayout::Compound),
    ("mass_measured_basis", "mg N/l", QuantityKind::Mass, SubstanceLayout::Measured),
    ("mass_reference_basis", "mg/l NO3", QuantityKind::Mass, SubstanceLayout::Reference),
    ("mass_plain", "mg/l", QuantityKind::Mass, SubstanceLayout::Plain),
    ("molar_dual_basis", "mmol N/l NO3", QuantityKind::Molar, SubstanceLayout::Dual),
    ("molar_compound_basis", "mmol/l NO3-N", QuantityKind::Molar, SubstanceLayout::Compound),
    ("molar_measured_basis", "mmol N/l", QuantityKind::Molar, SubstanceLayout::Measured),
    ("molar_reference_basis", "mmol/l Cl", QuantityKind::Molar, SubstanceLayout::Reference),
    ("molar_plain", "mmol/l", QuantityKind::Molar, SubstanceLayout::Plain),
];

/// Ratio words and their scale relative to 1.
pub const NAMED_RATIOS: [(&str, &str, f64); 11] = [
    ("percentage", "%", 1e-2),
    ("percent", "%", 1e-2),
    ("procent", "%", 1e-2),
    ("permille", "permille", 1e-3),
    ("promille", "permille", 1e-3),
    ("ppm", "ppm", 1e-6),
    ("ppb", "ppb", 1e-9),
    ("ppt", "ppt", 1e-12),
    ("ratio", "1", 1.0),
    ("fraction", "1", 1.0),
    ("dimensionless", "1", 1.0),
];

pub static RULES: LazyLock<Vec<UnitRule>> = LazyLock::new(|| {
    let mut rules = Vec::new();
    for (name, example, kind, layout) in CONCENTRATION_RULES {
        let numerator = match kind {
            QuantityKind::Molar => mole("num"),
            _ => mass("num"),
        };
        rules.push(UnitRule {
            name,
            example,
            shape: RuleShape::Concentration { kind, layout },
            pattern: anchored(&concentration_body(&numerator, layout)),
        });
    }
    rules.push(UnitRule {
        name: "volume_ratio",
        example: "ml/l",
        shape: RuleShape::VolumeRatio,
        pattern: anchored(&format!("{}{DIV}{}", volume("num"), per_volume("den"))),
    });
    rules.push(UnitRule {
        name: "mass_ratio",
        example: "mg/kg",
        shape: RuleShape::MassRatio,
        pattern: anchored(&format!("{}{DIV}{}", mass("num"), mass("den"))),
    });
    let words = NAMED_RATIOS
        .iter()
        .map(|(word, _, _)| *word)
        .collect::<Vec<_>>()
        .join("|");
    rules.push(UnitRule {
        name: "named_ratio",
        example: "%",
        shape: RuleShape::NamedRatio,
        pattern: anchored(&format!(r"(?P<word>(?i:{words}))")),
    });
    rules
});

/// The rule table in evaluation order.
pub fn rules() -> &'static [UnitRule] {
    &RULES
}
