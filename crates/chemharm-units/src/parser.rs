use chemharm_model::{ParsedUnit, QuantityKind, ScalePrefix, VolumeUnit};
use regex::Captures;
use tracing::trace;

use crate::grammar::{NAMED_RATIOS, RuleShape, SubstanceLayout, UnitRule, rules};

/// Substitutions applied before the grammar when none are configured.
pub const DEFAULT_REPLACEMENTS: [(&str, &str); 6] = [
    ("µ", "u"),
    ("μ", "u"),
    ("%", "percent"),
    ("‰", "permille"),
    ("-", " "),
    ("per", "/"),
];

/// Decomposes free-text unit strings using the rule table in
/// [`crate::grammar`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitParser {
    replacements: Vec<(String, String)>,
}

impl Default for UnitParser {
    fn default() -> Self {
        Self::with_replacements(
            DEFAULT_REPLACEMENTS
                .iter()
                .map(|(from, to)| ((*from).to_string(), (*to).to_string())),
        )
    }
}

impl UnitParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser with its own ordered substitution list.
    pub fn with_replacements(replacements: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            replacements: replacements.into_iter().collect(),
        }
    }

    pub fn replacements(&self) -> &[(String, String)] {
        &self.replacements
    }

    /// Applies the substitution list in order.
    pub fn substitute(&self, raw: &str) -> String {
        let mut text = raw.to_string();
        for (from, to) in &self.replacements {
            if from.is_empty() {
                continue;
            }
            text = if from.len() > 1 && from.chars().all(|c| c.is_ascii_alphabetic()) {
                replace_word(&text, from, to)
            } else {
                text.replace(from.as_str(), to)
            };
        }
        text
    }

    /// Parses a unit string. Unrecognized strings yield
    /// [`QuantityKind::Unknown`] with the raw text preserved.
    pub fn parse(&self, raw: &str) -> ParsedUnit {
        let text = self.substitute(raw);
        if text.trim().is_empty() {
            return ParsedUnit::unknown(raw);
        }
        for rule in rules() {
            if let Some(caps) = rule.pattern.captures(&text) {
                if let Some(unit) = build(raw, rule, &caps) {
                    trace!(raw, rule = rule.name, "unit parsed");
                    return unit;
                }
            }
        }
        trace!(raw, "unit not recognized");
        ParsedUnit::unknown(raw)
    }
}

/// Replaces whole words only, so `per` does not touch `percent`.
fn replace_word(text: &str, word: &str, replacement: &str) -> String {
    text.split(' ')
        .map(|token| if token == word { replacement } else { token })
        .collect::<Vec<_>>()
        .join(" ")
}

fn build(raw: &str, rule: &UnitRule, caps: &Captures<'_>) -> Option<ParsedUnit> {
    let captured = |group: &str| caps.name(group).map(|m| m.as_str().to_string());
    let mut unit = ParsedUnit::unknown(raw);
    unit.rule = Some(rule.name.to_string());
    match rule.shape {
        RuleShape::Concentration { kind, layout } => {
            let numerator = captured("num")?.to_lowercase();
            let symbol = match kind {
                QuantityKind::Molar => "mol",
                _ => "g",
            };
            let prefix = ScalePrefix::from_symbol(numerator.strip_suffix(symbol)?)?;
            let volume = VolumeUnit::from_symbol(&captured("den")?.to_lowercase())?;
            let count = denominator_count(caps)?;
            let (measured, reference) = match layout {
                SubstanceLayout::Dual => (captured("measured"), captured("reference")),
                SubstanceLayout::Compound => {
                    compound_order(captured("measured")?, captured("reference")?)
                }
                SubstanceLayout::Measured => (captured("measured"), captured("measured")),
                SubstanceLayout::Reference => (captured("reference"), captured("reference")),
                SubstanceLayout::Plain => (None, None),
            };
            unit.quantity_kind = kind;
            unit.base_unit = format!(
                "{}{symbol}/{}{}",
                prefix.symbol(),
                count_label(count),
                volume.symbol()
            );
            unit.scale_prefix = prefix;
            unit.volume = Some(volume);
            unit.factor = prefix.factor() / (f64::from(count) * volume.liters());
            unit.measured_substance = measured;
            unit.substance_ref = reference;
        }
        RuleShape::VolumeRatio => {
            let numerator = VolumeUnit::from_symbol(&captured("num")?.to_lowercase())?;
            let denominator = VolumeUnit::from_symbol(&captured("den")?.to_lowercase())?;
            let count = denominator_count(caps)?;
            unit.quantity_kind = QuantityKind::VolumeRatio;
            unit.base_unit = format!(
                "{}/{}{}",
                numerator.symbol(),
                count_label(count),
                denominator.symbol()
            );
            unit.volume = Some(denominator);
            unit.factor = numerator.liters() / (f64::from(count) * denominator.liters());
        }
        RuleShape::MassRatio => {
            let numerator = captured("num")?.to_lowercase();
            let denominator = captured("den")?.to_lowercase();
            let top = ScalePrefix::from_symbol(numerator.strip_suffix('g')?)?;
            let bottom = ScalePrefix::from_symbol(denominator.strip_suffix('g')?)?;
            unit.quantity_kind = QuantityKind::Dimensionless;
            unit.base_unit = format!("{}g/{}g", top.symbol(), bottom.symbol());
            unit.scale_prefix = top;
            unit.factor = top.factor() / bottom.factor();
        }
        RuleShape::NamedRatio => {
            let word = captured("word")?.to_lowercase();
            let (_, symbol, factor) = NAMED_RATIOS.iter().find(|(name, _, _)| *name == word)?;
            unit.quantity_kind = QuantityKind::Dimensionless;
            unit.base_unit = (*symbol).to_string();
            unit.factor = *factor;
        }
    }
    Some(unit)
}

/// The `count` in `mg/100ml`; 1 when absent. A zero count matches nothing.
fn denominator_count(caps: &Captures<'_>) -> Option<u32> {
    match caps.name("count") {
        None => Some(1),
        Some(count) => count.as_str().parse::<u32>().ok().filter(|count| *count > 0),
    }
}

fn count_label(count: u32) -> String {
    if count == 1 {
        String::new()
    } else {
        count.to_string()
    }
}

/// `NO3 N` and `N NO3` both mean nitrogen measured as nitrate. When only
/// the leading token is a bare element, it is the measured substance.
fn compound_order(trailing: String, leading: String) -> (Option<String>, Option<String>) {
    if is_element_symbol(&leading) && !is_element_symbol(&trailing) {
        (Some(leading), Some(trailing))
    } else {
        (Some(trailing), Some(leading))
    }
}

/// `N`, `Cl` and the like, with no digits or further atoms.
fn is_element_symbol(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(first), None, None) => first.is_ascii_uppercase(),
        (Some(first), Some(second), None) => {
            first.is_ascii_uppercase() && second.is_ascii_lowercase()
        }
        _ => false,
    }
}
