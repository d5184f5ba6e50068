//! Numeric parsing of measurement cells.
//!
//! Laboratory exports mix decimal commas and dots, thousands separators and
//! detection-limit markers. This module handles:
//! - Plain numbers: "123", "-45.67", "1.5E-3"
//! - Decimal commas: "0,5" (with a `,` decimal separator configured)
//! - Thousands separators: "1.234,5", "1,234.5"
//! - Detection-limit markers: "<0,5"

use chemharm_model::{Cell, DecimalStyle, RawValue};
use serde::{Deserialize, Serialize};

/// What happens to the value of a cell flagged below the detection limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionLimitPolicy {
    /// Keep the reported limit.
    #[default]
    Keep,
    Halve,
    Zero,
}

impl DetectionLimitPolicy {
    pub fn apply(self, limit: f64) -> f64 {
        match self {
            Self::Keep => limit,
            Self::Halve => limit / 2.0,
            Self::Zero => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    pub lt_symbol: String,
    /// Separator assumed when a number contains a single `,` or `.` only.
    pub decimal_separator: char,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            lt_symbol: "<".to_string(),
            decimal_separator: ',',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedNumber {
    pub value: f64,
    pub below_detection_limit: bool,
    pub decimal_style: DecimalStyle,
}

/// Parse measurement text to a number.
///
/// Returns None if the text is empty, not numeric, or not finite.
pub fn parse_measurement(text: &str, format: &NumberFormat) -> Option<ParsedNumber> {
    let mut rest = text.trim();
    let mut below_detection_limit = false;
    if !format.lt_symbol.is_empty() {
        if let Some(stripped) = rest.strip_prefix(format.lt_symbol.as_str()) {
            below_detection_limit = true;
            rest = stripped.trim_start();
        }
    }

    let compact: String = rest
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\''))
        .collect();
    if compact.is_empty() {
        return None;
    }

    let (cleaned, decimal_style) = resolve_separators(&compact, format.decimal_separator);
    let value: f64 = cleaned.parse().ok()?;
    value.is_finite().then_some(ParsedNumber {
        value,
        below_detection_limit,
        decimal_style,
    })
}

/// Rewrites `text` to dot-decimal form without thousands separators.
fn resolve_separators(text: &str, decimal_separator: char) -> (String, DecimalStyle) {
    let commas = text.matches(',').count();
    let dots = text.matches('.').count();
    match (commas, dots) {
        (0, 0) => (text.to_string(), DecimalStyle::Dot),
        // Both present: the last one is the decimal separator.
        (_, d) if commas > 0 && d > 0 => {
            let last_comma = text.rfind(',');
            let last_dot = text.rfind('.');
            if last_comma > last_dot {
                (text.replace('.', "").replace(',', "."), DecimalStyle::Comma)
            } else {
                (text.replace(',', ""), DecimalStyle::Dot)
            }
        }
        (1, 0) if decimal_separator == ',' => (text.replace(',', "."), DecimalStyle::Comma),
        (_, 0) => (text.replace(',', ""), DecimalStyle::Dot),
        (0, d) if d > 1 && decimal_separator == ',' => (text.replace('.', ""), DecimalStyle::Dot),
        _ => (text.to_string(), DecimalStyle::Dot),
    }
}

/// Fills `value` for a cell that has none yet.
///
/// Cells that already carry a value are left alone, so running the
/// normalization twice is harmless. Returns whether a value was assigned.
pub fn normalize_cell(
    cell: &mut Cell,
    format: &NumberFormat,
    policy: DetectionLimitPolicy,
) -> bool {
    if cell.value.is_some() {
        return false;
    }
    match &cell.raw {
        RawValue::Number(number) if number.is_finite() => {
            cell.value = Some(*number);
            true
        }
        RawValue::Text(text) => match parse_measurement(text, format) {
            Some(parsed) => {
                cell.value = Some(if parsed.below_detection_limit {
                    policy.apply(parsed.value)
                } else {
                    parsed.value
                });
                cell.below_detection_limit = parsed.below_detection_limit;
                cell.decimal_style = parsed.decimal_style;
                true
            }
            None => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<f64> {
        parse_measurement(text, &NumberFormat::default()).map(|parsed| parsed.value)
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse("123"), Some(123.0));
        assert_eq!(parse("-45.67"), Some(-45.67));
        assert_eq!(parse("  7  "), Some(7.0));
        assert_eq!(parse("1.5E-3"), Some(0.0015));
    }

    #[test]
    fn test_decimal_comma() {
        assert_eq!(parse("0,5"), Some(0.5));
        assert_eq!(parse("1,5e2"), Some(150.0));
        let dot = NumberFormat {
            decimal_separator: '.',
            ..NumberFormat::default()
        };
        assert_eq!(
            parse_measurement("1,234", &dot).map(|parsed| parsed.value),
            Some(1234.0)
        );
    }

    #[test]
    fn test_mixed_separators() {
        assert_eq!(parse("1.234,5"), Some(1234.5));
        assert_eq!(parse("1,234.5"), Some(1234.5));
        assert_eq!(parse("1.234.567"), Some(1_234_567.0));
        assert_eq!(parse("1 234,5"), Some(1234.5));
    }

    #[test]
    fn test_detection_limit() {
        let parsed = parse_measurement("<0,5", &NumberFormat::default()).unwrap();
        assert_eq!(parsed.value, 0.5);
        assert!(parsed.below_detection_limit);
        assert_eq!(parsed.decimal_style, DecimalStyle::Comma);

        let parsed = parse_measurement("< 2", &NumberFormat::default()).unwrap();
        assert_eq!(parsed.value, 2.0);
        assert!(parsed.below_detection_limit);
    }

    #[test]
    fn test_rejects_non_numeric() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("<"), None);
        assert_eq!(parse("n.a."), None);
        assert_eq!(parse("nan"), None);
        assert_eq!(parse("inf"), None);
        assert_eq!(parse(">10"), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let format = NumberFormat::default();
        let mut cell = Cell::text("<0,8");
        assert!(normalize_cell(&mut cell, &format, DetectionLimitPolicy::Halve));
        assert_eq!(cell.value, Some(0.4));
        assert!(cell.below_detection_limit);
        assert!(!normalize_cell(&mut cell, &format, DetectionLimitPolicy::Halve));
        assert_eq!(cell.value, Some(0.4));

        let mut text = Cell::text("n.a.");
        assert!(!normalize_cell(&mut text, &format, DetectionLimitPolicy::Keep));
        assert!(text.value.is_none());
    }
}
