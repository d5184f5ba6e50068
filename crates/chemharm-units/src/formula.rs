//! Chemical formula parsing.
//!
//! Supports element symbols with counts, nested `()`/`[]` groups with
//! multipliers, hydrate separators (`·`, `*`, `.`) with a leading
//! multiplier, and trailing ionic charges (`NO3-`, `SO4 2-`, `NH4⁺`).

use std::collections::BTreeMap;

use crate::elements::atomic_weight;
use crate::error::FormulaError;

/// Element symbol to atom count.
pub type Composition = BTreeMap<String, f64>;

const SUPERSCRIPTS: &str = "⁰¹²³⁴⁵⁶⁷⁸⁹⁺⁻";

pub fn parse_formula(formula: &str) -> Result<Composition, FormulaError> {
    let cleaned = strip_charge(formula);
    if cleaned.is_empty() {
        return Err(FormulaError::Empty);
    }
    let mut total = Composition::new();
    for part in cleaned.split(['·', '*', '.']) {
        let chars: Vec<char> = part.trim().chars().collect();
        let mut parser = Parser {
            chars: &chars,
            pos: 0,
        };
        let multiplier = parser.count();
        let composition = parser.sequence(None)?;
        add_scaled(&mut total, &composition, multiplier);
    }
    Ok(total)
}

/// Molar mass in g/mol.
pub fn molar_mass(formula: &str) -> Result<f64, FormulaError> {
    let composition = parse_formula(formula)?;
    composition
        .iter()
        .map(|(symbol, count)| {
            atomic_weight(symbol)
                .map(|weight| weight * count)
                .ok_or_else(|| FormulaError::UnknownElement(symbol.clone()))
        })
        .sum()
}

pub fn is_formula_like(text: &str) -> bool {
    parse_formula(text).is_ok()
}

fn strip_charge(formula: &str) -> String {
    let plain: String = formula
        .trim()
        .chars()
        .filter(|c| !SUPERSCRIPTS.contains(*c))
        .collect();
    let unsigned = plain.trim_end_matches(['+', '-']);
    if unsigned.len() != plain.len() {
        if let Some((head, tail)) = unsigned.rsplit_once(' ') {
            if tail.chars().all(|c| c.is_ascii_digit()) {
                return head.trim().to_string();
            }
        }
    }
    unsigned.trim().to_string()
}

fn add_scaled(total: &mut Composition, part: &Composition, factor: f64) {
    for (symbol, count) in part {
        *total.entry(symbol.clone()).or_insert(0.0) += count * factor;
    }
}

struct Parser<'a> {
    chars: &'a [char],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Reads a run of digits, defaulting to 1.
    fn count(&mut self) -> f64 {
        let mut value = 0.0;
        let mut seen = false;
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(10)) {
            value = value * 10.0 + f64::from(digit);
            seen = true;
            self.pos += 1;
        }
        if seen { value } else { 1.0 }
    }

    fn sequence(&mut self, close: Option<char>) -> Result<Composition, FormulaError> {
        let mut composition = Composition::new();
        loop {
            match self.peek() {
                None if close.is_some() => return Err(FormulaError::Unbalanced),
                None => break,
                Some(c) if Some(c) == close => {
                    self.pos += 1;
                    break;
                }
                Some(open @ ('(' | '[')) => {
                    self.pos += 1;
                    let closing = if open == '(' { ')' } else { ']' };
                    let inner = self.sequence(Some(closing))?;
                    let count = self.count();
                    add_scaled(&mut composition, &inner, count);
                }
                Some(')' | ']') => return Err(FormulaError::Unbalanced),
                Some(c) if c.is_ascii_uppercase() => {
                    self.pos += 1;
                    let mut symbol = c.to_string();
                    if let Some(lower) = self.peek().filter(char::is_ascii_lowercase) {
                        symbol.push(lower);
                        self.pos += 1;
                    }
                    if atomic_weight(&symbol).is_none() {
                        return Err(FormulaError::UnknownElement(symbol));
                    }
                    let count = self.count();
                    *composition.entry(symbol).or_insert(0.0) += count;
                }
                Some(c) => return Err(FormulaError::UnexpectedCharacter(c)),
            }
        }
        if composition.is_empty() {
            return Err(FormulaError::Empty);
        }
        Ok(composition)
    }
}
