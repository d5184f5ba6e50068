//! Molar mass lookup with a per-run cache.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Result, UnitError};
use crate::formula;

pub type LookupError = Box<dyn std::error::Error + Send + Sync>;

/// External molar mass source, e.g. a chemical database client.
///
/// `Ok(None)` means the identity is unknown to the source. Errors are
/// logged and treated the same way.
pub trait MolarMassLookup {
    fn molar_mass(&self, identity: &str) -> std::result::Result<Option<f64>, LookupError>;
}

/// Names whose formula is not spelled out in the identity itself.
const NAMED_SUBSTANCES: [(&str, &str); 34] = [
    ("chloride", "Cl"),
    ("chloor", "Cl"),
    ("sodium", "Na"),
    ("natrium", "Na"),
    ("potassium", "K"),
    ("kalium", "K"),
    ("calcium", "Ca"),
    ("magnesium", "Mg"),
    ("iron", "Fe"),
    ("ijzer", "Fe"),
    ("manganese", "Mn"),
    ("mangaan", "Mn"),
    ("ammonium", "NH4"),
    ("nitrate", "NO3"),
    ("nitraat", "NO3"),
    ("nitrite", "NO2"),
    ("nitriet", "NO2"),
    ("sulfate", "SO4"),
    ("sulphate", "SO4"),
    ("sulfaat", "SO4"),
    ("bicarbonate", "HCO3"),
    ("hydrogen carbonate", "HCO3"),
    ("waterstofcarbonaat", "HCO3"),
    ("phosphate", "PO4"),
    ("fosfaat", "PO4"),
    ("fluoride", "F"),
    ("arsenic", "As"),
    ("arseen", "As"),
    ("zinc", "Zn"),
    ("zink", "Zn"),
    ("copper", "Cu"),
    ("koper", "Cu"),
    ("lead", "Pb"),
    ("lood", "Pb"),
];

/// Formula behind a common English or Dutch substance name.
pub fn formula_for_name(name: &str) -> Option<&'static str> {
    let key = table_key(name);
    NAMED_SUBSTANCES
        .iter()
        .find(|(known, _)| *known == key)
        .map(|(_, formula)| *formula)
}

/// Local name to molar mass table, keyed case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MolarMassTable {
    masses: BTreeMap<String, f64>,
}

impl MolarMassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// English and Dutch names of common hydrochemical species.
    pub fn bundled() -> Self {
        let mut table = Self::new();
        for (name, formula) in NAMED_SUBSTANCES {
            if let Ok(mass) = formula::molar_mass(formula) {
                table.insert(name, mass);
            }
        }
        table
    }

    pub fn insert(&mut self, name: &str, molar_mass: f64) {
        self.masses.insert(table_key(name), molar_mass);
    }

    #[must_use]
    pub fn with(mut self, name: &str, molar_mass: f64) -> Self {
        self.insert(name, molar_mass);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.masses.get(&table_key(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }
}

fn table_key(name: &str) -> String {
    normalize_identity(name).to_lowercase()
}

/// Trims and collapses whitespace. Case is kept because `Co` and `CO`
/// are different formulae.
pub fn normalize_identity(identity: &str) -> String {
    identity.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Where a molar mass came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MassSource {
    Cache,
    Table,
    Formula,
    External,
}

/// Resolves substance identities to g/mol.
///
/// Lookup order is the local table, then formula parsing, then the
/// external source. Successful resolutions are cached for the lifetime of
/// the resolver, which the pipeline scopes to a single run.
pub struct MolarMassResolver {
    table: MolarMassTable,
    external: Option<Arc<dyn MolarMassLookup>>,
    cache: HashMap<String, f64>,
}

impl std::fmt::Debug for MolarMassResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MolarMassResolver")
            .field("table", &self.table.len())
            .field("external", &self.external.is_some())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl Default for MolarMassResolver {
    fn default() -> Self {
        Self::new(MolarMassTable::bundled())
    }
}

impl MolarMassResolver {
    pub fn new(table: MolarMassTable) -> Self {
        Self {
            table,
            external: None,
            cache: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_lookup(mut self, lookup: Arc<dyn MolarMassLookup>) -> Self {
        self.external = Some(lookup);
        self
    }

    pub fn resolve(&mut self, identity: &str) -> Result<f64> {
        self.resolve_with_source(identity).map(|(mass, _)| mass)
    }

    pub fn resolve_with_source(&mut self, identity: &str) -> Result<(f64, MassSource)> {
        let key = normalize_identity(identity);
        if key.is_empty() {
            return Err(UnitError::UnresolvedMolarMass {
                substance: identity.to_string(),
            });
        }
        if let Some(&mass) = self.cache.get(&key) {
            return Ok((mass, MassSource::Cache));
        }
        let found = self
            .table
            .get(&key)
            .map(|mass| (mass, MassSource::Table))
            .or_else(|| {
                formula::molar_mass(&key)
                    .ok()
                    .map(|mass| (mass, MassSource::Formula))
            })
            .or_else(|| {
                self.lookup_external(&key)
                    .map(|mass| (mass, MassSource::External))
            });
        match found {
            Some((mass, source)) if mass.is_finite() && mass > 0.0 => {
                debug!(substance = %key, molar_mass = mass, ?source, "molar mass resolved");
                self.cache.insert(key, mass);
                Ok((mass, source))
            }
            _ => Err(UnitError::UnresolvedMolarMass { substance: key }),
        }
    }

    fn lookup_external(&self, key: &str) -> Option<f64> {
        let lookup = self.external.as_ref()?;
        match lookup.molar_mass(key) {
            Ok(mass) => mass,
            Err(error) => {
                warn!(substance = %key, %error, "external molar mass lookup failed");
                None
            }
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use approx::assert_relative_eq;

    use super::*;

    struct Counting {
        calls: Cell<usize>,
        answer: Option<f64>,
    }

    impl MolarMassLookup for Counting {
        fn molar_mass(&self, _identity: &str) -> std::result::Result<Option<f64>, LookupError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.answer)
        }
    }

    struct Failing;

    impl MolarMassLookup for Failing {
        fn molar_mass(&self, identity: &str) -> std::result::Result<Option<f64>, LookupError> {
            Err(format!("service unavailable for {identity}").into())
        }
    }

    #[test]
    fn table_names_take_precedence() {
        let mut resolver = MolarMassResolver::default();
        let (mass, source) = resolver.resolve_with_source("Chloride").unwrap();
        assert_relative_eq!(mass, 35.45);
        assert_eq!(source, MassSource::Table);
    }

    #[test]
    fn formulae_are_computed() {
        let mut resolver = MolarMassResolver::new(MolarMassTable::new());
        let (mass, source) = resolver.resolve_with_source(" NO3 ").unwrap();
        assert_relative_eq!(mass, 62.004, epsilon = 1e-9);
        assert_eq!(source, MassSource::Formula);
        assert_eq!(resolver.resolve_with_source("NO3").unwrap().1, MassSource::Cache);
    }

    #[test]
    fn external_results_are_cached() {
        let lookup = Arc::new(Counting {
            calls: Cell::new(0),
            answer: Some(180.156),
        });
        let mut resolver =
            MolarMassResolver::new(MolarMassTable::new()).with_lookup(lookup.clone());
        for _ in 0..3 {
            assert_relative_eq!(resolver.resolve("glucose").unwrap(), 180.156);
        }
        assert_eq!(lookup.calls.get(), 1);
    }

    #[test]
    fn failures_are_unresolved() {
        let mut resolver = MolarMassResolver::new(MolarMassTable::new()).with_lookup(Arc::new(Failing));
        assert_eq!(
            resolver.resolve("onbekend"),
            Err(UnitError::UnresolvedMolarMass {
                substance: "onbekend".to_string()
            })
        );
        let mut bare = MolarMassResolver::new(MolarMassTable::new());
        assert!(bare.resolve("").is_err());
        assert_eq!(bare.cached(), 0);
    }
}
