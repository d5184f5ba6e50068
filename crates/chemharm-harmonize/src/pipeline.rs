//! The harmonization run.
//!
//! A run walks the stages `Imported → Renamed → Merged → UnitResolved →
//! Converted → Reported` in order. Configuration is checked up front, so a
//! run either fails before touching the table or completes every stage.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chemharm_map::{MappingDictionary, MatchEngine, split_name_and_unit};
use chemharm_model::{
    Column, ColumnFate, ColumnReport, ConversionOutcome, HarmonizationReport, MatchResult,
    MergeRecord, ParsedUnit, Stage, Table,
};
use chemharm_units::{
    MolarMassLookup, MolarMassResolver, MolarMassTable, TargetPlan, TargetUnits, UnitConverter,
    UnitError, UnitParser,
};
use tracing::{debug, debug_span, info_span, warn};

use crate::config::HarmonizeConfig;
use crate::error::{HarmonizeError, Result};
use crate::merge::{fill_missing, validate_groups};
use crate::numeric::normalize_cell;

/// Output of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Harmonized {
    pub table: Table,
    pub report: HarmonizationReport,
}

pub struct HarmonizationPipeline {
    config: HarmonizeConfig,
    dictionary: Option<Arc<MappingDictionary>>,
    molar_masses: MolarMassTable,
    lookup: Option<Arc<dyn MolarMassLookup>>,
}

impl fmt::Debug for HarmonizationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarmonizationPipeline")
            .field("config", &self.config)
            .field("dictionary", &self.dictionary.as_ref().map(|d| d.len()))
            .field("molar_masses", &self.molar_masses.len())
            .field("lookup", &self.lookup.is_some())
            .finish()
    }
}

impl Default for HarmonizationPipeline {
    fn default() -> Self {
        Self::new(HarmonizeConfig::default())
    }
}

impl HarmonizationPipeline {
    pub fn new(config: HarmonizeConfig) -> Self {
        Self {
            config,
            dictionary: None,
            molar_masses: MolarMassTable::bundled(),
            lookup: None,
        }
    }

    /// Without a dictionary the rename stage keeps every name.
    #[must_use]
    pub fn with_dictionary(mut self, dictionary: Arc<MappingDictionary>) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    #[must_use]
    pub fn with_molar_masses(mut self, table: MolarMassTable) -> Self {
        self.molar_masses = table;
        self
    }

    #[must_use]
    pub fn with_lookup(mut self, lookup: Arc<dyn MolarMassLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn config(&self) -> &HarmonizeConfig {
        &self.config
    }

    pub fn run(&self, table: Table) -> Result<Harmonized> {
        let span = info_span!(
            "harmonize",
            columns = table.column_count(),
            rows = table.row_count()
        );
        let _guard = span.enter();

        let converter = UnitConverter::new(self.config.unit_parser());
        let plan = self.prepare(&table, &converter)?;

        let mut run = Run {
            table,
            report: HarmonizationReport::default(),
            config: &self.config,
            converter: &converter,
            resolver: self.resolver(),
        };
        run.stage(Stage::Imported, |run| run.import(&plan));
        run.stage(Stage::Renamed, |run| run.rename(&plan));
        run.stage(Stage::Merged, Run::merge);
        run.stage(Stage::UnitResolved, Run::resolve_units);
        run.stage(Stage::Converted, |run| run.convert(&plan));
        run.stage(Stage::Reported, Run::finish);

        debug!(
            columns = run.table.column_count(),
            flagged = run.report.flagged().count(),
            merges = run.report.merges.len(),
            "harmonization complete"
        );
        Ok(Harmonized {
            table: run.table,
            report: run.report,
        })
    }

    /// A fresh resolver per run, so cached masses never outlive it.
    fn resolver(&self) -> MolarMassResolver {
        let resolver = MolarMassResolver::new(self.molar_masses.clone());
        match &self.lookup {
            Some(lookup) => resolver.with_lookup(Arc::clone(lookup)),
            None => resolver,
        }
    }

    /// Validates the configuration against the table and precomputes every
    /// decision that could fail.
    fn prepare(&self, table: &Table, converter: &UnitConverter) -> Result<Plan> {
        validate_groups(&self.config.merge_columns, table)?;
        for name in &self.config.drop_columns {
            if table.by_source(name).is_none() {
                return Err(HarmonizeError::unknown_column("drop_columns", name));
            }
        }

        let inferred: Vec<Option<(String, String)>> = table
            .columns()
            .iter()
            .map(|column| self.infer_unit(column, converter.parser()))
            .collect();

        let matches: Vec<Option<MatchResult>> = match &self.dictionary {
            Some(dictionary) => {
                let engine = MatchEngine::new(dictionary, self.config.match_method.clone())
                    .with_options(self.config.match_options());
                table
                    .columns()
                    .iter()
                    .zip(&inferred)
                    .map(|(column, inferred)| {
                        let name = inferred
                            .as_ref()
                            .map_or(column.name.as_str(), |(name, _)| name.as_str());
                        column.is_feature().then(|| engine.match_name(name))
                    })
                    .collect()
            }
            None => vec![None; table.column_count()],
        };

        for key in self.config.override_units.keys() {
            let known = table.columns().iter().enumerate().any(|(index, column)| {
                column.source_name == *key
                    || column.name == *key
                    || inferred[index].as_ref().is_some_and(|(name, _)| name == key)
                    || matches[index].as_ref().is_some_and(|m| m.alias == *key)
            });
            if !known {
                return Err(HarmonizeError::unknown_column("override_units", key));
            }
        }

        let header_names = table
            .columns()
            .iter()
            .zip(&inferred)
            .filter_map(|(column, inferred)| {
                let (name, _) = inferred.as_ref()?;
                Some((column.source_name.clone(), name.clone()))
            })
            .collect();

        Ok(Plan {
            inferred,
            header_names,
            matches,
            targets: Targets::new(&self.config, converter)?,
        })
    }

    fn infer_unit(&self, column: &Column, parser: &UnitParser) -> Option<(String, String)> {
        if !self.config.infer_units_from_names || !column.is_feature() || column.unit.is_some() {
            return None;
        }
        let (name, unit) = split_name_and_unit(&column.name);
        let unit = unit?;
        parser.parse(&unit).is_known().then_some((name, unit))
    }
}

/// Per-column decisions made before the first stage, indexed like the
/// input columns.
struct Plan {
    inferred: Vec<Option<(String, String)>>,
    /// Header names with their unit removed, by source name.
    header_names: BTreeMap<String, String>,
    matches: Vec<Option<MatchResult>>,
    targets: Targets,
}

struct Targets {
    plan: TargetPlan,
    /// False when only overridden columns are converted.
    convert_all: bool,
    parsed: BTreeMap<String, ParsedUnit>,
}

impl Targets {
    fn new(config: &HarmonizeConfig, converter: &UnitConverter) -> Result<Self> {
        let plan = TargetPlan::new(
            config
                .target_units
                .clone()
                .unwrap_or(TargetUnits::PerSubstance),
        )
        .with_overrides(config.override_units.clone())
        .with_fallback(config.default_target_unit.clone());
        let convert_all = config.target_units.is_some();

        let specs: Vec<String> = if convert_all {
            plan.unit_specs().into_iter().map(str::to_string).collect()
        } else {
            plan.overrides.values().cloned().collect()
        };
        let mut parsed = BTreeMap::new();
        for spec in specs {
            let unit = converter
                .parse_target(&spec)
                .map_err(|_| HarmonizeError::InvalidTargetUnit { spec: spec.clone() })?;
            parsed.insert(spec, unit);
        }
        Ok(Self {
            plan,
            convert_all,
            parsed,
        })
    }

    fn target_for(&self, names: &[&str]) -> Option<(&str, &ParsedUnit)> {
        let spec = if self.convert_all {
            self.plan.unit_for(names)
        } else {
            names
                .iter()
                .find_map(|name| self.plan.overrides.get(*name))?
                .as_str()
        };
        self.parsed
            .get_key_value(spec)
            .map(|(spec, unit)| (spec.as_str(), unit))
    }
}

struct Run<'a> {
    table: Table,
    report: HarmonizationReport,
    config: &'a HarmonizeConfig,
    converter: &'a UnitConverter,
    resolver: MolarMassResolver,
}

impl Run<'_> {
    fn stage(&mut self, stage: Stage, body: impl FnOnce(&mut Self)) {
        let expected = self
            .report
            .stages
            .last()
            .map_or(Some(Stage::Imported), |last| last.next());
        debug_assert_eq!(expected, Some(stage), "stages run in order");
        debug_span!("stage", stage = %stage).in_scope(|| body(self));
        self.report.stages.push(stage);
    }

    fn import(&mut self, plan: &Plan) {
        let format = self.config.number_format();
        let policy = self.config.detection_limit;
        for (index, column) in self.table.columns_mut().iter_mut().enumerate() {
            if let Some((name, unit)) = &plan.inferred[index] {
                debug!(column = %column.source_name, %name, %unit, "unit taken from header");
                column.name.clone_from(name);
                column.unit = Some(unit.clone());
            }
            if column.is_feature() {
                let parsed = column
                    .values
                    .iter_mut()
                    .map(|cell| normalize_cell(cell, &format, policy))
                    .filter(|parsed| *parsed)
                    .count();
                debug!(column = %column.source_name, parsed, "cells normalized");
            }
            let mut entry = ColumnReport::new(column.source_name.clone(), column.role);
            entry.output_name.clone_from(&column.name);
            entry.raw_unit.clone_from(&column.unit);
            self.report.columns.push(entry);
        }
    }

    fn rename(&mut self, plan: &Plan) {
        for (index, column) in self.table.columns_mut().iter_mut().enumerate() {
            let Some(result) = &plan.matches[index] else {
                continue;
            };
            debug!(
                column = %column.source_name,
                alias = %result.alias,
                method = %result.method,
                score = result.score,
                "column renamed"
            );
            column.name.clone_from(&result.alias);
            let entry = &mut self.report.columns[index];
            entry.output_name.clone_from(&result.alias);
            entry.name_match = Some(result.clone());
        }
    }

    fn merge(&mut self) {
        let config = self.config;
        for group in &config.merge_columns {
            self.merge_group(group);
        }

        let drops: BTreeSet<String> = config.drop_columns.iter().cloned().collect();
        for column in self.table.remove_sources(&drops) {
            debug!(column = %column.source_name, "column dropped");
            self.set_fate(&column.source_name, ColumnFate::Dropped);
        }
        self.report.merge_candidates = self.table.merge_candidates();
    }

    fn merge_group(&mut self, group: &[String]) {
        let Some((survivor_name, donor_names)) = group.split_first() else {
            return;
        };
        let donor_set: BTreeSet<String> = donor_names.iter().cloned().collect();
        let mut donors = self.table.remove_sources(&donor_set);
        let Some(index) = self.table.source_position(survivor_name) else {
            return;
        };

        let mut record = MergeRecord {
            survivor: survivor_name.clone(),
            donors: Vec::new(),
            filled: 0,
            skipped_donors: Vec::new(),
        };
        for donor_name in donor_names {
            let Some(position) = donors.iter().position(|c| c.source_name == *donor_name) else {
                continue;
            };
            let donor = donors.swap_remove(position);
            let survivor = &self.table.columns()[index];
            match donor_factor(self.converter, &mut self.resolver, survivor, &donor) {
                Ok(factor) => {
                    let Some(survivor) = self.table.column_mut(index) else {
                        return;
                    };
                    let filled = fill_missing(survivor, &donor, factor);
                    debug!(survivor = %survivor_name, donor = %donor_name, filled, factor, "column merged");
                    record.filled += filled;
                    record.donors.push(donor_name.clone());
                    self.set_fate(donor_name, ColumnFate::MergedInto(survivor_name.clone()));
                }
                Err(reason) => {
                    warn!(survivor = %survivor_name, donor = %donor_name, %reason, "merge donor skipped");
                    record.skipped_donors.push(donor_name.clone());
                    self.set_fate(donor_name, ColumnFate::Dropped);
                }
            }
        }
        self.report.merges.push(record);
    }

    fn set_fate(&mut self, source_name: &str, fate: ColumnFate) {
        if let Some(entry) = self.report.column_mut(source_name) {
            entry.fate = fate;
        }
    }

    fn resolve_units(&mut self) {
        let converter = self.converter;
        let parser = converter.parser();
        for column in self.table.columns_mut() {
            if !column.is_feature() {
                continue;
            }
            let parsed = column.unit.as_deref().map(|unit| parser.parse(unit));
            if let Some(unit) = parsed.as_ref().filter(|unit| !unit.is_known()) {
                warn!(column = %column.source_name, unit = %unit.raw, "unit not recognized");
            }
            column.parsed_unit.clone_from(&parsed);
            if let Some(entry) = self.report.column_mut(&column.source_name) {
                entry.unit = parsed;
            }
        }
    }

    fn convert(&mut self, plan: &Plan) {
        for column in self.table.columns_mut() {
            if !column.is_feature() {
                continue;
            }
            let mut names = vec![column.name.as_str()];
            if let Some(name) = plan.header_names.get(&column.source_name) {
                names.push(name);
            }
            names.push(&column.source_name);
            let Some((spec, target)) = plan.targets.target_for(&names) else {
                continue;
            };
            let outcome = match column.parsed_unit.clone() {
                Some(unit) if unit.is_known() => {
                    convert_column(self.converter, &mut self.resolver, column, &unit, spec, target)
                }
                _ => {
                    warn!(column = %column.source_name, "no usable unit, values left as is");
                    ConversionOutcome::SkippedUnknownUnit
                }
            };
            if let Some(entry) = self.report.column_mut(&column.source_name) {
                entry.conversion = outcome;
            }
        }
    }

    fn finish(&mut self) {
        for column in self.table.columns() {
            if let Some(entry) = self.report.column_mut(&column.source_name) {
                entry.output_name.clone_from(&column.name);
            }
        }
    }
}

/// Multiplier taking donor values into the survivor's unit.
fn donor_factor(
    converter: &UnitConverter,
    resolver: &mut MolarMassResolver,
    survivor: &Column,
    donor: &Column,
) -> std::result::Result<f64, String> {
    match (
        survivor.unit.as_deref().map(str::trim),
        donor.unit.as_deref().map(str::trim),
    ) {
        (None, None) => Ok(1.0),
        (Some(to), Some(from)) if to == from => Ok(1.0),
        (Some(to), Some(from)) => {
            let parser = converter.parser();
            let to = parser.parse(to).with_default_substance(&survivor.name);
            let from = parser.parse(from).with_default_substance(&survivor.name);
            converter
                .factor(&from, &to, resolver)
                .map_err(|error| error.to_string())
        }
        _ => Err("only one of the columns has a unit".to_string()),
    }
}

fn convert_column(
    converter: &UnitConverter,
    resolver: &mut MolarMassResolver,
    column: &mut Column,
    unit: &ParsedUnit,
    spec: &str,
    target: &ParsedUnit,
) -> ConversionOutcome {
    let from = unit.with_default_substance(&column.name);
    match converter.factor(&from, target, resolver) {
        Ok(factor) => {
            for value in column.values.iter_mut().filter_map(|cell| cell.value.as_mut()) {
                *value *= factor;
            }
            let output = output_unit(converter.parser(), unit, target);
            debug!(column = %column.source_name, from = %unit, to = %output, factor, "column converted");
            let label = output.label();
            column.unit = Some(label.clone());
            column.parsed_unit = Some(output);
            ConversionOutcome::Success {
                factor,
                target: label,
            }
        }
        Err(UnitError::UnresolvedMolarMass { substance }) => {
            warn!(column = %column.source_name, %substance, "molar mass unresolved, values kept");
            ConversionOutcome::UnresolvedMolarMass { substance }
        }
        Err(UnitError::Incompatible { from, to }) => {
            warn!(column = %column.source_name, %from, %to, "incompatible units, values kept");
            ConversionOutcome::IncompatibleUnit { from, to }
        }
        Err(UnitError::UnknownUnit { .. }) => ConversionOutcome::SkippedUnknownUnit,
        Err(error) => {
            warn!(column = %column.source_name, %error, "conversion failed, values kept");
            ConversionOutcome::IncompatibleUnit {
                from: unit.label(),
                to: spec.to_string(),
            }
        }
    }
}

/// The unit a converted column carries. Explicit substances of the source
/// carry over when the target names none, and the label is parsed again
/// so a later run sees exactly what it would parse itself.
fn output_unit(parser: &UnitParser, source: &ParsedUnit, target: &ParsedUnit) -> ParsedUnit {
    let basis = source
        .substance_ref
        .as_deref()
        .or(source.measured_substance.as_deref());
    let output = match basis {
        Some(substance) => target.with_default_substance(substance),
        None => target.clone(),
    };
    let reparsed = parser.parse(&output.label());
    if reparsed.is_known() { reparsed } else { output }
}
