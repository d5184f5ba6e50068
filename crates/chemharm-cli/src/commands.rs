use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chemharm_cli::input::{HarmonizedDocument, read_table};
use chemharm_harmonize::{HarmonizationPipeline, HarmonizeConfig, Harmonized};
use chemharm_map::{FuzzyThreshold, MappingDictionary, MatchEngine, MatchOptions, TextRules};
use chemharm_model::{MatchResult, MatchStrategy};
use chemharm_units::{MolarMassResolver, TargetUnits, UnitConverter, UnitParser};
use tracing::{debug, info, info_span};

use crate::cli::{
    DictionaryArgs, DictionarySource, HarmonizeArgs, MatchArgs, MolarMassArgs, ParseUnitArgs,
};
use crate::types::{MassRow, UnitRow};

pub fn run_harmonize(args: &HarmonizeArgs) -> Result<Harmonized> {
    let span = info_span!("harmonize_command", input = %args.input.display());
    let _guard = span.enter();

    let mut config = match &args.config {
        Some(path) => HarmonizeConfig::from_path(path)
            .with_context(|| format!("load configuration {}", path.display()))?,
        None => HarmonizeConfig::default(),
    };
    if let Some(target) = &args.target {
        config.target_units = Some(TargetUnits::from(target.clone()));
    }

    let mut pipeline = HarmonizationPipeline::new(config);
    if let Some(dictionary) = load_dictionary(&args.dictionary)? {
        pipeline = pipeline.with_dictionary(Arc::new(dictionary));
    }

    let table = read_table(&args.input)?;
    let harmonized = pipeline.run(table).context("harmonization failed")?;

    if let Some(path) = &args.output {
        let json = harmonized_json(&harmonized)?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        info!(path = %path.display(), "harmonized table written");
    }
    Ok(harmonized)
}

pub fn harmonized_json(harmonized: &Harmonized) -> Result<String> {
    let document = HarmonizedDocument {
        table: &harmonized.table,
        report: &harmonized.report,
    };
    serde_json::to_string_pretty(&document).context("serialize output")
}

pub fn run_match(args: &MatchArgs) -> Result<Vec<MatchResult>> {
    let Some(dictionary) = load_dictionary(&args.dictionary)? else {
        bail!("no dictionary given; pass --dictionary <PATH> or --bundled <VOCABULARY>");
    };
    if !(0.0..=100.0).contains(&args.threshold) {
        bail!("--threshold must be between 0 and 100, got {}", args.threshold);
    }

    let mut rules = if args.hydrochemistry {
        TextRules::hydrochemistry()
    } else {
        TextRules::new()
    };
    for text in &args.remove {
        rules = rules.with_removal(text.clone());
    }
    let threshold = if args.length_scaled {
        FuzzyThreshold::ByLength
    } else {
        FuzzyThreshold::Fixed(args.threshold)
    };
    let options = MatchOptions::new()
        .with_text_rules(rules)
        .with_threshold(threshold)
        .with_scorer(args.scorer.into());
    let strategies: Vec<MatchStrategy> = args.methods.iter().copied().map(Into::into).collect();

    let engine = MatchEngine::new(&dictionary, strategies).with_options(options);
    let results = engine.match_all(args.names.iter().map(String::as_str));
    debug!(
        names = results.len(),
        matched = results.iter().filter(|result| result.is_match()).count(),
        "names matched"
    );
    Ok(results)
}

pub fn run_parse_unit(args: &ParseUnitArgs) -> Result<Vec<UnitRow>> {
    let converter = UnitConverter::new(UnitParser::new());
    let target = args
        .to
        .as_deref()
        .map(|spec| {
            converter
                .parse_target(spec)
                .with_context(|| format!("target unit '{spec}'"))
        })
        .transpose()?;
    let mut resolver = MolarMassResolver::default();

    let rows = args
        .units
        .iter()
        .map(|raw| {
            let mut unit = converter.parser().parse(raw);
            if let Some(substance) = &args.substance {
                unit = unit.with_default_substance(substance);
            }
            let conversion = target.as_ref().map(|to| {
                converter
                    .factor(&unit, to, &mut resolver)
                    .map_err(|error| error.to_string())
            });
            UnitRow { unit, conversion }
        })
        .collect();
    Ok(rows)
}

pub fn run_molar_mass(args: &MolarMassArgs) -> Vec<MassRow> {
    let mut resolver = MolarMassResolver::default();
    args.substances
        .iter()
        .map(|substance| MassRow {
            substance: substance.clone(),
            resolved: resolver
                .resolve_with_source(substance)
                .map_err(|error| error.to_string()),
        })
        .collect()
}

pub fn run_dictionary(args: &DictionaryArgs) -> Result<()> {
    let dictionary = MappingDictionary::bundled(&args.key_vocabulary, &args.alias_vocabulary)
        .context("build bundled dictionary")?;
    match &args.output {
        Some(path) => {
            dictionary
                .write_to_path(path)
                .with_context(|| format!("write {}", path.display()))?;
            info!(path = %path.display(), entries = dictionary.len(), "dictionary written");
        }
        None => println!("{}", dictionary.to_json_string()?),
    }
    Ok(())
}

fn load_dictionary(source: &DictionarySource) -> Result<Option<MappingDictionary>> {
    if let Some(path) = &source.dictionary {
        let dictionary = MappingDictionary::from_path(path)
            .with_context(|| format!("load dictionary {}", path.display()))?;
        return Ok(Some(dictionary));
    }
    if let Some(vocabulary) = &source.bundled {
        let dictionary = MappingDictionary::bundled(vocabulary, &source.alias_vocabulary)
            .context("build bundled dictionary")?;
        return Ok(Some(dictionary));
    }
    Ok(None)
}
