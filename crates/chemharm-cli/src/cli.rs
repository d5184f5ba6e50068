//! CLI argument definitions.

use std::path::PathBuf;

use chemharm_map::FuzzyScorer;
use chemharm_model::MatchStrategy;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "chemharm",
    version,
    about = "Harmonize names and units of chemical measurement tables",
    long_about = "Harmonize names and units of chemical measurement tables.\n\n\
                  Renames feature columns to canonical aliases, merges duplicate\n\
                  columns and converts concentrations to the requested units."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,
}

#[derive(Subcommand)]
pub enum Command {
    /// Harmonize a JSON table and print a summary of every column.
    Harmonize(HarmonizeArgs),

    /// Match feature names against a dictionary.
    Match(MatchArgs),

    /// Show how unit strings are parsed.
    ParseUnit(ParseUnitArgs),

    /// Resolve molar masses of substances or formulae.
    MolarMass(MolarMassArgs),

    /// Export the bundled dictionary for two vocabularies as JSON.
    Dictionary(DictionaryArgs),
}

/// Where the mapping dictionary comes from.
#[derive(Args, Clone)]
pub struct DictionarySource {
    /// Dictionary JSON file (flat `{key: alias}` object or entry list).
    #[arg(long = "dictionary", value_name = "PATH", conflicts_with = "bundled")]
    pub dictionary: Option<PathBuf>,

    /// Use the bundled feature table with this key vocabulary.
    #[arg(long = "bundled", value_name = "VOCABULARY")]
    pub bundled: Option<String>,

    /// Alias vocabulary of the bundled feature table.
    #[arg(
        long = "alias-vocabulary",
        value_name = "VOCABULARY",
        default_value = "formula"
    )]
    pub alias_vocabulary: String,
}

#[derive(Parser)]
pub struct HarmonizeArgs {
    /// Input table as JSON.
    #[arg(value_name = "TABLE")]
    pub input: PathBuf,

    /// TOML run configuration.
    #[arg(long = "config", short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub dictionary: DictionarySource,

    /// Conversion target, overriding the configured `target_units`.
    #[arg(long = "target", value_name = "UNIT")]
    pub target: Option<String>,

    /// Write the harmonized table and report to this file.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Print the harmonized document as JSON instead of the summary.
    #[arg(long = "json")]
    pub json: bool,

    /// Print the harmonized values as a data frame.
    #[cfg(feature = "polars")]
    #[arg(long = "frame")]
    pub frame: bool,
}

#[derive(Parser)]
pub struct MatchArgs {
    /// Names to match.
    #[arg(value_name = "NAME", required = true)]
    pub names: Vec<String>,

    #[command(flatten)]
    pub dictionary: DictionarySource,

    /// Strategies tried in order.
    #[arg(
        long = "method",
        value_enum,
        value_delimiter = ',',
        default_value = "exact"
    )]
    pub methods: Vec<MatchMethodArg>,

    /// Minimum fuzzy score (0-100).
    #[arg(long = "threshold", default_value_t = 100.0)]
    pub threshold: f64,

    /// Scale the fuzzy threshold with the name length.
    #[arg(long = "length-scaled")]
    pub length_scaled: bool,

    #[arg(long = "scorer", value_enum, default_value = "token-set")]
    pub scorer: ScorerArg,

    /// Strings removed from names before matching.
    #[arg(long = "remove", value_name = "TEXT")]
    pub remove: Vec<String>,

    /// Apply the hydrochemistry replacement and removal preset.
    #[arg(long = "hydrochemistry")]
    pub hydrochemistry: bool,
}

#[derive(Parser)]
pub struct ParseUnitArgs {
    /// Unit strings to parse.
    #[arg(value_name = "UNIT", required = true)]
    pub units: Vec<String>,

    /// Convert each unit to this target and show the factor.
    #[arg(long = "to", value_name = "UNIT")]
    pub to: Option<String>,

    /// Substance assumed for units that name none.
    #[arg(long = "substance", value_name = "SUBSTANCE", requires = "to")]
    pub substance: Option<String>,
}

#[derive(Parser)]
pub struct MolarMassArgs {
    /// Substance names or formulae.
    #[arg(value_name = "SUBSTANCE", required = true)]
    pub substances: Vec<String>,
}

#[derive(Parser)]
pub struct DictionaryArgs {
    /// Vocabulary used for search keys.
    #[arg(long = "key-vocabulary", default_value = "dutch")]
    pub key_vocabulary: String,

    /// Vocabulary used for aliases.
    #[arg(long = "alias-vocabulary", default_value = "formula")]
    pub alias_vocabulary: String,

    /// Write to this file instead of stdout.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MatchMethodArg {
    Exact,
    Ascii,
    Fuzzy,
    Regex,
}

impl From<MatchMethodArg> for MatchStrategy {
    fn from(value: MatchMethodArg) -> Self {
        match value {
            MatchMethodArg::Exact => Self::Exact,
            MatchMethodArg::Ascii => Self::Ascii,
            MatchMethodArg::Fuzzy => Self::Fuzzy,
            MatchMethodArg::Regex => Self::Regex,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ScorerArg {
    TokenSet,
    TokenSort,
}

impl From<ScorerArg> for FuzzyScorer {
    fn from(value: ScorerArg) -> Self {
        match value {
            ScorerArg::TokenSet => Self::TokenSet,
            ScorerArg::TokenSort => Self::TokenSort,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
