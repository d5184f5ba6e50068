//! Chemical measurement harmonization CLI.

use std::io::{self, IsTerminal};

use anyhow::Error;
use chemharm_cli::logging::{LogConfig, LogFormat, init_logging};
use chemharm_harmonize::HarmonizeError;
use clap::{ColorChoice, Parser};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;
mod types;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{
    harmonized_json, run_dictionary, run_harmonize, run_match, run_molar_mass, run_parse_unit,
};
use crate::summary::{print_harmonize_summary, print_matches, print_molar_masses, print_units};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let result = match &cli.command {
        Command::Harmonize(args) => run_harmonize(args).and_then(|harmonized| {
            if args.json {
                println!("{}", harmonized_json(&harmonized)?);
            } else {
                print_harmonize_summary(&harmonized);
            }
            #[cfg(feature = "polars")]
            if args.frame {
                use anyhow::Context;
                let frame = harmonized
                    .table
                    .to_dataframe()
                    .context("build data frame")?;
                println!("{frame}");
            }
            Ok(())
        }),
        Command::Match(args) => run_match(args).map(|results| print_matches(&results)),
        Command::ParseUnit(args) => {
            run_parse_unit(args).map(|rows| print_units(&rows, args.to.as_deref()))
        }
        Command::MolarMass(args) => {
            print_molar_masses(&run_molar_mass(args));
            Ok(())
        }
        Command::Dictionary(args) => run_dictionary(args),
    };
    let exit_code = match result {
        Ok(()) => 0,
        Err(error) => {
            report_error(&error);
            1
        }
    };
    std::process::exit(exit_code);
}

fn report_error(error: &Error) {
    eprintln!("error: {error:#}");
    if let Some(hint) = error
        .downcast_ref::<HarmonizeError>()
        .and_then(HarmonizeError::suggestion)
    {
        eprintln!("hint: {hint}");
    }
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => io::stderr().is_terminal(),
    };
    config
}
