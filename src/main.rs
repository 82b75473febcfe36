//! Likelihood-ratio disease prioritization main executable

pub mod analysis;
pub mod background;
pub mod common;
pub mod config;
pub mod corpus;
pub mod error;
pub mod genes;
pub mod likelihood;
pub mod ontology;
pub mod prioritize;

use clap::{Args, Parser, Subcommand};
use console::{Emoji, Term};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Phenotype-driven disease prioritization",
    long_about = "Ranks candidate Mendelian diseases for a single case by combining \
                  phenotype and genotype likelihood ratios"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Subcommand)]
enum Commands {
    /// Database building related commands.
    Db(Db),
    /// Case prioritization related commands.
    Prioritize(Prioritize),
}

/// Parsing of "db *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Db {
    /// The sub command to run
    #[command(subcommand)]
    command: DbCommands,
}

/// Enum supporting the parsing of "db *" sub commands.
#[derive(Debug, Subcommand)]
enum DbCommands {
    BuildBackground(background::cli::Args),
}

/// Parsing of "prioritize *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Prioritize {
    /// The sub command to run
    #[command(subcommand)]
    command: PrioritizeCommands,
}

/// Enum supporting the parsing of "prioritize *" sub commands.
#[derive(Debug, Subcommand)]
enum PrioritizeCommands {
    Run(prioritize::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Db(db) => match &db.command {
                DbCommands::BuildBackground(args) => {
                    background::cli::run(&cli.common, args)?;
                }
            },
            Commands::Prioritize(prioritize) => match &prioritize.command {
                PrioritizeCommands::Run(args) => {
                    prioritize::run(&cli.common, args)?;
                }
            },
        }

        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))?;

    Ok(())
}
