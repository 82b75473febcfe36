//! Command line interface for building the background frequency table.

use std::time::Instant;

use clap::Parser;
use thousands::Separable;
use tracing::info;

use crate::background::BackgroundIndex;
use crate::corpus::load::{load_corpus, load_ontology};

/// Command line arguments for `db build-background` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Build the term background frequency table", long_about = None)]
pub struct Args {
    /// Path to the ontology term table (TSV).
    #[arg(long, required = true)]
    pub path_ontology: String,
    /// Path to the disease annotation table (TSV).
    #[arg(long, required = true)]
    pub path_annotations: String,
    /// Path to the output TSV file.
    #[arg(long, required = true)]
    pub path_output: String,
}

/// Main entry point for `db build-background` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    info!("args_common = {:?}", &args_common);
    info!("args = {:?}", &args);

    info!("Loading ontology...");
    let before_loading = Instant::now();
    let ontology = load_ontology(&args.path_ontology)?;
    info!(
        "...done loading {} terms in {:?}",
        ontology.len().separate_with_commas(),
        before_loading.elapsed()
    );

    info!("Loading disease annotations...");
    let before_loading = Instant::now();
    let corpus = load_corpus(&args.path_annotations, &ontology)?;
    info!(
        "...done loading {} diseases in {:?}",
        corpus.len().separate_with_commas(),
        before_loading.elapsed()
    );

    info!("Computing background frequencies...");
    let before_compute = Instant::now();
    let index = BackgroundIndex::build(&ontology, &corpus)?;
    info!("...done computing in {:?}", before_compute.elapsed());

    info!("Writing output...");
    let mut entries: Vec<_> = index.iter().collect();
    entries.sort_by_key(|(term, _)| *term);
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(&args.path_output)?;
    wtr.write_record(["term_id", "name", "frequency"])?;
    for (term, frequency) in entries {
        wtr.write_record([
            term.to_string(),
            ontology.name(term).unwrap_or("").to_string(),
            format!("{}", frequency),
        ])?;
    }
    wtr.flush()?;
    info!("...done writing {}", &args.path_output);

    Ok(())
}
