//! Code implementing the "prioritize run" sub command.

use std::time::Instant;

use clap::Parser;
use thousands::Separable;
use tracing::info;

use crate::analysis::{output, CaseEvaluator, CaseQuery};
use crate::background::BackgroundIndex;
use crate::common::trace_rss_now;
use crate::common::{GenomeAssembly, OutputFormat, TranscriptDatabase};
use crate::config::AnalysisConfig;
use crate::corpus::load::{load_corpus, load_ontology};
use crate::genes::{BackgroundGeneRates, GeneDiseaseIndex};
use crate::likelihood::genotype::GenotypeMap;

/// Command line arguments for `prioritize run` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Rank candidate diseases for a case", long_about = None)]
pub struct Args {
    /// Path to the data directory with the ontology, annotation, and gene
    /// tables.
    #[arg(long, required = true)]
    pub path_data_dir: String,
    /// Path to the case JSON file with observed/excluded terms.
    #[arg(long, required = true)]
    pub path_case_json: String,
    /// Path to the output report file.
    #[arg(long, required = true)]
    pub path_output: String,

    /// Optional path to the per-gene genotype JSON of the sample.
    #[arg(long)]
    pub path_genotypes_json: Option<String>,
    /// Optional path to the external annotator data directory.
    #[arg(long)]
    pub path_exomiser_dir: Option<String>,
    /// Genome assembly the variant data was called against.
    #[arg(long, value_enum, default_value_t = GenomeAssembly::Hg19)]
    pub assembly: GenomeAssembly,
    /// Transcript database used by the external annotator.
    #[arg(long, value_enum, default_value_t = TranscriptDatabase::Ucsc)]
    pub transcript_db: TranscriptDatabase,
    /// Optional custom background gene-rate table.
    #[arg(long)]
    pub path_background: Option<String>,
    /// Whether to drop variant calls failing the VCF FILTER column.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub filter_on_filter_column: bool,
    /// Format of the ranking report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Tsv)]
    pub output_format: OutputFormat,
}

impl Args {
    fn to_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            data_dir: self.path_data_dir.clone().into(),
            exomiser_dir: self.path_exomiser_dir.clone().map(Into::into),
            vcf: self.path_genotypes_json.clone().map(Into::into),
            assembly: self.assembly,
            transcript_db: self.transcript_db,
            background_file: self.path_background.clone().map(Into::into),
            filter_on_filter_column: self.filter_on_filter_column,
            output_format: self.output_format,
        }
    }
}

/// Main entry point for `prioritize run` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    info!("args_common = {:?}", &args_common);
    info!("args = {:?}", &args);

    let config = args.to_config();
    config.validate()?;

    info!("Loading ontology...");
    let before_loading = Instant::now();
    let ontology = load_ontology(&config.ontology_path())?;
    info!(
        "...done loading {} terms in {:?}",
        ontology.len().separate_with_commas(),
        before_loading.elapsed()
    );

    info!("Loading disease annotations...");
    let before_loading = Instant::now();
    let corpus = load_corpus(&config.annotations_path(), &ontology)?;
    info!(
        "...done loading {} diseases in {:?}",
        corpus.len().separate_with_commas(),
        before_loading.elapsed()
    );

    info!("Loading gene-disease links...");
    let before_loading = Instant::now();
    let gene_index = GeneDiseaseIndex::load(&config.gene_to_disease_path())?;
    info!(
        "...done loading links for {} genes in {:?}",
        gene_index.num_genes().separate_with_commas(),
        before_loading.elapsed()
    );

    info!("Computing background frequencies...");
    let before_compute = Instant::now();
    let background = BackgroundIndex::build(&ontology, &corpus)?;
    info!("...done computing in {:?}", before_compute.elapsed());

    info!("Loading case...");
    let case = CaseQuery::load(&args.path_case_json)?;
    info!(
        "...done loading case {:?} ({} observed, {} excluded terms)",
        &case.sample_name,
        case.observed.len(),
        case.excluded.len()
    );

    let genotype_input = match &config.vcf {
        Some(path) => {
            info!("Loading genotypes...");
            let rates = BackgroundGeneRates::load(&config.background_path())?;
            let (map, counters) = GenotypeMap::load(path, config.filter_on_filter_column)?;
            info!(
                "...done loading genotypes for {} genes ({} variants retained, {} filtered)",
                map.len(),
                counters.retained,
                counters.filtered
            );
            Some((rates, map, counters))
        }
        None => {
            info!("No genotypes given; running phenotype-only");
            None
        }
    };

    trace_rss_now();

    info!("Ranking diseases...");
    let before_ranking = Instant::now();
    let evaluator = CaseEvaluator::new(&ontology, &corpus, &background, &gene_index);
    let evaluator = match &genotype_input {
        Some((rates, map, _)) => evaluator.with_genotypes(rates, map),
        None => evaluator,
    };
    let mut results = evaluator.evaluate(&case)?;
    info!("...done ranking in {:?}", before_ranking.elapsed());

    results.metadata.insert(
        "analysis_date".to_string(),
        chrono::Utc::now().to_rfc3339(),
    );
    results
        .metadata
        .insert("assembly".to_string(), config.assembly.to_string());
    results.metadata.insert(
        "transcript_database".to_string(),
        config.transcript_db.to_string(),
    );
    if let Some((_, _, counters)) = &genotype_input {
        results.metadata.insert(
            "n_variants_retained".to_string(),
            counters.retained.to_string(),
        );
        results.metadata.insert(
            "n_variants_filtered".to_string(),
            counters.filtered.to_string(),
        );
    }

    if let Some(top) = results.ranking.first() {
        info!(
            "top candidate: {} ({}) with posterior {:.6}",
            top.disease_id, &top.disease_name, top.posterior_probability
        );
    }

    info!("Writing {} report...", config.output_format);
    let file = std::fs::File::create(&args.path_output)?;
    output::write_results(&results, config.output_format, file)?;
    info!("...done writing {}", &args.path_output);

    Ok(())
}
