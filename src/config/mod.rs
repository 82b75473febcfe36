//! Analysis configuration, validated before any engine construction.

use std::path::{Path, PathBuf};

use crate::common::{GenomeAssembly, OutputFormat, TranscriptDatabase};
use crate::error::Error;

/// File names expected inside the data directory.
pub const ONTOLOGY_FILENAME: &str = "terms.tsv";
/// Disease annotation table inside the data directory.
pub const ANNOTATIONS_FILENAME: &str = "disease_annotations.tsv";
/// Gene↔disease link table inside the data directory.
pub const GENE_TO_DISEASE_FILENAME: &str = "gene_to_disease.tsv";

/// Everything the prioritization run needs to know up front.
///
/// [`AnalysisConfig::validate`] checks paths and option combinations and
/// fails with [`Error::Config`] before anything heavy is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Directory with ontology, annotation, and gene link tables.
    pub data_dir: PathBuf,
    /// Optional directory with the external variant annotator's data.
    pub exomiser_dir: Option<PathBuf>,
    /// Optional path to the variant source of the sample (its per-gene
    /// genotype summary as produced by the external annotator).
    pub vcf: Option<PathBuf>,
    /// Genome assembly the variant data was called against.
    pub assembly: GenomeAssembly,
    /// Transcript database used by the external annotator.
    pub transcript_db: TranscriptDatabase,
    /// Optional custom background gene-rate table; when absent, the
    /// assembly-specific default inside `data_dir` is used.
    pub background_file: Option<PathBuf>,
    /// Whether to drop variant calls failing the VCF FILTER column.
    pub filter_on_filter_column: bool,
    /// Format of the ranking report.
    pub output_format: OutputFormat,
}

impl AnalysisConfig {
    /// The background gene-rate table to use: the custom file when given,
    /// otherwise the assembly-specific default in the data directory.
    pub fn background_path(&self) -> PathBuf {
        match &self.background_file {
            Some(path) => path.clone(),
            None => self
                .data_dir
                .join(format!("background-{}.tsv", self.assembly.name())),
        }
    }

    /// Path of the ontology term table.
    pub fn ontology_path(&self) -> PathBuf {
        self.data_dir.join(ONTOLOGY_FILENAME)
    }

    /// Path of the disease annotation table.
    pub fn annotations_path(&self) -> PathBuf {
        self.data_dir.join(ANNOTATIONS_FILENAME)
    }

    /// Path of the gene↔disease link table.
    pub fn gene_to_disease_path(&self) -> PathBuf {
        self.data_dir.join(GENE_TO_DISEASE_FILENAME)
    }

    /// Checks that all referenced files exist and the option combination
    /// makes sense.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.data_dir.is_dir() {
            return Err(Error::Config(format!(
                "data directory {} does not exist",
                self.data_dir.display()
            )));
        }
        for required in [
            self.ontology_path(),
            self.annotations_path(),
            self.gene_to_disease_path(),
        ] {
            require_file(&required)?;
        }
        if let Some(exomiser_dir) = &self.exomiser_dir {
            if !exomiser_dir.is_dir() {
                return Err(Error::Config(format!(
                    "exomiser data directory {} does not exist",
                    exomiser_dir.display()
                )));
            }
        }
        if let Some(vcf) = &self.vcf {
            require_file(vcf)?;
            if self.exomiser_dir.is_none() {
                return Err(Error::Config(
                    "variant input requires the external annotator data directory".to_string(),
                ));
            }
        }
        require_file(&self.background_path())?;
        Ok(())
    }
}

fn require_file(path: &Path) -> Result<(), Error> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "required file {} does not exist",
            path.display()
        )))
    }
}
