//! Common functionality.

use byte_unit::Byte;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Helper to print the current memory resident set size via `tracing`.
pub fn trace_rss_now() {
    let me = procfs::process::Process::myself().unwrap();
    let page_size = procfs::page_size();
    tracing::debug!(
        "RSS now: {}",
        Byte::from_bytes((me.stat().unwrap().rss * page_size) as u128).get_appropriate_unit(true)
    );
}

/// Select the genome assembly that variant data was called against.
#[derive(
    clap::ValueEnum,
    Clone,
    Copy,
    Debug,
    strum::Display,
    strum::EnumString,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum GenomeAssembly {
    /// GRCh37 / hg19
    Hg19,
    /// GRCh38 / hg38
    Hg38,
}

impl GenomeAssembly {
    /// Human-readable assembly name.
    pub fn name(&self) -> String {
        match self {
            GenomeAssembly::Hg19 => String::from("hg19"),
            GenomeAssembly::Hg38 => String::from("hg38"),
        }
    }
}

/// Select the transcript database used by the upstream variant annotator.
#[derive(
    clap::ValueEnum,
    Clone,
    Copy,
    Debug,
    Default,
    strum::Display,
    strum::EnumString,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TranscriptDatabase {
    /// UCSC transcripts
    #[default]
    Ucsc,
    /// RefSeq transcripts
    Refseq,
    /// Ensembl transcripts
    Ensembl,
}

/// Select the format that the ranking report is written in.
#[derive(
    clap::ValueEnum,
    Clone,
    Copy,
    Debug,
    Default,
    strum::Display,
    strum::EnumString,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    /// Tab-separated values, one row per candidate disease.
    #[default]
    Tsv,
    /// Self-contained HTML page.
    Html,
}

/// Return the version of the crate and `x.y.z` in tests.
pub fn worker_version() -> &'static str {
    if cfg!(test) {
        "x.y.z"
    } else {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    #[test]
    fn trace_rss_now_smoke() {
        super::trace_rss_now();
    }

    #[rstest::rstest]
    #[case(crate::common::GenomeAssembly::Hg19, "hg19")]
    #[case(crate::common::GenomeAssembly::Hg38, "hg38")]
    fn genome_assembly_name(#[case] assembly: crate::common::GenomeAssembly, #[case] expected: &str) {
        assert_eq!(expected, assembly.name());
        assert_eq!(expected, assembly.to_string());
    }

    #[rstest::rstest]
    #[case("hg19", crate::common::GenomeAssembly::Hg19)]
    #[case("HG38", crate::common::GenomeAssembly::Hg38)]
    fn genome_assembly_from_str(
        #[case] s: &str,
        #[case] expected: crate::common::GenomeAssembly,
    ) -> Result<(), anyhow::Error> {
        let assembly: crate::common::GenomeAssembly = s.parse()?;
        assert_eq!(expected, assembly);
        Ok(())
    }

    #[rstest::rstest]
    #[case("ucsc", crate::common::TranscriptDatabase::Ucsc)]
    #[case("refseq", crate::common::TranscriptDatabase::Refseq)]
    #[case("ensembl", crate::common::TranscriptDatabase::Ensembl)]
    fn transcript_database_from_str(
        #[case] s: &str,
        #[case] expected: crate::common::TranscriptDatabase,
    ) -> Result<(), anyhow::Error> {
        let db: crate::common::TranscriptDatabase = s.parse()?;
        assert_eq!(expected, db);
        Ok(())
    }

    #[rstest::rstest]
    #[case(crate::common::OutputFormat::Tsv, "tsv")]
    #[case(crate::common::OutputFormat::Html, "html")]
    fn output_format_display(#[case] format: crate::common::OutputFormat, #[case] expected: &str) {
        assert_eq!(expected, format.to_string());
    }

    #[test]
    fn worker_version_in_tests() {
        assert_eq!("x.y.z", super::worker_version());
    }
}
