//! Genotype likelihood ratios from predicted-pathogenic variant burden.
//!
//! For each gene linked to a candidate disease, the observed count of
//! called-pathogenic alleles is compared under two hypotheses: the patient
//! has the disease (expected count set by the mode of inheritance) versus
//! the patient does not (Poisson background with the per-gene rate).  The
//! disease-level ratio is the best ratio over its linked genes.

use std::path::Path;

use indexmap::IndexMap;
use statrs::distribution::{Discrete, Poisson};

use crate::corpus::DiseaseRecord;
use crate::error::Error;
use crate::genes::{BackgroundGeneRates, GeneId};

/// Minimum pathogenicity score for a variant to count towards the
/// pathogenic allele burden of a gene.
pub const PATHOGENICITY_THRESHOLD: f64 = 0.8;

/// Upper clamp for the per-gene pathogenic allele count; more than two
/// alleles carry no additional evidence for a Mendelian disease.
pub const MAX_PATHOGENIC_ALLELES: f64 = 2.0;

/// Lower clamp for background rates so the Poisson denominator stays
/// well-defined.
const MIN_BACKGROUND_LAMBDA: f64 = 1e-5;

/// A single variant call as delivered by the upstream annotator.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ObservedVariant {
    /// Predicted pathogenicity in `[0, 1]`.
    pub pathogenicity: f64,
    /// Population frequency of the variant.
    pub frequency: f64,
    /// Whether the call passed the VCF FILTER column.
    pub filter_pass: bool,
    /// Number of alternative alleles called in the sample (1 het, 2 hom).
    pub allele_count: u32,
}

/// The variant calls of one gene in the sample under analysis.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GeneGenotype {
    /// The gene the variants fall into.
    pub gene_id: GeneId,
    /// Gene symbol as reported by the annotator.
    pub gene_symbol: String,
    /// The variant calls.
    pub variants: Vec<ObservedVariant>,
}

impl GeneGenotype {
    /// The pathogenic allele burden of the gene: the sum of
    /// `pathogenicity × allele count` over variants at or above
    /// [`PATHOGENICITY_THRESHOLD`], clamped to
    /// [`MAX_PATHOGENIC_ALLELES`].
    pub fn pathogenic_allele_count(&self) -> f64 {
        let sum: f64 = self
            .variants
            .iter()
            .filter(|v| v.pathogenicity >= PATHOGENICITY_THRESHOLD)
            .map(|v| v.pathogenicity * f64::from(v.allele_count))
            .sum();
        sum.min(MAX_PATHOGENIC_ALLELES)
    }
}

/// Counters describing how the variant input was filtered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QcCounters {
    /// Variants kept for scoring.
    pub retained: usize,
    /// Variants dropped because of the FILTER column.
    pub filtered: usize,
}

/// Per-gene genotypes of the sample, keyed by gene.
#[derive(Debug, Default)]
pub struct GenotypeMap {
    genes: IndexMap<GeneId, GeneGenotype>,
}

impl GenotypeMap {
    /// Builds the map from raw per-gene calls.
    ///
    /// With `filter_on_filter_column` set, calls failing the FILTER column
    /// are dropped and counted; otherwise all calls are retained.
    pub fn from_gene_genotypes(
        raw: Vec<GeneGenotype>,
        filter_on_filter_column: bool,
    ) -> (Self, QcCounters) {
        let mut counters = QcCounters::default();
        let mut genes = IndexMap::new();
        for mut gene in raw {
            if filter_on_filter_column {
                let before = gene.variants.len();
                gene.variants.retain(|v| v.filter_pass);
                counters.filtered += before - gene.variants.len();
            }
            counters.retained += gene.variants.len();
            genes.insert(gene.gene_id, gene);
        }
        (Self { genes }, counters)
    }

    /// Read per-gene calls from a JSON file (a list of gene entries with
    /// their variants).
    ///
    /// # Errors
    ///
    /// In the case that the file could not be read or parsed.
    pub fn load<P: AsRef<Path>>(
        path: &P,
        filter_on_filter_column: bool,
    ) -> Result<(Self, QcCounters), anyhow::Error> {
        let raw: Vec<GeneGenotype> = serde_json::from_reader(std::fs::File::open(path.as_ref())?)?;
        Ok(Self::from_gene_genotypes(raw, filter_on_filter_column))
    }

    /// The calls for `gene`, if any.
    pub fn get(&self, gene: GeneId) -> Option<&GeneGenotype> {
        self.genes.get(&gene)
    }

    /// Iterates over the genes with calls, in input order.
    pub fn genes(&self) -> impl Iterator<Item = GeneId> + '_ {
        self.genes.keys().copied()
    }

    /// Number of genes with calls.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Returns `true` if no gene has calls.
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

/// Why the genotype ratio of the reported gene came out the way it did.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GenotypeCategory {
    /// Recessive disease but fewer than two pathogenic alleles in every
    /// linked gene.
    NoVariantsDetectedAr,
    /// Dominant(-like) disease but no pathogenic allele in any linked
    /// gene.
    NoVariantsDetectedAd,
    /// The observed burden meets the expectation under the mode of
    /// inheritance.
    PathogenicMatch,
    /// Burden present, but the background rate explains it at least as
    /// well.
    HighBackground,
}

/// The genotype likelihood ratio of one gene against one disease.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeneLikelihood {
    /// The best-scoring linked gene.
    pub gene: GeneId,
    /// The likelihood ratio; `> 1` favors the disease.
    pub ratio: f64,
    /// Explanatory category for reporting.
    pub category: GenotypeCategory,
    /// The pathogenic allele burden that was scored.
    pub observed_alleles: f64,
}

impl GeneLikelihood {
    /// Natural logarithm of the ratio.
    pub fn log_ratio(&self) -> f64 {
        self.ratio.ln()
    }
}

/// Computes genotype likelihood ratios against the background rate table.
pub struct GenotypeLikelihood<'a> {
    rates: &'a BackgroundGeneRates,
}

impl<'a> GenotypeLikelihood<'a> {
    /// Creates the calculator on top of the background rate table.
    pub fn new(rates: &'a BackgroundGeneRates) -> Self {
        Self { rates }
    }

    /// The genotype likelihood ratio of `disease`, maximized over its
    /// linked genes.
    ///
    /// Returns `None` (ratio 1, genotype uninformative) for diseases
    /// without linked genes.
    pub fn evaluate(
        &self,
        disease: &DiseaseRecord,
        linked_genes: &[GeneId],
        genotypes: &GenotypeMap,
    ) -> Result<Option<GeneLikelihood>, Error> {
        if linked_genes.is_empty() {
            return Ok(None);
        }

        let expectations = disease.expected_allele_counts();
        let mut best: Option<GeneLikelihood> = None;
        for &gene in linked_genes {
            let observed = genotypes
                .get(gene)
                .map(|g| g.pathogenic_allele_count())
                .unwrap_or(0.0);
            let count = observed.round() as u64;
            let lambda_background = self.rates.lambda(gene).max(MIN_BACKGROUND_LAMBDA);
            for &lambda_disease in &expectations {
                let numerator = poisson_pmf(count, lambda_disease)?;
                let denominator = poisson_pmf(count, lambda_background)?;
                let ratio =
                    Error::check_finite(numerator / denominator, "genotype likelihood ratio")?;
                let candidate = GeneLikelihood {
                    gene,
                    ratio,
                    category: categorize(count, lambda_disease, ratio),
                    observed_alleles: observed,
                };
                // Strictly greater keeps the first candidate on ties, so
                // the result only depends on the linked gene order.
                if best.as_ref().map(|b| candidate.ratio > b.ratio).unwrap_or(true) {
                    best = Some(candidate);
                }
            }
        }
        Ok(best)
    }
}

fn poisson_pmf(count: u64, lambda: f64) -> Result<f64, Error> {
    let distribution = Poisson::new(lambda).map_err(|_| Error::Numeric {
        context: format!("Poisson rate {lambda}"),
        value: lambda,
    })?;
    Ok(distribution.pmf(count))
}

fn categorize(count: u64, expected: f64, ratio: f64) -> GenotypeCategory {
    if (count as f64) >= expected {
        if ratio < 1.0 {
            GenotypeCategory::HighBackground
        } else {
            GenotypeCategory::PathogenicMatch
        }
    } else if expected >= 2.0 {
        GenotypeCategory::NoVariantsDetectedAr
    } else {
        GenotypeCategory::NoVariantsDetectedAd
    }
}

#[cfg(test)]
mod test {
    use indexmap::IndexSet;
    use pretty_assertions::assert_eq;

    use crate::corpus::{DiseaseId, DiseaseRecord, ModeOfInheritance};
    use crate::genes::{BackgroundGeneRates, GeneId};

    use super::{
        GeneGenotype, GenotypeCategory, GenotypeLikelihood, GenotypeMap, ObservedVariant,
    };

    fn variant(pathogenicity: f64, allele_count: u32, filter_pass: bool) -> ObservedVariant {
        ObservedVariant {
            pathogenicity,
            frequency: 0.0001,
            filter_pass,
            allele_count,
        }
    }

    fn gene_genotype(gene: u32, variants: Vec<ObservedVariant>) -> GeneGenotype {
        GeneGenotype {
            gene_id: GeneId::from_u32(gene),
            gene_symbol: format!("GENE{gene}"),
            variants,
        }
    }

    fn disease(id: &str, mois: &[ModeOfInheritance]) -> DiseaseRecord {
        DiseaseRecord::new(
            DiseaseId::from(id),
            id,
            vec![],
            mois.iter().copied().collect::<IndexSet<_>>(),
        )
    }

    #[test]
    fn pathogenic_allele_count_applies_threshold_and_clamp() {
        let gene = gene_genotype(
            1,
            vec![
                variant(0.9, 2, true),
                variant(0.9, 1, true),
                // below threshold, ignored
                variant(0.5, 2, true),
            ],
        );
        // 0.9 * 2 + 0.9 = 2.7, clamped to 2.0
        assert_eq!(gene.pathogenic_allele_count(), 2.0);
    }

    #[test]
    fn genotype_map_filters_on_filter_column() {
        let raw = vec![gene_genotype(1, vec![variant(0.9, 1, true), variant(0.9, 1, false)])];
        let (map, counters) = GenotypeMap::from_gene_genotypes(raw.clone(), true);
        assert_eq!(counters.retained, 1);
        assert_eq!(counters.filtered, 1);
        assert_eq!(map.get(GeneId::from_u32(1)).unwrap().variants.len(), 1);

        let (map, counters) = GenotypeMap::from_gene_genotypes(raw, false);
        assert_eq!(counters.retained, 2);
        assert_eq!(counters.filtered, 0);
        assert_eq!(map.get(GeneId::from_u32(1)).unwrap().variants.len(), 2);
    }

    #[test]
    fn no_linked_genes_is_uninformative() {
        let rates = BackgroundGeneRates::from_pairs(&[]);
        let engine = GenotypeLikelihood::new(&rates);
        let (map, _) = GenotypeMap::from_gene_genotypes(vec![], true);
        let result = engine
            .evaluate(&disease("OMIM:1", &[]), &[], &map)
            .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn recessive_disease_without_variants() {
        let rates = BackgroundGeneRates::from_pairs(&[(GeneId::from_u32(1), 0.1)]);
        let engine = GenotypeLikelihood::new(&rates);
        let (map, _) = GenotypeMap::from_gene_genotypes(vec![], true);

        let result = engine
            .evaluate(
                &disease("OMIM:1", &[ModeOfInheritance::AutosomalRecessive]),
                &[GeneId::from_u32(1)],
                &map,
            )
            .unwrap()
            .unwrap();
        // Poisson(0; 2) / Poisson(0; 0.1) = e^-2 / e^-0.1
        let expected = (-2.0f64).exp() / (-0.1f64).exp();
        assert!(
            float_cmp::approx_eq!(f64, result.ratio, expected, epsilon = 1e-9),
            "ratio = {}",
            result.ratio
        );
        assert!(result.ratio < 1.0);
        assert_eq!(result.category, GenotypeCategory::NoVariantsDetectedAr);
    }

    #[test]
    fn dominant_disease_with_matching_variant() {
        let rates = BackgroundGeneRates::from_pairs(&[(GeneId::from_u32(1), 0.1)]);
        let engine = GenotypeLikelihood::new(&rates);
        let (map, _) = GenotypeMap::from_gene_genotypes(
            vec![gene_genotype(1, vec![variant(0.95, 1, true)])],
            true,
        );

        let result = engine
            .evaluate(
                &disease("OMIM:1", &[ModeOfInheritance::AutosomalDominant]),
                &[GeneId::from_u32(1)],
                &map,
            )
            .unwrap()
            .unwrap();
        // Poisson(1; 1) / Poisson(1; 0.1)
        let expected = (-1.0f64).exp() / (0.1 * (-0.1f64).exp());
        assert!(
            float_cmp::approx_eq!(f64, result.ratio, expected, epsilon = 1e-9),
            "ratio = {}",
            result.ratio
        );
        assert!(result.ratio > 1.0);
        assert_eq!(result.category, GenotypeCategory::PathogenicMatch);
    }

    #[test]
    fn high_background_gene_scores_below_one() {
        // Two pathogenic alleles in a dominant gene whose background rate
        // is higher still.
        let rates = BackgroundGeneRates::from_pairs(&[(GeneId::from_u32(1), 3.0)]);
        let engine = GenotypeLikelihood::new(&rates);
        let (map, _) = GenotypeMap::from_gene_genotypes(
            vec![gene_genotype(1, vec![variant(1.0, 2, true)])],
            true,
        );

        let result = engine
            .evaluate(
                &disease("OMIM:1", &[ModeOfInheritance::AutosomalDominant]),
                &[GeneId::from_u32(1)],
                &map,
            )
            .unwrap()
            .unwrap();
        assert!(result.ratio < 1.0, "ratio = {}", result.ratio);
        assert_eq!(result.category, GenotypeCategory::HighBackground);
    }

    #[test]
    fn best_linked_gene_wins() {
        let rates = BackgroundGeneRates::from_pairs(&[]);
        let engine = GenotypeLikelihood::new(&rates);
        let (map, _) = GenotypeMap::from_gene_genotypes(
            vec![gene_genotype(2, vec![variant(0.95, 1, true)])],
            true,
        );

        let result = engine
            .evaluate(
                &disease("OMIM:1", &[ModeOfInheritance::AutosomalDominant]),
                &[GeneId::from_u32(1), GeneId::from_u32(2)],
                &map,
            )
            .unwrap()
            .unwrap();
        assert_eq!(result.gene, GeneId::from_u32(2));
        assert!(result.ratio > 1.0);
    }

    #[test]
    fn mixed_inheritance_takes_the_better_expectation() {
        let rates = BackgroundGeneRates::from_pairs(&[(GeneId::from_u32(1), 0.1)]);
        let engine = GenotypeLikelihood::new(&rates);
        let (map, _) = GenotypeMap::from_gene_genotypes(
            vec![gene_genotype(1, vec![variant(0.95, 1, true)])],
            true,
        );

        let result = engine
            .evaluate(
                &disease(
                    "OMIM:1",
                    &[
                        ModeOfInheritance::AutosomalRecessive,
                        ModeOfInheritance::AutosomalDominant,
                    ],
                ),
                &[GeneId::from_u32(1)],
                &map,
            )
            .unwrap()
            .unwrap();
        // One allele fits the dominant expectation better than the
        // recessive one.
        let expected = (-1.0f64).exp() / (0.1 * (-0.1f64).exp());
        assert!(
            float_cmp::approx_eq!(f64, result.ratio, expected, epsilon = 1e-9),
            "ratio = {}",
            result.ratio
        );
        assert_eq!(result.category, GenotypeCategory::PathogenicMatch);
    }

    #[test]
    fn genotype_category_display() {
        assert_eq!(
            GenotypeCategory::NoVariantsDetectedAr.to_string(),
            "NO_VARIANTS_DETECTED_AR"
        );
        assert_eq!(
            GenotypeCategory::PathogenicMatch.to_string(),
            "PATHOGENIC_MATCH"
        );
    }
}
