//! Case evaluation: ranking all corpus diseases for one patient.
//!
//! Scoring is a pure function of immutable shared state (ontology, corpus,
//! background index, gene links); per-disease scores are independent and
//! evaluated data-parallel, and the final ranking is deterministic for
//! fixed inputs regardless of the degree of parallelism.

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::background::BackgroundIndex;
use crate::corpus::{DiseaseCorpus, DiseaseId, DiseaseRecord};
use crate::error::Error;
use crate::genes::{BackgroundGeneRates, GeneDiseaseIndex, GeneId};
use crate::likelihood::genotype::{GenotypeCategory, GenotypeLikelihood, GenotypeMap};
use crate::likelihood::phenotype::{MatchType, PhenotypeLikelihood};
use crate::ontology::{Ontology, TermId};

pub mod output;

/// The phenotype observations of one proband.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CaseQuery {
    /// Name of the sample under analysis.
    pub sample_name: String,
    /// Terms observed in the proband.
    pub observed: Vec<TermId>,
    /// Terms explicitly ruled out in the proband.
    #[serde(default)]
    pub excluded: Vec<TermId>,
}

impl CaseQuery {
    /// Read a case from a JSON file.
    ///
    /// # Errors
    ///
    /// In the case that the file could not be read or parsed.
    pub fn load<P: AsRef<std::path::Path>>(path: &P) -> Result<Self, anyhow::Error> {
        Ok(serde_json::from_reader(std::fs::File::open(path.as_ref())?)?)
    }
}

/// The contribution of a single queried term to a disease's score.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TermContribution {
    /// The (canonicalized) term.
    pub term: TermId,
    /// The term name.
    pub term_name: String,
    /// The likelihood ratio.
    pub ratio: f64,
    /// Natural logarithm of the ratio.
    pub log_ratio: f64,
    /// How the term was matched against the disease annotations.
    pub match_type: MatchType,
}

/// The contribution of the best linked gene to a disease's score.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GeneContribution {
    /// The gene.
    pub gene: GeneId,
    /// The gene symbol.
    pub gene_symbol: String,
    /// The likelihood ratio.
    pub ratio: f64,
    /// Natural logarithm of the ratio.
    pub log_ratio: f64,
    /// Explanatory category.
    pub category: GenotypeCategory,
    /// The pathogenic allele burden that was scored.
    pub observed_alleles: f64,
}

/// One candidate disease with its composite score and breakdown.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DiseaseScore {
    /// The disease.
    pub disease_id: DiseaseId,
    /// The disease name.
    pub disease_name: String,
    /// Pretest probability of the disease.
    pub pretest_probability: f64,
    /// Sum of the log likelihood ratios of all contributions.
    pub composite_log_ratio: f64,
    /// Posterior probability over the candidate set.
    pub posterior_probability: f64,
    /// Per-term breakdown, observed terms first, then excluded terms.
    pub phenotype: Vec<TermContribution>,
    /// Best linked gene, when genotypes were supplied and the disease has
    /// linked genes.
    pub genotype: Option<GeneContribution>,
}

/// The ranked outcome of one case evaluation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AnalysisResults {
    /// All corpus diseases, best candidate first.
    pub ranking: Vec<DiseaseScore>,
    /// Per-case key/value metadata.
    pub metadata: IndexMap<String, String>,
}

struct GenotypeInput<'a> {
    rates: &'a BackgroundGeneRates,
    map: &'a GenotypeMap,
}

/// Evaluates cases against shared, immutable corpus state.
pub struct CaseEvaluator<'a> {
    ontology: &'a Ontology,
    corpus: &'a DiseaseCorpus,
    background: &'a BackgroundIndex,
    gene_index: &'a GeneDiseaseIndex,
    genotypes: Option<GenotypeInput<'a>>,
    pretest: Option<&'a IndexMap<DiseaseId, f64>>,
}

impl<'a> CaseEvaluator<'a> {
    /// Creates a phenotype-only evaluator.
    pub fn new(
        ontology: &'a Ontology,
        corpus: &'a DiseaseCorpus,
        background: &'a BackgroundIndex,
        gene_index: &'a GeneDiseaseIndex,
    ) -> Self {
        Self {
            ontology,
            corpus,
            background,
            gene_index,
            genotypes: None,
            pretest: None,
        }
    }

    /// Adds genotype evidence to the evaluation.
    pub fn with_genotypes(
        mut self,
        rates: &'a BackgroundGeneRates,
        map: &'a GenotypeMap,
    ) -> Self {
        self.genotypes = Some(GenotypeInput { rates, map });
        self
    }

    /// Overrides the uniform pretest probability for the given diseases.
    pub fn with_pretest_probabilities(mut self, pretest: &'a IndexMap<DiseaseId, f64>) -> Self {
        self.pretest = Some(pretest);
        self
    }

    /// Ranks all corpus diseases for the case.
    ///
    /// Fails on unknown terms, overlapping observed/excluded sets, and any
    /// non-finite intermediate value.
    pub fn evaluate(&self, case: &CaseQuery) -> Result<AnalysisResults, Error> {
        if self.corpus.is_empty() {
            return Err(Error::InconsistentInputs(
                "disease corpus is empty".to_string(),
            ));
        }

        let observed = self.canonicalize(&case.observed)?;
        let excluded = self.canonicalize(&case.excluded)?;
        for term in &excluded {
            if observed.contains(term) {
                return Err(Error::InconsistentInputs(format!(
                    "term {} is both observed and excluded",
                    term
                )));
            }
        }

        if let Some(input) = &self.genotypes {
            for gene in input.map.genes() {
                if !self.gene_index.contains_gene(gene) {
                    tracing::warn!(
                        "genotype entry for {} without gene-disease links; ignored",
                        gene
                    );
                }
            }
        }

        let records: Vec<&DiseaseRecord> = self.corpus.iter().collect();
        let mut scores = records
            .par_iter()
            .map(|record| self.score_disease(record, &observed, &excluded))
            .collect::<Result<Vec<_>, Error>>()?;

        let uniform_prior = 1.0 / self.corpus.len() as f64;
        for score in scores.iter_mut() {
            let prior = self
                .pretest
                .and_then(|m| m.get(&score.disease_id))
                .copied()
                .unwrap_or(uniform_prior);
            if !(prior.is_finite() && prior > 0.0) {
                return Err(Error::InconsistentInputs(format!(
                    "pretest probability for {} must be positive, got {}",
                    score.disease_id, prior
                )));
            }
            score.pretest_probability = prior;
        }

        // Posteriors via log-sum-exp so extreme composite ratios cannot
        // underflow.
        let log_unnormalized: Vec<f64> = scores
            .iter()
            .map(|s| s.pretest_probability.ln() + s.composite_log_ratio)
            .collect();
        let max_log = log_unnormalized
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let total: f64 = log_unnormalized.iter().map(|l| (l - max_log).exp()).sum();
        Error::check_finite(total, "posterior normalization")?;
        for (score, log) in scores.iter_mut().zip(&log_unnormalized) {
            score.posterior_probability =
                Error::check_finite((log - max_log).exp() / total, "posterior probability")?;
        }

        scores.sort_by(|a, b| {
            b.posterior_probability
                .total_cmp(&a.posterior_probability)
                .then_with(|| a.disease_id.cmp(&b.disease_id))
        });

        let mut metadata = IndexMap::new();
        metadata.insert("sample_name".to_string(), case.sample_name.clone());
        metadata.insert(
            "ontology_version".to_string(),
            self.ontology.version().unwrap_or("n/a").to_string(),
        );
        metadata.insert("n_diseases".to_string(), self.corpus.len().to_string());
        metadata.insert("n_observed_terms".to_string(), observed.len().to_string());
        metadata.insert("n_excluded_terms".to_string(), excluded.len().to_string());
        if let Some(input) = &self.genotypes {
            metadata.insert(
                "n_genes_with_variants".to_string(),
                input.map.len().to_string(),
            );
        }

        Ok(AnalysisResults {
            ranking: scores,
            metadata,
        })
    }

    /// Resolves every term to its primary ID, dropping duplicates while
    /// keeping first-seen order.
    fn canonicalize(&self, terms: &[TermId]) -> Result<Vec<TermId>, Error> {
        let mut result = Vec::with_capacity(terms.len());
        for &term in terms {
            let primary = self
                .ontology
                .primary_id(term)
                .ok_or(Error::UnknownTerm(term))?;
            if !result.contains(&primary) {
                result.push(primary);
            }
        }
        Ok(result)
    }

    fn score_disease(
        &self,
        record: &DiseaseRecord,
        observed: &[TermId],
        excluded: &[TermId],
    ) -> Result<DiseaseScore, Error> {
        let pheno = PhenotypeLikelihood::new(self.ontology, self.background);
        let mut phenotype = Vec::with_capacity(observed.len() + excluded.len());
        let mut composite_log_ratio = 0.0;
        for &term in observed {
            let result = pheno.observed(term, record)?;
            composite_log_ratio += result.log_ratio();
            phenotype.push(TermContribution {
                term: result.term,
                term_name: self.ontology.name(result.term).unwrap_or("").to_string(),
                ratio: result.ratio,
                log_ratio: result.log_ratio(),
                match_type: result.match_type,
            });
        }
        for &term in excluded {
            let result = pheno.excluded(term, record)?;
            composite_log_ratio += result.log_ratio();
            phenotype.push(TermContribution {
                term: result.term,
                term_name: self.ontology.name(result.term).unwrap_or("").to_string(),
                ratio: result.ratio,
                log_ratio: result.log_ratio(),
                match_type: result.match_type,
            });
        }

        let genotype = match &self.genotypes {
            Some(input) => {
                let engine = GenotypeLikelihood::new(input.rates);
                let linked = self.gene_index.genes_of(record.id());
                engine
                    .evaluate(record, linked, input.map)?
                    .map(|result| GeneContribution {
                        gene: result.gene,
                        gene_symbol: self
                            .gene_index
                            .symbol(result.gene)
                            .unwrap_or("")
                            .to_string(),
                        ratio: result.ratio,
                        log_ratio: result.log_ratio(),
                        category: result.category,
                        observed_alleles: result.observed_alleles,
                    })
            }
            None => None,
        };
        if let Some(contribution) = &genotype {
            composite_log_ratio += contribution.log_ratio;
        }

        Error::check_finite(
            composite_log_ratio,
            &format!("composite log ratio of {}", record.id()),
        )?;

        Ok(DiseaseScore {
            disease_id: record.id().clone(),
            disease_name: record.name().to_string(),
            pretest_probability: 0.0,
            composite_log_ratio,
            posterior_probability: 0.0,
            phenotype,
            genotype,
        })
    }
}

#[cfg(test)]
mod test {
    use indexmap::{IndexMap, IndexSet};
    use pretty_assertions::assert_eq;

    use crate::background::BackgroundIndex;
    use crate::corpus::{
        AnnotatedTerm, DiseaseCorpus, DiseaseId, DiseaseRecord, ModeOfInheritance,
    };
    use crate::error::Error;
    use crate::genes::{BackgroundGeneRates, GeneDiseaseIndex, GeneDiseaseRow, GeneId};
    use crate::likelihood::genotype::{GeneGenotype, GenotypeMap, ObservedVariant};
    use crate::ontology::{Ontology, OntologyBuilder, TermId, PHENOTYPIC_ABNORMALITY};

    use super::{CaseEvaluator, CaseQuery};

    fn hp(n: u32) -> TermId {
        TermId::from_u32(n)
    }

    fn ontology() -> Ontology {
        OntologyBuilder::new()
            .version("2024-01-01")
            .term(PHENOTYPIC_ABNORMALITY, "Phenotypic abnormality", &[])
            .term(hp(10), "Abnormality of the eye", &[PHENOTYPIC_ABNORMALITY])
            .term(hp(11), "Cataract", &[hp(10)])
            .term(hp(20), "Abnormality of the ear", &[PHENOTYPIC_ABNORMALITY])
            .term(hp(21), "Hearing impairment", &[hp(20)])
            .term(hp(30), "Abnormality of the heart", &[PHENOTYPIC_ABNORMALITY])
            .build()
            .unwrap()
    }

    fn disease(
        id: &str,
        annotations: &[(TermId, f64)],
        mois: &[ModeOfInheritance],
    ) -> DiseaseRecord {
        DiseaseRecord::new(
            DiseaseId::from(id),
            id,
            annotations
                .iter()
                .map(|&(term, frequency)| AnnotatedTerm { term, frequency })
                .collect(),
            mois.iter().copied().collect::<IndexSet<_>>(),
        )
    }

    fn corpus() -> DiseaseCorpus {
        let mut corpus = DiseaseCorpus::new();
        corpus.insert(disease("OMIM:3", &[(hp(11), 1.0)], &[]));
        corpus.insert(disease("OMIM:1", &[(hp(21), 1.0)], &[]));
        corpus.insert(disease("OMIM:2", &[(hp(11), 0.5), (hp(21), 0.5)], &[]));
        corpus
    }

    fn query(observed: &[TermId], excluded: &[TermId]) -> CaseQuery {
        CaseQuery {
            sample_name: "sample-1".to_string(),
            observed: observed.to_vec(),
            excluded: excluded.to_vec(),
        }
    }

    #[test]
    fn ranking_covers_corpus_and_posteriors_normalize() {
        let onto = ontology();
        let corpus = corpus();
        let index = BackgroundIndex::build(&onto, &corpus).unwrap();
        let genes = GeneDiseaseIndex::from_rows(&[]);
        let evaluator = CaseEvaluator::new(&onto, &corpus, &index, &genes);

        let results = evaluator
            .evaluate(&query(&[hp(11)], &[hp(21)]))
            .unwrap();
        assert_eq!(results.ranking.len(), 3);
        let total: f64 = results
            .ranking
            .iter()
            .map(|s| s.posterior_probability)
            .sum();
        assert!((total - 1.0).abs() < 1e-9, "total = {}", total);
        for score in &results.ranking {
            assert!((0.0..=1.0).contains(&score.posterior_probability));
            assert_eq!(score.phenotype.len(), 2);
        }
        // Cataract observed, hearing impairment excluded: the pure
        // cataract disease must come first.
        assert_eq!(results.ranking[0].disease_id, DiseaseId::from("OMIM:3"));
        assert_eq!(results.metadata["sample_name"], "sample-1");
        assert_eq!(results.metadata["n_diseases"], "3");
        assert_eq!(results.metadata["ontology_version"], "2024-01-01");
    }

    #[test]
    fn evaluation_is_deterministic() {
        let onto = ontology();
        let corpus = corpus();
        let index = BackgroundIndex::build(&onto, &corpus).unwrap();
        let genes = GeneDiseaseIndex::from_rows(&[]);
        let evaluator = CaseEvaluator::new(&onto, &corpus, &index, &genes);

        let case = query(&[hp(11), hp(21)], &[]);
        let first = evaluator.evaluate(&case).unwrap();
        let second = evaluator.evaluate(&case).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn ties_are_broken_by_disease_id() {
        let onto = ontology();
        let mut corpus = DiseaseCorpus::new();
        // Identical diseases, inserted in descending ID order.
        corpus.insert(disease("OMIM:9", &[(hp(11), 1.0)], &[]));
        corpus.insert(disease("OMIM:8", &[(hp(11), 1.0)], &[]));
        let index = BackgroundIndex::build(&onto, &corpus).unwrap();
        let genes = GeneDiseaseIndex::from_rows(&[]);
        let evaluator = CaseEvaluator::new(&onto, &corpus, &index, &genes);

        let results = evaluator.evaluate(&query(&[hp(11)], &[])).unwrap();
        let ids: Vec<_> = results
            .ranking
            .iter()
            .map(|s| s.disease_id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["OMIM:8", "OMIM:9"]);
        assert_eq!(
            results.ranking[0].posterior_probability,
            results.ranking[1].posterior_probability
        );
    }

    #[test]
    fn genotype_evidence_separates_equal_phenotypes() {
        let onto = ontology();
        let mut corpus = DiseaseCorpus::new();
        corpus.insert(disease(
            "OMIM:1",
            &[(hp(11), 1.0)],
            &[ModeOfInheritance::AutosomalDominant],
        ));
        corpus.insert(disease(
            "OMIM:2",
            &[(hp(11), 1.0)],
            &[ModeOfInheritance::AutosomalDominant],
        ));
        let index = BackgroundIndex::build(&onto, &corpus).unwrap();
        let genes = GeneDiseaseIndex::from_rows(&[
            GeneDiseaseRow {
                ncbi_gene_id: 100,
                gene_symbol: "AAA".into(),
                database_id: "OMIM:1".into(),
            },
            GeneDiseaseRow {
                ncbi_gene_id: 200,
                gene_symbol: "BBB".into(),
                database_id: "OMIM:2".into(),
            },
        ]);
        let rates = BackgroundGeneRates::from_pairs(&[]);
        let (map, _) = GenotypeMap::from_gene_genotypes(
            vec![GeneGenotype {
                gene_id: GeneId::from_u32(200),
                gene_symbol: "BBB".into(),
                variants: vec![ObservedVariant {
                    pathogenicity: 0.95,
                    frequency: 0.0001,
                    filter_pass: true,
                    allele_count: 1,
                }],
            }],
            true,
        );
        let evaluator =
            CaseEvaluator::new(&onto, &corpus, &index, &genes).with_genotypes(&rates, &map);

        let results = evaluator.evaluate(&query(&[hp(11)], &[])).unwrap();
        assert_eq!(results.ranking[0].disease_id, DiseaseId::from("OMIM:2"));
        assert!(
            results.ranking[0].posterior_probability
                > results.ranking[1].posterior_probability
        );
        let top_gene = results.ranking[0].genotype.as_ref().unwrap();
        assert_eq!(top_gene.gene_symbol, "BBB");
        assert_eq!(results.metadata["n_genes_with_variants"], "1");
    }

    #[test]
    fn empty_observed_with_excluded_terms_still_ranks() {
        let onto = ontology();
        let corpus = corpus();
        let index = BackgroundIndex::build(&onto, &corpus).unwrap();
        let genes = GeneDiseaseIndex::from_rows(&[]);
        let evaluator = CaseEvaluator::new(&onto, &corpus, &index, &genes);

        let results = evaluator.evaluate(&query(&[], &[hp(11)])).unwrap();
        assert_eq!(results.ranking.len(), 3);
        let total: f64 = results
            .ranking
            .iter()
            .map(|s| s.posterior_probability)
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn overlapping_observed_and_excluded_is_rejected() {
        let onto = ontology();
        let corpus = corpus();
        let index = BackgroundIndex::build(&onto, &corpus).unwrap();
        let genes = GeneDiseaseIndex::from_rows(&[]);
        let evaluator = CaseEvaluator::new(&onto, &corpus, &index, &genes);

        let result = evaluator.evaluate(&query(&[hp(11)], &[hp(11)]));
        assert!(matches!(result, Err(Error::InconsistentInputs(_))));
    }

    #[test]
    fn unknown_term_is_rejected() {
        let onto = ontology();
        let corpus = corpus();
        let index = BackgroundIndex::build(&onto, &corpus).unwrap();
        let genes = GeneDiseaseIndex::from_rows(&[]);
        let evaluator = CaseEvaluator::new(&onto, &corpus, &index, &genes);

        let result = evaluator.evaluate(&query(&[hp(9999)], &[]));
        assert_eq!(result, Err(Error::UnknownTerm(hp(9999))));
    }

    #[test]
    fn duplicate_observations_count_once() {
        let onto = ontology();
        let corpus = corpus();
        let index = BackgroundIndex::build(&onto, &corpus).unwrap();
        let genes = GeneDiseaseIndex::from_rows(&[]);
        let evaluator = CaseEvaluator::new(&onto, &corpus, &index, &genes);

        let deduplicated = evaluator.evaluate(&query(&[hp(11)], &[])).unwrap();
        let duplicated = evaluator
            .evaluate(&query(&[hp(11), hp(11)], &[]))
            .unwrap();
        assert_eq!(deduplicated, duplicated);
    }

    #[test]
    fn pretest_override_changes_the_ranking() {
        let onto = ontology();
        let mut corpus = DiseaseCorpus::new();
        corpus.insert(disease("OMIM:1", &[(hp(11), 1.0)], &[]));
        corpus.insert(disease("OMIM:2", &[(hp(11), 1.0)], &[]));
        let index = BackgroundIndex::build(&onto, &corpus).unwrap();
        let genes = GeneDiseaseIndex::from_rows(&[]);

        let mut pretest = IndexMap::new();
        pretest.insert(DiseaseId::from("OMIM:2"), 0.9);
        pretest.insert(DiseaseId::from("OMIM:1"), 0.1);
        let evaluator = CaseEvaluator::new(&onto, &corpus, &index, &genes)
            .with_pretest_probabilities(&pretest);

        let results = evaluator.evaluate(&query(&[hp(11)], &[])).unwrap();
        assert_eq!(results.ranking[0].disease_id, DiseaseId::from("OMIM:2"));
        assert!((results.ranking[0].posterior_probability - 0.9).abs() < 1e-9);
    }
}
