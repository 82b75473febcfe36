//! Per-term phenotype likelihood ratios.
//!
//! For a queried term and a candidate disease, the ratio compares the
//! frequency of the term among patients with the disease against its
//! background frequency in the corpus.  When the disease does not annotate
//! the query directly, the foreground frequency is established by a fuzzy
//! match over the ontology (see [`PhenotypeLikelihood::observed`]).

use crate::background::{BackgroundIndex, FALSE_POSITIVE_FLOOR};
use crate::corpus::DiseaseRecord;
use crate::error::Error;
use crate::ontology::{Ontology, TermGroup, TermId, PHENOTYPIC_ABNORMALITY};

/// How the foreground frequency of a query term was established.
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
pub enum MatchType {
    /// The disease annotates the query term directly.
    Exact,
    /// The disease annotates one or more descendants of the query term;
    /// their mean frequency is used.
    DescendantAnnotated,
    /// The query term is more specific than an annotated term; the
    /// frequency is penalized by the distance to the first shared
    /// informative ancestor.
    AncestorAnnotated,
    /// Query and disease share no informative ancestor; the query is
    /// treated as a false-positive observation.
    Unrelated,
    /// The query term was reported as excluded in the proband.
    Excluded,
}

/// A single term's likelihood ratio against one disease.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TermLikelihood {
    /// The (canonicalized) query term.
    pub term: TermId,
    /// The likelihood ratio; `> 1` favors the disease.
    pub ratio: f64,
    /// How the foreground frequency was matched.
    pub match_type: MatchType,
}

impl TermLikelihood {
    /// Natural logarithm of the ratio.
    pub fn log_ratio(&self) -> f64 {
        self.ratio.ln()
    }
}

/// Computes phenotype likelihood ratios against shared, immutable corpus
/// state.
pub struct PhenotypeLikelihood<'a> {
    ontology: &'a Ontology,
    background: &'a BackgroundIndex,
}

impl<'a> PhenotypeLikelihood<'a> {
    /// Creates the calculator on top of the ontology and background index.
    pub fn new(ontology: &'a Ontology, background: &'a BackgroundIndex) -> Self {
        Self {
            ontology,
            background,
        }
    }

    /// Likelihood ratio of observing `query` in a patient with `disease`.
    ///
    /// The result is strictly positive and finite; foreground frequencies
    /// of zero are lifted to the false-positive floor.
    pub fn observed(&self, query: TermId, disease: &DiseaseRecord) -> Result<TermLikelihood, Error> {
        let query = self
            .ontology
            .primary_id(query)
            .ok_or(Error::UnknownTerm(query))?;
        let background = self.background.frequency(self.ontology, query)?;
        let (frequency, match_type) = self.frequency_in_disease(query, disease);
        let numerator = frequency.max(FALSE_POSITIVE_FLOOR);
        let ratio = Error::check_finite(numerator / background, "phenotype likelihood ratio")?;
        Ok(TermLikelihood {
            term: query,
            ratio,
            match_type,
        })
    }

    /// Likelihood ratio of `query` being explicitly absent from the
    /// patient, under `disease`.
    ///
    /// Computed symmetrically to [`PhenotypeLikelihood::observed`]:
    /// `(1 - foreground) / (1 - background)`, with both sides clamped away
    /// from 0 and 1.
    pub fn excluded(&self, query: TermId, disease: &DiseaseRecord) -> Result<TermLikelihood, Error> {
        let query = self
            .ontology
            .primary_id(query)
            .ok_or(Error::UnknownTerm(query))?;
        let background = self.background.frequency(self.ontology, query)?;
        let (frequency, _) = self.frequency_in_disease(query, disease);
        let numerator =
            (1.0 - frequency).clamp(FALSE_POSITIVE_FLOOR, 1.0 - FALSE_POSITIVE_FLOOR);
        let denominator =
            (1.0 - background).clamp(FALSE_POSITIVE_FLOOR, 1.0 - FALSE_POSITIVE_FLOOR);
        let ratio =
            Error::check_finite(numerator / denominator, "excluded phenotype likelihood ratio")?;
        Ok(TermLikelihood {
            term: query,
            ratio,
            match_type: MatchType::Excluded,
        })
    }

    /// The frequency of `query` among patients with `disease`.
    ///
    /// Tried in order, first match wins:
    ///
    /// 1. the disease annotates `query` directly: the recorded frequency;
    /// 2. the disease annotates one or more terms below `query`: every such
    ///    patient also has `query`, so the mean of their frequencies;
    /// 3. the disease annotates a term above `query`: walk from `query`
    ///    towards the root and find the first ancestor that lies in the
    ///    disease's induced term set.  A hit at BFS position `i` yields
    ///    `1 / (1 + ln i)`, penalizing imprecision with distance; a hit at
    ///    the root carries no information and falls through;
    /// 4. otherwise the observation is treated as a false positive.
    fn frequency_in_disease(&self, query: TermId, disease: &DiseaseRecord) -> (f64, MatchType) {
        if let Some(frequency) = disease.frequency_of(query) {
            return (frequency, MatchType::Exact);
        }

        let mut n = 0usize;
        let mut cumulative = 0.0;
        for annotation in disease.phenotypes() {
            if annotation.term != query && self.ontology.is_subclass(annotation.term, query) {
                cumulative += annotation.frequency;
                n += 1;
            }
        }
        if n > 0 {
            return (cumulative / n as f64, MatchType::DescendantAnnotated);
        }

        let has_broader_annotation = disease
            .phenotypes()
            .iter()
            .any(|a| self.ontology.is_subclass(query, a.term));
        if has_broader_annotation {
            let mut disease_ancestors = TermGroup::new();
            for annotation in disease.phenotypes() {
                if let Some(ancestors) = self.ontology.ancestors(annotation.term) {
                    disease_ancestors.extend_from(ancestors);
                }
            }
            for (i, candidate) in self.ontology.path_to_root(query).into_iter().enumerate() {
                if disease_ancestors.contains(&candidate) {
                    if candidate == PHENOTYPIC_ABNORMALITY {
                        // Only the root is shared; that carries no
                        // information about the organ system.
                        break;
                    }
                    if i == 0 {
                        return (1.0, MatchType::AncestorAnnotated);
                    }
                    return (1.0 / (1.0 + (i as f64).ln()), MatchType::AncestorAnnotated);
                }
            }
        }

        (FALSE_POSITIVE_FLOOR, MatchType::Unrelated)
    }
}
