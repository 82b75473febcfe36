//! Background frequencies of phenotype terms across the disease corpus.
//!
//! For every term the index holds the fraction of corpus diseases that are
//! annotated with the term, directly or through ontology propagation: a
//! disease annotated with a specific finding implicitly carries every
//! ancestor of that finding, and the corpus is counted accordingly so that
//! likelihood-ratio numerators and denominators share one semantics.

use std::collections::HashMap;

use crate::corpus::DiseaseCorpus;
use crate::error::Error;
use crate::ontology::{Ontology, TermId};

pub mod cli;

/// Probability assigned to observing a term that is (practically) never
/// seen in the corpus.  Lookups never return less than this: a term that
/// was never annotated is more plausibly a false-positive observation than
/// truly impossible, and likelihood-ratio denominators must stay away from
/// zero.
pub const FALSE_POSITIVE_FLOOR: f64 = 5e-6;

/// Background frequency per ontology term, built once per corpus and
/// read-only afterwards.
#[derive(Debug)]
pub struct BackgroundIndex {
    frequencies: HashMap<TermId, f64>,
}

impl BackgroundIndex {
    /// Computes the index from the corpus by propagating each annotation
    /// to all its ancestors and normalizing by the corpus size.
    ///
    /// Every term of the ontology receives an entry, so later lookups of
    /// valid terms cannot miss.
    pub fn build(ontology: &Ontology, corpus: &DiseaseCorpus) -> Result<Self, Error> {
        if corpus.is_empty() {
            return Err(Error::InconsistentInputs(
                "cannot build background frequencies from an empty corpus".to_string(),
            ));
        }

        let mut frequencies: HashMap<TermId, f64> =
            ontology.term_ids().map(|t| (t, 0.0)).collect();
        for record in corpus.iter() {
            for annotation in record.phenotypes() {
                let ancestors = ontology
                    .ancestors(annotation.term)
                    .ok_or(Error::UnknownTerm(annotation.term))?;
                for ancestor in ancestors {
                    *frequencies.entry(ancestor).or_insert(0.0) += annotation.frequency;
                }
            }
        }

        let num_diseases = corpus.len() as f64;
        for value in frequencies.values_mut() {
            *value /= num_diseases;
        }

        tracing::debug!(
            "computed background frequencies for {} terms over {} diseases",
            frequencies.len(),
            corpus.len()
        );
        Ok(Self { frequencies })
    }

    /// The background frequency of `term`, in
    /// `[FALSE_POSITIVE_FLOOR, 1.0]`.
    ///
    /// The term is resolved through the alias table first; terms unknown
    /// to the ontology fail with [`Error::UnknownTerm`], and terms that
    /// are missing from the index despite being valid fail with
    /// [`Error::MissingBackground`] (a construction bug, never silently
    /// zero).
    pub fn frequency(&self, ontology: &Ontology, term: TermId) -> Result<f64, Error> {
        let primary = ontology.primary_id(term).ok_or(Error::UnknownTerm(term))?;
        let raw = self
            .frequencies
            .get(&primary)
            .copied()
            .ok_or(Error::MissingBackground(primary))?;
        Ok(raw.max(FALSE_POSITIVE_FLOOR))
    }

    /// Number of terms with an entry.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Returns `true` if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Iterates over `(term, raw frequency)` entries in unspecified order.
    ///
    /// Raw values are pre-clamp; use [`BackgroundIndex::frequency`] for
    /// scoring.
    pub fn iter(&self) -> impl Iterator<Item = (TermId, f64)> + '_ {
        self.frequencies.iter().map(|(t, f)| (*t, *f))
    }
}
