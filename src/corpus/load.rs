//! Loading of the ontology term table and the disease annotation table.

use std::path::Path;

use indexmap::{IndexMap, IndexSet};

use crate::ontology::{Ontology, OntologyBuilder, TermId};

use super::{AnnotatedTerm, DiseaseCorpus, DiseaseId, DiseaseRecord, ModeOfInheritance};

/// Data structure for representing a row of the ontology term table.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TermRow {
    /// The term ID, e.g. `HP:0000118`.
    pub term_id: String,
    /// The term name.
    pub name: String,
    /// Pipe-separated list of direct parent term IDs; empty for the root.
    pub parents: String,
    /// Pipe-separated list of alternate (obsolete) term IDs; may be empty.
    pub alt_ids: String,
}

/// Read the ontology term table (TSV with `term_id`, `name`, `parents`,
/// `alt_ids` columns) and build the [`Ontology`].
///
/// Lines starting with `#` are comments; a `#version=...` comment is
/// recorded as the ontology version.
///
/// # Errors
///
/// In the case that the file could not be read or the term graph is
/// invalid (duplicate IDs, unknown parents, cycles, unrooted terms).
pub fn load_ontology<P: AsRef<Path>>(path: &P) -> Result<Ontology, anyhow::Error> {
    let content = std::fs::read_to_string(path.as_ref())
        .map_err(|e| anyhow::anyhow!("error reading {}: {}", path.as_ref().display(), e))?;

    let mut builder = OntologyBuilder::new();
    for line in content.lines() {
        if let Some(version) = line.strip_prefix("#version=") {
            builder = builder.version(version.trim());
        }
    }

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .comment(Some(b'#'))
        .from_reader(content.as_bytes());
    for result in rdr.deserialize() {
        let row: TermRow = result?;
        let id = TermId::try_from(row.term_id.as_str())?;
        let parents = split_term_list(&row.parents)?;
        let alt_ids = split_term_list(&row.alt_ids)?;
        builder = builder.term_with_alternates(id, &row.name, &parents, &alt_ids);
    }

    builder.build()
}

fn split_term_list(raw: &str) -> Result<Vec<TermId>, anyhow::Error> {
    raw.split('|')
        .filter(|s| !s.trim().is_empty())
        .map(|s| TermId::try_from(s.trim()))
        .collect()
}

/// Data structure for representing a row of the disease annotation table.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnnotationRow {
    /// Disease identifier, e.g. `OMIM:154700`.
    pub database_id: String,
    /// Disease name.
    pub disease_name: String,
    /// Annotated HPO term ID.
    pub hpo_id: String,
    /// Annotation frequency in `[0, 1]`; empty means 1.0.
    pub frequency: Option<f64>,
    /// Annotation aspect; `P` for phenotypic abnormality, `I` for
    /// inheritance.
    pub aspect: String,
}

/// Read the disease annotation table (TSV) and build the corpus.
///
/// Phenotype rows (`aspect == "P"`) become [`AnnotatedTerm`]s after alias
/// resolution against the ontology; inheritance rows (`aspect == "I"`)
/// feed the mode-of-inheritance set.  Rows with terms unknown to the
/// ontology are skipped with a warning, and diseases that end up without
/// any phenotypic abnormality are dropped from the corpus.
///
/// # Errors
///
/// In the case that the file could not be read or a frequency is outside
/// `[0, 1]`.
pub fn load_corpus<P: AsRef<Path>>(
    path: &P,
    ontology: &Ontology,
) -> Result<DiseaseCorpus, anyhow::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .comment(Some(b'#'))
        .from_path(path.as_ref())?;

    type Partial = (String, Vec<AnnotatedTerm>, IndexSet<ModeOfInheritance>);
    let mut partial: IndexMap<DiseaseId, Partial> = IndexMap::new();

    for result in rdr.deserialize() {
        let row: AnnotationRow = result?;
        let disease_id = DiseaseId::from(row.database_id.as_str());
        let entry = partial.entry(disease_id).or_insert_with(|| {
            (row.disease_name.clone(), Vec::new(), IndexSet::new())
        });
        match row.aspect.as_str() {
            "P" => {
                let raw_term = TermId::try_from(row.hpo_id.as_str())?;
                let Some(term) = ontology.primary_id(raw_term) else {
                    tracing::warn!(
                        "skipping annotation of {} with unknown term {}",
                        &row.database_id,
                        raw_term
                    );
                    continue;
                };
                let frequency = row.frequency.unwrap_or(1.0);
                if !(0.0..=1.0).contains(&frequency) {
                    anyhow::bail!(
                        "annotation of {} with {} has frequency {} outside [0, 1]",
                        &row.database_id,
                        term,
                        frequency
                    );
                }
                if entry.1.iter().any(|a| a.term == term) {
                    tracing::warn!(
                        "ignoring duplicate annotation of {} with {}",
                        &row.database_id,
                        term
                    );
                    continue;
                }
                entry.1.push(AnnotatedTerm { term, frequency });
            }
            "I" => {
                if let Some(moi) = ModeOfInheritance::from_hpo_id(&row.hpo_id) {
                    entry.2.insert(moi);
                } else {
                    tracing::debug!(
                        "ignoring unrecognized inheritance term {} on {}",
                        &row.hpo_id,
                        &row.database_id
                    );
                }
            }
            _ => {
                tracing::debug!(
                    "ignoring annotation aspect {:?} on {}",
                    &row.aspect,
                    &row.database_id
                );
            }
        }
    }

    let mut corpus = DiseaseCorpus::new();
    for (id, (name, phenotypes, modes_of_inheritance)) in partial {
        if phenotypes.is_empty() {
            tracing::warn!("dropping disease {} without phenotypic abnormalities", &id);
            continue;
        }
        corpus.insert(DiseaseRecord::new(id, &name, phenotypes, modes_of_inheritance));
    }
    Ok(corpus)
}
