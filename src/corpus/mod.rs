//! The disease corpus: immutable disease records with their phenotype
//! annotations and inheritance modes.

use indexmap::{IndexMap, IndexSet};

use crate::ontology::TermId;

pub mod load;

/// Stable identifier of a disease, e.g. `OMIM:154700`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DiseaseId(String);

impl DiseaseId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DiseaseId {
    fn from(s: &str) -> Self {
        DiseaseId(s.to_string())
    }
}

impl From<String> for DiseaseId {
    fn from(s: String) -> Self {
        DiseaseId(s)
    }
}

impl std::fmt::Display for DiseaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Enumeration for modes of inheritance.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Clone,
    Copy,
    Debug,
    strum::EnumString,
    strum::Display,
)]
pub enum ModeOfInheritance {
    /// Autosomal dominant inheritance (HP:0000006).
    AutosomalDominant,
    /// Autosomal recessive inheritance (HP:0000007).
    AutosomalRecessive,
    /// X-linked dominant inheritance (HP:0001419).
    XLinkedDominant,
    /// X-linked recessive inheritance (HP:0001423).
    XLinkedRecessive,
    /// Y-linked inheritance (HP:0001450).
    YLinked,
    /// Mitochondrial inheritance (HP:0001427).
    Mitochondrial,
}

impl ModeOfInheritance {
    /// Allow parsing of `ModeOfInheritance` from HPO ID.
    pub fn from_hpo_id(hpo_id: &str) -> Option<Self> {
        match hpo_id {
            "HP:0000006" | "HP:0012275" => Some(Self::AutosomalDominant),
            "HP:0000007" => Some(Self::AutosomalRecessive),
            "HP:0001419" => Some(Self::XLinkedDominant),
            "HP:0001423" => Some(Self::XLinkedRecessive),
            "HP:0001450" => Some(Self::YLinked),
            "HP:0001427" => Some(Self::Mitochondrial),
            _ => None,
        }
    }

    /// The number of pathogenic alleles expected in an affected individual
    /// under this mode of inheritance.
    pub fn expected_pathogenic_alleles(&self) -> f64 {
        match self {
            ModeOfInheritance::AutosomalRecessive | ModeOfInheritance::XLinkedRecessive => 2.0,
            _ => 1.0,
        }
    }
}

/// One phenotype annotation of a disease.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnnotatedTerm {
    /// The annotated term (a phenotypic abnormality).
    pub term: TermId,
    /// Fraction of patients with the disease that show the term, in `[0, 1]`.
    /// Sources without an explicit frequency default to 1.0.
    pub frequency: f64,
}

/// A single disease with its phenotype annotations.
#[derive(Debug, Clone)]
pub struct DiseaseRecord {
    id: DiseaseId,
    name: String,
    phenotypes: Vec<AnnotatedTerm>,
    modes_of_inheritance: IndexSet<ModeOfInheritance>,
}

impl DiseaseRecord {
    /// Creates a new disease record.
    pub fn new(
        id: DiseaseId,
        name: &str,
        phenotypes: Vec<AnnotatedTerm>,
        modes_of_inheritance: IndexSet<ModeOfInheritance>,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            phenotypes,
            modes_of_inheritance,
        }
    }

    /// The disease identifier.
    pub fn id(&self) -> &DiseaseId {
        &self.id
    }

    /// The disease name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The phenotype annotations, in the order they were loaded.
    pub fn phenotypes(&self) -> &[AnnotatedTerm] {
        &self.phenotypes
    }

    /// The set of annotated modes of inheritance.
    pub fn modes_of_inheritance(&self) -> &IndexSet<ModeOfInheritance> {
        &self.modes_of_inheritance
    }

    /// The frequency recorded for `term` if the disease annotates it
    /// directly.
    pub fn frequency_of(&self, term: TermId) -> Option<f64> {
        self.phenotypes
            .iter()
            .find(|a| a.term == term)
            .map(|a| a.frequency)
    }

    /// The distinct expected pathogenic allele counts implied by the
    /// annotated modes of inheritance.
    ///
    /// A record without any recognized mode of inheritance is treated as
    /// dominant-like, i.e. one expected allele.
    pub fn expected_allele_counts(&self) -> Vec<f64> {
        let mut counts: Vec<f64> = Vec::with_capacity(2);
        for moi in &self.modes_of_inheritance {
            let expected = moi.expected_pathogenic_alleles();
            if !counts.contains(&expected) {
                counts.push(expected);
            }
        }
        if counts.is_empty() {
            counts.push(1.0);
        }
        counts
    }
}

/// The full disease corpus, iterable in load order and addressable by ID.
#[derive(Debug, Default)]
pub struct DiseaseCorpus {
    records: IndexMap<DiseaseId, DiseaseRecord>,
}

impl DiseaseCorpus {
    /// Creates an empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of diseases in the corpus.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the corpus contains no diseases.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Adds a record, replacing any previous record with the same ID.
    pub fn insert(&mut self, record: DiseaseRecord) {
        self.records.insert(record.id().clone(), record);
    }

    /// Looks up a disease by ID.
    pub fn get(&self, id: &DiseaseId) -> Option<&DiseaseRecord> {
        self.records.get(id)
    }

    /// Iterates over all records in load order.
    pub fn iter(&self) -> impl Iterator<Item = &DiseaseRecord> {
        self.records.values()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mode_of_inheritance_from_hpo_id() {
        assert_eq!(
            ModeOfInheritance::from_hpo_id("HP:0000006"),
            Some(ModeOfInheritance::AutosomalDominant)
        );
        assert_eq!(
            ModeOfInheritance::from_hpo_id("HP:0000007"),
            Some(ModeOfInheritance::AutosomalRecessive)
        );
        assert_eq!(
            ModeOfInheritance::from_hpo_id("HP:0001423"),
            Some(ModeOfInheritance::XLinkedRecessive)
        );
        assert_eq!(ModeOfInheritance::from_hpo_id("HP:0000000"), None);
    }

    #[rstest::rstest]
    #[case(ModeOfInheritance::AutosomalDominant, 1.0)]
    #[case(ModeOfInheritance::AutosomalRecessive, 2.0)]
    #[case(ModeOfInheritance::XLinkedDominant, 1.0)]
    #[case(ModeOfInheritance::XLinkedRecessive, 2.0)]
    #[case(ModeOfInheritance::Mitochondrial, 1.0)]
    fn expected_pathogenic_alleles(#[case] moi: ModeOfInheritance, #[case] expected: f64) {
        assert_eq!(moi.expected_pathogenic_alleles(), expected);
    }

    #[test]
    fn expected_allele_counts_defaults_to_dominant_like() {
        let record = DiseaseRecord::new(
            DiseaseId::from("OMIM:100000"),
            "No MoI disease",
            vec![],
            IndexSet::new(),
        );
        assert_eq!(record.expected_allele_counts(), vec![1.0]);
    }

    #[test]
    fn expected_allele_counts_deduplicates() {
        let mut mois = IndexSet::new();
        mois.insert(ModeOfInheritance::AutosomalDominant);
        mois.insert(ModeOfInheritance::XLinkedDominant);
        mois.insert(ModeOfInheritance::AutosomalRecessive);
        let record = DiseaseRecord::new(DiseaseId::from("OMIM:100001"), "Mixed", vec![], mois);
        assert_eq!(record.expected_allele_counts(), vec![1.0, 2.0]);
    }

    #[test]
    fn frequency_of_direct_annotation() {
        let record = DiseaseRecord::new(
            DiseaseId::from("OMIM:100002"),
            "Annotated",
            vec![AnnotatedTerm {
                term: TermId::from_u32(250),
                frequency: 0.75,
            }],
            IndexSet::new(),
        );
        assert_eq!(record.frequency_of(TermId::from_u32(250)), Some(0.75));
        assert_eq!(record.frequency_of(TermId::from_u32(251)), None);
    }

    #[test]
    fn corpus_iteration_preserves_load_order() {
        let mut corpus = DiseaseCorpus::new();
        for id in ["OMIM:3", "OMIM:1", "OMIM:2"] {
            corpus.insert(DiseaseRecord::new(
                DiseaseId::from(id),
                id,
                vec![],
                IndexSet::new(),
            ));
        }
        let ids: Vec<_> = corpus.iter().map(|r| r.id().as_str().to_string()).collect();
        assert_eq!(ids, vec!["OMIM:3", "OMIM:1", "OMIM:2"]);
    }
}
