//! Gene identifiers, gene↔disease links, and the per-gene background
//! rate table for predicted-pathogenic variants.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;

use crate::corpus::DiseaseId;

/// Default expected count of called-pathogenic alleles in a gene for an
/// individual without a Mendelian disease in that gene, used when the
/// background rate table has no entry.
pub const DEFAULT_BACKGROUND_LAMBDA: f64 = 0.1;

/// NCBI (Entrez) gene identifier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct GeneId(u32);

impl GeneId {
    /// Creates a gene ID from the numeric NCBI identifier.
    pub const fn from_u32(id: u32) -> Self {
        GeneId(id)
    }

    /// The numeric NCBI identifier.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for GeneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NCBIGene:{}", self.0)
    }
}

/// Data structure for representing a row of the gene↔disease link table.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GeneDiseaseRow {
    /// NCBI gene ID.
    pub ncbi_gene_id: u32,
    /// Gene symbol.
    pub gene_symbol: String,
    /// Disease identifier, e.g. `OMIM:154700`.
    pub database_id: String,
}

/// Multimaps between genes and diseases plus the gene symbol table.
#[derive(Debug, Default)]
pub struct GeneDiseaseIndex {
    gene_to_diseases: IndexMap<GeneId, Vec<DiseaseId>>,
    disease_to_genes: IndexMap<DiseaseId, Vec<GeneId>>,
    symbols: IndexMap<GeneId, String>,
}

impl GeneDiseaseIndex {
    /// Builds the index from link rows, dropping duplicate pairs.
    pub fn from_rows(rows: &[GeneDiseaseRow]) -> Self {
        let mut index = GeneDiseaseIndex::default();
        for row in rows {
            let gene = GeneId::from_u32(row.ncbi_gene_id);
            let disease = DiseaseId::from(row.database_id.as_str());
            index
                .symbols
                .entry(gene)
                .or_insert_with(|| row.gene_symbol.clone());
            let diseases = index.gene_to_diseases.entry(gene).or_default();
            if !diseases.contains(&disease) {
                diseases.push(disease.clone());
            }
            let genes = index.disease_to_genes.entry(disease).or_default();
            if !genes.contains(&gene) {
                genes.push(gene);
            }
        }
        index
    }

    /// Read the gene↔disease link table (TSV with `ncbi_gene_id`,
    /// `gene_symbol`, `database_id` columns).
    ///
    /// # Errors
    ///
    /// In the case that the file could not be read.
    pub fn load<P: AsRef<Path>>(path: &P) -> Result<Self, anyhow::Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .comment(Some(b'#'))
            .from_path(path.as_ref())?;
        let mut rows = Vec::new();
        for result in rdr.deserialize() {
            let row: GeneDiseaseRow = result?;
            rows.push(row);
        }
        Ok(Self::from_rows(&rows))
    }

    /// The genes linked to `disease`, in link-table order.
    pub fn genes_of(&self, disease: &DiseaseId) -> &[GeneId] {
        self.disease_to_genes
            .get(disease)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The diseases linked to `gene`, in link-table order.
    pub fn diseases_of(&self, gene: GeneId) -> &[DiseaseId] {
        self.gene_to_diseases
            .get(&gene)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The symbol of `gene`, if the gene is known.
    pub fn symbol(&self, gene: GeneId) -> Option<&str> {
        self.symbols.get(&gene).map(|s| s.as_str())
    }

    /// Returns `true` if the gene appears in the link table.
    pub fn contains_gene(&self, gene: GeneId) -> bool {
        self.symbols.contains_key(&gene)
    }

    /// Number of genes in the index.
    pub fn num_genes(&self) -> usize {
        self.symbols.len()
    }
}

/// Data structure for representing a row of the background rate table.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BackgroundRateRow {
    /// NCBI gene ID.
    pub ncbi_gene_id: u32,
    /// Gene symbol.
    pub gene_symbol: String,
    /// Expected count of called-pathogenic alleles in the population.
    pub lambda: f64,
}

/// Per-gene background rates of predicted-pathogenic alleles.
#[derive(Debug, Default)]
pub struct BackgroundGeneRates {
    rates: HashMap<GeneId, f64>,
}

impl BackgroundGeneRates {
    /// Builds the table from `(gene, rate)` pairs.
    pub fn from_pairs(pairs: &[(GeneId, f64)]) -> Self {
        Self {
            rates: pairs.iter().copied().collect(),
        }
    }

    /// Read the background rate table (TSV with `ncbi_gene_id`,
    /// `gene_symbol`, `lambda` columns).
    ///
    /// # Errors
    ///
    /// In the case that the file could not be read or a rate is negative.
    pub fn load<P: AsRef<Path>>(path: &P) -> Result<Self, anyhow::Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .comment(Some(b'#'))
            .from_path(path.as_ref())?;
        let mut rates = HashMap::new();
        for result in rdr.deserialize() {
            let row: BackgroundRateRow = result?;
            if row.lambda < 0.0 {
                anyhow::bail!(
                    "background rate for gene {} ({}) is negative: {}",
                    row.ncbi_gene_id,
                    &row.gene_symbol,
                    row.lambda
                );
            }
            rates.insert(GeneId::from_u32(row.ncbi_gene_id), row.lambda);
        }
        Ok(Self { rates })
    }

    /// The background rate for `gene`, falling back to
    /// [`DEFAULT_BACKGROUND_LAMBDA`] for genes without an entry.
    pub fn lambda(&self, gene: GeneId) -> f64 {
        self.rates
            .get(&gene)
            .copied()
            .unwrap_or(DEFAULT_BACKGROUND_LAMBDA)
    }

    /// Number of genes with an explicit rate.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Returns `true` if the table has no explicit rates.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
