//! Likelihood ratios of observations under each candidate disease.

pub mod genotype;
pub mod phenotype;
