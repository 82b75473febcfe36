//! Typed errors of the scoring core.
//!
//! File-level parse and I/O problems are reported as `anyhow::Error` by the
//! loaders; the scoring engine itself only fails in the ways enumerated
//! here.

use crate::ontology::TermId;

/// Errors raised by the scoring engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid or incomplete configuration, detected before any engine
    /// construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// A term could not be resolved in the ontology, even after alias
    /// resolution.
    #[error("term {0} not found in ontology")]
    UnknownTerm(TermId),

    /// Observed/excluded term sets overlap, the corpus is unusable, or
    /// similar caller-side contradictions.
    #[error("inconsistent inputs: {0}")]
    InconsistentInputs(String),

    /// A non-finite value showed up in a likelihood computation.
    #[error("non-finite value in {context}: {value}")]
    Numeric {
        /// Which computation produced the value.
        context: String,
        /// The offending value.
        value: f64,
    },

    /// A term had no entry in the background index after construction.
    /// This indicates a bug in index construction and is never recoverable.
    #[error("no background frequency entry for term {0}")]
    MissingBackground(TermId),
}

impl Error {
    /// Checks `value` for finiteness, attributing failures to `context`.
    pub fn check_finite(value: f64, context: &str) -> Result<f64, Error> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Error::Numeric {
                context: context.to_string(),
                value,
            })
        }
    }
}
