//! Error types and non-fatal diagnostics for the regime pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, RegimeError>;

/// Fatal errors. Any of these aborts the whole run.
#[derive(Error, Debug)]
pub enum RegimeError {
    /// Missing or inconsistent metadata (e.g. a variable without a transform code)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Not enough data to standardize or cluster
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Malformed input values (ragged panel, non-finite values, log of non-positive)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Failed to parse a field from an input file
    #[error("Failed to parse data: {0}")]
    Parse(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Clustering stage a warning originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Euclidean k=2 outlier split
    Outlier,
    /// Cosine sub-regime split
    Regime,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Outlier => write!(f, "outlier"),
            Stage::Regime => write!(f, "regime"),
        }
    }
}

/// Non-fatal conditions returned alongside results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegimeWarning {
    /// k-means hit its iteration bound before the centroids settled
    NonConvergence { stage: Stage, k: usize, iterations: usize },
    /// The elbow rule found no knee; `fallback_k` was used instead
    AmbiguousElbow { fallback_k: usize },
    /// A regime never occurs with a successor month; its transition row is all zero
    EmptyRegime { regime: usize },
}

impl fmt::Display for RegimeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegimeWarning::NonConvergence { stage, k, iterations } => write!(
                f,
                "{} stage k-means (k={}) did not converge within {} iterations",
                stage, k, iterations
            ),
            RegimeWarning::AmbiguousElbow { fallback_k } => {
                write!(f, "no clear elbow in inertia curve, using fallback k={}", fallback_k)
            }
            RegimeWarning::EmptyRegime { regime } => {
                write!(f, "regime {} has no observed transitions, row left at zero", regime)
            }
        }
    }
}

/// Collected warnings for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub warnings: Vec<RegimeWarning>,
}

impl Diagnostics {
    /// Create an empty diagnostics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it
    pub fn push(&mut self, warning: RegimeWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Merge another collector into this one
    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    /// True when no warnings were recorded
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Whether any k-means run failed to converge
    pub fn has_non_convergence(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, RegimeWarning::NonConvergence { .. }))
    }

    /// Regimes flagged as empty in the transition matrix
    pub fn empty_regimes(&self) -> Vec<usize> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                RegimeWarning::EmptyRegime { regime } => Some(*regime),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegimeError::Configuration("variable INDPRO has no transform code".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: variable INDPRO has no transform code"
        );
    }

    #[test]
    fn test_diagnostics_queries() {
        let mut diag = Diagnostics::new();
        assert!(diag.is_clean());

        diag.push(RegimeWarning::EmptyRegime { regime: 3 });
        diag.push(RegimeWarning::NonConvergence {
            stage: Stage::Regime,
            k: 4,
            iterations: 300,
        });

        assert!(!diag.is_clean());
        assert!(diag.has_non_convergence());
        assert_eq!(diag.empty_regimes(), vec![3]);
    }
}
