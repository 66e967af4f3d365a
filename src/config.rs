//! Pipeline configuration

use crate::clustering::ElbowMethod;
use crate::error::{RegimeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for the full regime classification run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    /// Cumulative explained variance the retained principal components must reach
    pub variance_threshold: f64,
    /// Smallest k considered by the elbow search
    pub k_min: usize,
    /// Largest k considered by the elbow search
    pub k_max: usize,
    /// Rule used to pick k from the inertia curve
    pub elbow: ElbowMethod,
    /// k used when the elbow rule finds no knee
    pub fallback_k: usize,
    /// Number of k-means restarts (best inertia wins)
    pub n_init: usize,
    /// Maximum Lloyd iterations per restart
    pub max_iter: usize,
    /// Centroid shift below which k-means is considered converged
    pub tol: f64,
    /// Base random seed for k-means++ initialization
    pub seed: u64,
    /// Smallest allowed value of `1 - P(Regime 0)` before taking log2
    pub outlier_clamp: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            variance_threshold: 0.95,
            k_min: 2,
            k_max: 10,
            elbow: ElbowMethod::MaxCurvature,
            fallback_k: 5,
            n_init: 10,
            max_iter: 300,
            tol: 1e-8,
            seed: 42,
            outlier_clamp: 1e-12,
        }
    }
}

impl RegimeConfig {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Set PCA variance threshold
    pub fn with_variance_threshold(mut self, threshold: f64) -> Self {
        self.variance_threshold = threshold;
        self
    }

    /// Set elbow candidate range
    pub fn with_k_range(mut self, k_min: usize, k_max: usize) -> Self {
        self.k_min = k_min;
        self.k_max = k_max;
        self
    }

    /// Set elbow rule
    pub fn with_elbow(mut self, elbow: ElbowMethod) -> Self {
        self.elbow = elbow;
        self
    }

    /// Set fallback k
    pub fn with_fallback_k(mut self, k: usize) -> Self {
        self.fallback_k = k;
        self
    }

    /// Set number of restarts
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set iteration bound
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check that every field is in range
    pub fn validate(&self) -> Result<()> {
        if !(self.variance_threshold > 0.0 && self.variance_threshold <= 1.0) {
            return Err(RegimeError::Configuration(format!(
                "variance_threshold must be in (0, 1], got {}",
                self.variance_threshold
            )));
        }
        if self.k_min < 2 {
            return Err(RegimeError::Configuration(format!(
                "k_min must be at least 2, got {}",
                self.k_min
            )));
        }
        if self.k_max < self.k_min {
            return Err(RegimeError::Configuration(format!(
                "k_max ({}) must not be below k_min ({})",
                self.k_max, self.k_min
            )));
        }
        if self.fallback_k < 2 {
            return Err(RegimeError::Configuration(format!(
                "fallback_k must be at least 2, got {}",
                self.fallback_k
            )));
        }
        if let ElbowMethod::Fixed { k } = self.elbow {
            if k < 2 {
                return Err(RegimeError::Configuration(format!(
                    "fixed elbow k must be at least 2, got {}",
                    k
                )));
            }
        }
        if self.n_init == 0 || self.max_iter == 0 {
            return Err(RegimeError::Configuration(
                "n_init and max_iter must be positive".to_string(),
            ));
        }
        if !(self.tol >= 0.0) {
            return Err(RegimeError::Configuration(format!(
                "tol must be non-negative, got {}",
                self.tol
            )));
        }
        if !(self.outlier_clamp > 0.0 && self.outlier_clamp < 0.5) {
            return Err(RegimeError::Configuration(format!(
                "outlier_clamp must be in (0, 0.5), got {}",
                self.outlier_clamp
            )));
        }
        Ok(())
    }
}
