//! Cosine k-means over typical months (Regimes 1..=r)

use crate::clustering::{inertia_curve, DistanceMetric, ElbowRule, KMeans, KMeansFit};
use crate::config::RegimeConfig;
use crate::error::{Diagnostics, RegimeError, RegimeWarning, Result, Stage};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Outcome of the cosine stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimePartition {
    /// Regime id (1..=r) of each typical month, in typical-month order
    pub labels: Vec<usize>,
    /// Unit-length centroids, row `j` belongs to regime `j + 1`
    pub centroids: Array2<f64>,
    /// Cosine distance of each typical month to each centroid
    pub cosine_distances: Array2<f64>,
    /// Number of typical regimes r
    pub chosen_k: usize,
    /// `(k, inertia)` pairs evaluated by the elbow search
    pub elbow_curve: Vec<(usize, f64)>,
    /// Whether the fallback k was used
    pub used_fallback: bool,
    fit: KMeansFit,
}

impl RegimePartition {
    /// Cosine distance of arbitrary state vectors to the fitted centroids.
    ///
    /// Used to score outlier months, which take no part in fitting.
    pub fn score(&self, states: &Array2<f64>) -> Array2<f64> {
        self.fit.distances(states)
    }

    /// Whether k-means converged
    pub fn converged(&self) -> bool {
        self.fit.converged
    }
}

/// Choose r with the elbow rule and split typical months by cosine distance
pub fn partition_regimes(
    typical: &Array2<f64>,
    config: &RegimeConfig,
    rule: &dyn ElbowRule,
) -> Result<(RegimePartition, Diagnostics)> {
    let n = typical.nrows();
    if n < config.k_min {
        return Err(RegimeError::InsufficientData(format!(
            "{} typical months cannot form {} regimes",
            n, config.k_min
        )));
    }

    let template = KMeans::new(config.k_min, DistanceMetric::Cosine)
        .with_n_init(config.n_init)
        .with_max_iter(config.max_iter)
        .with_tol(config.tol)
        .with_seed(config.seed);

    let k_hi = config.k_max.min(n);
    let candidates: Vec<usize> = (config.k_min..=k_hi).collect();
    let elbow_curve = inertia_curve(typical, &candidates, &template)?;
    tracing::debug!("Elbow curve ({}): {:?}", rule.name(), elbow_curve);

    let mut diagnostics = Diagnostics::new();
    let (chosen_k, used_fallback) = match rule.select(&elbow_curve) {
        Some(k) => (k.clamp(2, n), false),
        None => {
            let k = config.fallback_k.clamp(config.k_min, k_hi);
            diagnostics.push(RegimeWarning::AmbiguousElbow { fallback_k: k });
            (k, true)
        }
    };

    let fit = template
        .with_k(chosen_k)
        .with_seed(config.seed.wrapping_add(chosen_k as u64))
        .fit(typical)?;
    if !fit.converged {
        diagnostics.push(RegimeWarning::NonConvergence {
            stage: Stage::Regime,
            k: chosen_k,
            iterations: fit.n_iter,
        });
    }

    tracing::info!(
        "Cosine stage: {} typical regimes over {} months (sizes {:?})",
        chosen_k,
        n,
        fit.cluster_sizes()
    );

    Ok((
        RegimePartition {
            labels: fit.labels.iter().map(|&l| l + 1).collect(),
            centroids: fit.centroids.clone(),
            cosine_distances: fit.distances(typical),
            chosen_k,
            elbow_curve,
            used_fallback,
            fit,
        },
        diagnostics,
    ))
}
