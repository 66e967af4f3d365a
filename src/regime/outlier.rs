//! Euclidean k=2 split separating atypical months (Regime 0)

use crate::clustering::{DistanceMetric, KMeans, KMeansFit};
use crate::config::RegimeConfig;
use crate::error::{Diagnostics, RegimeWarning, Result, Stage};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Outcome of the ℓ2 stage.
///
/// Columns of `centroids` rows and `l2_distances` are reordered so index 0
/// is always the outlier cluster and index 1 the typical cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierPartition {
    /// Months assigned to Regime 0
    pub regime0_indices: Vec<usize>,
    /// Months passed on to the cosine stage
    pub typical_indices: Vec<usize>,
    /// Outlier centroid (row 0) and typical centroid (row 1)
    pub centroids: Array2<f64>,
    /// Distance of every month to [outlier, typical] centroids
    pub l2_distances: Array2<f64>,
    /// Whether the equal-size tie rule decided which cluster is Regime 0
    pub decided_by_tie: bool,
    /// Whether k-means converged
    pub converged: bool,
}

impl OutlierPartition {
    /// Number of outlier months
    pub fn n_outliers(&self) -> usize {
        self.regime0_indices.len()
    }

    /// Whether month `idx` belongs to Regime 0
    pub fn is_outlier(&self, idx: usize) -> bool {
        self.regime0_indices.binary_search(&idx).is_ok()
    }
}

/// Split all months with Euclidean k-means (k=2); the smaller cluster is Regime 0.
///
/// On equal sizes the cluster whose centroid lies farther from the origin is
/// Regime 0. For centered input (PCA scores) two equal-size centroids are
/// mirror images with equal norms, so norms within a relative 1e-9 count as
/// equal and the more dispersed cluster (larger mean squared distance to its
/// centroid) is Regime 0 instead. If that also ties, the lower k-means index wins.
pub fn partition_outliers(
    states: &Array2<f64>,
    config: &RegimeConfig,
) -> Result<(OutlierPartition, Diagnostics)> {
    let kmeans = KMeans::new(2, DistanceMetric::Euclidean)
        .with_n_init(config.n_init)
        .with_max_iter(config.max_iter)
        .with_tol(config.tol)
        .with_seed(config.seed);
    let fit = kmeans.fit(states)?;

    let mut diagnostics = Diagnostics::new();
    if !fit.converged {
        diagnostics.push(RegimeWarning::NonConvergence {
            stage: Stage::Outlier,
            k: 2,
            iterations: fit.n_iter,
        });
    }

    let distances = fit.distances(states);
    let (outlier, decided_by_tie) = pick_outlier_cluster(&fit, &distances);
    let typical = 1 - outlier;
    let order = [outlier, typical];

    let regime0_indices: Vec<usize> = fit
        .labels
        .iter()
        .enumerate()
        .filter(|(_, l)| **l == outlier)
        .map(|(i, _)| i)
        .collect();
    let typical_indices: Vec<usize> = fit
        .labels
        .iter()
        .enumerate()
        .filter(|(_, l)| **l == typical)
        .map(|(i, _)| i)
        .collect();

    let l2_distances = distances.select(Axis(1), &order);
    let centroids = fit.centroids.select(Axis(0), &order);

    tracing::info!(
        "Outlier split: {} outlier months, {} typical months{}",
        regime0_indices.len(),
        typical_indices.len(),
        if decided_by_tie { " (equal sizes, tie rule applied)" } else { "" }
    );

    Ok((
        OutlierPartition {
            regime0_indices,
            typical_indices,
            centroids,
            l2_distances,
            decided_by_tie,
            converged: fit.converged,
        },
        diagnostics,
    ))
}

fn pick_outlier_cluster(fit: &KMeansFit, distances: &Array2<f64>) -> (usize, bool) {
    let sizes = fit.cluster_sizes();
    if sizes[0] != sizes[1] {
        return (if sizes[0] < sizes[1] { 0 } else { 1 }, false);
    }

    let norm = |j: usize| {
        let c = fit.centroids.row(j);
        c.dot(&c).sqrt()
    };
    if let Some(j) = clearly_larger(norm(0), norm(1)) {
        return (j, true);
    }

    let dispersion = |j: usize| {
        let members: Vec<f64> = fit
            .labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == j)
            .map(|(i, _)| distances[[i, j]].powi(2))
            .collect();
        members.iter().sum::<f64>() / members.len().max(1) as f64
    };
    (clearly_larger(dispersion(0), dispersion(1)).unwrap_or(0), true)
}

/// Relative tolerance below which two tie-break statistics count as equal
const TIE_TOLERANCE: f64 = 1e-9;

/// Index (0 or 1) of the larger value, or `None` when they agree within
/// [`TIE_TOLERANCE`]
fn clearly_larger(a: f64, b: f64) -> Option<usize> {
    let scale = a.abs().max(b.abs()).max(f64::MIN_POSITIVE);
    if (a - b).abs() <= TIE_TOLERANCE * scale {
        None
    } else if a > b {
        Some(0)
    } else {
        Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_smaller_cluster_is_regime0() {
        let states = array![
            [0.1, 0.0],
            [-0.1, 0.1],
            [0.0, -0.1],
            [0.05, 0.05],
            [-0.05, 0.0],
            [6.0, 6.0],
            [6.2, 5.9]
        ];
        let (part, diag) = partition_outliers(&states, &RegimeConfig::default()).unwrap();

        assert_eq!(part.regime0_indices, vec![5, 6]);
        assert_eq!(part.typical_indices, vec![0, 1, 2, 3, 4]);
        assert!(!part.decided_by_tie);
        assert!(diag.is_clean());
        assert!(part.is_outlier(6));
        assert!(!part.is_outlier(0));

        // Outlier months are nearer the outlier centroid (column 0)
        for &i in &part.regime0_indices {
            assert!(part.l2_distances[[i, 0]] < part.l2_distances[[i, 1]]);
        }
    }

    #[test]
    fn test_equal_sizes_use_centroid_norm() {
        let states = array![
            [1.0, 1.0],
            [1.1, 0.9],
            [-3.0, -3.0],
            [-3.1, -2.9]
        ];
        let (part, _) = partition_outliers(&states, &RegimeConfig::default()).unwrap();

        assert!(part.decided_by_tie);
        assert_eq!(part.regime0_indices, vec![2, 3]);
        assert_eq!(part.typical_indices, vec![0, 1]);
    }

    #[test]
    fn test_centered_equal_sizes_use_dispersion() {
        // Mean-zero input: centroids (1, 1) and (-1, -1) have equal norms
        let states = array![
            [1.01, 1.0],
            [0.99, 1.0],
            [-0.5, -0.5],
            [-1.5, -1.5]
        ];
        for seed in 0..6 {
            let config = RegimeConfig::default().with_seed(seed);
            let (part, _) = partition_outliers(&states, &config).unwrap();

            assert!(part.decided_by_tie);
            assert_eq!(part.regime0_indices, vec![2, 3]);
            assert_eq!(part.typical_indices, vec![0, 1]);
        }
    }

    #[test]
    fn test_clearly_larger_tolerance() {
        assert_eq!(clearly_larger(1.0, 1.0 + 1e-15), None);
        assert_eq!(clearly_larger(2.0, 1.0), Some(0));
        assert_eq!(clearly_larger(1.0, 2.0), Some(1));
        assert_eq!(clearly_larger(0.0, 0.0), None);
    }

    #[test]
    fn test_iteration_bound_reports_non_convergence() {
        let states = array![
            [0.1, 0.0],
            [-0.1, 0.1],
            [0.0, -0.1],
            [0.05, 0.05],
            [-0.05, 0.0],
            [6.0, 6.0],
            [6.2, 5.9]
        ];
        let config = RegimeConfig::default().with_max_iter(1).with_tol(0.0);
        let (part, diag) = partition_outliers(&states, &config).unwrap();

        assert!(!part.converged);
        assert!(diag.has_non_convergence());
        assert_eq!(
            diag.warnings,
            vec![RegimeWarning::NonConvergence {
                stage: Stage::Outlier,
                k: 2,
                iterations: 1
            }]
        );
    }
}
