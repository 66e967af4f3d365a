//! Blending both clustering stages into one distribution per month

use crate::error::{RegimeError, Result};
use chrono::NaiveDate;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Probability of each regime 0..=r for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeDistribution {
    /// Month
    pub month: NaiveDate,
    /// `probabilities[i]` = P(Regime i); entries are non-negative and sum to 1
    pub probabilities: Vec<f64>,
}

impl RegimeDistribution {
    /// Number of regimes (r + 1)
    pub fn n_regimes(&self) -> usize {
        self.probabilities.len()
    }

    /// Probability of one regime
    pub fn probability(&self, regime: usize) -> f64 {
        self.probabilities.get(regime).copied().unwrap_or(0.0)
    }

    /// Most likely regime; the lowest id wins ties
    pub fn most_likely(&self) -> usize {
        argmax(&self.probabilities)
    }
}

/// Cluster membership from centroid distances:
/// `P(C_i) = (1 - d_i / Σ d_j) / (k - 1)`.
///
/// A single cluster gets probability 1; all-zero distances give a uniform split.
pub fn distances_to_probabilities(distances: &[f64]) -> Vec<f64> {
    let k = distances.len();
    match k {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let total: f64 = distances.iter().sum();
            if total <= 0.0 {
                return vec![1.0 / k as f64; k];
            }
            distances
                .iter()
                .map(|d| ((1.0 - d / total) / (k as f64 - 1.0)).max(0.0))
                .collect()
        }
    }
}

/// Scaled Regime 0 weight `-P_max * log2(1 - P(Regime 0))`.
///
/// `1 - P(Regime 0)` is floored at `clamp` so a month sitting on the outlier
/// centroid gets a large finite weight instead of infinity.
pub fn scaled_outlier_probability(p_outlier: f64, p_max: f64, clamp: f64) -> f64 {
    let remainder = (1.0 - p_outlier.clamp(0.0, 1.0)).max(clamp);
    -p_max * remainder.log2()
}

/// Final distribution for one month from its Regime 0 probability and its
/// typical-regime probabilities
pub fn blend_month(p_outlier: f64, typical_probs: &[f64], clamp: f64) -> Vec<f64> {
    let p_max = typical_probs.iter().copied().fold(0.0_f64, f64::max);
    let p_r0 = scaled_outlier_probability(p_outlier, p_max, clamp);

    let mut out = Vec::with_capacity(typical_probs.len() + 1);
    out.push(p_r0);
    out.extend_from_slice(typical_probs);

    let total: f64 = out.iter().sum();
    if total > 0.0 {
        for p in out.iter_mut() {
            *p /= total;
        }
    }
    out
}

/// One distribution per month.
///
/// `l2_distances` is months x 2 with the outlier centroid in column 0;
/// `cosine_distances` is months x r and must cover every month, outliers
/// included.
pub fn synthesize_probabilities(
    months: &[NaiveDate],
    l2_distances: &Array2<f64>,
    cosine_distances: &Array2<f64>,
    clamp: f64,
) -> Result<Vec<RegimeDistribution>> {
    let n = months.len();
    if l2_distances.nrows() != n || cosine_distances.nrows() != n {
        return Err(RegimeError::InvalidInput(format!(
            "distance rows ({} l2, {} cosine) do not match {} months",
            l2_distances.nrows(),
            cosine_distances.nrows(),
            n
        )));
    }
    if l2_distances.ncols() != 2 {
        return Err(RegimeError::InvalidInput(format!(
            "expected 2 l2 distance columns, got {}",
            l2_distances.ncols()
        )));
    }

    let distributions = months
        .iter()
        .enumerate()
        .map(|(i, &month)| {
            let l2 = distances_to_probabilities(&l2_distances.row(i).to_vec());
            let typical = distances_to_probabilities(&cosine_distances.row(i).to_vec());
            RegimeDistribution {
                month,
                probabilities: blend_month(l2[0], &typical, clamp),
            }
        })
        .collect();

    Ok(distributions)
}

pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
