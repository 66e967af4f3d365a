//! Choosing k from an inertia curve

use super::kmeans::KMeans;
use crate::error::Result;
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for picking k from `(k, inertia)` pairs sorted by k.
///
/// Returns `None` when the curve shows no usable knee.
pub trait ElbowRule: Send + Sync {
    /// Pick k from the inertia curve
    fn select(&self, curve: &[(usize, f64)]) -> Option<usize>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Knee at the largest discrete second difference of inertia:
/// `I(k-1) + I(k+1) - 2 I(k)`.
///
/// A knee whose curvature is below `min_relative_curvature` times the total
/// inertia drop across the curve is treated as no knee at all.
///
/// Only interior points have a second difference, so the first and last
/// candidates are never selected: with candidates `2..=10` the rule picks
/// from `3..=9`. Use [`FixedK`] to force an endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxCurvature {
    pub min_relative_curvature: f64,
}

impl Default for MaxCurvature {
    fn default() -> Self {
        Self {
            min_relative_curvature: 0.01,
        }
    }
}

impl ElbowRule for MaxCurvature {
    fn select(&self, curve: &[(usize, f64)]) -> Option<usize> {
        if curve.len() < 3 {
            return None;
        }

        let drop = (curve[0].1 - curve[curve.len() - 1].1).abs();
        if drop <= f64::EPSILON {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        for w in curve.windows(3) {
            let curvature = w[0].1 + w[2].1 - 2.0 * w[1].1;
            if best.map(|(_, c)| curvature > c).unwrap_or(true) {
                best = Some((w[1].0, curvature));
            }
        }

        best.filter(|&(_, c)| c > self.min_relative_curvature * drop)
            .map(|(k, _)| k)
    }

    fn name(&self) -> &'static str {
        "max-curvature"
    }
}

/// Always the same k, regardless of the curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedK(pub usize);

impl ElbowRule for FixedK {
    fn select(&self, _curve: &[(usize, f64)]) -> Option<usize> {
        Some(self.0)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Serializable choice of built-in elbow rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ElbowMethod {
    /// [`MaxCurvature`] with its default threshold
    MaxCurvature,
    /// [`FixedK`]
    Fixed { k: usize },
}

impl ElbowMethod {
    /// Build the rule this method names
    pub fn rule(&self) -> Box<dyn ElbowRule> {
        match *self {
            ElbowMethod::MaxCurvature => Box::new(MaxCurvature::default()),
            ElbowMethod::Fixed { k } => Box::new(FixedK(k)),
        }
    }
}

/// Inertia for each candidate k, fitted in parallel.
///
/// Candidate `k` is seeded with `template.seed + k` so the curve does not
/// depend on thread scheduling.
pub fn inertia_curve(
    data: &Array2<f64>,
    candidates: &[usize],
    template: &KMeans,
) -> Result<Vec<(usize, f64)>> {
    candidates
        .par_iter()
        .map(|&k| {
            let fit = template
                .clone()
                .with_k(k)
                .with_seed(template.seed.wrapping_add(k as u64))
                .fit(data)?;
            Ok((k, fit.inertia))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::DistanceMetric;
    use ndarray::array;

    #[test]
    fn test_max_curvature_finds_knee() {
        let curve = vec![(2, 100.0), (3, 40.0), (4, 30.0), (5, 25.0), (6, 22.0)];
        assert_eq!(MaxCurvature::default().select(&curve), Some(3));
    }

    #[test]
    fn test_straight_line_is_ambiguous() {
        let curve = vec![(2, 50.0), (3, 40.0), (4, 30.0), (5, 20.0)];
        assert_eq!(MaxCurvature::default().select(&curve), None);
    }

    #[test]
    fn test_short_curve_is_ambiguous() {
        let curve = vec![(2, 50.0), (3, 10.0)];
        assert_eq!(MaxCurvature::default().select(&curve), None);
    }

    #[test]
    fn test_endpoints_never_selected() {
        // Sharpest bend sits at the first candidate, which has no second difference
        let curve = vec![(2, 10.0), (3, 9.0), (4, 8.5), (5, 8.2)];
        assert_eq!(MaxCurvature::default().select(&curve), Some(3));
    }

    #[test]
    fn test_fixed_ignores_curve() {
        assert_eq!(FixedK(4).select(&[]), Some(4));
        assert_eq!(ElbowMethod::Fixed { k: 6 }.rule().select(&[]), Some(6));
    }

    #[test]
    fn test_inertia_curve_is_ordered_and_decreasing() {
        let data = array![
            [1.0, 0.0],
            [0.9, 0.1],
            [0.0, 1.0],
            [0.1, 0.9],
            [-1.0, 0.0],
            [-0.9, -0.1],
            [0.0, -1.0],
            [0.1, -0.9]
        ];
        let template = KMeans::new(2, DistanceMetric::Cosine);
        let curve = inertia_curve(&data, &[2, 3, 4], &template).unwrap();

        assert_eq!(curve.iter().map(|c| c.0).collect::<Vec<_>>(), vec![2, 3, 4]);
        assert!(curve[2].1 <= curve[0].1);
    }
}
