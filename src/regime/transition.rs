//! Regime-to-regime transition probabilities

use crate::error::{Diagnostics, RegimeError, RegimeWarning, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Empirical month-to-month transition matrix.
///
/// Row `i` is P(next regime | current regime i). Rows for regimes with no
/// observed successor month are all zero and listed in `empty_regimes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionMatrix {
    /// Row-stochastic probabilities (zero rows for empty regimes)
    pub probabilities: Array2<f64>,
    /// Raw transition counts
    pub counts: Array2<usize>,
    /// Regimes without any observed transition out
    pub empty_regimes: Vec<usize>,
}

impl TransitionMatrix {
    /// Number of regimes
    pub fn n_regimes(&self) -> usize {
        self.probabilities.nrows()
    }

    /// P(next = j | current = i)
    pub fn probability(&self, from: usize, to: usize) -> f64 {
        self.probabilities[[from, to]]
    }

    /// Diagonal: probability of staying in each regime
    pub fn persistence(&self) -> Vec<f64> {
        self.probabilities.diag().to_vec()
    }

    /// Expected months spent in a regime once entered, `1 / (1 - p_ii)`.
    ///
    /// `None` for empty regimes; infinite for absorbing ones.
    pub fn expected_duration(&self, regime: usize) -> Option<f64> {
        if self.empty_regimes.contains(&regime) {
            return None;
        }
        let stay = self.probabilities[[regime, regime]];
        if stay >= 1.0 {
            Some(f64::INFINITY)
        } else {
            Some(1.0 / (1.0 - stay))
        }
    }

    /// Transition probabilities given that the regime changes:
    /// diagonal zeroed, rows renormalized over the off-diagonal entries.
    /// Rows with no off-diagonal mass stay zero.
    pub fn conditional_on_transition(&self) -> Array2<f64> {
        let mut out = self.probabilities.clone();
        for (i, mut row) in out.rows_mut().into_iter().enumerate() {
            row[i] = 0.0;
            let total = row.sum();
            if total > 0.0 {
                row /= total;
            }
        }
        out
    }

    /// One-step-ahead regime distribution `pᵀ T`.
    ///
    /// Mass on empty regimes has nowhere to go, so the result is renormalized.
    pub fn next_distribution(&self, current: &[f64]) -> Result<Vec<f64>> {
        if current.len() != self.n_regimes() {
            return Err(RegimeError::InvalidInput(format!(
                "distribution has {} entries, matrix has {} regimes",
                current.len(),
                self.n_regimes()
            )));
        }
        let p = Array1::from_vec(current.to_vec());
        let mut next = p.dot(&self.probabilities);
        let total = next.sum();
        if total > 0.0 {
            next /= total;
        }
        Ok(next.to_vec())
    }
}

/// Count consecutive-month transitions in a hard label sequence and
/// normalize each row by how often its regime has a successor month.
pub fn estimate_transitions(labels: &[usize], n_regimes: usize) -> Result<(TransitionMatrix, Diagnostics)> {
    if let Some(&bad) = labels.iter().find(|&&l| l >= n_regimes) {
        return Err(RegimeError::InvalidInput(format!(
            "label {} out of range for {} regimes",
            bad, n_regimes
        )));
    }

    let mut counts = Array2::<usize>::zeros((n_regimes, n_regimes));
    for w in labels.windows(2) {
        counts[[w[0], w[1]]] += 1;
    }

    let mut probabilities = Array2::<f64>::zeros((n_regimes, n_regimes));
    let mut empty_regimes = Vec::new();
    let mut diagnostics = Diagnostics::new();

    for i in 0..n_regimes {
        let row_total: usize = counts.row(i).sum();
        if row_total == 0 {
            empty_regimes.push(i);
            diagnostics.push(RegimeWarning::EmptyRegime { regime: i });
            continue;
        }
        for j in 0..n_regimes {
            probabilities[[i, j]] = counts[[i, j]] as f64 / row_total as f64;
        }
    }

    Ok((
        TransitionMatrix {
            probabilities,
            counts,
            empty_regimes,
        },
        diagnostics,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_rows() {
        // 0->0, 0->1, 1->1, 1->0, 0->0
        let labels = [0, 0, 1, 1, 0, 0];
        let (tm, diag) = estimate_transitions(&labels, 2).unwrap();

        assert!(diag.is_clean());
        assert_eq!(tm.counts[[0, 0]], 2);
        assert_eq!(tm.counts[[0, 1]], 1);
        assert!((tm.probability(0, 0) - 2.0 / 3.0).abs() < 1e-12);
        assert!((tm.probability(1, 0) - 0.5).abs() < 1e-12);
        for row in tm.probabilities.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_unobserved_transition_is_zero() {
        let labels = [0, 0, 1, 1];
        let (tm, _) = estimate_transitions(&labels, 2).unwrap();
        assert_eq!(tm.probability(1, 0), 0.0);
    }

    #[test]
    fn test_empty_regime_flagged() {
        let labels = [0, 1, 0, 1];
        let (tm, diag) = estimate_transitions(&labels, 3).unwrap();

        assert_eq!(tm.empty_regimes, vec![2]);
        assert_eq!(diag.empty_regimes(), vec![2]);
        assert!(tm.probabilities.row(2).iter().all(|&p| p == 0.0));
        assert_eq!(tm.expected_duration(2), None);
    }

    #[test]
    fn test_conditional_on_transition() {
        let labels = [0, 0, 0, 1, 0, 2, 2, 0];
        let (tm, _) = estimate_transitions(&labels, 3).unwrap();
        let cond = tm.conditional_on_transition();

        // From 0: 2 stays, 1 to regime 1, 1 to regime 2
        assert_eq!(cond[[0, 0]], 0.0);
        assert!((cond[[0, 1]] - 0.5).abs() < 1e-12);
        assert!((cond[[0, 2]] - 0.5).abs() < 1e-12);
        assert!((cond[[2, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_persistence_and_duration() {
        let labels = [0, 0, 0, 0, 1];
        let (tm, _) = estimate_transitions(&labels, 2).unwrap();
        assert!((tm.persistence()[0] - 0.75).abs() < 1e-12);
        assert!((tm.expected_duration(0).unwrap() - 4.0).abs() < 1e-12);
        // Regime 1 only appears in the final month
        assert!(tm.empty_regimes.contains(&1));
    }

    #[test]
    fn test_next_distribution() {
        let labels = [0, 1, 0, 1, 1, 0];
        let (tm, _) = estimate_transitions(&labels, 2).unwrap();
        let next = tm.next_distribution(&[1.0, 0.0]).unwrap();
        assert!((next[0] - tm.probability(0, 0)).abs() < 1e-12);
        assert!((next.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(tm.next_distribution(&[1.0]).is_err());
    }

    #[test]
    fn test_out_of_range_label() {
        assert!(estimate_transitions(&[0, 3], 2).is_err());
    }
}
