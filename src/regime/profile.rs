//! Per-regime summaries of the transformed macro variables

use crate::data::TransformedPanel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Average transformed variable values over the months of one regime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeProfile {
    /// Regime id
    pub regime: usize,
    /// Months labeled with this regime
    pub months: usize,
    /// Share of all months
    pub frequency: f64,
    /// `(variable, mean)` in panel column order; empty for unused regimes
    pub variable_means: Vec<(String, f64)>,
}

impl RegimeProfile {
    /// Mean of one variable within the regime
    pub fn mean_of(&self, name: &str) -> Option<f64> {
        self.variable_means
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

impl fmt::Display for RegimeProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Regime {}: {} months ({:.1}%)",
            self.regime,
            self.months,
            self.frequency * 100.0
        )?;
        for (name, mean) in self.variable_means.iter().take(8) {
            writeln!(f, "  {:>16}: {:>10.4}", name, mean)?;
        }
        Ok(())
    }
}

/// Summaries for regimes `0..n_regimes` given one hard label per panel month
pub fn profile_regimes(
    panel: &TransformedPanel,
    labels: &[usize],
    n_regimes: usize,
) -> Vec<RegimeProfile> {
    let total = labels.len().max(1) as f64;

    (0..n_regimes)
        .map(|regime| {
            let rows: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|(_, l)| **l == regime)
                .map(|(i, _)| i)
                .collect();

            let variable_means = if rows.is_empty() {
                Vec::new()
            } else {
                panel
                    .names
                    .iter()
                    .enumerate()
                    .map(|(j, name)| {
                        let sum: f64 = rows.iter().map(|&i| panel.values[[i, j]]).sum();
                        (name.clone(), sum / rows.len() as f64)
                    })
                    .collect()
            };

            RegimeProfile {
                regime,
                months: rows.len(),
                frequency: rows.len() as f64 / total,
                variable_means,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::array;

    #[test]
    fn test_profile_means() {
        let panel = TransformedPanel {
            months: (1..=4)
                .map(|m| NaiveDate::from_ymd_opt(2020, m, 1).unwrap())
                .collect(),
            names: vec!["UNRATE".to_string(), "UMCSENT".to_string()],
            values: array![[8.0, 60.0], [4.0, 95.0], [9.0, 55.0], [4.5, 90.0]],
            dropped_rows: 0,
        };
        let profiles = profile_regimes(&panel, &[0, 1, 0, 1], 3);

        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0].months, 2);
        assert!((profiles[0].mean_of("UNRATE").unwrap() - 8.5).abs() < 1e-12);
        assert!((profiles[1].mean_of("UMCSENT").unwrap() - 92.5).abs() < 1e-12);
        assert!((profiles[1].frequency - 0.5).abs() < 1e-12);
        assert!(profiles[2].variable_means.is_empty());
    }
}
