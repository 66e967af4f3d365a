//! Stationarity transforms (FRED-MD transformation codes)

use super::panel::MacroPanel;
use crate::error::{RegimeError, Result};
use chrono::NaiveDate;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Per-variable transformation tag ("t-code")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformCode {
    /// 1: x
    Level,
    /// 2: Δx
    Diff,
    /// 3: Δ²x
    SecondDiff,
    /// 4: ln x
    Log,
    /// 5: Δ ln x
    LogDiff,
    /// 6: Δ² ln x
    SecondLogDiff,
    /// 7: Δ(x_t / x_{t-1} - 1)
    PctChangeDiff,
}

impl TransformCode {
    /// All codes in numeric order
    pub const ALL: [TransformCode; 7] = [
        TransformCode::Level,
        TransformCode::Diff,
        TransformCode::SecondDiff,
        TransformCode::Log,
        TransformCode::LogDiff,
        TransformCode::SecondLogDiff,
        TransformCode::PctChangeDiff,
    ];

    /// Parse a numeric t-code (1..=7)
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1..=7 => Ok(Self::ALL[(code - 1) as usize]),
            _ => Err(RegimeError::Configuration(format!(
                "unknown transform code {}",
                code
            ))),
        }
    }

    /// Numeric t-code
    pub fn code(&self) -> u8 {
        match self {
            TransformCode::Level => 1,
            TransformCode::Diff => 2,
            TransformCode::SecondDiff => 3,
            TransformCode::Log => 4,
            TransformCode::LogDiff => 5,
            TransformCode::SecondLogDiff => 6,
            TransformCode::PctChangeDiff => 7,
        }
    }

    /// Leading rows consumed by differencing
    pub fn lost_rows(&self) -> usize {
        match self {
            TransformCode::Level | TransformCode::Log => 0,
            TransformCode::Diff | TransformCode::LogDiff => 1,
            TransformCode::SecondDiff
            | TransformCode::SecondLogDiff
            | TransformCode::PctChangeDiff => 2,
        }
    }

    /// Transform one series. Output has `series.len() - lost_rows()` entries,
    /// aligned with the tail of the input.
    pub fn apply(&self, series: &[f64]) -> Result<Vec<f64>> {
        if series.len() <= self.lost_rows() {
            return Err(RegimeError::InsufficientData(format!(
                "transform {} needs more than {} observations, got {}",
                self,
                self.lost_rows(),
                series.len()
            )));
        }

        let out = match self {
            TransformCode::Level => series.to_vec(),
            TransformCode::Diff => diff(series),
            TransformCode::SecondDiff => diff(&diff(series)),
            TransformCode::Log => log(series)?,
            TransformCode::LogDiff => diff(&log(series)?),
            TransformCode::SecondLogDiff => diff(&diff(&log(series)?)),
            TransformCode::PctChangeDiff => {
                if let Some(pos) = series.iter().position(|&x| x == 0.0) {
                    return Err(RegimeError::InvalidInput(format!(
                        "percent change undefined for zero value at row {}",
                        pos
                    )));
                }
                let growth: Vec<f64> = series.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
                diff(&growth)
            }
        };

        Ok(out)
    }
}

impl fmt::Display for TransformCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransformCode::Level => "level",
            TransformCode::Diff => "diff",
            TransformCode::SecondDiff => "second diff",
            TransformCode::Log => "log",
            TransformCode::LogDiff => "log diff",
            TransformCode::SecondLogDiff => "second log diff",
            TransformCode::PctChangeDiff => "pct change diff",
        };
        write!(f, "{} ({})", self.code(), label)
    }
}

fn diff(series: &[f64]) -> Vec<f64> {
    series.windows(2).map(|w| w[1] - w[0]).collect()
}

fn log(series: &[f64]) -> Result<Vec<f64>> {
    series
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            if x > 0.0 {
                Ok(x.ln())
            } else {
                Err(RegimeError::InvalidInput(format!(
                    "log undefined for non-positive value {} at row {}",
                    x, i
                )))
            }
        })
        .collect()
}

/// Variable name to transform code mapping (external reference data)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformTable {
    codes: HashMap<String, TransformCode>,
}

impl TransformTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the same code to every listed variable
    pub fn uniform<S: AsRef<str>>(names: &[S], code: TransformCode) -> Self {
        names
            .iter()
            .map(|n| (n.as_ref().to_string(), code))
            .collect()
    }

    /// Assign a code to a variable
    pub fn insert(&mut self, name: impl Into<String>, code: TransformCode) {
        self.codes.insert(name.into(), code);
    }

    /// Look up a variable's code
    pub fn get(&self, name: &str) -> Option<TransformCode> {
        self.codes.get(name).copied()
    }

    /// Number of mapped variables
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl FromIterator<(String, TransformCode)> for TransformTable {
    fn from_iter<I: IntoIterator<Item = (String, TransformCode)>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().collect(),
        }
    }
}

/// Panel after per-variable stationarity transforms
#[derive(Debug, Clone)]
pub struct TransformedPanel {
    /// Months that survived differencing
    pub months: Vec<NaiveDate>,
    /// Variable names in column order
    pub names: Vec<String>,
    /// Transformed values (months x variables)
    pub values: Array2<f64>,
    /// Leading months dropped from every column
    pub dropped_rows: usize,
}

impl TransformedPanel {
    /// Number of months
    pub fn n_months(&self) -> usize {
        self.months.len()
    }

    /// Number of variables
    pub fn n_variables(&self) -> usize {
        self.names.len()
    }
}

/// Apply each variable's transform code.
///
/// All columns are trimmed to the largest differencing lag so the result
/// stays rectangular.
pub fn apply_transform(panel: &MacroPanel, table: &TransformTable) -> Result<TransformedPanel> {
    let unmapped: Vec<&str> = panel
        .names()
        .iter()
        .filter(|n| table.get(n).is_none())
        .map(|n| n.as_str())
        .collect();
    if !unmapped.is_empty() {
        return Err(RegimeError::Configuration(format!(
            "variables without a transform code: {}",
            unmapped.join(", ")
        )));
    }

    let codes: Vec<TransformCode> = panel
        .names()
        .iter()
        .filter_map(|n| table.get(n))
        .collect();
    let dropped_rows = codes.iter().map(|c| c.lost_rows()).max().unwrap_or(0);

    let n_out = panel.n_months().saturating_sub(dropped_rows);
    if n_out == 0 {
        return Err(RegimeError::InsufficientData(format!(
            "{} months cannot absorb a differencing lag of {}",
            panel.n_months(),
            dropped_rows
        )));
    }

    let mut values = Array2::zeros((n_out, panel.n_variables()));
    for (j, code) in codes.iter().enumerate() {
        let series = panel.values().column(j).to_vec();
        let transformed = code.apply(&series).map_err(|e| match e {
            RegimeError::InvalidInput(msg) => {
                RegimeError::InvalidInput(format!("{}: {}", panel.names()[j], msg))
            }
            other => other,
        })?;
        let offset = transformed.len() - n_out;
        for (i, v) in transformed[offset..].iter().enumerate() {
            values[[i, j]] = *v;
        }
    }

    tracing::debug!(
        "Transformed {} variables, dropped {} leading months",
        panel.n_variables(),
        dropped_rows
    );

    Ok(TransformedPanel {
        months: panel.months()[dropped_rows..].to_vec(),
        names: panel.names().to_vec(),
        values,
        dropped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample_panel() -> MacroPanel {
        let months = (1..=5)
            .map(|m| NaiveDate::from_ymd_opt(2021, m, 1).unwrap())
            .collect();
        MacroPanel::new(
            months,
            vec!["A".to_string(), "B".to_string()],
            array![[1.0, 10.0], [2.0, 20.0], [4.0, 40.0], [7.0, 80.0], [11.0, 160.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_code_roundtrip() {
        for code in TransformCode::ALL {
            assert_eq!(TransformCode::from_code(code.code()).unwrap(), code);
        }
        assert!(TransformCode::from_code(0).is_err());
        assert!(TransformCode::from_code(8).is_err());
    }

    #[test]
    fn test_differences() {
        let x = [1.0, 2.0, 4.0, 7.0];
        assert_eq!(TransformCode::Diff.apply(&x).unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(TransformCode::SecondDiff.apply(&x).unwrap(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_log_diff() {
        let x = [1.0, std::f64::consts::E, std::f64::consts::E.powi(3)];
        let out = TransformCode::LogDiff.apply(&x).unwrap();
        assert!((out[0] - 1.0).abs() < 1e-12);
        assert!((out[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_pct_change_diff() {
        // growth: 1.0, 0.5, then diff = -0.5
        let out = TransformCode::PctChangeDiff.apply(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0] + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_log_of_non_positive_fails() {
        assert!(matches!(
            TransformCode::Log.apply(&[1.0, 0.0]),
            Err(RegimeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_apply_transform_trims_uniformly() {
        let panel = sample_panel();
        let mut table = TransformTable::new();
        table.insert("A", TransformCode::SecondDiff);
        table.insert("B", TransformCode::Level);

        let out = apply_transform(&panel, &table).unwrap();
        assert_eq!(out.dropped_rows, 2);
        assert_eq!(out.n_months(), 3);
        assert_eq!(out.months[0], NaiveDate::from_ymd_opt(2021, 3, 1).unwrap());
        // second diff of A: [1, 1, 1]; level of B trimmed to last 3
        assert_eq!(out.values.column(0).to_vec(), vec![1.0, 1.0, 1.0]);
        assert_eq!(out.values.column(1).to_vec(), vec![40.0, 80.0, 160.0]);
    }

    #[test]
    fn test_unmapped_variable_is_configuration_error() {
        let panel = sample_panel();
        let mut table = TransformTable::new();
        table.insert("A", TransformCode::Level);

        let err = apply_transform(&panel, &table).unwrap_err();
        match err {
            RegimeError::Configuration(msg) => assert!(msg.contains('B')),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
