//! Variable preprocessing: transform, standardize, reduce
//!
//! The order is fixed: stationarity transform, then z-scoring over the full
//! history, then PCA. PCA is scale-sensitive, so the steps do not commute.

mod pca;
mod standardize;

pub use pca::{reduce_dimensions, PcaModel};
pub use standardize::{standardize, standardize_matrix, Standardized};

use crate::data::{apply_transform, MacroPanel, TransformTable, TransformedPanel};
use crate::error::Result;
use chrono::NaiveDate;
use ndarray::Array2;

/// Per-month state vectors ready for clustering
#[derive(Debug, Clone)]
pub struct StateMatrix {
    /// Month of each row
    pub months: Vec<NaiveDate>,
    /// Principal component scores (months x components)
    pub vectors: Array2<f64>,
    /// Number of retained components
    pub component_count: usize,
    /// Explained variance share of each retained component
    pub explained_variance_ratio: Vec<f64>,
    /// Transformed (pre-standardization) panel the vectors were built from
    pub transformed: TransformedPanel,
}

impl StateMatrix {
    /// Wrap an already reduced matrix; no transformed panel is kept
    pub fn from_vectors(months: Vec<NaiveDate>, vectors: Array2<f64>) -> Self {
        let component_count = vectors.ncols();
        let transformed = TransformedPanel {
            months: months.clone(),
            names: (1..=component_count).map(|i| format!("PC{}", i)).collect(),
            values: vectors.clone(),
            dropped_rows: 0,
        };
        Self {
            months,
            vectors,
            component_count,
            explained_variance_ratio: Vec::new(),
            transformed,
        }
    }

    /// Number of months
    pub fn n_months(&self) -> usize {
        self.vectors.nrows()
    }
}

/// Runs the three preprocessing steps
#[derive(Debug, Clone)]
pub struct Preprocessor {
    variance_threshold: f64,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            variance_threshold: 0.95,
        }
    }
}

impl Preprocessor {
    /// Create a preprocessor with a PCA variance target
    pub fn new(variance_threshold: f64) -> Self {
        Self { variance_threshold }
    }

    /// Transform, standardize and reduce a raw panel
    pub fn run(&self, panel: &MacroPanel, table: &TransformTable) -> Result<StateMatrix> {
        let transformed = apply_transform(panel, table)?;
        let standardized = standardize(&transformed)?;
        let pca = PcaModel::fit_with_variance_threshold(&standardized.values, self.variance_threshold)?;
        let vectors = pca.transform(&standardized.values);

        tracing::info!(
            "PCA: {} of {} components explain {:.1}% of variance ({} months)",
            pca.n_components,
            transformed.n_variables(),
            pca.retained_variance() * 100.0,
            transformed.n_months()
        );

        Ok(StateMatrix {
            months: transformed.months.clone(),
            vectors,
            component_count: pca.n_components,
            explained_variance_ratio: pca.explained_variance_ratio.to_vec(),
            transformed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TransformCode;
    use ndarray::array;

    #[test]
    fn test_run_produces_rectangular_states() {
        let months = (1..=6)
            .map(|m| NaiveDate::from_ymd_opt(2022, m, 1).unwrap())
            .collect();
        let panel = MacroPanel::new(
            months,
            vec!["A".into(), "B".into(), "C".into()],
            array![
                [100.0, 3.0, 1.0],
                [101.0, 3.2, 4.0],
                [103.0, 3.1, 2.0],
                [102.0, 3.6, 8.0],
                [106.0, 3.3, 5.0],
                [107.0, 3.9, 7.0]
            ],
        )
        .unwrap();
        let mut table = TransformTable::new();
        table.insert("A", TransformCode::LogDiff);
        table.insert("B", TransformCode::Diff);
        table.insert("C", TransformCode::Level);

        let states = Preprocessor::new(1.0).run(&panel, &table).unwrap();
        assert_eq!(states.n_months(), 5);
        assert_eq!(states.months[0], NaiveDate::from_ymd_opt(2022, 2, 1).unwrap());
        assert_eq!(states.vectors.ncols(), states.component_count);
        assert!(states.component_count <= 3);
    }
}
