//! Column standardization (z-scores over the full history)

use crate::data::TransformedPanel;
use crate::error::{RegimeError, Result};
use ndarray::{Array1, Array2, Axis};

/// Standardized matrix with the statistics used to produce it
#[derive(Debug, Clone)]
pub struct Standardized {
    /// Z-scored values (months x variables)
    pub values: Array2<f64>,
    /// Column means
    pub means: Array1<f64>,
    /// Column standard deviations (population)
    pub stds: Array1<f64>,
}

/// Demean and scale each column to unit variance.
///
/// Fails on a constant column, which cannot be standardized.
pub fn standardize(panel: &TransformedPanel) -> Result<Standardized> {
    standardize_matrix(&panel.values, &panel.names)
}

/// Standardize a raw matrix; `names` are used only for error messages
pub fn standardize_matrix(data: &Array2<f64>, names: &[String]) -> Result<Standardized> {
    if data.nrows() < 2 {
        return Err(RegimeError::InsufficientData(format!(
            "standardization needs at least 2 months, got {}",
            data.nrows()
        )));
    }

    let means = data
        .mean_axis(Axis(0))
        .ok_or_else(|| RegimeError::InsufficientData("empty matrix".to_string()))?;
    let stds = data.std_axis(Axis(0), 0.0);

    for (j, (&std, &mean)) in stds.iter().zip(means.iter()).enumerate() {
        if std <= 1e-12 * mean.abs().max(1.0) {
            let name = names.get(j).map(|s| s.as_str()).unwrap_or("?");
            return Err(RegimeError::InsufficientData(format!(
                "variable {} has zero variance after transformation",
                name
            )));
        }
    }

    let values = (data - &means) / &stds;

    Ok(Standardized {
        values,
        means,
        stds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standardize_moments() {
        let data = array![[1.0, 10.0], [2.0, 30.0], [3.0, 20.0], [4.0, 40.0]];
        let names = vec!["A".to_string(), "B".to_string()];
        let out = standardize_matrix(&data, &names).unwrap();

        for col in out.values.columns() {
            let mean = col.mean().unwrap();
            let var = col.mapv(|x| (x - mean).powi(2)).mean().unwrap();
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
        assert!((out.means[0] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_fails() {
        let data = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]];
        let names = vec!["A".to_string(), "FLAT".to_string()];
        match standardize_matrix(&data, &names) {
            Err(RegimeError::InsufficientData(msg)) => assert!(msg.contains("FLAT")),
            other => panic!("expected InsufficientData, got {:?}", other),
        }
    }

    #[test]
    fn test_single_row_fails() {
        let data = array![[1.0, 2.0]];
        assert!(standardize_matrix(&data, &[]).is_err());
    }
}
