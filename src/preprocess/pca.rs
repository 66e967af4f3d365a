//! Principal component analysis on standardized macro data

use crate::error::{RegimeError, Result};
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{s, Array1, Array2, Axis};

/// Fitted PCA model
#[derive(Debug, Clone)]
pub struct PcaModel {
    /// Number of components retained
    pub n_components: usize,
    /// Principal axes as columns (features x components)
    pub components: Array2<f64>,
    /// Variance explained by each retained component
    pub explained_variance: Array1<f64>,
    /// Share of total variance per retained component
    pub explained_variance_ratio: Array1<f64>,
    /// Running sum of `explained_variance_ratio`
    pub cumulative_variance_ratio: Array1<f64>,
    /// Column means of the fitted data
    pub mean: Array1<f64>,
}

impl PcaModel {
    /// Fit PCA keeping `n_components` (all when `None`)
    pub fn fit(data: &Array2<f64>, n_components: Option<usize>) -> Result<Self> {
        let (n_samples, n_features) = data.dim();
        if n_samples < 2 || n_features == 0 {
            return Err(RegimeError::InsufficientData(format!(
                "PCA needs at least 2 samples and 1 feature, got {}x{}",
                n_samples, n_features
            )));
        }
        let n_components = n_components.unwrap_or(n_features).clamp(1, n_features);

        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| RegimeError::InsufficientData("empty matrix".to_string()))?;
        let centered = data - &mean;
        let cov = centered.t().dot(&centered) / (n_samples as f64 - 1.0);

        let (eigenvalues, eigenvectors) = symmetric_eigen(&cov);

        let total_variance: f64 = eigenvalues.sum();
        let explained_variance = eigenvalues.slice(s![..n_components]).to_owned();
        let explained_variance_ratio = if total_variance > 0.0 {
            &explained_variance / total_variance
        } else {
            Array1::zeros(n_components)
        };

        let mut cumulative = Array1::zeros(n_components);
        let mut running = 0.0;
        for i in 0..n_components {
            running += explained_variance_ratio[i];
            cumulative[i] = running;
        }

        Ok(Self {
            n_components,
            components: eigenvectors.slice(s![.., ..n_components]).to_owned(),
            explained_variance,
            explained_variance_ratio,
            cumulative_variance_ratio: cumulative,
            mean,
        })
    }

    /// Fit PCA keeping the fewest leading components whose cumulative
    /// explained variance reaches `threshold`
    pub fn fit_with_variance_threshold(data: &Array2<f64>, threshold: f64) -> Result<Self> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(RegimeError::Configuration(format!(
                "variance threshold must be in (0, 1], got {}",
                threshold
            )));
        }

        let full = Self::fit(data, None)?;
        let n_components = full
            .cumulative_variance_ratio
            .iter()
            .position(|&v| v >= threshold - 1e-10)
            .map(|i| i + 1)
            .unwrap_or(full.n_components);

        Ok(full.truncate(n_components))
    }

    /// Keep only the first `n` components of an already fitted model
    fn truncate(mut self, n: usize) -> Self {
        let n = n.clamp(1, self.n_components);
        self.components = self.components.slice(s![.., ..n]).to_owned();
        self.explained_variance = self.explained_variance.slice(s![..n]).to_owned();
        self.explained_variance_ratio = self.explained_variance_ratio.slice(s![..n]).to_owned();
        self.cumulative_variance_ratio = self.cumulative_variance_ratio.slice(s![..n]).to_owned();
        self.n_components = n;
        self
    }

    /// Project data onto the retained components
    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        (data - &self.mean).dot(&self.components)
    }

    /// Map component scores back to the original feature space
    pub fn inverse_transform(&self, scores: &Array2<f64>) -> Array2<f64> {
        scores.dot(&self.components.t()) + &self.mean
    }

    /// Cumulative variance explained by the retained components
    pub fn retained_variance(&self) -> f64 {
        self.cumulative_variance_ratio
            .last()
            .copied()
            .unwrap_or(0.0)
    }
}

/// Eigen-decomposition of a symmetric matrix, eigenvalues descending.
///
/// Negative round-off eigenvalues are clamped to zero. Each eigenvector is
/// signed so that its largest-magnitude entry is positive.
fn symmetric_eigen(matrix: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = matrix.nrows();
    let m = DMatrix::from_fn(n, n, |i, j| matrix[[i, j]]);
    let eigen = SymmetricEigen::new(m);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut values = Array1::zeros(n);
    let mut vectors = Array2::zeros((n, n));
    for (col, &idx) in order.iter().enumerate() {
        values[col] = eigen.eigenvalues[idx].max(0.0);

        let v = eigen.eigenvectors.column(idx);
        let pivot = v
            .iter()
            .copied()
            .fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
        let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
        for row in 0..n {
            vectors[[row, col]] = sign * v[row];
        }
    }

    (values, vectors)
}

/// Reduce a standardized matrix to its leading principal components.
///
/// Returns the component scores and how many components were kept.
pub fn reduce_dimensions(
    standardized: &Array2<f64>,
    variance_threshold: f64,
) -> Result<(Array2<f64>, usize)> {
    let pca = PcaModel::fit_with_variance_threshold(standardized, variance_threshold)?;
    Ok((pca.transform(standardized), pca.n_components))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_known_eigenvalues() {
        let matrix = array![[4.0, 2.0], [2.0, 3.0]];
        let (values, vectors) = symmetric_eigen(&matrix);

        let disc = (0.25_f64 + 4.0).sqrt();
        assert!((values[0] - (3.5 + disc)).abs() < 1e-10);
        assert!((values[1] - (3.5 - disc)).abs() < 1e-10);

        // A v = λ v for the leading pair
        let v = vectors.column(0).to_owned();
        let av = matrix.dot(&v);
        for i in 0..2 {
            assert!((av[i] - values[0] * v[i]).abs() < 1e-10);
        }
    }

    #[test]
    fn test_fit_shapes_and_ratios() {
        let data = array![
            [1.0, 2.0, 3.0],
            [4.0, 5.0, 6.5],
            [7.0, 8.0, 9.0],
            [2.0, 3.5, 4.0],
            [5.0, 6.0, 7.0]
        ];
        let pca = PcaModel::fit(&data, Some(2)).unwrap();

        assert_eq!(pca.n_components, 2);
        assert_eq!(pca.components.shape(), &[3, 2]);
        assert!(pca.explained_variance_ratio.sum() <= 1.0 + 1e-10);
        assert!(pca.cumulative_variance_ratio[1] >= pca.cumulative_variance_ratio[0]);
    }

    #[test]
    fn test_threshold_selects_minimum_components() {
        // Nearly one-dimensional data: first component carries almost everything
        let data = array![
            [1.0, 2.0, 0.01],
            [2.0, 4.0, -0.01],
            [3.0, 6.1, 0.02],
            [4.0, 8.0, -0.02],
            [5.0, 9.9, 0.0]
        ];
        let pca = PcaModel::fit_with_variance_threshold(&data, 0.95).unwrap();
        assert_eq!(pca.n_components, 1);
        assert!(pca.retained_variance() >= 0.95);
    }

    #[test]
    fn test_full_variance_reconstructs() {
        let data = array![[1.0, 2.0], [3.0, 1.0], [5.0, 6.0], [7.0, 4.0]];
        let pca = PcaModel::fit_with_variance_threshold(&data, 1.0).unwrap();
        assert_eq!(pca.n_components, 2);

        let reconstructed = pca.inverse_transform(&pca.transform(&data));
        let error: f64 = (&data - &reconstructed).iter().map(|x| x.abs()).sum();
        assert!(error < 1e-9);
    }

    #[test]
    fn test_invalid_threshold() {
        let data = array![[1.0, 2.0], [3.0, 1.0], [5.0, 6.0]];
        assert!(matches!(
            reduce_dimensions(&data, 0.0),
            Err(RegimeError::Configuration(_))
        ));
    }
}
