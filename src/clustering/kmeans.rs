//! Seeded Lloyd's k-means with Euclidean or cosine distance

use crate::error::{RegimeError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Distance used for assignment and inertia
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// ℓ2 distance
    Euclidean,
    /// 1 - cosine similarity
    Cosine,
}

impl DistanceMetric {
    /// Distance between two vectors
    pub fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).powi(2))
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Cosine => {
                let na = a.dot(&a).sqrt();
                let nb = b.dot(&b).sqrt();
                if na <= f64::EPSILON || nb <= f64::EPSILON {
                    return 1.0;
                }
                (1.0 - a.dot(&b) / (na * nb)).clamp(0.0, 2.0)
            }
        }
    }

    /// Map rows into the space the metric's centroids live in.
    /// Cosine works on unit vectors; zero rows stay zero.
    fn prepare(&self, data: &Array2<f64>) -> Array2<f64> {
        match self {
            DistanceMetric::Euclidean => data.clone(),
            DistanceMetric::Cosine => {
                let mut out = data.clone();
                for mut row in out.rows_mut() {
                    let norm = row.dot(&row).sqrt();
                    if norm > f64::EPSILON {
                        row /= norm;
                    }
                }
                out
            }
        }
    }

    /// Turn a member mean into a centroid
    fn finish_centroid(&self, mut centroid: Array1<f64>) -> Array1<f64> {
        if *self == DistanceMetric::Cosine {
            let norm = centroid.dot(&centroid).sqrt();
            if norm > f64::EPSILON {
                centroid /= norm;
            }
        }
        centroid
    }
}

/// k-means settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeans {
    /// Number of clusters
    pub k: usize,
    /// Distance metric
    pub metric: DistanceMetric,
    /// Number of k-means++ restarts; lowest inertia wins
    pub n_init: usize,
    /// Iteration bound per restart
    pub max_iter: usize,
    /// Largest centroid shift treated as converged
    pub tol: f64,
    /// Base seed; restart `i` uses `seed + i`
    pub seed: u64,
}

impl KMeans {
    /// Create k-means with default iteration settings
    pub fn new(k: usize, metric: DistanceMetric) -> Self {
        Self {
            k,
            metric,
            n_init: 10,
            max_iter: 300,
            tol: 1e-8,
            seed: 42,
        }
    }

    /// Set number of restarts
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    /// Set iteration bound
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    /// Set convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set base seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Same settings with a different k
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Fit on the rows of `data`
    pub fn fit(&self, data: &Array2<f64>) -> Result<KMeansFit> {
        let n = data.nrows();
        if self.k == 0 {
            return Err(RegimeError::Configuration("k must be positive".to_string()));
        }
        if n < self.k {
            return Err(RegimeError::InsufficientData(format!(
                "k-means with k={} needs at least {} rows, got {}",
                self.k, self.k, n
            )));
        }

        let prepared = self.metric.prepare(data);
        let mut best: Option<KMeansFit> = None;

        for run in 0..self.n_init.max(1) {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(run as u64));
            let initial = self.init_plus_plus(&prepared, &mut rng);
            let fit = self.lloyd(&prepared, initial);

            let better = best
                .as_ref()
                .map(|b| fit.inertia < b.inertia)
                .unwrap_or(true);
            if better {
                best = Some(fit);
            }
        }

        best.ok_or_else(|| RegimeError::InsufficientData("k-means produced no fit".to_string()))
    }

    /// k-means++ seeding: each new center is drawn with probability
    /// proportional to its squared distance from the nearest chosen center
    fn init_plus_plus(&self, data: &Array2<f64>, rng: &mut ChaCha8Rng) -> Array2<f64> {
        let n = data.nrows();
        let mut chosen: Vec<usize> = vec![rng.gen_range(0..n)];
        let mut nearest: Vec<f64> = (0..n)
            .map(|i| self.metric.distance(data.row(i), data.row(chosen[0])).powi(2))
            .collect();

        while chosen.len() < self.k {
            let total: f64 = nearest.iter().sum();
            let next = if total > 0.0 {
                let target = rng.gen::<f64>() * total;
                let mut cumsum = 0.0;
                let mut pick = n - 1;
                for (i, &d) in nearest.iter().enumerate() {
                    cumsum += d;
                    if d > 0.0 && cumsum >= target {
                        pick = i;
                        break;
                    }
                }
                pick
            } else {
                (0..n).find(|i| !chosen.contains(i)).unwrap_or(0)
            };

            chosen.push(next);
            for (i, slot) in nearest.iter_mut().enumerate() {
                let d = self.metric.distance(data.row(i), data.row(next)).powi(2);
                if d < *slot {
                    *slot = d;
                }
            }
        }

        data.select(Axis(0), &chosen)
    }

    fn lloyd(&self, data: &Array2<f64>, mut centroids: Array2<f64>) -> KMeansFit {
        let (n, d) = data.dim();
        let mut labels = assign(data, &centroids, self.metric).0;
        let mut converged = false;
        let mut n_iter = 0;

        for iter in 1..=self.max_iter {
            n_iter = iter;

            let mut sums = Array2::<f64>::zeros((self.k, d));
            let mut counts = vec![0usize; self.k];
            for (i, &label) in labels.iter().enumerate() {
                let mut row = sums.row_mut(label);
                row += &data.row(i);
                counts[label] += 1;
            }

            let mut updated = Array2::zeros((self.k, d));
            let mut reseeded: Vec<usize> = Vec::new();
            for j in 0..self.k {
                if counts[j] > 0 {
                    let mean = sums.row(j).to_owned() / counts[j] as f64;
                    updated.row_mut(j).assign(&self.metric.finish_centroid(mean));
                } else {
                    // Empty cluster: reseed at the point worst served by its centroid,
                    // never one already taken by another empty cluster this round
                    let far = (0..n)
                        .filter(|i| !reseeded.contains(i))
                        .max_by(|&a, &b| {
                            let da = self.metric.distance(data.row(a), centroids.row(labels[a]));
                            let db = self.metric.distance(data.row(b), centroids.row(labels[b]));
                            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                        })
                        .unwrap_or(0);
                    updated.row_mut(j).assign(&data.row(far));
                    labels[far] = j;
                    reseeded.push(far);
                }
            }

            let shift = (&updated - &centroids)
                .rows()
                .into_iter()
                .map(|r| r.dot(&r).sqrt())
                .fold(0.0_f64, f64::max);
            centroids = updated;
            labels = assign(data, &centroids, self.metric).0;

            if shift <= self.tol {
                converged = true;
                break;
            }
        }

        let (labels, nearest) = assign(data, &centroids, self.metric);
        let inertia = nearest.iter().map(|d| d * d).sum();

        KMeansFit {
            metric: self.metric,
            centroids,
            labels,
            inertia,
            n_iter,
            converged,
        }
    }
}

/// Nearest centroid per row (lowest index wins ties) and its distance
fn assign(data: &Array2<f64>, centroids: &Array2<f64>, metric: DistanceMetric) -> (Vec<usize>, Vec<f64>) {
    let mut labels = Vec::with_capacity(data.nrows());
    let mut dists = Vec::with_capacity(data.nrows());
    for row in data.rows() {
        let mut best = (0, f64::INFINITY);
        for (j, c) in centroids.rows().into_iter().enumerate() {
            let dist = metric.distance(row, c);
            if dist < best.1 {
                best = (j, dist);
            }
        }
        labels.push(best.0);
        dists.push(best.1);
    }
    (labels, dists)
}

/// Result of a k-means fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansFit {
    /// Metric the model was fit with
    pub metric: DistanceMetric,
    /// Centroids as rows (unit length for cosine)
    pub centroids: Array2<f64>,
    /// Cluster of each fitted row
    pub labels: Vec<usize>,
    /// Sum of squared distances to assigned centroids
    pub inertia: f64,
    /// Iterations used by the winning restart
    pub n_iter: usize,
    /// Whether the winning restart converged within the bound
    pub converged: bool,
}

impl KMeansFit {
    /// Number of clusters
    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    /// Distance from every row of `data` to every centroid (rows x k)
    pub fn distances(&self, data: &Array2<f64>) -> Array2<f64> {
        let mut out = Array2::zeros((data.nrows(), self.k()));
        for (i, row) in data.rows().into_iter().enumerate() {
            for (j, c) in self.centroids.rows().into_iter().enumerate() {
                out[[i, j]] = self.metric.distance(row, c);
            }
        }
        out
    }

    /// Nearest centroid for each row of `data`
    pub fn predict(&self, data: &Array2<f64>) -> Vec<usize> {
        assign(data, &self.centroids, self.metric).0
    }

    /// Members per cluster on the fitted data
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}
