//! Clustering primitives
//!
//! Seeded k-means under Euclidean or cosine distance, plus the elbow rules
//! used to pick the number of typical regimes.

mod elbow;
mod kmeans;

pub use elbow::{inertia_curve, ElbowMethod, ElbowRule, FixedK, MaxCurvature};
pub use kmeans::{DistanceMetric, KMeans, KMeansFit};
