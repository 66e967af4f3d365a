//! Regime detection module
//!
//! Two-stage modified k-means: a Euclidean k=2 split isolates atypical
//! months as Regime 0, a cosine k-means splits the remaining months into
//! r typical regimes, and centroid distances from both stages are blended
//! into one probability distribution per month.

mod detector;
mod outlier;
mod probability;
mod profile;
mod transition;
mod typical;

pub use detector::{RegimeClassification, RegimeDetector, RollingWindow};
pub use outlier::{partition_outliers, OutlierPartition};
pub use probability::{
    blend_month, distances_to_probabilities, scaled_outlier_probability,
    synthesize_probabilities, RegimeDistribution,
};
pub use profile::{profile_regimes, RegimeProfile};
pub use transition::{estimate_transitions, TransitionMatrix};
pub use typical::{partition_regimes, RegimePartition};
