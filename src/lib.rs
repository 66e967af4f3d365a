//! # Macro Regime - Macroeconomic Regime Detection for Tactical Asset Allocation
//!
//! Classifies months of a macroeconomic panel (FRED-MD style) into regimes
//! with a modified two-stage k-means and assigns every month a probability
//! distribution over regimes, plus a regime transition matrix.
//!
//! ## Modules
//!
//! - `data` - Monthly panel, transformation codes and FRED-MD loader
//! - `preprocess` - Standardization and PCA
//! - `clustering` - Seeded k-means (Euclidean / cosine) and elbow rules
//! - `regime` - Outlier split, typical regimes, probabilities, transitions
//! - `config` - Pipeline configuration
//! - `error` - Error types and diagnostics

pub mod clustering;
pub mod config;
pub mod data;
pub mod error;
pub mod preprocess;
pub mod regime;

pub use config::RegimeConfig;
pub use data::{MacroPanel, TransformCode, TransformTable};
pub use error::{Diagnostics, RegimeError, RegimeWarning, Result};
pub use regime::{RegimeClassification, RegimeDetector, RegimeDistribution, TransitionMatrix};

/// Commonly used types
pub mod prelude {
    pub use crate::clustering::{DistanceMetric, ElbowMethod, ElbowRule, FixedK, KMeans, MaxCurvature};
    pub use crate::config::RegimeConfig;
    pub use crate::data::{apply_transform, load_fred_md, MacroPanel, TransformCode, TransformTable};
    pub use crate::error::{Diagnostics, RegimeError, RegimeWarning, Result};
    pub use crate::preprocess::{Preprocessor, StateMatrix};
    pub use crate::regime::{
        RegimeClassification, RegimeDetector, RegimeDistribution, RegimeProfile, TransitionMatrix,
    };
}
