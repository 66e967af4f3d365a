//! End-to-end regime classification pipeline

use super::outlier::{partition_outliers, OutlierPartition};
use super::probability::{synthesize_probabilities, RegimeDistribution};
use super::profile::{profile_regimes, RegimeProfile};
use super::transition::{estimate_transitions, TransitionMatrix};
use super::typical::{partition_regimes, RegimePartition};
use crate::clustering::ElbowRule;
use crate::config::RegimeConfig;
use crate::data::{MacroPanel, TransformTable};
use crate::error::{Diagnostics, RegimeError, Result};
use crate::preprocess::{Preprocessor, StateMatrix};
use chrono::NaiveDate;
use ndarray::Axis;
use rayon::prelude::*;
use serde::Serialize;

/// Everything one run produces
#[derive(Debug, Clone, Serialize)]
pub struct RegimeClassification {
    /// Months that were classified (after differencing)
    pub months: Vec<NaiveDate>,
    /// Regime distribution per month
    pub distributions: Vec<RegimeDistribution>,
    /// Most likely regime per month
    pub hard_labels: Vec<usize>,
    /// r + 1
    pub n_regimes: usize,
    /// Principal components retained by preprocessing
    pub component_count: usize,
    /// ℓ2 stage output
    pub outliers: OutlierPartition,
    /// Cosine stage output
    pub regimes: RegimePartition,
    /// Transition matrix over hard labels
    pub transitions: TransitionMatrix,
    /// Per-regime variable summaries
    pub profiles: Vec<RegimeProfile>,
    /// Non-fatal warnings from every stage
    pub diagnostics: Diagnostics,
}

impl RegimeClassification {
    /// Number of typical regimes r
    pub fn chosen_k(&self) -> usize {
        self.regimes.chosen_k
    }

    /// Distribution of the last classified month
    pub fn current(&self) -> Option<&RegimeDistribution> {
        self.distributions.last()
    }

    /// Regime distribution projected one month past the end of the panel
    pub fn next_month_distribution(&self) -> Result<Vec<f64>> {
        let current = self.current().ok_or_else(|| {
            RegimeError::InsufficientData("no classified months".to_string())
        })?;
        self.transitions.next_distribution(&current.probabilities)
    }

    /// Print a short report
    pub fn print_summary(&self) {
        println!("\n=== Regime Classification ===");
        println!("Months classified: {}", self.months.len());
        println!("Principal components: {}", self.component_count);
        println!(
            "Regimes: {} (1 outlier + {} typical)",
            self.n_regimes,
            self.chosen_k()
        );
        println!();

        for profile in &self.profiles {
            let persistence = self.transitions.probabilities[[profile.regime, profile.regime]];
            println!(
                "  Regime {}: {:>4} months ({:>5.1}%), persistence {:.3}",
                profile.regime,
                profile.months,
                profile.frequency * 100.0,
                persistence
            );
        }

        println!("\nTransition Matrix:");
        for i in 0..self.n_regimes {
            print!("  Regime {}: ", i);
            for j in 0..self.n_regimes {
                print!("{:.2}  ", self.transitions.probabilities[[i, j]]);
            }
            println!();
        }

        if !self.diagnostics.is_clean() {
            println!("\nWarnings:");
            for w in &self.diagnostics.warnings {
                println!("  - {}", w);
            }
        }
    }
}

/// Classification of one trailing window
#[derive(Debug)]
pub struct RollingWindow {
    /// First raw month in the window
    pub start_month: NaiveDate,
    /// Last raw month in the window
    pub end_month: NaiveDate,
    /// Pipeline result for this window
    pub result: Result<RegimeClassification>,
}

/// Runs preprocessing, both clustering stages, probability synthesis and
/// transition estimation
pub struct RegimeDetector {
    config: RegimeConfig,
    elbow_rule: Box<dyn ElbowRule>,
}

impl RegimeDetector {
    /// Create a detector; the configuration is validated here
    pub fn new(config: RegimeConfig) -> Result<Self> {
        config.validate()?;
        let elbow_rule = config.elbow.rule();
        Ok(Self { config, elbow_rule })
    }

    /// Replace the elbow rule named in the configuration
    pub fn with_elbow_rule(mut self, rule: Box<dyn ElbowRule>) -> Self {
        self.elbow_rule = rule;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    /// Classify a raw panel
    pub fn detect(&self, panel: &MacroPanel, table: &TransformTable) -> Result<RegimeClassification> {
        let states = Preprocessor::new(self.config.variance_threshold).run(panel, table)?;
        self.classify(&states)
    }

    /// Classify already preprocessed state vectors
    pub fn classify(&self, states: &StateMatrix) -> Result<RegimeClassification> {
        let mut diagnostics = Diagnostics::new();

        let (outliers, diag) = partition_outliers(&states.vectors, &self.config)?;
        diagnostics.extend(diag);

        let typical = states.vectors.select(Axis(0), &outliers.typical_indices);
        let (regimes, diag) = partition_regimes(&typical, &self.config, self.elbow_rule.as_ref())?;
        diagnostics.extend(diag);

        // Outlier months are scored, not fitted, against the cosine centroids
        let cosine_all = regimes.score(&states.vectors);
        let distributions = synthesize_probabilities(
            &states.months,
            &outliers.l2_distances,
            &cosine_all,
            self.config.outlier_clamp,
        )?;

        let hard_labels: Vec<usize> = distributions.iter().map(|d| d.most_likely()).collect();
        let n_regimes = regimes.chosen_k + 1;

        let (transitions, diag) = estimate_transitions(&hard_labels, n_regimes)?;
        diagnostics.extend(diag);

        let profiles = profile_regimes(&states.transformed, &hard_labels, n_regimes);

        tracing::info!(
            "Classified {} months into {} regimes ({} warnings)",
            states.n_months(),
            n_regimes,
            diagnostics.warnings.len()
        );

        Ok(RegimeClassification {
            months: states.months.clone(),
            distributions,
            hard_labels,
            n_regimes,
            component_count: states.component_count,
            outliers,
            regimes,
            transitions,
            profiles,
            diagnostics,
        })
    }

    /// Run the full pipeline on every trailing window of `window` raw months.
    ///
    /// Windows are independent and run in parallel; a failing window does not
    /// affect the others.
    pub fn detect_rolling(
        &self,
        panel: &MacroPanel,
        table: &TransformTable,
        window: usize,
    ) -> Result<Vec<RollingWindow>> {
        if window < 2 {
            return Err(RegimeError::Configuration(format!(
                "rolling window must span at least 2 months, got {}",
                window
            )));
        }
        if window > panel.n_months() {
            return Err(RegimeError::InsufficientData(format!(
                "window of {} months exceeds panel length {}",
                window,
                panel.n_months()
            )));
        }

        let ends: Vec<usize> = (window..=panel.n_months()).collect();
        tracing::info!("Rolling classification over {} windows of {} months", ends.len(), window);

        let windows = ends
            .par_iter()
            .map(|&end| {
                let start = end - window;
                let result = panel
                    .slice(start, end)
                    .and_then(|sub| self.detect(&sub, table));
                RollingWindow {
                    start_month: panel.months()[start],
                    end_month: panel.months()[end - 1],
                    result,
                }
            })
            .collect();

        Ok(windows)
    }
}
