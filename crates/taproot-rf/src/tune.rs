use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use crate::config::{ForestConfig, MtryRule, ProximityMode};
use crate::error::ForestError;

/// One evaluated width during a search.
#[derive(Debug, Clone, PartialEq)]
pub struct TuneTrial {
    /// The per-split feature width that was tried.
    pub mtry: usize,
    /// Final OOB error of the forest trained at this width.
    pub oob_error: f64,
}

/// Outcome of a width search.
#[derive(Debug, Clone)]
pub struct TuneResult {
    trials: Vec<TuneTrial>,
    start_mtry: usize,
    best_mtry: usize,
    best_error: f64,
}

impl TuneResult {
    /// All evaluated widths, ascending by width. Each width was fitted
    /// exactly once.
    #[must_use]
    pub fn trials(&self) -> &[TuneTrial] {
        &self.trials
    }

    /// The width the search started from.
    #[must_use]
    pub fn start_mtry(&self) -> usize {
        self.start_mtry
    }

    /// The width with the lowest OOB error; ties go to the smaller
    /// width.
    #[must_use]
    pub fn best_mtry(&self) -> usize {
        self.best_mtry
    }

    /// The OOB error at [`best_mtry`](Self::best_mtry).
    #[must_use]
    pub fn best_error(&self) -> f64 {
        self.best_error
    }
}

/// Geometric search for the OOB-optimal per-split feature width.
///
/// Starting from the width the base configuration resolves to, the
/// search walks outward in both directions: shrinking divides by the
/// step factor (ceiling, floored at 1), growing multiplies (floor,
/// capped at the feature count). A direction keeps stepping while the
/// relative improvement `1 - err_new / err_best` stays at or above the
/// threshold; an oscillating search is cut off by `max_steps` per
/// direction and the best width seen so far is returned.
///
/// Every trial clones the base configuration, so all trials share the
/// same tree count and seed and differ only in width. Proximity is
/// forced off for trials.
///
/// Defaults after [`MtrySearch::new`]:
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `step_factor` | 1.5 |
/// | `improve` | 1e-5 |
/// | `max_steps` | 10 |
#[derive(Debug, Clone)]
pub struct MtrySearch {
    step_factor: f64,
    improve: f64,
    max_steps: usize,
}

impl Default for MtrySearch {
    fn default() -> Self {
        Self::new()
    }
}

impl MtrySearch {
    /// Creates a search with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            step_factor: 1.5,
            improve: 1e-5,
            max_steps: 10,
        }
    }

    /// Sets the geometric step factor (must be finite and above 1).
    #[must_use]
    pub fn with_step_factor(mut self, step_factor: f64) -> Self {
        self.step_factor = step_factor;
        self
    }

    /// Sets the minimum relative improvement to keep stepping.
    #[must_use]
    pub fn with_improve(mut self, improve: f64) -> Self {
        self.improve = improve;
        self
    }

    /// Sets the safety bound on steps per direction.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// The geometric step factor.
    #[must_use]
    pub fn step_factor(&self) -> f64 {
        self.step_factor
    }

    /// The minimum relative improvement.
    #[must_use]
    pub fn improve(&self) -> f64 {
        self.improve
    }

    /// The safety bound on steps per direction.
    #[must_use]
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Runs the search on row-major `features` with integer `labels`.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidStepFactor`],
    /// [`ForestError::InvalidImprovement`], or
    /// [`ForestError::InvalidMaxSteps`] for bad search parameters,
    /// [`ForestError::EmptyDataset`] / [`ForestError::ZeroFeatures`]
    /// for degenerate data, and any training error from a trial fit.
    #[instrument(skip_all, fields(step_factor = self.step_factor, n_samples = features.len()))]
    pub fn search(
        &self,
        base: &ForestConfig,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<TuneResult, ForestError> {
        if !self.step_factor.is_finite() || self.step_factor <= 1.0 {
            return Err(ForestError::InvalidStepFactor {
                step_factor: self.step_factor,
            });
        }
        if !self.improve.is_finite() || self.improve < 0.0 {
            return Err(ForestError::InvalidImprovement {
                improve: self.improve,
            });
        }
        if self.max_steps == 0 {
            return Err(ForestError::InvalidMaxSteps {
                max_steps: self.max_steps,
            });
        }
        if features.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        let n_features = features[0].len();
        if n_features == 0 {
            return Err(ForestError::ZeroFeatures);
        }

        let start = base.mtry().resolve(n_features)?;
        let mut evaluated: BTreeMap<usize, f64> = BTreeMap::new();
        let start_error =
            evaluate_width(base, start, features, labels, feature_names, &mut evaluated)?;

        for grow in [false, true] {
            let mut best_error = start_error;
            let mut current = start;
            for _ in 0..self.max_steps {
                let next = if grow {
                    ((current as f64 * self.step_factor).floor() as usize).min(n_features)
                } else {
                    ((current as f64 / self.step_factor).ceil() as usize).max(1)
                };
                if next == current {
                    break;
                }
                current = next;
                let error =
                    evaluate_width(base, current, features, labels, feature_names, &mut evaluated)?;
                let improvement = if best_error > 0.0 {
                    1.0 - error / best_error
                } else {
                    0.0
                };
                debug!(mtry = current, oob_error = error, improvement, grow, "step evaluated");
                if improvement < self.improve {
                    break;
                }
                best_error = error;
            }
        }

        let mut best_mtry = start;
        let mut best_error = start_error;
        for (&mtry, &error) in &evaluated {
            if error < best_error || (error == best_error && mtry < best_mtry) {
                best_mtry = mtry;
                best_error = error;
            }
        }

        let trials: Vec<TuneTrial> = evaluated
            .into_iter()
            .map(|(mtry, oob_error)| TuneTrial { mtry, oob_error })
            .collect();
        info!(
            start_mtry = start,
            best_mtry,
            best_error,
            n_trials = trials.len(),
            "width search complete"
        );

        Ok(TuneResult {
            trials,
            start_mtry: start,
            best_mtry,
            best_error,
        })
    }
}

/// Fits the base configuration at one width, reusing a cached error if
/// the width was already tried.
fn evaluate_width(
    base: &ForestConfig,
    mtry: usize,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
    evaluated: &mut BTreeMap<usize, f64>,
) -> Result<f64, ForestError> {
    if let Some(&error) = evaluated.get(&mtry) {
        return Ok(error);
    }
    let config = base
        .clone()
        .with_mtry(MtryRule::Fixed(mtry))
        .with_proximity(ProximityMode::Disabled);
    let model = config.fit(features, labels, feature_names)?;
    let error = model.oob().error();
    info!(mtry, oob_error = error, "trial complete");
    evaluated.insert(mtry, error);
    Ok(error)
}
