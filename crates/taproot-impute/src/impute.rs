use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument, warn};

use taproot_rf::{ForestConfig, MtryRule, ProximityMode};

use crate::error::ImputeError;

/// Stopping rule for the refinement loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopRule {
    /// Run exactly this many refinement iterations. This is the
    /// authoritative mode: published error figures assume it.
    FixedIterations(usize),
    /// Stop once the relative change in preliminary-forest OOB error
    /// between consecutive iterations falls below `epsilon`, bounded
    /// by `max_iterations`.
    OobStabilized {
        /// Relative-change threshold, must be finite and positive.
        epsilon: f64,
        /// Hard bound on iterations.
        max_iterations: usize,
    },
}

/// OOB error of the preliminary forest at one refinement iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationStat {
    /// 1-based iteration number.
    pub iteration: usize,
    /// Final OOB error of that iteration's preliminary forest.
    pub oob_error: f64,
}

/// A dense matrix with every formerly missing cell filled.
#[derive(Debug, Clone, PartialEq)]
pub struct ImputedMatrix {
    rows: Vec<Vec<f64>>,
}

impl ImputedMatrix {
    /// Number of rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Row-major view of the matrix.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Consumes the matrix into its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }
}

/// Result of an imputation run.
#[derive(Debug, Clone)]
pub struct ImputeOutcome {
    matrix: ImputedMatrix,
    iterations: Vec<IterationStat>,
    stopped_early: bool,
    n_filled: usize,
}

impl ImputeOutcome {
    /// The completed matrix.
    #[must_use]
    pub fn matrix(&self) -> &ImputedMatrix {
        &self.matrix
    }

    /// Consumes the outcome into the completed matrix.
    #[must_use]
    pub fn into_matrix(self) -> ImputedMatrix {
        self.matrix
    }

    /// Per-iteration OOB error of the preliminary forests, in order.
    /// Empty when the input had no missing cells.
    #[must_use]
    pub fn iterations(&self) -> &[IterationStat] {
        &self.iterations
    }

    /// Whether an [`StopRule::OobStabilized`] rule fired before its
    /// iteration bound.
    #[must_use]
    pub fn stopped_early(&self) -> bool {
        self.stopped_early
    }

    /// Number of cells that were missing on input.
    #[must_use]
    pub fn n_filled(&self) -> usize {
        self.n_filled
    }
}

/// Configuration for proximity-weighted iterative imputation.
///
/// Missing cells start at their column median; each iteration then
/// fits a preliminary forest on the current fill and replaces every
/// missing cell with the proximity-weighted average of the column's
/// originally observed values. Cells whose proximity mass is zero keep
/// their current value for that iteration.
///
/// Defaults after [`ImputeConfig::new`]:
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `trees` | 300 |
/// | `mtry` | [`MtryRule::Sqrt`] |
/// | `stop_rule` | [`StopRule::FixedIterations`]`(10)` |
/// | `seed` | 42 |
#[derive(Debug, Clone)]
pub struct ImputeConfig {
    trees: usize,
    mtry: MtryRule,
    stop: StopRule,
    seed: u64,
}

impl Default for ImputeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ImputeConfig {
    /// Creates a configuration with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trees: 300,
            mtry: MtryRule::Sqrt,
            stop: StopRule::FixedIterations(10),
            seed: 42,
        }
    }

    /// Sets the preliminary forest size per iteration.
    #[must_use]
    pub fn with_trees(mut self, trees: usize) -> Self {
        self.trees = trees;
        self
    }

    /// Sets the per-split feature width of the preliminary forests.
    #[must_use]
    pub fn with_mtry(mut self, mtry: MtryRule) -> Self {
        self.mtry = mtry;
        self
    }

    /// Sets the stopping rule.
    #[must_use]
    pub fn with_stop_rule(mut self, stop: StopRule) -> Self {
        self.stop = stop;
        self
    }

    /// Sets the RNG seed; per-iteration forest seeds derive from it.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Preliminary forest size per iteration.
    #[must_use]
    pub fn trees(&self) -> usize {
        self.trees
    }

    /// Per-split feature width rule.
    #[must_use]
    pub fn mtry(&self) -> MtryRule {
        self.mtry
    }

    /// The stopping rule.
    #[must_use]
    pub fn stop_rule(&self) -> StopRule {
        self.stop
    }

    /// The RNG seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Imputes `values` (row-major, `None` = missing) guided by class
    /// `labels`.
    ///
    /// A complete input passes through unchanged with zero iterations.
    /// Observed cells are never modified.
    ///
    /// # Errors
    ///
    /// | Error | Condition |
    /// |-------|-----------|
    /// | [`ImputeError::EmptyDataset`] | `values` has no rows |
    /// | [`ImputeError::ZeroFeatures`] | rows have no columns |
    /// | [`ImputeError::FeatureCountMismatch`] | a row has the wrong width |
    /// | [`ImputeError::NonFiniteValue`] | an observed cell is NaN or infinite |
    /// | [`ImputeError::LabelCountMismatch`] | label and row counts differ |
    /// | [`ImputeError::AllMissingColumn`] | a column has no observed value |
    /// | [`ImputeError::InvalidIterationCount`] | a stop rule allows zero iterations |
    /// | [`ImputeError::InvalidEpsilon`] | a non-positive or non-finite epsilon |
    /// | [`ImputeError::Forest`] | a preliminary fit failed |
    #[instrument(skip_all, fields(n_samples = values.len(), trees = self.trees))]
    pub fn run(
        &self,
        values: &[Vec<Option<f64>>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<ImputeOutcome, ImputeError> {
        if values.is_empty() {
            return Err(ImputeError::EmptyDataset);
        }
        let n_features = values[0].len();
        if n_features == 0 {
            return Err(ImputeError::ZeroFeatures);
        }
        for (sample_index, row) in values.iter().enumerate() {
            if row.len() != n_features {
                return Err(ImputeError::FeatureCountMismatch {
                    expected: n_features,
                    got: row.len(),
                    sample_index,
                });
            }
            for (feature_index, cell) in row.iter().enumerate() {
                if let Some(value) = cell
                    && !value.is_finite()
                {
                    return Err(ImputeError::NonFiniteValue {
                        sample_index,
                        feature_index,
                    });
                }
            }
        }
        if labels.len() != values.len() {
            return Err(ImputeError::LabelCountMismatch {
                n_samples: values.len(),
                n_labels: labels.len(),
            });
        }

        let (max_iterations, epsilon) = match self.stop {
            StopRule::FixedIterations(iterations) => {
                if iterations == 0 {
                    return Err(ImputeError::InvalidIterationCount { iterations });
                }
                (iterations, None)
            }
            StopRule::OobStabilized {
                epsilon,
                max_iterations,
            } => {
                if max_iterations == 0 {
                    return Err(ImputeError::InvalidIterationCount {
                        iterations: max_iterations,
                    });
                }
                if !epsilon.is_finite() || epsilon <= 0.0 {
                    return Err(ImputeError::InvalidEpsilon { epsilon });
                }
                (max_iterations, Some(epsilon))
            }
        };

        let mut missing: Vec<(usize, usize)> = Vec::new();
        let mut observed_rows: Vec<Vec<usize>> = vec![Vec::new(); n_features];
        for (i, row) in values.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                match cell {
                    Some(_) => observed_rows[j].push(i),
                    None => missing.push((i, j)),
                }
            }
        }
        for (feature_index, observed) in observed_rows.iter().enumerate() {
            if observed.is_empty() {
                return Err(ImputeError::AllMissingColumn { feature_index });
            }
        }

        if missing.is_empty() {
            debug!("no missing cells, matrix passes through unchanged");
            let rows = values
                .iter()
                .map(|row| row.iter().copied().flatten().collect())
                .collect();
            return Ok(ImputeOutcome {
                matrix: ImputedMatrix { rows },
                iterations: Vec::new(),
                stopped_early: false,
                n_filled: 0,
            });
        }

        let n_filled = missing.len();
        let medians: Vec<f64> = (0..n_features)
            .map(|j| column_median(values, j, &observed_rows[j]))
            .collect();
        let mut filled: Vec<Vec<f64>> = values
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, cell)| cell.unwrap_or(medians[j]))
                    .collect()
            })
            .collect();
        info!(n_missing = n_filled, "rough median fill complete");

        let mut master_rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut iterations = Vec::new();
        let mut stopped_early = false;
        let mut previous_error: Option<f64> = None;

        for iteration in 1..=max_iterations {
            let forest_seed: u64 = master_rng.r#gen();
            let config = ForestConfig::new(self.trees)?
                .with_mtry(self.mtry)
                .with_proximity(ProximityMode::Enabled)
                .with_seed(forest_seed);
            let model = config.fit(&filled, labels, feature_names)?;
            let oob_error = model.oob().error();
            iterations.push(IterationStat {
                iteration,
                oob_error,
            });

            let proximity = model
                .proximity()
                .expect("proximity enabled for imputation fits");

            let mut zero_mass = 0usize;
            for &(i, j) in &missing {
                let mut numerator = 0.0;
                let mut denominator = 0.0;
                for &k in &observed_rows[j] {
                    let weight = proximity.value(i, k);
                    if weight > 0.0
                        && let Some(value) = values[k][j]
                    {
                        numerator += weight * value;
                        denominator += weight;
                    }
                }
                if denominator > 0.0 {
                    filled[i][j] = numerator / denominator;
                } else {
                    zero_mass += 1;
                }
            }
            if zero_mass > 0 {
                warn!(
                    iteration,
                    n_cells = zero_mass,
                    "cells with zero proximity mass keep their current value"
                );
            }
            debug!(iteration, oob_error, "refinement pass complete");

            if let Some(epsilon) = epsilon
                && let Some(previous) = previous_error
            {
                let change = if previous > 0.0 {
                    (previous - oob_error).abs() / previous
                } else {
                    (previous - oob_error).abs()
                };
                if change < epsilon {
                    stopped_early = true;
                    info!(iteration, change, "imputation converged");
                    break;
                }
            }
            previous_error = Some(oob_error);
        }

        info!(
            n_filled,
            n_iterations = iterations.len(),
            stopped_early,
            "imputation complete"
        );
        Ok(ImputeOutcome {
            matrix: ImputedMatrix { rows: filled },
            iterations,
            stopped_early,
            n_filled,
        })
    }
}

/// Median of the observed values in one column.
fn column_median(values: &[Vec<Option<f64>>], column: usize, observed: &[usize]) -> f64 {
    let mut sorted: Vec<f64> = observed
        .iter()
        .filter_map(|&i| values[i][column])
        .collect();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        0.5 * (sorted[mid - 1] + sorted[mid])
    }
}
