use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::config::{ForestConfig, ProximityMode};
use crate::confusion::ConfusionMatrix;
use crate::error::ForestError;
use crate::importance::rank_features;
use crate::node::NodeIndex;
use crate::oob::OobAccumulator;
use crate::proximity::ProximityAccumulator;
use crate::result::{TrainedModel, TrainingMetadata};
use crate::tree::{DecisionTree, TreeParams};

/// An ensemble of fitted decision trees.
#[derive(Debug, Clone)]
pub struct Forest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
    feature_names: Vec<String>,
}

impl Forest {
    /// Number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of feature columns the forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of classes the forest predicts over.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Feature column names, in training order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// The fitted trees, in training order.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

/// Per-tree training output, collected in tree order.
struct TreeOutput {
    tree: DecisionTree,
    oob_predictions: Vec<(usize, usize)>,
    leaves: Option<Vec<NodeIndex>>,
}

/// Draws `n_samples` indices with replacement and returns the draw
/// together with its out-of-bag complement (ascending, no duplicates).
pub(crate) fn bootstrap_sample(
    n_samples: usize,
    rng: &mut ChaCha8Rng,
) -> (Vec<usize>, Vec<usize>) {
    let mut in_bag = vec![false; n_samples];
    let mut draw = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let index = rng.gen_range(0..n_samples);
        in_bag[index] = true;
        draw.push(index);
    }
    let oob = (0..n_samples).filter(|&i| !in_bag[i]).collect();
    (draw, oob)
}

/// Trains a random forest on row-major `features` with integer class
/// `labels`.
///
/// Each tree draws its own seed from a master RNG keyed on the
/// configured seed, so results are identical across thread counts and
/// repeated runs. Trees grow on bootstrap samples the same size as the
/// dataset; out-of-bag samples are scored by every tree that excluded
/// them, producing the error curve, the confusion matrix, and (when
/// enabled) the proximity matrix.
///
/// # Errors
///
/// | Error | Condition |
/// |-------|-----------|
/// | [`ForestError::EmptyDataset`] | `features` has no rows |
/// | [`ForestError::ZeroFeatures`] | rows have no columns |
/// | [`ForestError::FeatureCountMismatch`] | a row has the wrong width |
/// | [`ForestError::NonFiniteValue`] | a value is NaN or infinite |
/// | [`ForestError::LabelCountMismatch`] | label and row counts differ |
/// | [`ForestError::InvalidClassCount`] | an explicit class count of 0 |
/// | [`ForestError::LabelOutOfRange`] | a label exceeds the class range |
/// | [`ForestError::FeatureNameCountMismatch`] | name and column counts differ |
/// | [`ForestError::InvalidMinSamplesSplit`] | `min_samples_split < 2` |
/// | [`ForestError::InvalidMinSamplesLeaf`] | `min_samples_leaf == 0` |
/// | [`ForestError::InvalidMtry`] | resolved width outside `[1, n_features]` |
/// | [`ForestError::OobEvaluationFailed`] | no sample was ever out-of-bag |
#[instrument(skip_all, fields(n_trees = config.n_trees(), n_samples = features.len()))]
pub fn train(
    config: &ForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<TrainedModel, ForestError> {
    let (n_features, n_classes) = validate(config, features, labels, feature_names)?;
    let n_samples = features.len();
    let mtry = config.mtry().resolve(n_features)?;

    let params = TreeParams {
        criterion: config.criterion(),
        mtry,
        min_samples_split: config.min_samples_split(),
        min_samples_leaf: config.min_samples_leaf(),
    };

    // One shared column-major copy; trees index into it through their
    // bootstrap draws instead of materializing per-tree matrices.
    let mut col_features: Vec<Vec<f64>> = vec![Vec::with_capacity(n_samples); n_features];
    for row in features {
        for (column, &value) in col_features.iter_mut().zip(row) {
            column.push(value);
        }
    }

    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed());
    let tree_seeds: Vec<u64> = (0..config.n_trees()).map(|_| master_rng.r#gen()).collect();
    let proximity_enabled = config.proximity() == ProximityMode::Enabled;

    debug!(mtry, n_classes, proximity = proximity_enabled, "growing trees");

    let grown: Vec<TreeOutput> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let (bag, oob_indices) = bootstrap_sample(n_samples, &mut rng);
            let tree =
                DecisionTree::grow(&col_features, labels, n_classes, &bag, params, &mut rng);
            let oob_predictions = oob_indices
                .iter()
                .map(|&i| (i, tree.predict_class(&features[i])))
                .collect();
            let leaves = proximity_enabled.then(|| {
                features
                    .iter()
                    .map(|row| tree.terminal_leaf(row))
                    .collect::<Vec<NodeIndex>>()
            });
            TreeOutput {
                tree,
                oob_predictions,
                leaves,
            }
        })
        .collect();

    // Accumulate strictly in tree order; the parallel collect above
    // preserves it, which keeps curves and proximities reproducible.
    let mut oob_acc = OobAccumulator::new(labels, n_classes);
    let mut prox_acc = proximity_enabled.then(|| ProximityAccumulator::new(n_samples));
    let mut decrease_totals = vec![0.0; n_features];
    let mut trees = Vec::with_capacity(grown.len());
    for output in grown {
        oob_acc.record_tree(&output.oob_predictions);
        if let (Some(acc), Some(leaves)) = (prox_acc.as_mut(), output.leaves.as_ref()) {
            acc.record_tree(leaves);
        }
        for (total, decrease) in decrease_totals.iter_mut().zip(output.tree.feature_decreases())
        {
            *total += decrease;
        }
        trees.push(output.tree);
    }

    let oob = oob_acc.finish()?;
    if oob.n_never_oob() > 0 {
        info!(
            n_excluded = oob.n_never_oob(),
            "samples never out-of-bag; excluded from error estimates"
        );
    }
    let confusion = ConfusionMatrix::from_predictions(labels, oob.predictions(), n_classes)?;
    let importances = rank_features(feature_names, &decrease_totals, trees.len());
    let proximity = prox_acc.map(|acc| acc.finish(trees.len()));

    let metadata = TrainingMetadata {
        n_trees: trees.len(),
        n_samples,
        n_features,
        n_classes,
        mtry,
    };
    let forest = Forest {
        trees,
        n_features,
        n_classes,
        feature_names: feature_names.to_vec(),
    };

    info!(oob_error = oob.error(), "training complete");

    Ok(TrainedModel::new(
        forest,
        oob,
        confusion,
        importances,
        proximity,
        metadata,
    ))
}

/// Checks dataset shape, values, labels, and configuration, returning
/// the feature count and resolved class count.
fn validate(
    config: &ForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<(usize, usize), ForestError> {
    if features.is_empty() {
        return Err(ForestError::EmptyDataset);
    }
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(ForestError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(ForestError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        for (feature_index, value) in row.iter().enumerate() {
            if !value.is_finite() {
                return Err(ForestError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }
    }
    if labels.len() != features.len() {
        return Err(ForestError::LabelCountMismatch {
            n_samples: features.len(),
            n_labels: labels.len(),
        });
    }
    let n_classes = match config.n_classes() {
        Some(0) => return Err(ForestError::InvalidClassCount { n_classes: 0 }),
        Some(k) => k,
        None => labels.iter().copied().max().unwrap_or(0) + 1,
    };
    for (sample_index, &label) in labels.iter().enumerate() {
        if label >= n_classes {
            return Err(ForestError::LabelOutOfRange {
                label,
                n_classes,
                sample_index,
            });
        }
    }
    if feature_names.len() != n_features {
        return Err(ForestError::FeatureNameCountMismatch {
            n_features,
            n_names: feature_names.len(),
        });
    }
    if config.min_samples_split() < 2 {
        return Err(ForestError::InvalidMinSamplesSplit {
            min_samples_split: config.min_samples_split(),
        });
    }
    if config.min_samples_leaf() == 0 {
        return Err(ForestError::InvalidMinSamplesLeaf {
            min_samples_leaf: config.min_samples_leaf(),
        });
    }
    Ok((n_features, n_classes))
}
