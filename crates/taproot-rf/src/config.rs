use crate::error::ForestError;
use crate::result::TrainedModel;
use crate::split::SplitCriterion;

/// How the number of candidate features per split (mtry) is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtryRule {
    /// Square root of the feature count, rounded to the nearest
    /// integer and clamped to at least 1.
    Sqrt,
    /// A fixed width.
    Fixed(usize),
    /// Every feature at every split (plain bagging).
    All,
}

impl MtryRule {
    /// Resolves the rule against a concrete feature count.
    pub(crate) fn resolve(self, n_features: usize) -> Result<usize, ForestError> {
        let mtry = match self {
            MtryRule::Sqrt => ((n_features as f64).sqrt().round() as usize).max(1),
            MtryRule::Fixed(width) => width,
            MtryRule::All => n_features,
        };
        if mtry == 0 || mtry > n_features {
            return Err(ForestError::InvalidMtry { mtry, n_features });
        }
        Ok(mtry)
    }
}

/// Whether training accumulates the pairwise sample proximity matrix.
///
/// Proximity costs `O(n_samples^2)` memory and per-tree time; leave it
/// disabled unless ordination or imputation needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProximityMode {
    Disabled,
    Enabled,
}

/// Configuration for random forest training.
///
/// Defaults after [`ForestConfig::new`]:
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `mtry` | [`MtryRule::Sqrt`] |
/// | `min_samples_split` | 2 |
/// | `min_samples_leaf` | 1 |
/// | `criterion` | [`SplitCriterion::Gini`] |
/// | `proximity` | [`ProximityMode::Disabled`] |
/// | `n_classes` | derived from the labels |
/// | `seed` | 42 |
#[derive(Debug, Clone)]
pub struct ForestConfig {
    n_trees: usize,
    mtry: MtryRule,
    min_samples_split: usize,
    min_samples_leaf: usize,
    criterion: SplitCriterion,
    proximity: ProximityMode,
    n_classes: Option<usize>,
    seed: u64,
}

impl ForestConfig {
    /// Creates a configuration for a forest of `n_trees` trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] when `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            mtry: MtryRule::Sqrt,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Gini,
            proximity: ProximityMode::Disabled,
            n_classes: None,
            seed: 42,
        })
    }

    /// Sets the per-split feature width rule.
    #[must_use]
    pub fn with_mtry(mut self, mtry: MtryRule) -> Self {
        self.mtry = mtry;
        self
    }

    /// Sets the minimum number of samples required to split a node.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Sets the minimum number of samples required in each child.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Sets the split impurity criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Enables or disables proximity accumulation.
    #[must_use]
    pub fn with_proximity(mut self, proximity: ProximityMode) -> Self {
        self.proximity = proximity;
        self
    }

    /// Fixes the class count instead of deriving it from the labels.
    ///
    /// Use this when a class may be absent from the training labels but
    /// must still occupy a row in the confusion matrix.
    #[must_use]
    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = Some(n_classes);
        self
    }

    /// Sets the RNG seed. Identical configurations and data produce
    /// identical forests.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of trees to train.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// The per-split feature width rule.
    #[must_use]
    pub fn mtry(&self) -> MtryRule {
        self.mtry
    }

    /// Minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Minimum samples required in each child.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// The split impurity criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Whether proximity accumulation is enabled.
    #[must_use]
    pub fn proximity(&self) -> ProximityMode {
        self.proximity
    }

    /// The explicit class count, if one was set.
    #[must_use]
    pub fn n_classes(&self) -> Option<usize> {
        self.n_classes
    }

    /// The RNG seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Trains a forest on row-major `features` with integer `labels`.
    ///
    /// See [`crate::forest::train`] for validation and semantics.
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<TrainedModel, ForestError> {
        crate::forest::train(self, features, labels, feature_names)
    }
}
