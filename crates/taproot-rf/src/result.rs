use crate::confusion::ConfusionMatrix;
use crate::forest::Forest;
use crate::importance::RankedFeature;
use crate::oob::OobTrace;
use crate::proximity::ProximityMatrix;

/// Shape summary of one training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingMetadata {
    /// Number of trees trained.
    pub n_trees: usize,
    /// Number of training samples.
    pub n_samples: usize,
    /// Number of feature columns.
    pub n_features: usize,
    /// Number of classes.
    pub n_classes: usize,
    /// Per-split feature width after resolving the configured rule.
    pub mtry: usize,
}

/// A trained forest together with its out-of-bag diagnostics.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    forest: Forest,
    oob: OobTrace,
    confusion: ConfusionMatrix,
    importances: Vec<RankedFeature>,
    proximity: Option<ProximityMatrix>,
    metadata: TrainingMetadata,
}

impl TrainedModel {
    pub(crate) fn new(
        forest: Forest,
        oob: OobTrace,
        confusion: ConfusionMatrix,
        importances: Vec<RankedFeature>,
        proximity: Option<ProximityMatrix>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            forest,
            oob,
            confusion,
            importances,
            proximity,
            metadata,
        }
    }

    /// The fitted trees.
    #[must_use]
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Out-of-bag error curve and final predictions.
    #[must_use]
    pub fn oob(&self) -> &OobTrace {
        &self.oob
    }

    /// Confusion matrix over out-of-bag predictions.
    #[must_use]
    pub fn confusion(&self) -> &ConfusionMatrix {
        &self.confusion
    }

    /// All features ranked by descending mean decrease in impurity.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// The `k` highest-ranked features; `k` is clamped to the feature
    /// count.
    #[must_use]
    pub fn top_features(&self, k: usize) -> &[RankedFeature] {
        &self.importances[..k.min(self.importances.len())]
    }

    /// Pairwise sample proximity, when enabled in the configuration.
    #[must_use]
    pub fn proximity(&self) -> Option<&ProximityMatrix> {
        self.proximity.as_ref()
    }

    /// Shape summary of the run.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}
