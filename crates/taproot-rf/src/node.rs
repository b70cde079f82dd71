use std::fmt;

/// Index of a feature column in the training matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the underlying column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feature[{}]", self.0)
    }
}

/// Index of a node in a tree's arena storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the underlying arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node[{}]", self.0)
    }
}

/// Impurity of a node under the configured split criterion.
///
/// Gini impurity lies in [0, 1); entropy in [0, log2(n_classes)].
/// A value of zero means the node is pure.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) fn new(value: f64) -> Self {
        debug_assert!(value.is_finite() && value >= 0.0, "impurity must be finite and non-negative");
        Self(value)
    }

    /// Returns the impurity as a plain float.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Whether this node is pure (single class).
    #[must_use]
    pub fn is_pure(self) -> bool {
        self.0 == 0.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// A single node in a fitted decision tree.
///
/// Trees store nodes in a flat arena; `Split` variants reference their
/// children by [`NodeIndex`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Internal node that routes samples by thresholding one feature.
    Split {
        /// Feature column tested at this node.
        feature: FeatureIndex,
        /// Samples with `value <= threshold` go left, the rest go right.
        threshold: f64,
        /// Arena index of the left child.
        left: NodeIndex,
        /// Arena index of the right child.
        right: NodeIndex,
        /// Impurity of the node before the split.
        impurity: Impurity,
        /// Number of bootstrap samples that reached this node.
        n_samples: usize,
        /// Weighted impurity decrease achieved by this split.
        impurity_decrease: f64,
    },
    /// Terminal node carrying a class prediction.
    Leaf {
        /// Majority class among the samples in this leaf.
        prediction: usize,
        /// Impurity of the leaf.
        impurity: Impurity,
        /// Number of bootstrap samples that reached this leaf.
        n_samples: usize,
    },
}

impl Node {
    /// Whether this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}
