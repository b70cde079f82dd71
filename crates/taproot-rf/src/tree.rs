use rand_chacha::ChaCha8Rng;

use crate::node::{Node, NodeIndex};
use crate::split::{SplitCriterion, find_best_split};

/// Growth parameters for a single tree, resolved by the forest.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub(crate) criterion: SplitCriterion,
    pub(crate) mtry: usize,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
}

/// A fitted CART decision tree.
///
/// Nodes live in a flat arena in preorder; index 0 is the root. Trees
/// are grown on bootstrap index vectors over a shared column-major
/// feature matrix, so duplicate draws weigh into every count.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_features: usize,
    n_classes: usize,
}

impl DecisionTree {
    /// Grows a tree on `sample_indices` (bootstrap draws, duplicates
    /// allowed) over the column-major matrix `col_features`.
    pub(crate) fn grow(
        col_features: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        sample_indices: &[usize],
        params: TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut nodes = Vec::new();
        build_node(
            &mut nodes,
            col_features,
            labels,
            n_classes,
            sample_indices,
            params,
            rng,
        );
        DecisionTree {
            nodes,
            n_features: col_features.len(),
            n_classes,
        }
    }

    /// Total number of nodes in the tree.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of terminal nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Maximum root-to-leaf depth; a lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((index, depth)) = stack.pop() {
            match &self.nodes[index] {
                Node::Leaf { .. } => max_depth = max_depth.max(depth),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), depth + 1));
                    stack.push((right.index(), depth + 1));
                }
            }
        }
        max_depth
    }

    /// Number of feature columns the tree was grown on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of classes the tree predicts over.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Read-only view of the node arena.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Routes a sample to its terminal leaf and returns the arena index
    /// together with the leaf's class prediction.
    fn descend(&self, sample: &[f64]) -> (usize, usize) {
        let mut current = 0usize;
        loop {
            match &self.nodes[current] {
                Node::Leaf { prediction, .. } => return (current, *prediction),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    current = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }

    /// Predicted class for one sample. Ties inside a leaf were already
    /// resolved at growth time toward the lowest class index.
    pub(crate) fn predict_class(&self, sample: &[f64]) -> usize {
        self.descend(sample).1
    }

    /// Arena index of the terminal leaf a sample lands in. Two samples
    /// share a leaf exactly when these indices are equal.
    pub(crate) fn terminal_leaf(&self, sample: &[f64]) -> NodeIndex {
        NodeIndex::new(self.descend(sample).0)
    }

    /// Per-feature sums of weighted impurity decrease over all splits.
    pub(crate) fn feature_decreases(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease;
            }
        }
        totals
    }
}

/// Recursively grows the subtree for `sample_indices`, returning its
/// root's arena index.
///
/// A leaf placeholder is pushed first so the node owns a stable index
/// before its children are grown; it is overwritten with the split
/// variant once both child indices are known.
fn build_node(
    nodes: &mut Vec<Node>,
    col_features: &[Vec<f64>],
    labels: &[usize],
    n_classes: usize,
    sample_indices: &[usize],
    params: TreeParams,
    rng: &mut ChaCha8Rng,
) -> NodeIndex {
    let n_node = sample_indices.len();
    let mut class_counts = vec![0usize; n_classes];
    for &si in sample_indices {
        class_counts[labels[si]] += 1;
    }
    let impurity = params.criterion.impurity(&class_counts, n_node);
    let prediction = majority_class(&class_counts);

    let index = NodeIndex::new(nodes.len());
    nodes.push(Node::Leaf {
        prediction,
        impurity,
        n_samples: n_node,
    });

    if impurity.is_pure() || n_node < params.min_samples_split {
        return index;
    }

    let Some(split) = find_best_split(
        col_features,
        labels,
        n_classes,
        sample_indices,
        impurity,
        params.mtry,
        params.min_samples_leaf,
        params.criterion,
        rng,
    ) else {
        return index;
    };

    let left = build_node(
        nodes,
        col_features,
        labels,
        n_classes,
        &split.left_indices,
        params,
        rng,
    );
    let right = build_node(
        nodes,
        col_features,
        labels,
        n_classes,
        &split.right_indices,
        params,
        rng,
    );

    nodes[index.index()] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
        impurity,
        n_samples: n_node,
        impurity_decrease: split.impurity_decrease,
    };
    index
}

/// Majority class of a count vector; ties resolve to the lowest class
/// index so predictions stay deterministic.
fn majority_class(class_counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in class_counts.iter().enumerate().skip(1) {
        if count > class_counts[best] {
            best = class;
        }
    }
    best
}
