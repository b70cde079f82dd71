use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::node::{FeatureIndex, Impurity};

/// Impurity criterion used to score candidate splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitCriterion {
    /// Gini impurity: `1 - sum(p_c^2)`.
    Gini,
    /// Shannon entropy in bits: `-sum(p_c * log2(p_c))`.
    Entropy,
}

impl SplitCriterion {
    /// Computes the impurity of a node from its class counts.
    ///
    /// `n_samples` must equal the sum of `class_counts`. An empty node
    /// has impurity zero.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let total = n_samples as f64;
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / total;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / total;
                    -p * p.log2()
                })
                .sum(),
        };
        // Clamp tiny negative results from floating-point cancellation.
        Impurity::new(value.max(0.0))
    }
}

impl std::fmt::Display for SplitCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SplitCriterion::Gini => write!(f, "gini"),
            SplitCriterion::Entropy => write!(f, "entropy"),
        }
    }
}

/// The best split found for one node, with the resulting partition.
#[derive(Debug, Clone)]
pub(crate) struct BestSplit {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Scans `mtry` randomly drawn features for the threshold split with the
/// largest weighted impurity decrease.
///
/// `sample_indices` may contain duplicates (bootstrap draws count with
/// multiplicity). Returns `None` when no candidate split has positive
/// decrease or when every candidate would violate `min_samples_leaf`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn find_best_split(
    col_features: &[Vec<f64>],
    labels: &[usize],
    n_classes: usize,
    sample_indices: &[usize],
    parent_impurity: Impurity,
    mtry: usize,
    min_samples_leaf: usize,
    criterion: SplitCriterion,
    rng: &mut ChaCha8Rng,
) -> Option<BestSplit> {
    let n_features = col_features.len();
    let n_node = sample_indices.len();
    if n_node < 2 * min_samples_leaf {
        return None;
    }

    // Partial Fisher-Yates: the first `mtry` entries become the candidate
    // feature draw for this node.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = mtry.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best: Option<(FeatureIndex, f64, f64)> = None;

    for &feature in &feature_order[..take] {
        let column = &col_features[feature];

        let mut sorted: Vec<usize> = sample_indices.to_vec();
        sorted.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

        let mut left_counts = vec![0usize; n_classes];
        let mut right_counts = vec![0usize; n_classes];
        for &si in &sorted {
            right_counts[labels[si]] += 1;
        }

        // Single forward scan: move one sample at a time from right to
        // left and score the boundary wherever the feature value changes.
        for pos in 0..n_node - 1 {
            let si = sorted[pos];
            left_counts[labels[si]] += 1;
            right_counts[labels[si]] -= 1;

            let lo = column[si];
            let hi = column[sorted[pos + 1]];
            if lo == hi {
                continue;
            }

            let n_left = pos + 1;
            let n_right = n_node - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let left_impurity = criterion.impurity(&left_counts, n_left);
            let right_impurity = criterion.impurity(&right_counts, n_right);
            let decrease = n_node as f64 * parent_impurity.value()
                - n_left as f64 * left_impurity.value()
                - n_right as f64 * right_impurity.value();

            if decrease > best.map_or(0.0, |(_, _, d)| d) {
                let mut threshold = 0.5 * (lo + hi);
                // Midpoint can round up onto `hi` when lo and hi are
                // adjacent floats; fall back to the lower value so the
                // partition stays non-empty on both sides.
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some((FeatureIndex::new(feature), threshold, decrease));
            }
        }
    }

    let (feature, threshold, impurity_decrease) = best?;
    let column = &col_features[feature.index()];
    let mut left_indices = Vec::new();
    let mut right_indices = Vec::new();
    for &si in sample_indices {
        if column[si] <= threshold {
            left_indices.push(si);
        } else {
            right_indices.push(si);
        }
    }

    Some(BestSplit {
        feature,
        threshold,
        impurity_decrease,
        left_indices,
        right_indices,
    })
}
