use crate::node::NodeIndex;

/// Condensed index of the unordered pair `(i, j)` with `i > j`.
///
/// Pairs are laid out row by row: `(1,0), (2,0), (2,1), (3,0), ...`
pub(crate) fn pair_index(i: usize, j: usize) -> usize {
    debug_assert!(i > j, "pair_index requires i > j");
    i * (i - 1) / 2 + j
}

/// Pairwise sample proximity: the fraction of trees in which two
/// samples land in the same terminal leaf.
///
/// Stored condensed (strict lower triangle); the diagonal is implicitly
/// 1 and the matrix is symmetric. All values lie in [0, 1].
#[derive(Debug, Clone)]
pub struct ProximityMatrix {
    n_samples: usize,
    condensed: Vec<f64>,
}

impl ProximityMatrix {
    /// Number of samples the matrix covers.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Proximity between samples `i` and `j`.
    ///
    /// Panics if either index is out of range.
    #[must_use]
    pub fn value(&self, i: usize, j: usize) -> f64 {
        assert!(
            i < self.n_samples && j < self.n_samples,
            "sample index out of range"
        );
        if i == j {
            return 1.0;
        }
        let (hi, lo) = if i > j { (i, j) } else { (j, i) };
        self.condensed[pair_index(hi, lo)]
    }

    /// The condensed strict lower triangle, length `n * (n - 1) / 2`.
    #[must_use]
    pub fn condensed(&self) -> &[f64] {
        &self.condensed
    }

    /// Condensed dissimilarities `1 - proximity`, ready for ordination.
    #[must_use]
    pub fn condensed_distances(&self) -> Vec<f64> {
        self.condensed.iter().map(|&p| 1.0 - p).collect()
    }
}

/// Accumulates shared-leaf counts tree by tree.
#[derive(Debug)]
pub(crate) struct ProximityAccumulator {
    n_samples: usize,
    counts: Vec<u64>,
}

impl ProximityAccumulator {
    pub(crate) fn new(n_samples: usize) -> Self {
        let n_pairs = n_samples * n_samples.saturating_sub(1) / 2;
        Self {
            n_samples,
            counts: vec![0; n_pairs],
        }
    }

    /// Records one tree's leaf assignment for every sample.
    pub(crate) fn record_tree(&mut self, leaves: &[NodeIndex]) {
        debug_assert_eq!(leaves.len(), self.n_samples);
        for i in 1..self.n_samples {
            for j in 0..i {
                if leaves[i] == leaves[j] {
                    self.counts[pair_index(i, j)] += 1;
                }
            }
        }
    }

    /// Normalizes counts by the number of trees recorded.
    pub(crate) fn finish(self, n_trees: usize) -> ProximityMatrix {
        let scale = 1.0 / n_trees as f64;
        ProximityMatrix {
            n_samples: self.n_samples,
            condensed: self.counts.iter().map(|&c| c as f64 * scale).collect(),
        }
    }
}
