use taproot_rf::ForestError;

/// Errors from proximity-based imputation.
#[derive(Debug, thiserror::Error)]
pub enum ImputeError {
    /// Returned when the input matrix has zero rows.
    #[error("dataset has zero samples")]
    EmptyDataset,

    /// Returned when the input matrix has zero feature columns.
    #[error("dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a row has a different number of cells than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of cells in the row.
        got: usize,
        /// The zero-based index of the offending row.
        sample_index: usize,
    },

    /// Returned when the label vector and matrix disagree in length.
    #[error("got {n_labels} labels for {n_samples} samples")]
    LabelCountMismatch {
        /// The number of rows in the matrix.
        n_samples: usize,
        /// The number of labels provided.
        n_labels: usize,
    },

    /// Returned when a feature column has no observed value at all, so
    /// there is nothing to impute from.
    #[error("feature column {feature_index} has no observed values")]
    AllMissingColumn {
        /// The zero-based index of the empty column.
        feature_index: usize,
    },

    /// Returned when an observed cell holds a NaN or infinite value.
    #[error("non-finite observed value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending row.
        sample_index: usize,
        /// The zero-based index of the offending column.
        feature_index: usize,
    },

    /// Returned when a stop rule requests zero iterations.
    #[error("iteration bound must be at least 1, got {iterations}")]
    InvalidIterationCount {
        /// The invalid iteration bound provided.
        iterations: usize,
    },

    /// Returned when the convergence epsilon is zero, negative, or
    /// non-finite.
    #[error("convergence epsilon must be finite and positive, got {epsilon}")]
    InvalidEpsilon {
        /// The invalid epsilon provided.
        epsilon: f64,
    },

    /// Returned when a preliminary forest fit fails.
    #[error("preliminary forest training failed: {0}")]
    Forest(#[from] ForestError),
}
