/// Errors from random forest training, evaluation, and tuning.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when the per-split feature width resolves to 0 or exceeds n_features.
    #[error("mtry resolved to {mtry}, but must be in [1, {n_features}]")]
    InvalidMtry {
        /// The resolved per-split feature width.
        mtry: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when an explicit class count of zero is configured.
    #[error("n_classes must be at least 1, got {n_classes}")]
    InvalidClassCount {
        /// The invalid class count provided.
        n_classes: usize,
    },

    /// Returned when the tuning step factor is not a finite value above 1.
    #[error("step_factor must be finite and greater than 1.0, got {step_factor}")]
    InvalidStepFactor {
        /// The invalid step factor provided.
        step_factor: f64,
    },

    /// Returned when the tuning improvement threshold is negative or non-finite.
    #[error("improvement threshold must be finite and non-negative, got {improve}")]
    InvalidImprovement {
        /// The invalid improvement threshold provided.
        improve: f64,
    },

    /// Returned when the tuning safety bound is zero.
    #[error("max_steps must be at least 1, got {max_steps}")]
    InvalidMaxSteps {
        /// The invalid step bound provided.
        max_steps: usize,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the feature-name list and feature matrix disagree in width.
    #[error("got {n_names} feature names for {n_features} feature columns")]
    FeatureNameCountMismatch {
        /// The number of feature columns in the dataset.
        n_features: usize,
        /// The number of names provided.
        n_names: usize,
    },

    /// Returned when the label vector and feature matrix disagree in length.
    #[error("got {n_labels} labels for {n_samples} samples")]
    LabelCountMismatch {
        /// The number of samples in the feature matrix.
        n_samples: usize,
        /// The number of labels provided.
        n_labels: usize,
    },

    /// Returned when a label falls outside the configured class range.
    #[error("label {label} at sample {sample_index} exceeds class range [0, {n_classes})")]
    LabelOutOfRange {
        /// The offending label value.
        label: usize,
        /// The configured number of classes.
        n_classes: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when OOB evaluation fails (no sample has any OOB tree).
    #[error("OOB evaluation failed: {reason}")]
    OobEvaluationFailed {
        /// Human-readable description of why OOB evaluation failed.
        reason: String,
    },
}
