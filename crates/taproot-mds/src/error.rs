/// Errors from classical multidimensional scaling.
#[derive(Debug, thiserror::Error)]
pub enum MdsError {
    /// Returned when fewer than two samples are supplied.
    #[error("ordination needs at least 2 samples, got {n_samples}")]
    TooFewSamples {
        /// The number of samples supplied.
        n_samples: usize,
    },

    /// Returned when the condensed distance vector has the wrong length.
    #[error(
        "condensed distance vector has length {got}, expected {expected} for {n_samples} samples"
    )]
    CondensedLengthMismatch {
        /// The expected length `n_samples * (n_samples - 1) / 2`.
        expected: usize,
        /// The actual length supplied.
        got: usize,
        /// The number of samples supplied.
        n_samples: usize,
    },

    /// Returned when a distance is NaN, infinite, or negative.
    #[error("distance at condensed index {index} must be finite and non-negative, got {value}")]
    InvalidDistance {
        /// The condensed index of the offending entry.
        index: usize,
        /// The offending value.
        value: f64,
    },

    /// Returned when the requested axis count is zero or not below the
    /// sample count.
    #[error("axis count {n_axes} must lie in [1, {max_axes}] for {n_samples} samples")]
    InvalidAxisCount {
        /// The requested number of axes.
        n_axes: usize,
        /// The largest representable axis count, `n_samples - 1`.
        max_axes: usize,
        /// The number of samples supplied.
        n_samples: usize,
    },
}
