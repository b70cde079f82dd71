//! I/O error types for taproot-io.

use std::path::PathBuf;

/// Errors from file I/O, TSV parsing, and result serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the TSV parser encounters a malformed record.
    #[error("TSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the TSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the TSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the TSV file.
        path: PathBuf,
    },

    /// Returned when the header has no columns left after the sample id
    /// and label columns.
    #[error("no feature columns in {path}")]
    NoFeatureColumns {
        /// Path to the TSV file.
        path: PathBuf,
    },

    /// Returned when no header column matches the configured label column name.
    #[error("label column \"{label_column}\" not found in {path}")]
    MissingLabelColumn {
        /// Path to the TSV file.
        path: PathBuf,
        /// The column name that was searched for.
        label_column: String,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} (sample {sample_id}) has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the TSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Sample id of the offending row.
        sample_id: String,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a feature cell is neither a missing-value marker nor a
    /// finite float.
    #[error("invalid numeric value in {path}: row {row_index}, feature column {feature_index}, raw value \"{raw}\"")]
    InvalidNumericValue {
        /// Path to the TSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Zero-based feature column index (excluding id and label columns).
        feature_index: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when a label cell is not one of the configured class names.
    #[error("unknown class label \"{label}\" in {path} at row {row_index}: expected one of {expected}")]
    UnknownClassLabel {
        /// Path to the TSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// The unrecognized label value.
        label: String,
        /// Comma-joined list of accepted class names.
        expected: String,
    },

    /// Returned when the same sample id appears more than once.
    #[error("duplicate sample id \"{sample_id}\" in {path}: first at row {first_row}, again at row {second_row}")]
    DuplicateSampleId {
        /// Path to the TSV file.
        path: PathBuf,
        /// The duplicated sample id.
        sample_id: String,
        /// Zero-based row index of the first occurrence.
        first_row: usize,
        /// Zero-based row index of the second occurrence.
        second_row: usize,
    },

    /// Returned when a row's sample id cell is empty.
    #[error("empty sample id in {path} at row {row_index}")]
    EmptySampleId {
        /// Path to the TSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
    },

    /// Returned when the configured class-name list is empty.
    #[error("class-name list is empty")]
    EmptyClassList,

    /// Returned when the same class name is configured twice.
    #[error("duplicate class name \"{name}\"")]
    DuplicateClassName {
        /// The duplicated class name.
        name: String,
    },

    /// Returned when the run name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid run name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidRunName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a TSV record cannot be written.
    #[error("cannot write TSV record to {path}")]
    CsvWrite {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },
}
