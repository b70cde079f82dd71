//! TSV sample table reader with full input validation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{SampleId, SampleTable};

/// Reads a labeled sample-by-feature table from a TSV file.
///
/// Expected TSV format:
/// - Header row required; the first column is the sample id
/// - One column whose header matches the configured label column name
///   (searched by name, anywhere after the id column)
/// - All remaining columns are numeric features, kept in file order
/// - One row per sample, all rows must have the same number of columns
/// - An empty cell or `NA` in a feature column is a missing measurement
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::EmptyClassList`] | No class names configured |
/// | [`IoError::DuplicateClassName`] | Same class name configured twice |
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed TSV record |
/// | [`IoError::MissingLabelColumn`] | No header column matches the label name |
/// | [`IoError::NoFeatureColumns`] | Only id and label columns, no features |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::EmptySampleId`] | Row with an empty first cell |
/// | [`IoError::DuplicateSampleId`] | Same sample id appears twice |
/// | [`IoError::UnknownClassLabel`] | Label cell not in the class-name list |
/// | [`IoError::InvalidNumericValue`] | Feature cell not missing and not a finite float |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
pub struct TableReader {
    path: PathBuf,
    label_column: String,
    class_names: Vec<String>,
}

impl TableReader {
    /// Create a new reader for the given TSV file path.
    ///
    /// `label_column` is the header name of the class label column;
    /// `class_names` lists the accepted label values, and their order
    /// assigns the class indices used everywhere downstream.
    pub fn new(path: &Path, label_column: &str, class_names: &[String]) -> Self {
        Self {
            path: path.to_path_buf(),
            label_column: label_column.to_string(),
            class_names: class_names.to_vec(),
        }
    }

    /// Read and validate the TSV file, returning a [`SampleTable`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<SampleTable, IoError> {
        // 1. Validate the configured class list
        if self.class_names.is_empty() {
            return Err(IoError::EmptyClassList);
        }
        let mut class_index: HashMap<&str, usize> = HashMap::new();
        for (index, name) in self.class_names.iter().enumerate() {
            if class_index.insert(name.as_str(), index).is_some() {
                return Err(IoError::DuplicateClassName { name: name.clone() });
            }
        }

        // 2. Open file (FileNotFound on failure)
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // 3. Build TSV reader with headers.
        // flexible(true) allows rows with varying column counts so that our own
        // InconsistentRowLength check fires instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        // 4. Header: locate the label column by name, everything else
        // past the id column is a feature
        let header = rdr.headers().map_err(|e| IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        })?;
        let expected_cols = header.len();
        let id_column = header.get(0).unwrap_or("").to_string();
        let label_position = header
            .iter()
            .skip(1)
            .position(|name| name == self.label_column)
            .map(|p| p + 1)
            .ok_or_else(|| IoError::MissingLabelColumn {
                path: self.path.clone(),
                label_column: self.label_column.clone(),
            })?;
        let feature_names: Vec<String> = header
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != 0 && i != label_position)
            .map(|(_, name)| String::from(name))
            .collect();
        if feature_names.is_empty() {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        debug!(
            expected_cols,
            label_position,
            n_features = feature_names.len(),
            "read TSV header"
        );

        // 5. Iterate rows with validation
        let mut sample_ids = Vec::new();
        let mut labels = Vec::new();
        let mut values: Vec<Vec<Option<f64>>> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut n_missing = 0usize;

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            // Check column count consistency
            if record.len() != expected_cols {
                let sample_id = record.get(0).unwrap_or("").to_string();
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    sample_id,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            // Extract sample id (first column)
            let sample_id_str = record.get(0).unwrap_or("").to_string();
            if sample_id_str.is_empty() {
                return Err(IoError::EmptySampleId {
                    path: self.path.clone(),
                    row_index,
                });
            }

            // Check for duplicate sample ids
            if let Some(&first_row) = seen.get(&sample_id_str) {
                return Err(IoError::DuplicateSampleId {
                    path: self.path.clone(),
                    sample_id: sample_id_str,
                    first_row,
                    second_row: row_index,
                });
            }
            seen.insert(sample_id_str.clone(), row_index);

            // Resolve the class label against the configured names
            let raw_label = record.get(label_position).unwrap_or("");
            let Some(&label) = class_index.get(raw_label) else {
                return Err(IoError::UnknownClassLabel {
                    path: self.path.clone(),
                    row_index,
                    label: raw_label.to_string(),
                    expected: self.class_names.join(", "),
                });
            };

            // Parse feature cells; "" and "NA" are missing measurements
            let mut row = Vec::with_capacity(feature_names.len());
            for col_index in 1..record.len() {
                if col_index == label_position {
                    continue;
                }
                let feature_index = row.len();
                let raw = record.get(col_index).unwrap_or("");
                if raw.is_empty() || raw == "NA" {
                    n_missing += 1;
                    row.push(None);
                    continue;
                }
                let value: f64 = raw.parse().map_err(|_| IoError::InvalidNumericValue {
                    path: self.path.clone(),
                    row_index,
                    feature_index,
                    raw: raw.to_string(),
                })?;
                if !value.is_finite() {
                    return Err(IoError::InvalidNumericValue {
                        path: self.path.clone(),
                        row_index,
                        feature_index,
                        raw: raw.to_string(),
                    });
                }
                row.push(Some(value));
            }

            sample_ids.push(SampleId::new(sample_id_str));
            labels.push(label);
            values.push(row);
        }

        // 6. Check for empty dataset
        if sample_ids.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_samples = sample_ids.len(),
            n_features = feature_names.len(),
            n_missing,
            "sample table loaded"
        );

        Ok(SampleTable::new(
            sample_ids,
            self.class_names.clone(),
            labels,
            feature_names,
            values,
            id_column,
            self.label_column.clone(),
        ))
    }
}
