//! Domain types for taproot-io.

use crate::IoError;

/// A sample identifier.
///
/// Wraps a non-empty string parsed from the first column of the input TSV.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SampleId(String);

impl SampleId {
    /// Create a new sample id from a non-empty string.
    pub(crate) fn new(id: String) -> Self {
        debug_assert!(!id.is_empty(), "sample id must not be empty");
        Self(id)
    }

    /// Return the sample id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SampleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated run name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunName(String);

impl RunName {
    /// Parse and validate a run name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidRunName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidRunName { name });
        }
        Ok(Self(name))
    }

    /// Return the run name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A labeled sample-by-feature table, possibly with missing cells.
///
/// Produced by [`TableReader`](crate::TableReader). Sample ids, labels,
/// and value rows are stored in parallel vectors — `sample_ids[i]`
/// corresponds to `labels[i]` and `values[i]`. Labels are indices into
/// `class_names`, assigned by the order the class names were configured.
/// A `None` cell is a missing measurement.
#[derive(Debug, Clone)]
pub struct SampleTable {
    sample_ids: Vec<SampleId>,
    class_names: Vec<String>,
    labels: Vec<usize>,
    feature_names: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
    id_column: String,
    label_column: String,
}

impl SampleTable {
    pub(crate) fn new(
        sample_ids: Vec<SampleId>,
        class_names: Vec<String>,
        labels: Vec<usize>,
        feature_names: Vec<String>,
        values: Vec<Vec<Option<f64>>>,
        id_column: String,
        label_column: String,
    ) -> Self {
        Self {
            sample_ids,
            class_names,
            labels,
            feature_names,
            values,
            id_column,
            label_column,
        }
    }

    /// Sample ids in file row order.
    #[must_use]
    pub fn sample_ids(&self) -> &[SampleId] {
        &self.sample_ids
    }

    /// Configured class names; a label `c` means `class_names[c]`.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Class index per sample, parallel to `sample_ids`.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Feature column names in file column order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Feature values: `values[sample_index][feature_index]`, `None`
    /// where the cell was missing.
    #[must_use]
    pub fn values(&self) -> &[Vec<Option<f64>>] {
        &self.values
    }

    /// Header name of the sample id column.
    #[must_use]
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Header name of the label column.
    #[must_use]
    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    /// Number of samples (rows).
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Number of configured classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Number of missing cells across the whole table.
    #[must_use]
    pub fn n_missing(&self) -> usize {
        self.values
            .iter()
            .map(|row| row.iter().filter(|cell| cell.is_none()).count())
            .sum()
    }

    /// Number of samples per class, indexed by class.
    #[must_use]
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.class_names.len()];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }

    /// The table as a dense matrix, or `None` if any cell is missing.
    #[must_use]
    pub fn to_complete(&self) -> Option<Vec<Vec<f64>>> {
        self.values
            .iter()
            .map(|row| row.iter().copied().collect::<Option<Vec<f64>>>())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_table(values: Vec<Vec<Option<f64>>>) -> SampleTable {
        let n = values.len();
        SampleTable::new(
            (0..n).map(|i| SampleId::new(format!("S{i}"))).collect(),
            vec!["leaf".to_string(), "root".to_string()],
            (0..n).map(|i| i % 2).collect(),
            vec!["m1".to_string(), "m2".to_string()],
            values,
            "sample".to_string(),
            "Factor".to_string(),
        )
    }

    #[test]
    fn sample_id_as_str_returns_inner() {
        let id = SampleId::new("Leaf_A_07".to_string());
        assert_eq!(id.as_str(), "Leaf_A_07");
    }

    #[test]
    fn run_name_valid() {
        let name = RunName::new("metabolome-run_01".to_string());
        assert!(name.is_ok());
        assert_eq!(name.unwrap().as_str(), "metabolome-run_01");
    }

    #[test]
    fn run_name_rejects_empty() {
        let name = RunName::new(String::new());
        assert!(matches!(name, Err(IoError::InvalidRunName { .. })));
    }

    #[test]
    fn run_name_rejects_special_chars() {
        let name = RunName::new("my run!".to_string());
        assert!(matches!(name, Err(IoError::InvalidRunName { .. })));
    }

    #[test]
    fn missing_cells_are_counted() {
        let table = test_table(vec![
            vec![Some(1.0), None],
            vec![None, Some(2.0)],
            vec![Some(3.0), Some(4.0)],
            vec![Some(5.0), Some(6.0)],
        ]);
        assert_eq!(table.n_missing(), 2);
        assert!(table.to_complete().is_none());
    }

    #[test]
    fn complete_table_converts_to_dense_rows() {
        let table = test_table(vec![
            vec![Some(1.0), Some(2.0)],
            vec![Some(3.0), Some(4.0)],
        ]);
        assert_eq!(table.n_missing(), 0);
        let dense = table.to_complete().unwrap();
        assert_eq!(dense, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn class_counts_follow_labels() {
        let table = test_table(vec![
            vec![Some(1.0), Some(2.0)],
            vec![Some(3.0), Some(4.0)],
            vec![Some(5.0), Some(6.0)],
        ]);
        assert_eq!(table.class_counts(), vec![2, 1]);
    }
}
