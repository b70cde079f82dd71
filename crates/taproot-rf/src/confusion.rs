use std::fmt;

use crate::error::ForestError;

/// Precision, recall, and F1 for one class of a confusion matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassMetrics {
    /// Fraction of predictions for this class that were correct.
    pub precision: f64,
    /// Fraction of this class's samples that were recovered.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Number of evaluated samples with this true class.
    pub support: usize,
}

/// Confusion matrix over out-of-bag majority predictions.
///
/// `matrix[t][p]` counts samples of true class `t` predicted as class
/// `p`. Samples without an OOB prediction are skipped, so row sums
/// equal per-class counts among evaluated samples only.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

impl ConfusionMatrix {
    /// Builds the matrix from true labels and optional predictions.
    ///
    /// # Errors
    ///
    /// | Error | Condition |
    /// |-------|-----------|
    /// | [`ForestError::InvalidClassCount`] | `n_classes` is zero |
    /// | [`ForestError::LabelCountMismatch`] | slices differ in length |
    /// | [`ForestError::LabelOutOfRange`] | a label or prediction is `>= n_classes` |
    /// | [`ForestError::EmptyDataset`] | no sample carries a prediction |
    pub fn from_predictions(
        true_labels: &[usize],
        predicted: &[Option<usize>],
        n_classes: usize,
    ) -> Result<Self, ForestError> {
        if n_classes == 0 {
            return Err(ForestError::InvalidClassCount { n_classes });
        }
        if true_labels.len() != predicted.len() {
            return Err(ForestError::LabelCountMismatch {
                n_samples: predicted.len(),
                n_labels: true_labels.len(),
            });
        }

        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        let mut n_evaluated = 0usize;
        for (sample_index, (&label, &prediction)) in
            true_labels.iter().zip(predicted).enumerate()
        {
            if label >= n_classes {
                return Err(ForestError::LabelOutOfRange {
                    label,
                    n_classes,
                    sample_index,
                });
            }
            let Some(prediction) = prediction else {
                continue;
            };
            if prediction >= n_classes {
                return Err(ForestError::LabelOutOfRange {
                    label: prediction,
                    n_classes,
                    sample_index,
                });
            }
            matrix[label][prediction] += 1;
            n_evaluated += 1;
        }

        if n_evaluated == 0 {
            return Err(ForestError::EmptyDataset);
        }

        Ok(Self { matrix, n_classes })
    }

    /// Number of classes on each axis.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Total number of evaluated samples.
    #[must_use]
    pub fn n_evaluated(&self) -> usize {
        self.matrix.iter().map(|row| row.iter().sum::<usize>()).sum()
    }

    /// Fraction of evaluated samples on the diagonal.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|c| self.matrix[c][c]).sum();
        correct as f64 / self.n_evaluated() as f64
    }

    /// Complement of [`accuracy`](Self::accuracy).
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        1.0 - self.accuracy()
    }

    /// Per-class precision, recall, F1, and support, in class order.
    ///
    /// Undefined ratios (zero denominators) are reported as 0.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.n_classes)
            .map(|class| {
                let tp = self.matrix[class][class];
                let predicted: usize = (0..self.n_classes).map(|t| self.matrix[t][class]).sum();
                let support: usize = self.matrix[class].iter().sum();

                let precision = if predicted > 0 {
                    tp as f64 / predicted as f64
                } else {
                    0.0
                };
                let recall = if support > 0 {
                    tp as f64 / support as f64
                } else {
                    0.0
                };
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                ClassMetrics {
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Raw count rows, indexed `[true_class][predicted_class]`.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>10}", "")?;
        for p in 0..self.n_classes {
            write!(f, "{:>10}", format!("pred_{p}"))?;
        }
        writeln!(f)?;
        for (t, row) in self.matrix.iter().enumerate() {
            write!(f, "{:>10}", format!("true_{t}"))?;
            for count in row {
                write!(f, "{count:>10}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_some(labels: &[usize]) -> Vec<Option<usize>> {
        labels.iter().map(|&l| Some(l)).collect()
    }

    #[test]
    fn perfect_predictions_fill_the_diagonal() {
        let truth = vec![0, 1, 2, 0, 1, 2];
        let matrix = ConfusionMatrix::from_predictions(&truth, &all_some(&truth), 3)
            .expect("valid inputs");

        assert_eq!(matrix.accuracy(), 1.0);
        assert_eq!(matrix.error_rate(), 0.0);
        for (t, row) in matrix.as_rows().iter().enumerate() {
            for (p, &count) in row.iter().enumerate() {
                assert_eq!(count, usize::from(t == p) * 2);
            }
        }
    }

    #[test]
    fn known_mistakes_land_off_diagonal() {
        let truth = vec![0, 0, 1, 1];
        let predicted = all_some(&[0, 1, 1, 1]);
        let matrix =
            ConfusionMatrix::from_predictions(&truth, &predicted, 2).expect("valid inputs");

        assert_eq!(matrix.as_rows()[0], vec![1, 1]);
        assert_eq!(matrix.as_rows()[1], vec![0, 2]);
        assert!((matrix.accuracy() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn row_sums_match_evaluated_class_counts() {
        let truth = vec![0, 0, 0, 1, 1, 2];
        let mut predicted = all_some(&[0, 1, 0, 1, 0, 2]);
        predicted[2] = None;
        let matrix =
            ConfusionMatrix::from_predictions(&truth, &predicted, 3).expect("valid inputs");

        let row_sums: Vec<usize> = matrix.as_rows().iter().map(|r| r.iter().sum()).collect();
        assert_eq!(row_sums, vec![2, 2, 1]);
        assert_eq!(matrix.n_evaluated(), 5);
    }

    #[test]
    fn metrics_handle_a_never_predicted_class() {
        let truth = vec![0, 1];
        let predicted = all_some(&[0, 0]);
        let matrix =
            ConfusionMatrix::from_predictions(&truth, &predicted, 2).expect("valid inputs");

        let metrics = matrix.class_metrics();
        assert_eq!(metrics[1].precision, 0.0);
        assert_eq!(metrics[1].recall, 0.0);
        assert_eq!(metrics[1].f1, 0.0);
        assert_eq!(metrics[1].support, 1);
        assert!((metrics[0].precision - 0.5).abs() < 1e-12);
        assert_eq!(metrics[0].recall, 1.0);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let result = ConfusionMatrix::from_predictions(&[0, 1], &all_some(&[0]), 2);
        assert!(matches!(
            result,
            Err(ForestError::LabelCountMismatch { .. })
        ));
    }

    #[test]
    fn out_of_range_prediction_is_rejected() {
        let result = ConfusionMatrix::from_predictions(&[0], &all_some(&[5]), 2);
        assert!(matches!(result, Err(ForestError::LabelOutOfRange { .. })));
    }

    #[test]
    fn all_none_predictions_are_rejected() {
        let result = ConfusionMatrix::from_predictions(&[0, 1], &[None, None], 2);
        assert!(matches!(result, Err(ForestError::EmptyDataset)));
    }

    #[test]
    fn display_labels_rows_and_columns() {
        let truth = vec![0, 1];
        let matrix = ConfusionMatrix::from_predictions(&truth, &all_some(&truth), 2)
            .expect("valid inputs");
        let text = matrix.to_string();

        assert!(text.contains("pred_0"));
        assert!(text.contains("true_1"));
    }
}
