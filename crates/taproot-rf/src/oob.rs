use crate::error::ForestError;

/// One point of the out-of-bag error curve.
///
/// Errors are computed from majority votes over the first `n_trees`
/// trees in training order, using only trees whose bootstrap excluded
/// the sample.
#[derive(Debug, Clone, PartialEq)]
pub struct OobErrorPoint {
    /// Number of trees accumulated so far (1-based).
    pub n_trees: usize,
    /// Overall error rate; `None` while no sample has received a vote.
    pub overall: Option<f64>,
    /// Per-class error rates; `None` for classes without voted samples.
    pub per_class: Vec<Option<f64>>,
}

/// Out-of-bag evaluation of a trained forest.
///
/// Holds the full error curve plus the final per-sample majority
/// predictions. Samples that were in-bag for every tree carry no
/// prediction and are excluded from all error rates.
#[derive(Debug, Clone)]
pub struct OobTrace {
    curve: Vec<OobErrorPoint>,
    predictions: Vec<Option<usize>>,
    final_error: f64,
    per_class_error: Vec<Option<f64>>,
    n_voted: usize,
    n_never_oob: usize,
}

impl OobTrace {
    /// Error curve indexed by number of trees accumulated.
    #[must_use]
    pub fn curve(&self) -> &[OobErrorPoint] {
        &self.curve
    }

    /// Final majority prediction per sample; `None` for samples that
    /// were never out-of-bag.
    #[must_use]
    pub fn predictions(&self) -> &[Option<usize>] {
        &self.predictions
    }

    /// Final overall OOB error rate.
    #[must_use]
    pub fn error(&self) -> f64 {
        self.final_error
    }

    /// Final per-class OOB error rates.
    #[must_use]
    pub fn class_errors(&self) -> &[Option<f64>] {
        &self.per_class_error
    }

    /// Number of samples with at least one OOB vote.
    #[must_use]
    pub fn n_voted(&self) -> usize {
        self.n_voted
    }

    /// Number of samples excluded because every tree bagged them.
    #[must_use]
    pub fn n_never_oob(&self) -> usize {
        self.n_never_oob
    }
}

/// Accumulates OOB votes tree by tree, recording a curve point after
/// each tree.
#[derive(Debug)]
pub(crate) struct OobAccumulator<'a> {
    labels: &'a [usize],
    n_classes: usize,
    votes: Vec<Vec<usize>>,
    curve: Vec<OobErrorPoint>,
}

impl<'a> OobAccumulator<'a> {
    pub(crate) fn new(labels: &'a [usize], n_classes: usize) -> Self {
        Self {
            labels,
            n_classes,
            votes: vec![vec![0; n_classes]; labels.len()],
            curve: Vec::new(),
        }
    }

    /// Records one tree's predictions for its out-of-bag samples as
    /// `(sample_index, predicted_class)` pairs, then appends the curve
    /// point for the forest-so-far.
    pub(crate) fn record_tree(&mut self, oob_predictions: &[(usize, usize)]) {
        for &(sample_index, predicted) in oob_predictions {
            self.votes[sample_index][predicted] += 1;
        }

        let mut class_wrong = vec![0usize; self.n_classes];
        let mut class_total = vec![0usize; self.n_classes];
        for (sample_index, votes) in self.votes.iter().enumerate() {
            let total: usize = votes.iter().sum();
            if total == 0 {
                continue;
            }
            let label = self.labels[sample_index];
            class_total[label] += 1;
            if argmax_votes(votes) != label {
                class_wrong[label] += 1;
            }
        }

        let voted: usize = class_total.iter().sum();
        let wrong: usize = class_wrong.iter().sum();
        let overall = (voted > 0).then(|| wrong as f64 / voted as f64);
        let per_class = class_wrong
            .iter()
            .zip(&class_total)
            .map(|(&w, &t)| (t > 0).then(|| w as f64 / t as f64))
            .collect();

        self.curve.push(OobErrorPoint {
            n_trees: self.curve.len() + 1,
            overall,
            per_class,
        });
    }

    /// Finalizes the trace, failing when not a single sample ever
    /// received an OOB vote.
    pub(crate) fn finish(self) -> Result<OobTrace, ForestError> {
        let predictions: Vec<Option<usize>> = self
            .votes
            .iter()
            .map(|votes| {
                let total: usize = votes.iter().sum();
                (total > 0).then(|| argmax_votes(votes))
            })
            .collect();
        let n_voted = predictions.iter().filter(|p| p.is_some()).count();
        let n_never_oob = predictions.len() - n_voted;

        let Some(last) = self.curve.last() else {
            return Err(ForestError::OobEvaluationFailed {
                reason: "no trees were recorded".to_string(),
            });
        };
        let Some(final_error) = last.overall else {
            return Err(ForestError::OobEvaluationFailed {
                reason: "no sample was out-of-bag for any tree; increase n_trees".to_string(),
            });
        };
        let per_class_error = last.per_class.clone();

        Ok(OobTrace {
            curve: self.curve,
            predictions,
            final_error,
            per_class_error,
            n_voted,
            n_never_oob,
        })
    }
}

/// Majority vote; ties resolve to the lowest class index.
pub(crate) fn argmax_votes(votes: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in votes.iter().enumerate().skip(1) {
        if count > votes[best] {
            best = class;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_is_none_before_first_vote() {
        let labels = vec![0, 1];
        let mut acc = OobAccumulator::new(&labels, 2);
        acc.record_tree(&[]);
        acc.record_tree(&[(0, 0)]);
        let trace = acc.finish().expect("one sample voted");

        assert_eq!(trace.curve().len(), 2);
        assert_eq!(trace.curve()[0].overall, None);
        assert_eq!(trace.curve()[1].overall, Some(0.0));
    }

    #[test]
    fn per_class_error_tracks_only_voted_classes() {
        let labels = vec![0, 1];
        let mut acc = OobAccumulator::new(&labels, 2);
        acc.record_tree(&[(0, 1)]);
        let trace = acc.finish().expect("one sample voted");

        let point = &trace.curve()[0];
        // Sample 0 (class 0) was predicted as class 1; class 1 never voted.
        assert_eq!(point.per_class[0], Some(1.0));
        assert_eq!(point.per_class[1], None);
        assert_eq!(point.overall, Some(1.0));
    }

    #[test]
    fn majority_overturns_an_early_wrong_vote() {
        let labels = vec![1];
        let mut acc = OobAccumulator::new(&labels, 2);
        acc.record_tree(&[(0, 0)]);
        acc.record_tree(&[(0, 1)]);
        acc.record_tree(&[(0, 1)]);
        let trace = acc.finish().expect("sample voted");

        assert_eq!(trace.curve()[0].overall, Some(1.0));
        assert_eq!(trace.curve()[2].overall, Some(0.0));
        assert_eq!(trace.predictions(), &[Some(1)]);
        assert_eq!(trace.error(), 0.0);
    }

    #[test]
    fn vote_tie_predicts_lowest_class() {
        let labels = vec![1];
        let mut acc = OobAccumulator::new(&labels, 2);
        acc.record_tree(&[(0, 0)]);
        acc.record_tree(&[(0, 1)]);
        let trace = acc.finish().expect("sample voted");

        // 1-1 tie goes to class 0, which is wrong for this sample.
        assert_eq!(trace.predictions(), &[Some(0)]);
        assert_eq!(trace.error(), 1.0);
    }

    #[test]
    fn never_oob_samples_are_counted_and_skipped() {
        let labels = vec![0, 0, 1];
        let mut acc = OobAccumulator::new(&labels, 2);
        acc.record_tree(&[(0, 0), (2, 1)]);
        let trace = acc.finish().expect("two samples voted");

        assert_eq!(trace.n_voted(), 2);
        assert_eq!(trace.n_never_oob(), 1);
        assert_eq!(trace.predictions()[1], None);
        assert_eq!(trace.error(), 0.0);
    }

    #[test]
    fn all_in_bag_forest_fails_finish() {
        let labels = vec![0, 1];
        let mut acc = OobAccumulator::new(&labels, 2);
        acc.record_tree(&[]);
        let result = acc.finish();

        assert!(matches!(
            result,
            Err(ForestError::OobEvaluationFailed { .. })
        ));
    }

    #[test]
    fn argmax_prefers_lowest_on_tie() {
        assert_eq!(argmax_votes(&[3, 3, 1]), 0);
        assert_eq!(argmax_votes(&[1, 4, 4]), 1);
        assert_eq!(argmax_votes(&[0, 2, 5]), 2);
    }
}
