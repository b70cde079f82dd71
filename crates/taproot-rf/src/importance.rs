/// A feature ranked by mean decrease in impurity.
///
/// Importance is the per-tree sum of weighted impurity decreases at
/// every split using the feature, averaged over all trees in the
/// forest. Values are non-negative and unnormalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFeature {
    /// Feature column name.
    pub name: String,
    /// Mean decrease in impurity.
    pub importance: f64,
    /// 1-based rank; rank 1 is the most important feature.
    pub rank: usize,
}

/// Averages accumulated impurity decreases over the forest and sorts
/// features by descending importance.
///
/// Ties keep their original column order (stable sort), so rankings
/// are deterministic.
pub(crate) fn rank_features(
    feature_names: &[String],
    decrease_totals: &[f64],
    n_trees: usize,
) -> Vec<RankedFeature> {
    debug_assert_eq!(feature_names.len(), decrease_totals.len());
    let scale = 1.0 / n_trees as f64;
    let mut ranked: Vec<RankedFeature> = feature_names
        .iter()
        .zip(decrease_totals)
        .map(|(name, &total)| RankedFeature {
            name: name.clone(),
            importance: total * scale,
            rank: 0,
        })
        .collect();

    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (position, feature) in ranked.iter_mut().enumerate() {
        feature.rank = position + 1;
    }
    ranked
}
