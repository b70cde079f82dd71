use tracing::{debug, instrument};

use crate::error::MdsError;

/// A low-dimensional embedding produced by classical MDS.
#[derive(Debug, Clone)]
pub struct MdsEmbedding {
    coordinates: Vec<Vec<f64>>,
    eigenvalues: Vec<f64>,
    proportion_explained: Vec<f64>,
}

impl MdsEmbedding {
    /// Per-sample coordinates: one row of `n_axes` values per sample,
    /// in input order.
    #[must_use]
    pub fn coordinates(&self) -> &[Vec<f64>] {
        &self.coordinates
    }

    /// Eigenvalues of the retained axes, descending.
    #[must_use]
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// Share of total positive inertia carried by each retained axis.
    #[must_use]
    pub fn proportion_explained(&self) -> &[f64] {
        &self.proportion_explained
    }

    /// Number of retained axes.
    #[must_use]
    pub fn n_axes(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Number of embedded samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.coordinates.len()
    }
}

/// Embeds `n_samples` points in `n_axes` dimensions from a condensed
/// distance vector (strict lower triangle, pair order
/// `(1,0), (2,0), (2,1), (3,0), ...`).
///
/// Classical (Torgerson) scaling: square the distances, double-center
/// with Gower's transform, eigendecompose, and scale the leading
/// eigenvectors by the square roots of their eigenvalues. Negative
/// eigenvalues from non-Euclidean input contribute zero-length axes
/// and zero explained inertia.
///
/// # Errors
///
/// | Error | Condition |
/// |-------|-----------|
/// | [`MdsError::TooFewSamples`] | `n_samples < 2` |
/// | [`MdsError::CondensedLengthMismatch`] | wrong condensed length |
/// | [`MdsError::InvalidDistance`] | a NaN, infinite, or negative distance |
/// | [`MdsError::InvalidAxisCount`] | `n_axes` is 0 or `>= n_samples` |
#[instrument(skip(condensed))]
pub fn classical_mds(
    condensed: &[f64],
    n_samples: usize,
    n_axes: usize,
) -> Result<MdsEmbedding, MdsError> {
    if n_samples < 2 {
        return Err(MdsError::TooFewSamples { n_samples });
    }
    let expected = n_samples * (n_samples - 1) / 2;
    if condensed.len() != expected {
        return Err(MdsError::CondensedLengthMismatch {
            expected,
            got: condensed.len(),
            n_samples,
        });
    }
    for (index, &value) in condensed.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(MdsError::InvalidDistance { index, value });
        }
    }
    if n_axes == 0 || n_axes >= n_samples {
        return Err(MdsError::InvalidAxisCount {
            n_axes,
            max_axes: n_samples - 1,
            n_samples,
        });
    }

    let mut squared = vec![vec![0.0; n_samples]; n_samples];
    let mut index = 0;
    for i in 1..n_samples {
        for j in 0..i {
            let d2 = condensed[index] * condensed[index];
            index += 1;
            squared[i][j] = d2;
            squared[j][i] = d2;
        }
    }

    // Gower double-centering: b_ij = -0.5 (d2_ij - row_i - row_j + grand).
    let row_means: Vec<f64> = squared
        .iter()
        .map(|row| row.iter().sum::<f64>() / n_samples as f64)
        .collect();
    let grand_mean = row_means.iter().sum::<f64>() / n_samples as f64;
    let mut centered = vec![vec![0.0; n_samples]; n_samples];
    for i in 0..n_samples {
        for j in 0..n_samples {
            centered[i][j] =
                -0.5 * (squared[i][j] - row_means[i] - row_means[j] + grand_mean);
        }
    }

    let (eigenvalues, eigenvectors) = jacobi_eigen(centered);
    let mut order: Vec<usize> = (0..n_samples).collect();
    order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));
    let positive_inertia: f64 = eigenvalues.iter().filter(|&&l| l > 0.0).sum();

    let mut coordinates = vec![vec![0.0; n_axes]; n_samples];
    let mut axis_eigenvalues = Vec::with_capacity(n_axes);
    let mut proportion_explained = Vec::with_capacity(n_axes);
    for (axis, &k) in order[..n_axes].iter().enumerate() {
        let lambda = eigenvalues[k];
        let scale = lambda.max(0.0).sqrt();
        for (point, vector_row) in coordinates.iter_mut().zip(&eigenvectors) {
            point[axis] = vector_row[k] * scale;
        }
        axis_eigenvalues.push(lambda);
        proportion_explained.push(if positive_inertia > 0.0 {
            lambda.max(0.0) / positive_inertia
        } else {
            0.0
        });
    }

    debug!(
        leading_eigenvalue = axis_eigenvalues.first().copied().unwrap_or(0.0),
        "ordination complete"
    );
    Ok(MdsEmbedding {
        coordinates,
        eigenvalues: axis_eigenvalues,
        proportion_explained,
    })
}

/// Cyclic Jacobi eigendecomposition of a symmetric matrix.
///
/// Returns the eigenvalues with matching eigenvector columns:
/// `vectors[i][k]` is component `i` of the eigenvector paired with
/// eigenvalue `k`. Sweeps stop once the off-diagonal mass is
/// negligible relative to the whole matrix.
fn jacobi_eigen(mut a: Vec<Vec<f64>>) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = a.len();
    let mut v = vec![vec![0.0; n]; n];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    const MAX_SWEEPS: usize = 64;
    for _ in 0..MAX_SWEEPS {
        let mut total = 0.0;
        let mut off_diagonal = 0.0;
        for (i, row) in a.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                total += value * value;
                if i != j {
                    off_diagonal += value * value;
                }
            }
        }
        if off_diagonal <= total * 1e-18 + f64::MIN_POSITIVE {
            break;
        }

        for p in 0..n - 1 {
            for q in p + 1..n {
                if a[p][q].abs() < 1e-300 {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = if theta.abs() > 1e12 {
                    // Large theta: the exact formula cancels; use its limit.
                    1.0 / (2.0 * theta)
                } else {
                    let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                    sign / (theta.abs() + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                let tau = s / (1.0 + c);

                let apq = a[p][q];
                a[p][p] -= t * apq;
                a[q][q] += t * apq;
                a[p][q] = 0.0;
                a[q][p] = 0.0;
                for k in 0..n {
                    if k == p || k == q {
                        continue;
                    }
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = akp - s * (akq + tau * akp);
                    a[p][k] = a[k][p];
                    a[k][q] = akq + s * (akp - tau * akq);
                    a[q][k] = a[k][q];
                }
                for k in 0..n {
                    let vkp = v[k][p];
                    let vkq = v[k][q];
                    v[k][p] = vkp - s * (vkq + tau * vkp);
                    v[k][q] = vkq + s * (vkp - tau * vkq);
                }
            }
        }
    }

    let eigenvalues = (0..n).map(|i| a[i][i]).collect();
    (eigenvalues, v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded_distance(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }

    #[test]
    fn two_points_preserve_their_distance() {
        let embedding = classical_mds(&[2.0], 2, 1).expect("valid input");
        let coords = embedding.coordinates();

        let d = embedded_distance(&coords[0], &coords[1]);
        assert!((d - 2.0).abs() < 1e-7, "distance {d}");
    }

    #[test]
    fn equilateral_triangle_preserves_pairwise_distances() {
        let embedding = classical_mds(&[1.0, 1.0, 1.0], 3, 2).expect("valid input");
        let coords = embedding.coordinates();

        for i in 0..3 {
            for j in 0..i {
                let d = embedded_distance(&coords[i], &coords[j]);
                assert!((d - 1.0).abs() < 1e-7, "pair ({i},{j}) distance {d}");
            }
        }
    }

    #[test]
    fn unit_square_recovers_both_diagonals() {
        // Points (0,0), (1,0), (1,1), (0,1); condensed pair order
        // (1,0), (2,0), (2,1), (3,0), (3,1), (3,2).
        let sqrt2 = std::f64::consts::SQRT_2;
        let condensed = vec![1.0, sqrt2, 1.0, 1.0, sqrt2, 1.0];
        let embedding = classical_mds(&condensed, 4, 2).expect("valid input");
        let coords = embedding.coordinates();

        let mut index = 0;
        for i in 1..4 {
            for j in 0..i {
                let d = embedded_distance(&coords[i], &coords[j]);
                assert!(
                    (d - condensed[index]).abs() < 1e-7,
                    "pair ({i},{j}) distance {d}, expected {}",
                    condensed[index]
                );
                index += 1;
            }
        }
    }

    #[test]
    fn identical_points_collapse_to_the_origin() {
        let embedding = classical_mds(&[0.0, 0.0, 0.0], 3, 2).expect("valid input");

        for point in embedding.coordinates() {
            for &coordinate in point {
                assert!(coordinate.abs() < 1e-12);
            }
        }
        for &proportion in embedding.proportion_explained() {
            assert_eq!(proportion, 0.0);
        }
    }

    #[test]
    fn planar_input_explains_all_inertia_in_two_axes() {
        let embedding = classical_mds(&[1.0, 1.0, 1.0], 3, 2).expect("valid input");

        let total: f64 = embedding.proportion_explained().iter().sum();
        assert!((total - 1.0).abs() < 1e-7, "explained {total}");
        // The two retained axes split the inertia evenly by symmetry.
        assert!((embedding.proportion_explained()[0] - 0.5).abs() < 1e-7);
        assert_eq!(embedding.n_axes(), 2);
        assert_eq!(embedding.n_samples(), 3);
    }

    #[test]
    fn eigenvalues_are_reported_descending() {
        let sqrt2 = std::f64::consts::SQRT_2;
        let condensed = vec![1.0, sqrt2, 1.0, 1.0, sqrt2, 1.0];
        let embedding = classical_mds(&condensed, 4, 3).expect("valid input");

        for pair in embedding.eigenvalues().windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn too_few_samples_rejected() {
        assert!(matches!(
            classical_mds(&[], 1, 1),
            Err(MdsError::TooFewSamples { n_samples: 1 })
        ));
    }

    #[test]
    fn wrong_condensed_length_rejected() {
        assert!(matches!(
            classical_mds(&[1.0, 2.0], 3, 2),
            Err(MdsError::CondensedLengthMismatch {
                expected: 3,
                got: 2,
                ..
            })
        ));
    }

    #[test]
    fn bad_distances_rejected() {
        assert!(matches!(
            classical_mds(&[1.0, f64::NAN, 1.0], 3, 2),
            Err(MdsError::InvalidDistance { index: 1, .. })
        ));
        assert!(matches!(
            classical_mds(&[1.0, 1.0, -0.5], 3, 2),
            Err(MdsError::InvalidDistance { index: 2, .. })
        ));
    }

    #[test]
    fn axis_count_bounds_rejected() {
        assert!(matches!(
            classical_mds(&[1.0, 1.0, 1.0], 3, 0),
            Err(MdsError::InvalidAxisCount { n_axes: 0, .. })
        ));
        assert!(matches!(
            classical_mds(&[1.0, 1.0, 1.0], 3, 3),
            Err(MdsError::InvalidAxisCount {
                n_axes: 3,
                max_axes: 2,
                ..
            })
        ));
    }
}
