use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Errors raised while computing the embedding.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("no rows to embed (every model was filtered out)")]
    Empty,
    #[error("embedding input rows have no feature columns")]
    NoFeatures,
    #[error("embedding input rows have inconsistent lengths")]
    RaggedRows,
}

/// Hyperparameters of the 2D stochastic-neighbor embedding.
///
/// `perplexity` plays the role of the neighborhood size: it is the effective
/// number of neighbors each model's similarity distribution is calibrated to.
/// Determinism depends entirely on `seed`; changing the perplexity or the
/// input window changes the layout non-trivially.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub seed: u64,
    pub perplexity: f64,
    pub iterations: usize,
    pub learning_rate: f64,
    pub early_exaggeration: f64,
    pub exaggeration_iterations: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            perplexity: 30.0,
            iterations: 500,
            learning_rate: 100.0,
            early_exaggeration: 12.0,
            exaggeration_iterations: 100,
        }
    }
}

/// Compute a 2D t-SNE embedding of the given rows.
///
/// Rows must be dense and of equal length (run the matrix through
/// `drop_incomplete` first). The result is positionally aligned with the
/// input and bit-for-bit reproducible for a fixed seed and input: the whole
/// computation is sequential f64 arithmetic driven by a seeded `StdRng`.
pub fn embed(rows: &[Vec<f64>], config: &EmbeddingConfig) -> Result<Vec<(f64, f64)>, EmbedError> {
    if rows.is_empty() {
        return Err(EmbedError::Empty);
    }
    let dim = rows[0].len();
    if dim == 0 {
        // A zero-column window slips through the missing-value filter
        // vacuously; laying out zero-feature rows would be pure noise.
        return Err(EmbedError::NoFeatures);
    }
    if rows.iter().any(|row| row.len() != dim) {
        return Err(EmbedError::RaggedRows);
    }

    let n = rows.len();
    if n == 1 {
        return Ok(vec![(0.0, 0.0)]);
    }

    let d2 = pairwise_squared_distances(rows);
    let p = joint_affinities(&d2, n, config.perplexity);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut y: Vec<(f64, f64)> = (0..n)
        .map(|_| {
            (
                (rng.gen::<f64>() - 0.5) * 1e-4,
                (rng.gen::<f64>() - 0.5) * 1e-4,
            )
        })
        .collect();
    let mut velocity = vec![(0.0, 0.0); n];

    let mut num = vec![0.0; n * n];
    for iter in 0..config.iterations {
        // Student-t kernel numerators in the low-dimensional space.
        let mut num_sum = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = y[i].0 - y[j].0;
                let dy = y[i].1 - y[j].1;
                let value = 1.0 / (1.0 + dx * dx + dy * dy);
                num[i * n + j] = value;
                num[j * n + i] = value;
                num_sum += 2.0 * value;
            }
        }

        let exaggeration = if iter < config.exaggeration_iterations {
            config.early_exaggeration
        } else {
            1.0
        };
        let momentum = if iter < config.iterations / 2 { 0.5 } else { 0.8 };

        for i in 0..n {
            let mut grad = (0.0, 0.0);
            for j in 0..n {
                if i == j {
                    continue;
                }
                let q = (num[i * n + j] / num_sum).max(1e-12);
                let weight = 4.0 * (exaggeration * p[i * n + j] - q) * num[i * n + j];
                grad.0 += weight * (y[i].0 - y[j].0);
                grad.1 += weight * (y[i].1 - y[j].1);
            }
            velocity[i].0 = momentum * velocity[i].0 - config.learning_rate * grad.0;
            velocity[i].1 = momentum * velocity[i].1 - config.learning_rate * grad.1;
        }

        let mut mean = (0.0, 0.0);
        for i in 0..n {
            y[i].0 += velocity[i].0;
            y[i].1 += velocity[i].1;
            mean.0 += y[i].0;
            mean.1 += y[i].1;
        }

        // Keep the layout centered; embedding units are arbitrary anyway.
        mean.0 /= n as f64;
        mean.1 /= n as f64;
        for point in y.iter_mut() {
            point.0 -= mean.0;
            point.1 -= mean.1;
        }
    }

    Ok(y)
}

fn pairwise_squared_distances(rows: &[Vec<f64>]) -> Vec<f64> {
    let n = rows.len();
    let mut d2 = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let dist: f64 = rows[i]
                .iter()
                .zip(rows[j].iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            d2[i * n + j] = dist;
            d2[j * n + i] = dist;
        }
    }
    d2
}

/// Symmetrized affinities with per-point Gaussian bandwidths calibrated to
/// the target perplexity by binary search on the precision.
fn joint_affinities(d2: &[f64], n: usize, perplexity: f64) -> Vec<f64> {
    // Perplexity cannot exceed the number of available neighbors.
    let perplexity = perplexity.min((n - 1) as f64 / 3.0).max(1.0);
    let target_entropy = perplexity.ln();

    let mut conditional = vec![0.0; n * n];
    for i in 0..n {
        let mut beta = 1.0;
        let mut beta_min = f64::NEG_INFINITY;
        let mut beta_max = f64::INFINITY;

        for _ in 0..50 {
            let mut sum = 0.0;
            for j in 0..n {
                if j != i {
                    let value = (-d2[i * n + j] * beta).exp();
                    conditional[i * n + j] = value;
                    sum += value;
                }
            }

            let mut entropy = 0.0;
            if sum > 0.0 {
                for j in 0..n {
                    if j != i {
                        let prob = conditional[i * n + j] / sum;
                        conditional[i * n + j] = prob;
                        if prob > 1e-12 {
                            entropy -= prob * prob.ln();
                        }
                    }
                }
            }

            let diff = entropy - target_entropy;
            if diff.abs() < 1e-5 {
                break;
            }
            if diff > 0.0 {
                beta_min = beta;
                beta = if beta_max.is_finite() {
                    (beta + beta_max) / 2.0
                } else {
                    beta * 2.0
                };
            } else {
                beta_max = beta;
                beta = if beta_min.is_finite() {
                    (beta + beta_min) / 2.0
                } else {
                    beta / 2.0
                };
            }
        }
    }

    let mut joint = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let value =
                    (conditional[i * n + j] + conditional[j * n + i]) / (2.0 * n as f64);
                joint[i * n + j] = value.max(1e-12);
            }
        }
    }
    joint
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_clusters() -> Vec<Vec<f64>> {
        // Five rows near the origin, five rows far away from it.
        let mut rows = Vec::new();
        for i in 0..5 {
            rows.push(vec![0.0 + i as f64 * 0.01; 8]);
        }
        for i in 0..5 {
            rows.push(vec![10.0 + i as f64 * 0.01; 8]);
        }
        rows
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let result = embed(&[], &EmbeddingConfig::default());
        assert!(matches!(result, Err(EmbedError::Empty)));
    }

    #[test]
    fn test_zero_feature_rows_are_an_error() {
        let rows = vec![vec![], vec![], vec![]];
        let result = embed(&rows, &EmbeddingConfig::default());
        assert!(matches!(result, Err(EmbedError::NoFeatures)));
    }

    #[test]
    fn test_ragged_rows_are_an_error() {
        let rows = vec![vec![0.0, 1.0], vec![0.0]];
        let result = embed(&rows, &EmbeddingConfig::default());
        assert!(matches!(result, Err(EmbedError::RaggedRows)));
    }

    #[test]
    fn test_single_row_embeds_trivially() {
        let rows = vec![vec![0.1, 0.2, 0.3]];
        let coords = embed(&rows, &EmbeddingConfig::default()).unwrap();
        assert_eq!(coords, vec![(0.0, 0.0)]);
    }

    #[test]
    fn test_output_is_aligned_with_input() {
        let rows = two_clusters();
        let coords = embed(&rows, &EmbeddingConfig::default()).unwrap();
        assert_eq!(coords.len(), rows.len());
        assert!(coords.iter().all(|(x, y)| x.is_finite() && y.is_finite()));
    }

    #[test]
    fn test_same_seed_is_bit_for_bit_reproducible() {
        let rows = two_clusters();
        let config = EmbeddingConfig::default();

        let first = embed(&rows, &config).unwrap();
        let second = embed(&rows, &config).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seeds_give_different_layouts() {
        let rows = two_clusters();
        let base = EmbeddingConfig::default();
        let other = EmbeddingConfig { seed: 7, ..base.clone() };

        let first = embed(&rows, &base).unwrap();
        let second = embed(&rows, &other).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_distant_clusters_stay_separated() {
        let rows = two_clusters();
        let coords = embed(&rows, &EmbeddingConfig::default()).unwrap();

        let center = |points: &[(f64, f64)]| {
            let n = points.len() as f64;
            (
                points.iter().map(|p| p.0).sum::<f64>() / n,
                points.iter().map(|p| p.1).sum::<f64>() / n,
            )
        };
        let (ax, ay) = center(&coords[..5]);
        let (bx, by) = center(&coords[5..]);
        let between = ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt();

        let spread = |points: &[(f64, f64)], cx: f64, cy: f64| {
            points
                .iter()
                .map(|p| ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt())
                .fold(0.0f64, f64::max)
        };
        let within = spread(&coords[..5], ax, ay).max(spread(&coords[5..], bx, by));

        assert!(
            between > within,
            "cluster centers {:.3} apart, max within-cluster spread {:.3}",
            between,
            within
        );
    }
}
