use ndarray::{Array1, Array2};
use rand::prelude::*;

/// Random logits of shape `(rows, n_classes)`, uniform in `[min, max]`.
pub fn random_logits(rows: usize, n_classes: usize, seed: u64, min: f64, max: f64) -> Array2<f64> {
    assert!(max >= min);
    let mut rng = StdRng::seed_from_u64(seed);
    let width = max - min;
    Array2::from_shape_simple_fn((rows, n_classes), || min + rng.r#gen::<f64>() * width)
}

/// Random class indices in `0..n_classes`.
pub fn random_labels(rows: usize, n_classes: usize, seed: u64) -> Array1<usize> {
    assert!(n_classes > 0);
    let mut rng = StdRng::seed_from_u64(seed);
    Array1::from_shape_simple_fn(rows, || rng.gen_range(0..n_classes))
}

/// One-hot encoding of `labels`, shape `(labels.len(), n_classes)`.
pub fn one_hot_matrix(labels: &Array1<usize>, n_classes: usize) -> Array2<f64> {
    let mut out = Array2::zeros((labels.len(), n_classes));
    for (row, &label) in labels.iter().enumerate() {
        out[[row, label]] = 1.0;
    }
    out
}

/// Random non-negative weights in `[0.5, 1.5)`.
pub fn random_weights(rows: usize, seed: u64) -> Array1<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array1::from_shape_simple_fn(rows, || 0.5 + rng.r#gen::<f64>())
}

/// Logits whose true class wins by `margin` over every other class.
///
/// With a large margin the layered probability of every *other* class
/// underflows, which is the setting in which the two loss modes diverge when
/// the label points at a losing class.
pub fn separated_logits(labels: &Array1<usize>, n_classes: usize, margin: f64) -> Array2<f64> {
    let mut out = Array2::zeros((labels.len(), n_classes));
    for (row, &label) in labels.iter().enumerate() {
        out[[row, label]] = margin;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_per_seed() {
        assert_eq!(random_logits(4, 3, 7, -2.0, 2.0), random_logits(4, 3, 7, -2.0, 2.0));
        assert_ne!(random_logits(4, 3, 7, -2.0, 2.0), random_logits(4, 3, 8, -2.0, 2.0));
    }

    #[test]
    fn values_in_range() {
        let logits = random_logits(50, 5, 1, -3.0, 3.0);
        assert!(logits.iter().all(|v| (-3.0..=3.0).contains(v)));
        let labels = random_labels(50, 5, 2);
        assert!(labels.iter().all(|&l| l < 5));
    }

    #[test]
    fn one_hot_rows() {
        let labels = Array1::from(vec![2usize, 0]);
        let hot = one_hot_matrix(&labels, 3);
        assert_eq!(hot.row(0).to_vec(), vec![0.0, 0.0, 1.0]);
        assert_eq!(hot.row(1).to_vec(), vec![1.0, 0.0, 0.0]);
    }
}
