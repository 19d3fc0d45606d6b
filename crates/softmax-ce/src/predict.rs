//! Prediction extraction.
//!
//! The predicted class is the index of the largest output. Softmax is strictly
//! increasing in each logit, so the argmax of the logits and the argmax of
//! their probabilities agree: prediction never needs the softmax.

use ndarray::ArrayView2;

use crate::error::{InvalidInput, Result};
use crate::labels::{Targets, Weights};
use crate::transform::validate_logits;
use crate::utils::{with_row_slice, Parallelism};

/// Index of the largest value. Ties resolve to the lowest index.
///
/// Works on logits and probabilities alike.
///
/// # Example
///
/// ```
/// assert_eq!(softmax_ce::argmax(&[1.0, 4.0, 4.0, 2.0]).unwrap(), 1);
/// ```
pub fn argmax(values: &[f64]) -> Result<usize> {
    validate_logits(values)?;
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    Ok(best)
}

/// Predicted class of every row, in row order.
pub fn predict_classes(values: ArrayView2<'_, f64>, parallelism: Parallelism) -> Result<Vec<usize>> {
    if values.ncols() == 0 {
        return InvalidInput::Empty.err();
    }
    parallelism.maybe_par_try_map(0..values.nrows(), |i| with_row_slice(values.row(i), argmax))
}

/// Multiclass accuracy: weighted fraction of rows whose argmax is the target
/// class.
///
/// Higher is better.
pub fn accuracy(
    outputs: ArrayView2<'_, f64>,
    targets: Targets<'_>,
    weights: Weights<'_>,
    parallelism: Parallelism,
) -> Result<f64> {
    let (n_rows, n_classes) = outputs.dim();
    if n_rows == 0 || n_classes == 0 {
        return InvalidInput::Empty.err();
    }
    targets.validate_shape(n_rows, n_classes)?;
    let total_weight = weights.validate(n_rows)?;

    let predictions = predict_classes(outputs, parallelism)?;

    let mut correct = 0.0;
    for (i, (pred, w)) in predictions.iter().zip(weights.iter(n_rows)).enumerate() {
        if *pred == targets.class_index(i, n_classes)? {
            correct += w;
        }
    }
    Ok(correct / total_weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SoftmaxError;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    #[test]
    fn argmax_basic() {
        assert_eq!(argmax(&[1.0, 2.0, 3.0, 4.0]), Ok(3));
        assert_eq!(argmax(&[-7.0]), Ok(0));
    }

    #[test]
    fn argmax_ties_go_low() {
        assert_eq!(argmax(&[5.0, 5.0, 5.0]), Ok(0));
        assert_eq!(argmax(&[0.0, 9.0, 1.0, 9.0]), Ok(1));
    }

    #[test]
    fn argmax_rejects_bad_input() {
        assert_eq!(argmax(&[]), Err(SoftmaxError::InvalidInput(InvalidInput::Empty)));
        assert!(matches!(
            argmax(&[0.0, f64::NAN]),
            Err(SoftmaxError::InvalidInput(InvalidInput::NonFinite { index: 1, .. }))
        ));
    }

    #[test]
    fn predict_classes_row_order() {
        let values = array![[0.1, 0.9], [3.0, -3.0], [2.0, 2.0]];
        for p in [Parallelism::Sequential, Parallelism::Parallel] {
            assert_eq!(predict_classes(values.view(), p), Ok(vec![1, 0, 0]));
        }
        // Transposed: [[0.1, 3.0, 2.0], [0.9, -3.0, 2.0]].
        assert_eq!(predict_classes(values.t(), Parallelism::Sequential), Ok(vec![1, 2]));
    }

    #[test]
    fn predict_classes_zero_rows() {
        let values = Array2::<f64>::zeros((0, 3));
        assert_eq!(predict_classes(values.view(), Parallelism::Sequential), Ok(vec![]));
    }

    #[test]
    fn accuracy_unweighted() {
        let values = array![[0.1, 0.9], [0.8, 0.2], [0.3, 0.7], [0.6, 0.4]];
        let labels = array![1usize, 0, 0, 1];
        let acc = accuracy(
            values.view(),
            Targets::Sparse(labels.view()),
            Weights::None,
            Parallelism::Sequential,
        )
        .unwrap();
        assert_abs_diff_eq!(acc, 0.5);
    }

    #[test]
    fn accuracy_weighted_one_hot() {
        let values = array![[2.0, 1.0], [2.0, 1.0]];
        let hot = array![[1.0, 0.0], [0.0, 1.0]];
        let weights = array![3.0, 1.0];
        let acc = accuracy(
            values.view(),
            Targets::OneHot(hot.view()),
            Weights::from_array(weights.view()),
            Parallelism::Parallel,
        )
        .unwrap();
        assert_abs_diff_eq!(acc, 0.75);
    }
}
