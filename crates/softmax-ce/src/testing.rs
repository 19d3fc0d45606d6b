//! Testing utilities for softmax-ce.
//!
//! Assertion helpers and tolerance constants shared by unit tests, integration
//! tests and benchmarks, plus deterministic random data in [`data`].
//!
//! ```
//! use softmax_ce::testing::{assert_probability_vector, SUM_TOLERANCE};
//!
//! let a = softmax_ce::softmax(&[3.0, 1.0, 0.2]).unwrap();
//! assert_probability_vector(&a, SUM_TOLERANCE, "softmax");
//! ```

pub mod data;

// =============================================================================
// Constants
// =============================================================================

/// Tolerance on the sum of a probability vector.
pub const SUM_TOLERANCE: f64 = 1e-9;

/// Default tolerance for comparing O(1) values such as probabilities and
/// losses.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

// =============================================================================
// Assertions
// =============================================================================

/// Assert that two slices are approximately equal element-wise.
///
/// # Panics
///
/// Panics if lengths differ or any element differs by more than tolerance.
pub fn assert_slice_approx_eq(actual: &[f64], expected: &[f64], tolerance: f64, context: &str) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "{context}: length mismatch - got {}, expected {}",
        actual.len(),
        expected.len()
    );

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        let diff = (a - e).abs();
        assert!(
            diff <= tolerance,
            "{context}[{i}]: {a} ≠ {e} (diff={diff}, tolerance={tolerance})"
        );
    }
}

/// Assert that `probs` is a probability vector: every entry in `[0, 1]` and
/// the sum within `tolerance` of 1.
pub fn assert_probability_vector(probs: &[f64], tolerance: f64, context: &str) {
    assert!(!probs.is_empty(), "{context}: empty probability vector");
    for (i, p) in probs.iter().enumerate() {
        assert!(
            (0.0..=1.0).contains(p),
            "{context}[{i}]: {p} is not in [0, 1]"
        );
    }
    let sum: f64 = probs.iter().sum();
    assert!(
        (sum - 1.0).abs() <= tolerance,
        "{context}: sums to {sum} (tolerance={tolerance})"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_approx_eq_passes() {
        assert_slice_approx_eq(&[1.0, 2.0], &[1.0, 2.0 + 1e-12], DEFAULT_TOLERANCE, "ok");
    }

    #[test]
    #[should_panic(expected = "length mismatch")]
    fn slice_approx_eq_length() {
        assert_slice_approx_eq(&[1.0], &[1.0, 2.0], DEFAULT_TOLERANCE, "len");
    }

    #[test]
    #[should_panic(expected = "sums to")]
    fn probability_vector_bad_sum() {
        assert_probability_vector(&[0.5, 0.6], SUM_TOLERANCE, "sum");
    }
}
