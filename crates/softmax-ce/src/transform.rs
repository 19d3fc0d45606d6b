//! The softmax transform and its relatives.
//!
//! [`softmax`] maps a logit vector to a probability vector:
//!
//! ```text
//! a_i = exp(z_i) / sum_k exp(z_k)
//! ```
//!
//! # Numerical Stability
//!
//! Softmax is invariant to adding a constant to every logit, so the transform
//! subtracts `max(z)` before exponentiating. The largest exponentiated term is
//! then exactly 1 and every other term lies in `[0, 1]`, which bounds the
//! normaliser to `[1, N]`: it can neither overflow nor reach zero.
//!
//! [`naive_softmax`] skips the shift. It is kept for contrast and reports
//! [`SoftmaxError::NumericOverflow`] where the stable form would not.
//!
//! # Precision
//!
//! All arithmetic is `f64`. Any finite input is accepted; a difference
//! `z_i - max` that overflows to `-inf` exponentiates to exactly `0`.

use ndarray::Array2;

use crate::error::{InvalidInput, Result, SoftmaxError};

// =============================================================================
// Validation
// =============================================================================

/// Check that `logits` is non-empty and every entry is finite.
///
/// Returns the first offending index on failure.
pub fn validate_logits(logits: &[f64]) -> Result<()> {
    if logits.is_empty() {
        return InvalidInput::Empty.err();
    }
    match logits.iter().position(|x| !x.is_finite()) {
        Some(index) => InvalidInput::NonFinite {
            index,
            value: logits[index],
        }
        .err(),
        None => Ok(()),
    }
}

/// Check that `probs` is non-empty and every entry lies in `[0, 1]`.
///
/// The sum is not checked here; see
/// [`ClassifierOutput::from_probabilities`](crate::ClassifierOutput::from_probabilities)
/// for the row-sum tolerance.
pub fn validate_probabilities(probs: &[f64]) -> Result<()> {
    if probs.is_empty() {
        return InvalidInput::Empty.err();
    }
    match probs.iter().position(|p| !(0.0..=1.0).contains(p)) {
        Some(index) => InvalidInput::NotAProbability {
            index,
            value: probs[index],
        }
        .err(),
        None => Ok(()),
    }
}

/// Largest element. Callers have already validated the slice.
#[inline]
pub(crate) fn max_value(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// `sum_k exp(z_k - max)` for validated logits.
#[inline]
fn shifted_exp_sum(logits: &[f64], max: f64) -> f64 {
    logits.iter().map(|&z| (z - max).exp()).sum()
}

/// Normaliser must be finite and positive.
#[inline]
fn check_normaliser(sum: f64) -> Result<()> {
    if sum.is_finite() && sum > 0.0 {
        Ok(())
    } else {
        Err(SoftmaxError::NumericOverflow { sum })
    }
}

// =============================================================================
// Softmax
// =============================================================================

/// Numerically stable softmax.
///
/// # Errors
///
/// [`InvalidInput::Empty`] for an empty slice, [`InvalidInput::NonFinite`]
/// if any entry is `NaN` or infinite.
///
/// # Example
///
/// ```
/// let a = softmax_ce::softmax(&[1000.0, 1000.0]).unwrap();
/// assert_eq!(a, vec![0.5, 0.5]);
/// ```
pub fn softmax(logits: &[f64]) -> Result<Vec<f64>> {
    let mut out = logits.to_vec();
    softmax_inplace(&mut out)?;
    Ok(out)
}

/// Numerically stable softmax, overwriting `row` with probabilities.
///
/// On error `row` is left untouched.
pub fn softmax_inplace(row: &mut [f64]) -> Result<()> {
    validate_logits(row)?;

    let max = max_value(row);
    let sum = shifted_exp_sum(row, max);
    check_normaliser(sum)?;

    for x in row.iter_mut() {
        *x = (*x - max).exp() / sum;
    }
    Ok(())
}

/// Softmax without the max shift: `exp(z) / sum(exp(z))`.
///
/// This is the textbook formula. Large logits overflow `exp` to `+inf`, very
/// negative ones underflow it to `0`; either way the normalisation step would
/// produce `NaN`. Instead of returning `NaN`, this reports
/// [`SoftmaxError::NumericOverflow`]. Use [`softmax`] for real work.
pub fn naive_softmax(logits: &[f64]) -> Result<Vec<f64>> {
    validate_logits(logits)?;

    let exps: Vec<f64> = logits.iter().map(|z| z.exp()).collect();
    let sum: f64 = exps.iter().sum();
    check_normaliser(sum)?;

    Ok(exps.into_iter().map(|e| e / sum).collect())
}

// =============================================================================
// Log-space helpers
// =============================================================================

/// `ln(sum_k exp(z_k))`, computed as `max + ln(sum_k exp(z_k - max))`.
pub fn logsumexp(logits: &[f64]) -> Result<f64> {
    validate_logits(logits)?;
    let max = max_value(logits);
    let sum = shifted_exp_sum(logits, max);
    check_normaliser(sum)?;
    Ok(max + sum.ln())
}

/// `ln(softmax(z))` without materialising the probabilities.
///
/// Entries stay finite where `softmax` would underflow to `0`.
pub fn log_softmax(logits: &[f64]) -> Result<Vec<f64>> {
    let lse = logsumexp(logits)?;
    Ok(logits.iter().map(|&z| z - lse).collect())
}

/// Jacobian of softmax with respect to the logits.
///
/// `J[[i, j]] = a_i * (δ_ij - a_j)`: how a change in logit `j` moves
/// probability `i`. Unlike element-wise activations, every output depends on
/// every input, so the matrix is dense.
pub fn softmax_jacobian(logits: &[f64]) -> Result<Array2<f64>> {
    let a = softmax(logits)?;
    let n = a.len();
    Ok(Array2::from_shape_fn((n, n), |(i, j)| {
        let delta = if i == j { 1.0 } else { 0.0 };
        a[i] * (delta - a[j])
    }))
}

// =============================================================================
// Tests
// =============================================================================
