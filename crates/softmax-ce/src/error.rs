//! Error types.
//!
//! Every fallible operation in the crate returns [`Result<T>`], which carries a
//! [`SoftmaxError`]. Errors are fatal to the call that raised them: there are no
//! partial results.

use crate::output::OutputKind;

/// Convenience alias used throughout the crate.
pub type Result<T, E = SoftmaxError> = std::result::Result<T, E>;

/// Top-level error for softmax, loss and prediction operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SoftmaxError {
    /// The caller passed a malformed vector, label or batch.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// The softmax normaliser left the representable range.
    ///
    /// Only the unshifted transform ([`naive_softmax`](crate::naive_softmax))
    /// can produce this.
    #[error("numeric overflow: softmax normaliser is {sum}")]
    NumericOverflow { sum: f64 },

    /// A fused loss left the representable range.
    ///
    /// `logsumexp(z) - z[y]` can exceed `f64::MAX` when the logits span more
    /// than that, e.g. `[f64::MAX, -f64::MAX]` with the second class as label.
    #[error("numeric overflow: loss is {loss}")]
    LossOverflow { loss: f64 },
}

/// The specific way an input was malformed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidInput {
    #[error("vector is empty")]
    Empty,

    #[error("non-finite value {value} at index {index}")]
    NonFinite { index: usize, value: f64 },

    #[error("value {value} at index {index} is not a probability")]
    NotAProbability { index: usize, value: f64 },

    #[error("row {row} sums to {sum}, expected 1")]
    ProbabilitiesDoNotSumToOne { row: usize, sum: f64 },

    #[error("label {label} is out of range for {n_classes} classes")]
    LabelOutOfRange { label: usize, n_classes: usize },

    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A dense label must hold exactly one `1.0` and zeros elsewhere.
    #[error("target is not a one-hot vector")]
    InvalidOneHot,

    #[error("weight {value} at index {index} must be finite and non-negative")]
    InvalidWeight { index: usize, value: f64 },

    #[error("total sample weight is zero")]
    ZeroTotalWeight,

    #[error("total sample weight {total} is not finite")]
    NonFiniteTotalWeight { total: f64 },

    #[error("loss expects {expected:?} but the outputs are {actual:?}")]
    OutputKindMismatch {
        expected: OutputKind,
        actual: OutputKind,
    },
}

impl InvalidInput {
    /// Shorthand for `Err(SoftmaxError::InvalidInput(self))`.
    #[inline]
    pub(crate) fn err<T>(self) -> Result<T> {
        Err(SoftmaxError::InvalidInput(self))
    }
}
