//! Cross-entropy loss for softmax classifiers.
//!
//! A classifier can be organised two ways:
//!
//! - **Layered**: softmax is the model's last layer, so the model emits
//!   probabilities and the loss takes `-ln(a[y])`.
//! - **Fused**: the model emits raw logits and the loss folds the softmax in,
//!   computing `logsumexp(z) - z[y]` directly.
//!
//! Both give the same number for well-scaled inputs. They differ when a
//! probability underflows: `a[y] = 0` makes the layered loss `+inf`, while the
//! fused form never leaves log space and stays finite. The only fused overflow
//! is a loss above `f64::MAX`, which needs logits spread wider than `f64::MAX`;
//! it is reported as [`SoftmaxError::LossOverflow`].

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::error::{InvalidInput, Result, SoftmaxError};
use crate::labels::{Label, Targets, Weights};
use crate::output::OutputKind;
use crate::transform::{logsumexp, softmax, validate_probabilities};
use crate::utils::{with_row_slice, Parallelism};

// =============================================================================
// Per-example losses
// =============================================================================

/// Layered loss for a sparse label: `-ln(probs[label])`.
///
/// No clamping is applied, so an underflowed probability yields `+inf`.
pub fn sparse_cross_entropy(probs: &[f64], label: usize) -> Result<f64> {
    validate_probabilities(probs)?;
    let y = Label::Index(label).class_index(probs.len())?;
    Ok(-probs[y].ln())
}

/// Layered loss for a one-hot label: `-sum_j onehot[j] * ln(probs[j])`.
///
/// Zero terms are skipped, so `0 * ln(0)` does not turn the sum into `NaN`.
pub fn categorical_cross_entropy(probs: &[f64], one_hot: &[f64]) -> Result<f64> {
    validate_probabilities(probs)?;
    Label::OneHot(one_hot).class_index(probs.len())?;
    Ok(-one_hot
        .iter()
        .zip(probs)
        .filter(|(t, _)| **t != 0.0)
        .map(|(t, p)| t * p.ln())
        .sum::<f64>())
}

/// Fused loss for a sparse label: `logsumexp(logits) - logits[label]`.
///
/// # Errors
///
/// [`SoftmaxError::LossOverflow`] when the logits span more than `f64::MAX`
/// and the difference does not fit in an `f64`.
///
/// # Example
///
/// ```
/// // probs[0] underflows to 0 here, but the loss is still finite.
/// let loss = softmax_ce::sparse_cross_entropy_from_logits(&[0.0, 1000.0], 0).unwrap();
/// assert!((loss - 1000.0).abs() < 1e-9);
/// ```
pub fn sparse_cross_entropy_from_logits(logits: &[f64], label: usize) -> Result<f64> {
    let lse = logsumexp(logits)?;
    let y = Label::Index(label).class_index(logits.len())?;
    check_loss(lse - logits[y])
}

/// Fused loss for a one-hot label: `-sum_j onehot[j] * log_softmax(z)[j]`.
///
/// Fails like [`sparse_cross_entropy_from_logits`] when the loss overflows.
pub fn categorical_cross_entropy_from_logits(logits: &[f64], one_hot: &[f64]) -> Result<f64> {
    let lse = logsumexp(logits)?;
    Label::OneHot(one_hot).class_index(logits.len())?;
    check_loss(
        -one_hot
            .iter()
            .zip(logits)
            .filter(|(t, _)| **t != 0.0)
            .map(|(t, z)| t * (z - lse))
            .sum::<f64>(),
    )
}

#[inline]
fn check_loss(loss: f64) -> Result<f64> {
    if loss.is_finite() {
        Ok(loss)
    } else {
        Err(SoftmaxError::LossOverflow { loss })
    }
}

/// Gradient of the fused loss with respect to the logits:
/// `softmax(z) - onehot(y)`.
///
/// Entries sum to zero; only the true class gets a negative component.
pub fn cross_entropy_gradient(logits: &[f64], label: Label<'_>) -> Result<Vec<f64>> {
    let mut grad = softmax(logits)?;
    let y = label.class_index(grad.len())?;
    grad[y] -= 1.0;
    Ok(grad)
}

// =============================================================================
// Modes
// =============================================================================

/// How the loss receives the classifier's outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossMode {
    /// Probabilities in; the model applied softmax itself.
    Layered,
    /// Logits in; softmax is folded into the loss.
    Fused,
}

impl LossMode {
    /// The kind of output this mode consumes.
    pub fn expected_input(self) -> OutputKind {
        match self {
            LossMode::Layered => OutputKind::Probabilities,
            LossMode::Fused => OutputKind::Logits,
        }
    }

    /// The mode that consumes outputs of `kind`.
    pub fn for_output(kind: OutputKind) -> Self {
        match kind {
            OutputKind::Probabilities => LossMode::Layered,
            OutputKind::Logits => LossMode::Fused,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LossMode::Layered => "layered",
            LossMode::Fused => "fused",
        }
    }
}

impl std::fmt::Display for LossMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How per-example losses combine into a batch cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    /// Weighted arithmetic mean; the plain mean when unweighted.
    #[default]
    Mean,
    /// Weighted sum.
    Sum,
}

// =============================================================================
// CrossEntropy
// =============================================================================

/// Cross-entropy loss in a fixed [`LossMode`].
///
/// Lower is better. Labels may be sparse or one-hot.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use softmax_ce::{CrossEntropy, Parallelism, Reduction, Targets, Weights};
///
/// let logits = array![[0.0, 1000.0], [2.0, 2.0]];
/// let labels = array![0usize, 1];
/// let cost = CrossEntropy::fused()
///     .cost(
///         logits.view(),
///         Targets::Sparse(labels.view()),
///         Weights::None,
///         Reduction::Sum,
///         Parallelism::Sequential,
///     )
///     .unwrap();
/// assert!((cost - (1000.0 + 2f64.ln())).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossEntropy {
    pub mode: LossMode,
}

impl CrossEntropy {
    pub fn new(mode: LossMode) -> Self {
        Self { mode }
    }

    pub fn layered() -> Self {
        Self::new(LossMode::Layered)
    }

    pub fn fused() -> Self {
        Self::new(LossMode::Fused)
    }

    /// The kind of output rows this loss consumes.
    #[inline]
    pub fn expected_input(&self) -> OutputKind {
        self.mode.expected_input()
    }

    pub fn name(&self) -> &'static str {
        match self.mode {
            LossMode::Layered => "cross_entropy",
            LossMode::Fused => "cross_entropy_from_logits",
        }
    }

    /// Loss for a single example.
    pub fn loss(&self, row: &[f64], label: Label<'_>) -> Result<f64> {
        match (self.mode, label) {
            (LossMode::Layered, Label::Index(y)) => sparse_cross_entropy(row, y),
            (LossMode::Layered, Label::OneHot(t)) => categorical_cross_entropy(row, t),
            (LossMode::Fused, Label::Index(y)) => sparse_cross_entropy_from_logits(row, y),
            (LossMode::Fused, Label::OneHot(t)) => categorical_cross_entropy_from_logits(row, t),
        }
    }

    /// Loss of every row, in row order.
    pub fn per_example(
        &self,
        outputs: ArrayView2<'_, f64>,
        targets: Targets<'_>,
        parallelism: Parallelism,
    ) -> Result<Vec<f64>> {
        let (n_rows, n_classes) = outputs.dim();
        if n_rows == 0 || n_classes == 0 {
            return InvalidInput::Empty.err();
        }
        targets.validate_shape(n_rows, n_classes)?;

        parallelism.maybe_par_try_map(0..n_rows, |i| -> Result<f64> {
            let label = targets.label(i)?;
            with_row_slice(outputs.row(i), |row| self.loss(row, label))
        })
    }

    /// Reduce the per-example losses to one number.
    ///
    /// Rows with zero weight contribute nothing, even when their loss is
    /// infinite.
    pub fn cost(
        &self,
        outputs: ArrayView2<'_, f64>,
        targets: Targets<'_>,
        weights: Weights<'_>,
        reduction: Reduction,
        parallelism: Parallelism,
    ) -> Result<f64> {
        let n_rows = outputs.nrows();
        if n_rows == 0 {
            return InvalidInput::Empty.err();
        }
        let total_weight = weights.validate(n_rows)?;
        let losses = self.per_example(outputs, targets, parallelism)?;

        let weighted: f64 = losses
            .iter()
            .zip(weights.iter(n_rows))
            .filter(|(_, w)| *w > 0.0)
            .map(|(l, w)| l * w)
            .sum();

        Ok(match reduction {
            Reduction::Mean => weighted / total_weight,
            Reduction::Sum => weighted,
        })
    }

    /// Gradient of the loss with respect to the logits of one example.
    ///
    /// The fused loss is a function of the logits directly. The layered loss
    /// reaches the logits through softmax, and by the chain rule its gradient
    /// is the same `softmax(z) - onehot(y)`, so both modes share it.
    pub fn gradient(&self, logits: &[f64], label: Label<'_>) -> Result<Vec<f64>> {
        cross_entropy_gradient(logits, label)
    }
}

impl Default for CrossEntropy {
    fn default() -> Self {
        Self::fused()
    }
}

// =============================================================================
// Tests
// =============================================================================
