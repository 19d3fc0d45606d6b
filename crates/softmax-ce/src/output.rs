//! Batches of classifier outputs.
//!
//! A classifier emits one row of `n_classes` values per example. Depending on
//! how the model is organised those values are either raw **logits** (a linear
//! last layer) or **probabilities** (softmax folded into the last layer).
//! [`ClassifierOutput`] tags a batch with its [`OutputKind`] so that losses and
//! reports can pick the matching computation.
//!
//! # Layout
//!
//! Row-major `(n_rows, n_classes)`: row `i` is example `i`, column `c` is
//! class `c`.

use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{InvalidInput, Result};
use crate::predict::predict_classes;
use crate::transform::{softmax_inplace, validate_probabilities};
use crate::utils::Parallelism;

// =============================================================================
// OutputKind
// =============================================================================

/// Semantic kind of classifier output values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Unnormalised per-class scores, any finite real value.
    Logits,
    /// Per-class probabilities in `[0, 1]`, each row summing to 1.
    Probabilities,
}

impl OutputKind {
    pub fn name(self) -> &'static str {
        match self {
            OutputKind::Logits => "logits",
            OutputKind::Probabilities => "probabilities",
        }
    }
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Batch softmax
// =============================================================================

/// Apply softmax to every row of `values` in place.
///
/// Rows are independent. If a row fails validation the call returns its error;
/// rows processed before it have already been transformed.
pub fn softmax_rows_inplace(mut values: ArrayViewMut2<'_, f64>, parallelism: Parallelism) -> Result<()> {
    if values.ncols() == 0 {
        return InvalidInput::Empty.err();
    }
    parallelism.maybe_par_bridge_try_for_each(values.axis_iter_mut(Axis(0)), softmax_row)
}

/// Apply softmax to every row of `logits`, returning a new batch.
///
/// Output row `i` is the probability vector of input row `i`.
pub fn softmax_rows(logits: ArrayView2<'_, f64>, parallelism: Parallelism) -> Result<Array2<f64>> {
    let mut out = logits.as_standard_layout().into_owned();
    softmax_rows_inplace(out.view_mut(), parallelism)?;
    Ok(out)
}

fn softmax_row(mut row: ArrayViewMut1<'_, f64>) -> Result<()> {
    if let Some(slice) = row.as_slice_mut() {
        return softmax_inplace(slice);
    }
    let mut buf = row.to_vec();
    softmax_inplace(&mut buf)?;
    row.assign(&ArrayView1::from(&buf[..]));
    Ok(())
}

// =============================================================================
// ValueRange
// =============================================================================

/// Smallest and largest value across a batch.
///
/// Probabilities stay within `[0, 1]`; logits typically do not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

// =============================================================================
// ClassifierOutput
// =============================================================================

/// A validated batch of classifier outputs.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use softmax_ce::{ClassifierOutput, OutputKind, Parallelism};
///
/// let logits = ClassifierOutput::from_logits(array![[1.0, 2.0, 3.0, 4.0]]).unwrap();
/// let probs = logits.to_probabilities(Parallelism::Sequential).unwrap();
/// assert_eq!(probs.kind(), OutputKind::Probabilities);
/// assert_eq!(probs.predict(Parallelism::Sequential).unwrap(), vec![3]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierOutput {
    values: Array2<f64>,
    kind: OutputKind,
}

impl ClassifierOutput {
    /// Wrap a batch of logits.
    ///
    /// # Errors
    ///
    /// [`InvalidInput::Empty`] if the batch has no rows or no classes,
    /// [`InvalidInput::NonFinite`] (with the row-major flat index) for any
    /// `NaN` or infinite value.
    pub fn from_logits(values: Array2<f64>) -> Result<Self> {
        validate_batch(values.view())?;
        Ok(Self {
            values,
            kind: OutputKind::Logits,
        })
    }

    /// Wrap a batch of probabilities.
    ///
    /// Every entry must lie in `[0, 1]` and every row must sum to 1 within
    /// `tolerance`.
    pub fn from_probabilities(values: Array2<f64>, tolerance: f64) -> Result<Self> {
        validate_batch(values.view())?;
        for (row_idx, row) in values.rows().into_iter().enumerate() {
            let row = row.to_vec();
            validate_probabilities(&row)?;
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > tolerance {
                return InvalidInput::ProbabilitiesDoNotSumToOne { row: row_idx, sum }.err();
            }
        }
        Ok(Self {
            values,
            kind: OutputKind::Probabilities,
        })
    }

    #[inline]
    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    #[inline]
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    #[inline]
    pub fn n_classes(&self) -> usize {
        self.values.ncols()
    }

    /// Convert to probabilities.
    ///
    /// Logits go through the stable softmax; probabilities are cloned as-is.
    pub fn to_probabilities(&self, parallelism: Parallelism) -> Result<ClassifierOutput> {
        match self.kind {
            OutputKind::Probabilities => Ok(self.clone()),
            OutputKind::Logits => Ok(Self {
                values: softmax_rows(self.values.view(), parallelism)?,
                kind: OutputKind::Probabilities,
            }),
        }
    }

    /// Predicted class per row.
    ///
    /// Softmax preserves order, so this does not need probabilities: it gives
    /// the same answer on logits and on their softmax.
    pub fn predict(&self, parallelism: Parallelism) -> Result<Vec<usize>> {
        predict_classes(self.values.view(), parallelism)
    }

    /// Smallest and largest value in the batch.
    pub fn summary(&self) -> ValueRange {
        let (min, max) = self
            .values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        ValueRange { min, max }
    }
}

/// Non-empty in both dimensions and finite everywhere.
fn validate_batch(values: ArrayView2<'_, f64>) -> Result<()> {
    if values.is_empty() {
        return InvalidInput::Empty.err();
    }
    let n_classes = values.ncols();
    match values.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, col), &value)) => InvalidInput::NonFinite {
            index: row * n_classes + col,
            value,
        }
        .err(),
        None => Ok(()),
    }
}
