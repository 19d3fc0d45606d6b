//! Target labels and sample weights.
//!
//! A target designates "the true class" in one of two encodings:
//!
//! - **sparse**: a class index in `0..n_classes`
//! - **one-hot**: a length-`n_classes` vector with a single `1.0` at the true
//!   index and `0.0` elsewhere
//!
//! [`Label`] holds one example's target, [`Targets`] a whole batch, and
//! [`Weights`] the optional per-example weights used when averaging.

use ndarray::{ArrayView1, ArrayView2, Axis};

use crate::error::{InvalidInput, Result};

// =============================================================================
// Label
// =============================================================================

/// Target for a single example.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Label<'a> {
    /// Sparse encoding: the class index.
    Index(usize),
    /// Dense encoding: a one-hot vector.
    OneHot(&'a [f64]),
}

impl Label<'_> {
    /// Resolve the true class index, validating against `n_classes`.
    ///
    /// # Errors
    ///
    /// - [`InvalidInput::LabelOutOfRange`] if a sparse index is `>= n_classes`
    /// - [`InvalidInput::LengthMismatch`] if a one-hot vector has the wrong length
    /// - [`InvalidInput::InvalidOneHot`] if it is not exactly one-hot
    pub fn class_index(&self, n_classes: usize) -> Result<usize> {
        match *self {
            Label::Index(label) => {
                if label < n_classes {
                    Ok(label)
                } else {
                    InvalidInput::LabelOutOfRange { label, n_classes }.err()
                }
            }
            Label::OneHot(values) => {
                if values.len() != n_classes {
                    return InvalidInput::LengthMismatch {
                        expected: n_classes,
                        actual: values.len(),
                    }
                    .err();
                }
                one_hot_index(values)
            }
        }
    }
}

impl From<usize> for Label<'_> {
    fn from(index: usize) -> Self {
        Label::Index(index)
    }
}

impl<'a> From<&'a [f64]> for Label<'a> {
    fn from(values: &'a [f64]) -> Self {
        Label::OneHot(values)
    }
}

/// Index of the single `1.0` in a one-hot vector.
fn one_hot_index(values: &[f64]) -> Result<usize> {
    let mut hot = None;
    for (i, &v) in values.iter().enumerate() {
        if v == 1.0 {
            if hot.is_some() {
                return InvalidInput::InvalidOneHot.err();
            }
            hot = Some(i);
        } else if v != 0.0 {
            return InvalidInput::InvalidOneHot.err();
        }
    }
    hot.ok_or(InvalidInput::InvalidOneHot.into())
}

/// Build the one-hot encoding of `index` over `n_classes` classes.
///
/// # Example
///
/// ```
/// assert_eq!(softmax_ce::one_hot(2, 4).unwrap(), vec![0.0, 0.0, 1.0, 0.0]);
/// ```
pub fn one_hot(index: usize, n_classes: usize) -> Result<Vec<f64>> {
    if index >= n_classes {
        return InvalidInput::LabelOutOfRange {
            label: index,
            n_classes,
        }
        .err();
    }
    let mut out = vec![0.0; n_classes];
    out[index] = 1.0;
    Ok(out)
}

// =============================================================================
// Targets
// =============================================================================

/// Targets for a batch of examples.
#[derive(Debug, Clone, Copy)]
pub enum Targets<'a> {
    /// One class index per row.
    Sparse(ArrayView1<'a, usize>),
    /// One one-hot row per example, shape `(n_rows, n_classes)`.
    OneHot(ArrayView2<'a, f64>),
}

impl<'a> Targets<'a> {
    /// Number of examples.
    pub fn n_rows(&self) -> usize {
        match self {
            Targets::Sparse(labels) => labels.len(),
            Targets::OneHot(rows) => rows.nrows(),
        }
    }

    /// Check that there is exactly one target per output row and, for
    /// one-hot targets, one column per class.
    pub fn validate_shape(&self, n_rows: usize, n_classes: usize) -> Result<()> {
        if self.n_rows() != n_rows {
            return InvalidInput::LengthMismatch {
                expected: n_rows,
                actual: self.n_rows(),
            }
            .err();
        }
        if let Targets::OneHot(rows) = self {
            if rows.ncols() != n_classes {
                return InvalidInput::LengthMismatch {
                    expected: n_classes,
                    actual: rows.ncols(),
                }
                .err();
            }
        }
        Ok(())
    }

    /// Label of example `row`, borrowing from the batch when possible.
    ///
    /// One-hot rows that are not contiguous in memory are resolved to their
    /// class index instead.
    pub fn label(&self, row: usize) -> Result<Label<'a>> {
        match *self {
            Targets::Sparse(labels) => Ok(Label::Index(labels[row])),
            Targets::OneHot(rows) => {
                let r = rows.index_axis_move(Axis(0), row);
                match r.to_slice() {
                    Some(values) => Ok(Label::OneHot(values)),
                    None => {
                        let values = r.to_vec();
                        Ok(Label::Index(one_hot_index(&values)?))
                    }
                }
            }
        }
    }

    /// Resolve the class index of example `row`.
    pub fn class_index(&self, row: usize, n_classes: usize) -> Result<usize> {
        self.label(row)?.class_index(n_classes)
    }
}

// =============================================================================
// Weights
// =============================================================================

/// Optional per-example weights.
///
/// `None` means uniform weights, in which case weighted averages reduce to
/// plain arithmetic means.
#[derive(Debug, Clone, Copy, Default)]
pub enum Weights<'a> {
    #[default]
    None,
    Some(ArrayView1<'a, f64>),
}

impl<'a> Weights<'a> {
    /// Wrap an array view of weights.
    pub fn from_array(weights: ArrayView1<'a, f64>) -> Self {
        Weights::Some(weights)
    }

    /// Weight of example `row`.
    #[inline]
    pub fn get(&self, row: usize) -> f64 {
        match self {
            Weights::None => 1.0,
            Weights::Some(w) => w[row],
        }
    }

    /// Iterate over `n_rows` weights.
    pub fn iter(&self, n_rows: usize) -> impl Iterator<Item = f64> + 'a {
        let weights = *self;
        (0..n_rows).map(move |i| weights.get(i))
    }

    /// Validate length, finiteness and sign; returns the total weight.
    ///
    /// # Errors
    ///
    /// [`InvalidInput::LengthMismatch`], [`InvalidInput::InvalidWeight`] or
    /// [`InvalidInput::ZeroTotalWeight`]; [`InvalidInput::NonFiniteTotalWeight`]
    /// when finite weights add up to `+inf`.
    pub fn validate(&self, n_rows: usize) -> Result<f64> {
        if let Weights::Some(w) = self {
            if w.len() != n_rows {
                return InvalidInput::LengthMismatch {
                    expected: n_rows,
                    actual: w.len(),
                }
                .err();
            }
            if let Some(index) = w.iter().position(|v| !v.is_finite() || *v < 0.0) {
                return InvalidInput::InvalidWeight {
                    index,
                    value: w[index],
                }
                .err();
            }
        }

        let total: f64 = self.iter(n_rows).sum();
        if !total.is_finite() {
            return InvalidInput::NonFiniteTotalWeight { total }.err();
        }
        if total > 0.0 {
            Ok(total)
        } else {
            InvalidInput::ZeroTotalWeight.err()
        }
    }
}
