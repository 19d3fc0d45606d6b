//! Batch evaluation.
//!
//! [`Evaluator`] applies a [`CostConfig`] to a batch of classifier outputs and
//! produces an [`EvalReport`]. It also computes the layered and fused costs of
//! the same logits side by side ([`Evaluator::compare_modes`]), which is how
//! the two ways of organising a classifier are contrasted.

use ndarray::{Array2, ArrayView2};
use serde::Serialize;

use crate::config::CostConfig;
use crate::error::{InvalidInput, Result};
use crate::labels::{Targets, Weights};
use crate::logger::EvalLogger;
use crate::loss::{CrossEntropy, LossMode};
use crate::output::{softmax_rows, ClassifierOutput, OutputKind, ValueRange};
use crate::predict::accuracy;
use crate::utils::run_with_threads;

// =============================================================================
// Reports
// =============================================================================

/// Result of evaluating one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalReport {
    /// Loss mode the cost was computed in.
    pub mode: LossMode,
    /// Reduced cost over the batch. May be `+inf` in layered mode.
    pub cost: f64,
    /// Weighted fraction of correct predictions.
    pub accuracy: f64,
    pub n_rows: usize,
    pub n_classes: usize,
    /// Value range of the outputs as given.
    pub range: ValueRange,
}

impl std::fmt::Display for EvalReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "rows: {}, classes: {}", self.n_rows, self.n_classes)?;
        writeln!(f, "output range: [{}, {}]", self.range.min, self.range.max)?;
        writeln!(f, "mode: {}", self.mode)?;
        writeln!(f, "cost: {:.6}", self.cost)?;
        write!(f, "accuracy: {:.4}", self.accuracy)
    }
}

/// Costs of the same logits computed both ways.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModeComparison {
    /// Softmax first, then probabilities into the loss.
    pub layered: f64,
    /// Logits straight into the loss.
    pub fused: f64,
    /// `|layered - fused|`; `+inf` when the layered cost overflowed.
    pub abs_diff: f64,
}

impl ModeComparison {
    pub fn new(layered: f64, fused: f64) -> Self {
        Self {
            layered,
            fused,
            abs_diff: (layered - fused).abs(),
        }
    }

    /// Whether the two modes agree within `tolerance`.
    pub fn agrees(&self, tolerance: f64) -> bool {
        self.abs_diff <= tolerance
    }
}

impl std::fmt::Display for ModeComparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "layered cost: {:.6}", self.layered)?;
        writeln!(f, "fused cost: {:.6}", self.fused)?;
        write!(f, "difference: {:.3e}", self.abs_diff)
    }
}

// =============================================================================
// Evaluator
// =============================================================================

/// Applies a [`CostConfig`] to batches of classifier outputs.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use softmax_ce::{CostConfig, Evaluator, LossMode, OutputKind, Targets, Weights};
///
/// let evaluator = Evaluator::new(CostConfig::default());
/// let output = evaluator
///     .wrap(array![[0.0, 1000.0], [3.0, 1.0]], OutputKind::Logits)
///     .unwrap();
/// let labels = array![1usize, 0];
///
/// let report = evaluator
///     .evaluate(&output, Targets::Sparse(labels.view()), Weights::None)
///     .unwrap();
/// assert_eq!(report.mode, LossMode::Fused);
/// assert_eq!(report.accuracy, 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: CostConfig,
    logger: EvalLogger,
}

impl Evaluator {
    pub fn new(config: CostConfig) -> Self {
        let logger = EvalLogger::new(config.verbosity);
        Self { config, logger }
    }

    #[inline]
    pub fn config(&self) -> &CostConfig {
        &self.config
    }

    /// Validate raw values as a batch of `kind`, using the configured
    /// probability tolerance.
    pub fn wrap(&self, values: Array2<f64>, kind: OutputKind) -> Result<ClassifierOutput> {
        match kind {
            OutputKind::Logits => ClassifierOutput::from_logits(values),
            OutputKind::Probabilities => {
                ClassifierOutput::from_probabilities(values, self.config.probability_tolerance)
            }
        }
    }

    /// The loss mode for outputs of `kind`.
    ///
    /// Without a forced mode the kind decides: logits are fused, probabilities
    /// layered. A forced mode must match the kind.
    pub fn resolve_mode(&self, kind: OutputKind) -> Result<LossMode> {
        match self.config.mode {
            None => Ok(LossMode::for_output(kind)),
            Some(mode) if mode.expected_input() == kind => Ok(mode),
            Some(mode) => InvalidInput::OutputKindMismatch {
                expected: mode.expected_input(),
                actual: kind,
            }
            .err(),
        }
    }

    /// Compute the cost and accuracy of a batch.
    pub fn evaluate(
        &self,
        output: &ClassifierOutput,
        targets: Targets<'_>,
        weights: Weights<'_>,
    ) -> Result<EvalReport> {
        let mode = self.resolve_mode(output.kind())?;
        let loss = CrossEntropy::new(mode);
        let reduction = self.config.reduction;
        self.logger
            .start_evaluation(output.n_rows(), output.n_classes(), mode);

        let (cost, acc) = run_with_threads(self.config.threads(), |parallelism| -> Result<_> {
            let values = output.values();
            let cost = loss.cost(values, targets, weights, reduction, parallelism)?;
            let acc = accuracy(values, targets, weights, parallelism)?;
            Ok((cost, acc))
        })?;

        self.logger.log_cost(mode, cost, acc);
        if !cost.is_finite() {
            self.logger
                .warn("cost is not finite; evaluate logits in fused mode to avoid underflow");
        }

        Ok(EvalReport {
            mode,
            cost,
            accuracy: acc,
            n_rows: output.n_rows(),
            n_classes: output.n_classes(),
            range: output.summary(),
        })
    }

    /// Cost of the same logits in layered and fused mode.
    ///
    /// The layered cost runs the logits through softmax and feeds the
    /// probabilities to the loss; it becomes `+inf` as soon as a true-class
    /// probability underflows. The fused cost stays finite unless the logits
    /// of a row span more than `f64::MAX`.
    pub fn compare_modes(
        &self,
        logits: ArrayView2<'_, f64>,
        targets: Targets<'_>,
        weights: Weights<'_>,
    ) -> Result<ModeComparison> {
        let reduction = self.config.reduction;
        self.logger.debug(&format!(
            "comparing modes on {} rows x {} classes",
            logits.nrows(),
            logits.ncols()
        ));

        let comparison = run_with_threads(self.config.threads(), |parallelism| -> Result<_> {
            let probs = softmax_rows(logits, parallelism)?;
            let layered =
                CrossEntropy::layered().cost(probs.view(), targets, weights, reduction, parallelism)?;
            let fused = CrossEntropy::fused().cost(logits, targets, weights, reduction, parallelism)?;
            Ok(ModeComparison::new(layered, fused))
        })?;

        self.logger
            .log_comparison(comparison.layered, comparison.fused);
        Ok(comparison)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(CostConfig::default())
    }
}
