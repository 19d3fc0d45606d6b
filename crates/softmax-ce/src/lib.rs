//! softmax-ce: numerically stable softmax and cross-entropy for Rust.
//!
//! Softmax turns a vector of logits into a probability distribution;
//! cross-entropy scores that distribution against the true class. The crate
//! covers both ways a multiclass classifier can be organised:
//!
//! - **layered**: the model emits probabilities and the loss consumes them;
//! - **fused**: the model emits logits and the loss folds the softmax in,
//!   staying finite where the layered form overflows.
//!
//! # Key Types
//!
//! - [`softmax`] / [`log_softmax`] / [`logsumexp`] - Per-vector transforms
//! - [`CrossEntropy`] / [`LossMode`] - Loss in either organisation
//! - [`ClassifierOutput`] - A batch of logits or probabilities
//! - [`Evaluator`] / [`CostConfig`] - Configured batch evaluation
//!
//! # Example
//!
//! ```
//! use softmax_ce::{argmax, softmax, sparse_cross_entropy_from_logits};
//!
//! let z = [1.0, 2.0, 3.0, 4.0];
//! let a = softmax(&z).unwrap();
//! assert!((a.iter().sum::<f64>() - 1.0).abs() < 1e-12);
//! assert_eq!(argmax(&z).unwrap(), argmax(&a).unwrap());
//!
//! let loss = sparse_cross_entropy_from_logits(&z, 3).unwrap();
//! assert!((loss + a[3].ln()).abs() < 1e-12);
//! ```

// Re-export approx for users who want to compare probabilities
pub use approx;

pub mod config;
pub mod error;
pub mod eval;
pub mod labels;
pub mod logger;
pub mod loss;
pub mod output;
pub mod predict;
pub mod testing;
pub mod transform;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Errors
pub use error::{InvalidInput, Result, SoftmaxError};

// Transforms
pub use transform::{
    log_softmax, logsumexp, naive_softmax, softmax, softmax_inplace, softmax_jacobian,
    validate_logits, validate_probabilities,
};

// Labels
pub use labels::{one_hot, Label, Targets, Weights};

// Losses
pub use loss::{
    categorical_cross_entropy, categorical_cross_entropy_from_logits, cross_entropy_gradient,
    sparse_cross_entropy, sparse_cross_entropy_from_logits, CrossEntropy, LossMode, Reduction,
};

// Prediction
pub use predict::{accuracy, argmax, predict_classes};

// Batches
pub use output::{softmax_rows, softmax_rows_inplace, ClassifierOutput, OutputKind, ValueRange};

// Evaluation and configuration
pub use config::{ConfigError, CostConfig};
pub use eval::{EvalReport, Evaluator, ModeComparison};
pub use logger::{EvalLogger, Verbosity};

// Shared utilities
pub use utils::{run_with_threads, Parallelism};
