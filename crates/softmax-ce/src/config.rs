//! Evaluation configuration with builder pattern.
//!
//! [`CostConfig`] controls how [`Evaluator`](crate::Evaluator) turns a batch of
//! outputs into a cost. It is built with `bon` and validated at `build()`, and
//! can also be read from JSON where every field is optional.
//!
//! # Example
//!
//! ```
//! use softmax_ce::{CostConfig, LossMode, Reduction};
//!
//! // All defaults
//! let config = CostConfig::builder().build().unwrap();
//! assert_eq!(config.mode, None);
//!
//! let config = CostConfig::builder()
//!     .mode(LossMode::Fused)
//!     .reduction(Reduction::Sum)
//!     .build()
//!     .unwrap();
//! ```

use std::num::NonZeroUsize;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::logger::Verbosity;
use crate::loss::{LossMode, Reduction};

/// Default tolerance on the row sums of probability batches.
pub const DEFAULT_PROBABILITY_TOLERANCE: f64 = 1e-6;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Row-sum tolerance must be finite and in (0, 1).
    #[error("probability_tolerance must be in (0, 1), got {0}")]
    InvalidTolerance(f64),

    /// The JSON document could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(String),
}

// =============================================================================
// CostConfig
// =============================================================================

/// Configuration for batch cost evaluation.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
#[serde(default, deny_unknown_fields)]
pub struct CostConfig {
    /// Force a loss mode. `None` picks it from the kind of outputs.
    pub mode: Option<LossMode>,

    /// How per-example losses are combined. Default: `Mean`.
    #[builder(default)]
    pub reduction: Reduction,

    /// Number of threads. `None` uses the global pool.
    pub n_threads: Option<NonZeroUsize>,

    /// Tolerance on probability row sums. Default: 1e-6.
    #[builder(default = DEFAULT_PROBABILITY_TOLERANCE)]
    pub probability_tolerance: f64,

    /// Verbosity level. Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

impl<S: cost_config_builder::IsComplete> CostConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidTolerance`] if `probability_tolerance` is not a
    /// finite value in (0, 1).
    pub fn build(self) -> Result<CostConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl CostConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tol = self.probability_tolerance;
        if !(tol > 0.0 && tol < 1.0) {
            return Err(ConfigError::InvalidTolerance(tol));
        }
        Ok(())
    }

    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: CostConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Thread count in [`run_with_threads`](crate::run_with_threads) terms
    /// (0 = auto).
    #[inline]
    pub fn threads(&self) -> usize {
        self.n_threads.map_or(0, NonZeroUsize::get)
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        Self::builder().__build_internal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CostConfig::default();
        assert_eq!(config.mode, None);
        assert_eq!(config.reduction, Reduction::Mean);
        assert_eq!(config.n_threads, None);
        assert_eq!(config.threads(), 0);
        assert_eq!(config.probability_tolerance, DEFAULT_PROBABILITY_TOLERANCE);
        assert_eq!(config.verbosity, Verbosity::Silent);
        assert_eq!(CostConfig::builder().build(), Ok(config));
    }

    #[test]
    fn builder_sets_fields() {
        let config = CostConfig::builder()
            .mode(LossMode::Layered)
            .n_threads(NonZeroUsize::new(4).unwrap())
            .verbosity(Verbosity::Debug)
            .build()
            .unwrap();
        assert_eq!(config.mode, Some(LossMode::Layered));
        assert_eq!(config.threads(), 4);
    }

    #[test]
    fn rejects_bad_tolerance() {
        for tol in [0.0, -1e-3, 1.0, f64::NAN, f64::INFINITY] {
            let result = CostConfig::builder().probability_tolerance(tol).build();
            assert!(matches!(result, Err(ConfigError::InvalidTolerance(_))), "tol={tol}");
        }
    }

    #[test]
    fn from_json_partial() {
        let config = CostConfig::from_json_str(r#"{"mode": "fused", "n_threads": 2}"#).unwrap();
        assert_eq!(config.mode, Some(LossMode::Fused));
        assert_eq!(config.threads(), 2);
        assert_eq!(config.reduction, Reduction::Mean);

        let config = CostConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CostConfig::default());
    }

    #[test]
    fn from_json_errors() {
        assert!(matches!(
            CostConfig::from_json_str(r#"{"probability_tolerance": 2.0}"#),
            Err(ConfigError::InvalidTolerance(_))
        ));
        // Zero threads is not a NonZeroUsize.
        assert!(matches!(
            CostConfig::from_json_str(r#"{"n_threads": 0}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            CostConfig::from_json_str(r#"{"learning_rate": 0.1}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn json_roundtrip_keeps_fields() {
        let config = CostConfig::builder()
            .mode(LossMode::Layered)
            .reduction(Reduction::Sum)
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(CostConfig::from_json_str(&json).unwrap(), config);
    }
}
