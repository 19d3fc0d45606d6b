//! Verbosity-gated evaluation logging.
//!
//! Messages go through the [`log`] facade; the embedding application decides
//! where they end up (the `softmax-eval` binary installs `env_logger`).

use serde::{Deserialize, Serialize};

use crate::loss::LossMode;

const TARGET: &str = "softmax_ce";

/// Verbosity level for evaluation output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// No output.
    #[default]
    Silent,
    /// Warnings only.
    Warning,
    /// Costs and summaries.
    Info,
    /// Shapes and per-step details.
    Debug,
}

impl Verbosity {
    /// Map a `-v` count to a verbosity: 0 is `Warning`, 1 `Info`, 2+ `Debug`.
    pub fn from_occurrences(count: u8) -> Self {
        match count {
            0 => Verbosity::Warning,
            1 => Verbosity::Info,
            _ => Verbosity::Debug,
        }
    }

    /// The most detailed `log` level this verbosity lets through.
    pub fn level_filter(self) -> log::LevelFilter {
        match self {
            Verbosity::Silent => log::LevelFilter::Off,
            Verbosity::Warning => log::LevelFilter::Warn,
            Verbosity::Info => log::LevelFilter::Info,
            Verbosity::Debug => log::LevelFilter::Debug,
        }
    }
}

/// Logger for one evaluation run.
#[derive(Debug, Clone, Copy)]
pub struct EvalLogger {
    verbosity: Verbosity,
}

impl EvalLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn warn(&self, msg: &str) {
        if self.verbosity >= Verbosity::Warning {
            log::warn!(target: TARGET, "{msg}");
        }
    }

    pub fn info(&self, msg: &str) {
        if self.verbosity >= Verbosity::Info {
            log::info!(target: TARGET, "{msg}");
        }
    }

    pub fn debug(&self, msg: &str) {
        if self.verbosity >= Verbosity::Debug {
            log::debug!(target: TARGET, "{msg}");
        }
    }

    pub fn start_evaluation(&self, n_rows: usize, n_classes: usize, mode: LossMode) {
        self.debug(&format!("evaluating {n_rows} rows x {n_classes} classes in {mode} mode"));
    }

    pub fn log_cost(&self, mode: LossMode, cost: f64, accuracy: f64) {
        self.info(&format!("[{mode}] cost={cost:.6} accuracy={accuracy:.4}"));
    }

    pub fn log_comparison(&self, layered: f64, fused: f64) {
        self.info(&format!(
            "layered cost={layered:.6} fused cost={fused:.6} diff={:.3e}",
            (layered - fused).abs()
        ));
        if !layered.is_finite() {
            self.warn("layered cost is not finite: a true-class probability underflowed to 0");
        }
    }
}
