use std::fs;
use std::io::{self, Read};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use softmax_ce::{
    run_with_threads, CostConfig, EvalReport, Evaluator, LossMode, ModeComparison, OutputKind,
    Targets, ValueRange, Verbosity, Weights,
};

const ABOUT: &str = r#"Evaluate classifier outputs with a numerically stable softmax and cross-entropy.

The input is a JSON document:
  {"outputs": [[...], ...], "kind": "logits" | "probabilities",
   "labels": [...], "one_hot": [[...], ...], "weights": [...]}

Targets are optional; without them only probabilities and predictions are printed.

Basic usage:
  $ softmax-eval batch.json --mode compare"#;

#[derive(Debug, Parser)]
#[command(version, about = ABOUT)]
struct Options {
    /// JSON file with outputs and targets. If INPUT is "-", read from stdin.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Loss mode. "auto" picks it from the output kind; "compare" computes the
    /// layered and fused cost of the same logits.
    #[arg(short, long, value_enum, default_value_t = ModeArg::Auto)]
    mode: ModeArg,

    /// JSON file with a cost configuration. Missing fields take defaults.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of worker threads. Overrides the config file.
    #[arg(short, long, value_name = "N")]
    threads: Option<NonZeroUsize>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Auto,
    Layered,
    Fused,
    Compare,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Input {
    outputs: Vec<Vec<f64>>,
    kind: OutputKind,
    labels: Option<Vec<usize>>,
    one_hot: Option<Vec<Vec<f64>>>,
    weights: Option<Vec<f64>>,
}

#[derive(Debug, Serialize)]
struct Summary {
    probabilities: Vec<Vec<f64>>,
    predictions: Vec<usize>,
    range: ValueRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<EvalReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comparison: Option<ModeComparison>,
}

fn main() -> Result<()> {
    let opts = Options::parse();

    let mut config = match &opts.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            CostConfig::from_json_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => CostConfig::default(),
    };
    apply_overrides(&mut config, &opts);

    env_logger::Builder::new()
        .filter_level(config.verbosity.level_filter())
        .format_timestamp(None)
        .init();

    let input = read_input(&opts.input)?;
    let summary = evaluate(input, config, opts.mode == ModeArg::Compare)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Command-line flags take precedence over the config file.
fn apply_overrides(config: &mut CostConfig, opts: &Options) {
    if let Some(n) = opts.threads {
        config.n_threads = Some(n);
    }
    match opts.mode {
        ModeArg::Layered => config.mode = Some(LossMode::Layered),
        ModeArg::Fused => config.mode = Some(LossMode::Fused),
        ModeArg::Auto | ModeArg::Compare => {}
    }
    config.verbosity = config
        .verbosity
        .max(Verbosity::from_occurrences(opts.verbose));
}

fn read_input(path: &Path) -> Result<Input> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&text).context("failed to parse input JSON")
}

fn evaluate(input: Input, config: CostConfig, compare: bool) -> Result<Summary> {
    let evaluator = Evaluator::new(config);
    let threads = evaluator.config().threads();

    let values = to_array2(input.outputs, "outputs")?;
    let output = evaluator.wrap(values, input.kind)?;

    let probabilities = run_with_threads(threads, |p| output.to_probabilities(p))?;
    let predictions = run_with_threads(threads, |p| output.predict(p))?;

    let labels = input.labels.map(Array1::from);
    let one_hot = input
        .one_hot
        .map(|rows| to_array2(rows, "one_hot"))
        .transpose()?;
    let weights = input.weights.map(Array1::from);

    let targets = match (&labels, &one_hot) {
        (Some(_), Some(_)) => bail!("give either \"labels\" or \"one_hot\", not both"),
        (Some(l), None) => Some(Targets::Sparse(l.view())),
        (None, Some(h)) => Some(Targets::OneHot(h.view())),
        (None, None) => None,
    };
    let weights = match &weights {
        Some(w) => Weights::from_array(w.view()),
        None => Weights::None,
    };
    if targets.is_none() && compare {
        bail!("--mode compare needs \"labels\" or \"one_hot\"");
    }

    let (report, comparison) = match targets {
        None => (None, None),
        Some(targets) if compare => {
            if output.kind() != OutputKind::Logits {
                bail!("--mode compare needs logits, got {}", output.kind());
            }
            let cmp = evaluator.compare_modes(output.values(), targets, weights)?;
            (None, Some(cmp))
        }
        Some(targets) => (Some(evaluator.evaluate(&output, targets, weights)?), None),
    };

    Ok(Summary {
        probabilities: probabilities
            .values()
            .rows()
            .into_iter()
            .map(|r| r.to_vec())
            .collect(),
        predictions,
        range: output.summary(),
        report,
        comparison,
    })
}

fn to_array2(rows: Vec<Vec<f64>>, field: &str) -> Result<Array2<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
        bail!("{field}: row {i} has {} values, expected {n_cols}", row.len());
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat).with_context(|| format!("{field}: bad shape"))
}

fn print_summary(summary: &Summary) {
    for (i, (probs, pred)) in summary
        .probabilities
        .iter()
        .zip(&summary.predictions)
        .enumerate()
    {
        let probs: Vec<String> = probs.iter().map(|p| format!("{p:.4}")).collect();
        println!("row {i}: [{}] -> class {pred}", probs.join(", "));
    }
    match &summary.report {
        Some(report) => println!("{report}"),
        None => println!(
            "output range: [{}, {}]",
            summary.range.min, summary.range.max
        ),
    }
    if let Some(cmp) = &summary.comparison {
        println!("{cmp}");
    }
}
