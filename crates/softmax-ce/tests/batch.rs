//! Batch operations, evaluation and configuration.

use approx::assert_abs_diff_eq;
use ndarray::{array, Array2, Axis};
use rstest::rstest;

use softmax_ce::testing::data::{
    one_hot_matrix, random_labels, random_logits, random_weights, separated_logits,
};
use softmax_ce::testing::{assert_probability_vector, SUM_TOLERANCE};
use softmax_ce::{
    accuracy, predict_classes, run_with_threads, softmax, softmax_rows, softmax_rows_inplace,
    ClassifierOutput, CostConfig, CrossEntropy, Evaluator, InvalidInput, LossMode, OutputKind,
    Parallelism, Reduction, SoftmaxError, Targets, Verbosity, Weights,
};

// =============================================================================
// Batch softmax
// =============================================================================

#[test]
fn batch_softmax_matches_per_row() {
    let logits = random_logits(32, 6, 42, -50.0, 50.0);
    let probs = softmax_rows(logits.view(), Parallelism::Parallel).unwrap();

    for (row, prob_row) in logits.rows().into_iter().zip(probs.rows()) {
        let expected = softmax(&row.to_vec()).unwrap();
        assert_eq!(prob_row.to_vec(), expected);
        assert_probability_vector(&expected, SUM_TOLERANCE, "row");
    }
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(4)]
fn results_do_not_depend_on_threads(#[case] n_threads: usize) {
    let logits = random_logits(200, 10, 7, -20.0, 20.0);
    let labels = random_labels(200, 10, 8);
    let weights = random_weights(200, 9);

    let reference = (
        softmax_rows(logits.view(), Parallelism::Sequential).unwrap(),
        predict_classes(logits.view(), Parallelism::Sequential).unwrap(),
        CrossEntropy::fused()
            .per_example(
                logits.view(),
                Targets::Sparse(labels.view()),
                Parallelism::Sequential,
            )
            .unwrap(),
    );

    let result = run_with_threads(n_threads, |p| {
        (
            softmax_rows(logits.view(), p).unwrap(),
            predict_classes(logits.view(), p).unwrap(),
            CrossEntropy::fused()
                .per_example(logits.view(), Targets::Sparse(labels.view()), p)
                .unwrap(),
        )
    });
    assert_eq!(result, reference);

    let seq_cost = CrossEntropy::fused()
        .cost(
            logits.view(),
            Targets::Sparse(labels.view()),
            Weights::from_array(weights.view()),
            Reduction::Mean,
            Parallelism::Sequential,
        )
        .unwrap();
    let par_cost = run_with_threads(n_threads, |p| {
        CrossEntropy::fused()
            .cost(
                logits.view(),
                Targets::Sparse(labels.view()),
                Weights::from_array(weights.view()),
                Reduction::Mean,
                p,
            )
            .unwrap()
    });
    assert_eq!(seq_cost, par_cost);
}

#[test]
fn inplace_batch_reports_bad_row() {
    let mut values = array![[1.0, 2.0], [f64::NAN, 0.0]];
    let err = softmax_rows_inplace(values.view_mut(), Parallelism::Sequential).unwrap_err();
    assert!(matches!(
        err,
        SoftmaxError::InvalidInput(InvalidInput::NonFinite { index: 0, .. })
    ));
}

// =============================================================================
// Cost and accuracy
// =============================================================================

#[test]
fn weighted_cost_is_hand_computed_mean() {
    let logits = random_logits(16, 4, 3, -5.0, 5.0);
    let labels = random_labels(16, 4, 4);
    let weights = random_weights(16, 5);

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, row) in logits.axis_iter(Axis(0)).enumerate() {
        let a = softmax(&row.to_vec()).unwrap();
        num += weights[i] * -a[labels[i]].ln();
        den += weights[i];
    }

    let cost = CrossEntropy::fused()
        .cost(
            logits.view(),
            Targets::Sparse(labels.view()),
            Weights::from_array(weights.view()),
            Reduction::Mean,
            Parallelism::Sequential,
        )
        .unwrap();
    assert_abs_diff_eq!(cost, num / den, epsilon = 1e-9);

    let total = CrossEntropy::fused()
        .cost(
            logits.view(),
            Targets::Sparse(labels.view()),
            Weights::from_array(weights.view()),
            Reduction::Sum,
            Parallelism::Sequential,
        )
        .unwrap();
    assert_abs_diff_eq!(total, num, epsilon = 1e-9);
}

#[test]
fn sparse_and_one_hot_targets_agree() {
    let logits = random_logits(24, 5, 11, -3.0, 3.0);
    let labels = random_labels(24, 5, 12);
    let hot = one_hot_matrix(&labels, 5);

    for loss in [CrossEntropy::fused(), CrossEntropy::layered()] {
        let outputs = match loss.expected_input() {
            OutputKind::Logits => logits.clone(),
            OutputKind::Probabilities => softmax_rows(logits.view(), Parallelism::Sequential).unwrap(),
        };
        let sparse = loss
            .per_example(outputs.view(), Targets::Sparse(labels.view()), Parallelism::Sequential)
            .unwrap();
        let dense = loss
            .per_example(outputs.view(), Targets::OneHot(hot.view()), Parallelism::Sequential)
            .unwrap();
        for (s, d) in sparse.iter().zip(&dense) {
            assert_abs_diff_eq!(*s, *d, epsilon = 1e-15);
        }
    }
}

#[test]
fn accuracy_of_separated_logits_is_one() {
    let labels = random_labels(50, 3, 21);
    let logits = separated_logits(&labels, 3, 5.0);
    let acc = accuracy(
        logits.view(),
        Targets::Sparse(labels.view()),
        Weights::None,
        Parallelism::Parallel,
    )
    .unwrap();
    assert_eq!(acc, 1.0);
}

#[test]
fn cost_rejects_empty_batch() {
    let logits = Array2::<f64>::zeros((0, 3));
    let labels = ndarray::Array1::<usize>::zeros(0);
    let err = CrossEntropy::fused()
        .cost(
            logits.view(),
            Targets::Sparse(labels.view()),
            Weights::None,
            Reduction::Mean,
            Parallelism::Sequential,
        )
        .unwrap_err();
    assert_eq!(err, SoftmaxError::InvalidInput(InvalidInput::Empty));
}

// =============================================================================
// Evaluation
// =============================================================================

#[test]
fn evaluate_logits_and_probabilities_give_same_cost() {
    let logits = random_logits(40, 4, 31, -4.0, 4.0);
    let labels = random_labels(40, 4, 32);
    let evaluator = Evaluator::default();

    let out_logits = ClassifierOutput::from_logits(logits.clone()).unwrap();
    let out_probs = out_logits.to_probabilities(Parallelism::Sequential).unwrap();

    let fused = evaluator
        .evaluate(&out_logits, Targets::Sparse(labels.view()), Weights::None)
        .unwrap();
    let layered = evaluator
        .evaluate(&out_probs, Targets::Sparse(labels.view()), Weights::None)
        .unwrap();

    assert_eq!(fused.mode, LossMode::Fused);
    assert_eq!(layered.mode, LossMode::Layered);
    assert_abs_diff_eq!(fused.cost, layered.cost, epsilon = 1e-9);
    assert_eq!(fused.accuracy, layered.accuracy);
    assert!(layered.range.min >= 0.0 && layered.range.max <= 1.0);
}

#[test]
fn evaluate_with_forced_mode_mismatch() {
    let config = CostConfig::builder().mode(LossMode::Fused).build().unwrap();
    let evaluator = Evaluator::new(config);
    let probs = ClassifierOutput::from_probabilities(array![[0.5, 0.5]], 1e-9).unwrap();
    let labels = array![0usize];

    let err = evaluator
        .evaluate(&probs, Targets::Sparse(labels.view()), Weights::None)
        .unwrap_err();
    assert_eq!(
        err,
        SoftmaxError::InvalidInput(InvalidInput::OutputKindMismatch {
            expected: OutputKind::Logits,
            actual: OutputKind::Probabilities,
        })
    );
}

#[test]
fn compare_modes_on_confident_wrong_predictions() {
    // Every label points at a class that lost by 1000.
    let labels = random_labels(10, 3, 41);
    let winners = labels.mapv(|l| (l + 1) % 3);
    let logits = separated_logits(&winners, 3, 1000.0);

    let config = CostConfig::builder()
        .verbosity(Verbosity::Debug)
        .build()
        .unwrap();
    let cmp = Evaluator::new(config)
        .compare_modes(logits.view(), Targets::Sparse(labels.view()), Weights::None)
        .unwrap();

    assert_eq!(cmp.layered, f64::INFINITY);
    assert_abs_diff_eq!(cmp.fused, 1000.0, epsilon = 1e-9);
    assert_eq!(cmp.abs_diff, f64::INFINITY);
}

#[test]
fn report_serializes_to_json() {
    let evaluator = Evaluator::default();
    let out = ClassifierOutput::from_logits(array![[2.0, 0.0], [0.0, 2.0]]).unwrap();
    let labels = array![0usize, 1];
    let report = evaluator
        .evaluate(&out, Targets::Sparse(labels.view()), Weights::None)
        .unwrap();

    let json: serde_json::Value = serde_json::to_value(&report).unwrap();
    assert_eq!(json["mode"], "fused");
    assert_eq!(json["n_rows"], 2);
    assert_eq!(json["accuracy"], 1.0);
    assert_eq!(json["range"]["max"], 2.0);
}

#[test]
fn config_from_json_drives_evaluator() {
    let config = CostConfig::from_json_str(
        r#"{"mode": "layered", "reduction": "sum", "probability_tolerance": 0.01, "verbosity": "warning"}"#,
    )
    .unwrap();
    let evaluator = Evaluator::new(config);

    // Off by 0.005: accepted under the configured tolerance.
    let out = evaluator
        .wrap(array![[0.5, 0.505], [0.25, 0.75]], OutputKind::Probabilities)
        .unwrap();
    let labels = array![1usize, 1];
    let report = evaluator
        .evaluate(&out, Targets::Sparse(labels.view()), Weights::None)
        .unwrap();
    assert_abs_diff_eq!(
        report.cost,
        -(0.505f64).ln() - (0.75f64).ln(),
        epsilon = 1e-12
    );
}
