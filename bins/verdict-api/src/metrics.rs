// Prometheus metrics for the evaluation endpoint
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};
use verdict_common::types::{EvaluationResult, Language};

lazy_static! {
    pub static ref EVALUATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "verdict_evaluations_total",
        "Evaluation requests by language and outcome",
        &["language", "outcome"]
    )
    .expect("Failed to register verdict_evaluations_total");
    pub static ref CASES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "verdict_cases_total",
        "Evaluated test cases by verdict",
        &["verdict"]
    )
    .expect("Failed to register verdict_cases_total");
    pub static ref EVALUATION_SECONDS: Histogram = register_histogram!(
        "verdict_evaluation_duration_seconds",
        "Wall-clock time per evaluation request",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register verdict_evaluation_duration_seconds");
}

/// Known languages by name; anything else shares one label.
fn language_label(tag: &str) -> &'static str {
    Language::from_tag(tag).map_or("unsupported", |language| language.as_str())
}

pub fn record_evaluation(language: &str, result: &EvaluationResult, seconds: f64) {
    let outcome = if result.all_passed() { "passed" } else { "failed" };
    EVALUATIONS_TOTAL
        .with_label_values(&[language_label(language), outcome])
        .inc();
    for case in &result.results {
        let verdict = match case.error.as_deref() {
            None if case.passed => "passed",
            None => "wrong_answer",
            Some("timeout") => "timeout",
            Some(_) => "error",
        };
        CASES_TOTAL.with_label_values(&[verdict]).inc();
    }
    EVALUATION_SECONDS.observe(seconds);
}

pub fn record_internal_error(language: &str) {
    EVALUATIONS_TOTAL
        .with_label_values(&[language_label(language), "internal_error"])
        .inc();
}

/// Text exposition of every registered metric.
pub fn render() -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
