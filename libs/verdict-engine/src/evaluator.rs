/// Evaluator - Comparison and Aggregation
///
/// **Core Responsibility:**
/// Judge each case's outcome against its expected value and assemble the
/// final result in request order.
///
/// **Critical Properties:**
/// - Knows nothing about sandboxes or runtimes
/// - Pure functions: (outcomes, expected values) → verdicts
///
/// **Comparison Rules:**
/// - Values of different JavaScript `typeof` classes never match
///   (`null`, arrays and objects are all "object")
/// - Two top-level numbers match within an absolute tolerance of 1e-4
/// - Everything else is deep equality: arrays in order, objects by key set
///   regardless of key order, nested numbers compared as doubles
use serde_json::Value;
use verdict_common::types::{CaseResult, EvaluationResult, TestCase};

use crate::harness::CaseOutcome;

pub const NUMBER_TOLERANCE: f64 = 1e-4;

pub const TIMEOUT_ERROR: &str = "timeout";

fn js_typeof(value: &Value) -> &'static str {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
    }
}

/// Does `actual` satisfy `expected`?
pub fn compare(actual: &Value, expected: &Value) -> bool {
    if js_typeof(actual) != js_typeof(expected) {
        return false;
    }
    if let (Value::Number(a), Value::Number(e)) = (actual, expected) {
        return match (a.as_f64(), e.as_f64()) {
            (Some(a), Some(e)) => (a - e).abs() < NUMBER_TOLERANCE,
            _ => false,
        };
    }
    deep_equal(actual, expected)
}

fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, x)| y.get(key).is_some_and(|y| deep_equal(x, y)))
        }
        _ => false,
    }
}

/// Verdict for one case given what its program produced.
pub fn judge(case: &TestCase, outcome: CaseOutcome) -> CaseResult {
    match outcome {
        CaseOutcome::Returned(actual) => CaseResult {
            passed: compare(&actual, &case.expected),
            input: case.input.clone(),
            expected: case.expected.clone(),
            actual,
            error: None,
        },
        CaseOutcome::Raised(message) => CaseResult::fault(case, message),
        CaseOutcome::TimedOut => CaseResult::fault(case, TIMEOUT_ERROR),
    }
}

/// Every case failed with the same error.
pub fn degenerate(cases: &[TestCase], message: &str) -> EvaluationResult {
    let results: Vec<CaseResult> = cases
        .iter()
        .map(|case| CaseResult::fault(case, message))
        .collect();
    EvaluationResult {
        passed: 0,
        total: results.len(),
        results,
    }
}

/// Collects per-case verdicts into request order, whatever order they
/// finish in.
pub struct ResultAggregator<'a> {
    cases: &'a [TestCase],
    slots: Vec<Option<CaseResult>>,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(cases: &'a [TestCase]) -> Self {
        Self {
            cases,
            slots: vec![None; cases.len()],
        }
    }

    /// Store the verdict for `cases[index]`. Out-of-range indices are ignored.
    pub fn record(&mut self, index: usize, result: CaseResult) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(result);
        }
    }

    pub fn finish(self) -> EvaluationResult {
        let results: Vec<CaseResult> = self
            .slots
            .into_iter()
            .zip(self.cases)
            .map(|(slot, case)| slot.unwrap_or_else(|| CaseResult::fault(case, "not evaluated")))
            .collect();
        EvaluationResult {
            passed: results.iter().filter(|r| r.passed).count(),
            total: results.len(),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    /// Helper to create a test case
    fn make_case(input: Value, expected: Value) -> TestCase {
        let Value::Object(input) = input else {
            panic!("input must be an object");
        };
        TestCase { input, expected }
    }

    #[test]
    fn test_numbers_within_tolerance() {
        assert!(compare(&json!(0.30000000000000004), &json!(0.3)));
        assert!(compare(&json!(3), &json!(3.00005)));
        assert!(!compare(&json!(3), &json!(3.001)));
        assert!(compare(&json!(-0.0), &json!(0)));
        assert!(compare(&json!(1.00005), &json!(1.0001)));
        assert!(!compare(&json!(1.0), &json!(1.01)));
    }

    #[test]
    fn test_typeof_classes_must_match() {
        assert!(!compare(&json!("1"), &json!(1)));
        assert!(!compare(&json!(1), &json!(true)));
        assert!(!compare(&json!(null), &json!(0)));
        // Same typeof class, different shape.
        assert!(!compare(&json!(null), &json!({})));
        assert!(!compare(&json!([]), &json!({})));
    }

    #[test]
    fn test_arrays_are_ordered() {
        assert!(compare(&json!([1, 2, 3]), &json!([1, 2, 3])));
        assert!(!compare(&json!([3, 2, 1]), &json!([1, 2, 3])));
        assert!(!compare(&json!([1, 2]), &json!([1, 2, 3])));
    }

    #[test]
    fn test_object_key_order_is_irrelevant() {
        assert!(compare(&json!({ "a": 1, "b": [2] }), &json!({ "b": [2], "a": 1 })));
        assert!(!compare(&json!({ "a": 1 }), &json!({ "a": 1, "b": 2 })));
        assert!(!compare(&json!({ "a": 1, "c": 2 }), &json!({ "a": 1, "b": 2 })));
    }

    #[test]
    fn test_nested_numbers_compare_as_doubles() {
        assert!(compare(&json!([1.0, 2]), &json!([1, 2.0])));
        // Tolerance only applies at the top level.
        assert!(!compare(&json!([0.30000000000000004]), &json!([0.3])));
    }

    #[test]
    fn test_judge_outcomes() {
        let case = make_case(json!({ "a": 2, "b": 3 }), json!(5));

        let passed = judge(&case, CaseOutcome::Returned(json!(5)));
        assert!(passed.passed);
        assert_eq!(passed.actual, json!(5));
        assert_eq!(passed.error, None);

        let wrong = judge(&case, CaseOutcome::Returned(json!(6)));
        assert!(!wrong.passed);
        assert_eq!(wrong.actual, json!(6));
        assert_eq!(wrong.error, None);

        let raised = judge(&case, CaseOutcome::Raised("RangeError: boom".to_string()));
        assert!(!raised.passed);
        assert_eq!(raised.actual, Value::Null);
        assert_eq!(raised.error.as_deref(), Some("RangeError: boom"));

        let timed_out = judge(&case, CaseOutcome::TimedOut);
        assert_eq!(timed_out.error.as_deref(), Some("timeout"));
        assert_eq!(timed_out.input, case.input);
    }

    #[test]
    fn test_null_expected_matches_null_return() {
        let case = make_case(json!({}), Value::Null);
        assert!(judge(&case, CaseOutcome::Returned(Value::Null)).passed);
    }

    #[test]
    fn test_aggregator_restores_request_order() {
        let cases = vec![
            make_case(json!({ "n": 1 }), json!(1)),
            make_case(json!({ "n": 2 }), json!(4)),
            make_case(json!({ "n": 3 }), json!(9)),
        ];
        let mut aggregator = ResultAggregator::new(&cases);
        aggregator.record(2, judge(&cases[2], CaseOutcome::Returned(json!(9))));
        aggregator.record(0, judge(&cases[0], CaseOutcome::Returned(json!(1))));
        aggregator.record(1, judge(&cases[1], CaseOutcome::TimedOut));
        aggregator.record(7, judge(&cases[1], CaseOutcome::TimedOut));

        let result = aggregator.finish();
        assert_eq!(result.total, 3);
        assert_eq!(result.passed, 2);
        let inputs: Vec<&Map<String, Value>> = result.results.iter().map(|r| &r.input).collect();
        assert_eq!(inputs, [&cases[0].input, &cases[1].input, &cases[2].input]);
        assert!(!result.results[1].passed);
    }

    #[test]
    fn test_unrecorded_slot_fails() {
        let cases = vec![make_case(json!({}), json!(1))];
        let result = ResultAggregator::new(&cases).finish();
        assert_eq!(result.passed, 0);
        assert_eq!(result.results[0].error.as_deref(), Some("not evaluated"));
    }

    #[test]
    fn test_degenerate_result() {
        let cases = vec![
            make_case(json!({ "x": 1 }), json!(1)),
            make_case(json!({ "x": 2 }), json!(2)),
        ];
        let result = degenerate(&cases, "Function not found");
        assert_eq!(result.passed, 0);
        assert_eq!(result.total, 2);
        assert!(result
            .results
            .iter()
            .all(|r| !r.passed && r.error.as_deref() == Some("Function not found")));
        assert_eq!(result.results[1].input, cases[1].input);
        assert_eq!(result.results[1].expected, json!(2));
    }
}
