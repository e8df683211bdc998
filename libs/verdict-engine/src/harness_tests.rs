/// Runtime-backed tests for the full evaluation path
///
/// These tests run real programs:
/// 1. Return values are judged and slotted in request order
/// 2. Every case runs in a fresh runtime
/// 3. Timeouts, thrown errors and syntax errors stay local to their case
/// 4. Python, Java and C++ submissions run after normalization
///
/// Process-backed tests skip themselves when `node` is not on PATH.
use crate::config::{EngineConfig, SandboxKind};
use crate::executor::Executor;
use serde_json::{json, Value};
use verdict_common::types::{EvaluationRequest, EvaluationResult, TestCase};

/// Executor over the local runtime, or `None` when it is unavailable.
async fn local_executor(config: EngineConfig) -> Option<Executor> {
    let executor = Executor::from_config(config).ok()?;
    match executor.sandbox().check().await {
        Ok(version) if !version.is_empty() => Some(executor),
        _ => {
            eprintln!("skipping: node runtime not available");
            None
        }
    }
}

fn case(input: Value, expected: Value) -> TestCase {
    TestCase {
        input: input.as_object().cloned().unwrap_or_default(),
        expected,
    }
}

fn request(language: &str, code: &str, test_cases: Vec<TestCase>) -> EvaluationRequest {
    EvaluationRequest {
        code: code.to_string(),
        language: language.to_string(),
        test_cases,
        function_name: None,
    }
}

async fn evaluate(config: EngineConfig, request: EvaluationRequest) -> Option<EvaluationResult> {
    let executor = local_executor(config).await?;
    Some(executor.evaluate(&request).await.unwrap())
}

#[tokio::test]
async fn test_add_scores_one_of_two() {
    let request = request(
        "javascript",
        "function add(a, b) { return a + b; }",
        vec![
            case(json!({ "a": 1, "b": 2 }), json!(3)),
            case(json!({ "a": 2, "b": 2 }), json!(5)),
        ],
    );
    let Some(result) = evaluate(EngineConfig::default(), request).await else {
        return;
    };

    assert_eq!(result.passed, 1);
    assert_eq!(result.total, 2);
    assert!(result.results[0].passed);
    assert_eq!(result.results[0].actual, json!(3));
    assert!(!result.results[1].passed);
    assert_eq!(result.results[1].actual, json!(4));
    assert_eq!(result.results[1].error, None);
}

#[tokio::test]
async fn test_cases_do_not_share_state() {
    let request = request(
        "javascript",
        "let calls = 0;\nfunction tick() { calls += 1; return calls; }",
        vec![case(json!({}), json!(1)), case(json!({}), json!(1))],
    );
    let Some(result) = evaluate(EngineConfig::default(), request).await else {
        return;
    };
    assert_eq!(result.passed, 2);
}

#[tokio::test]
async fn test_timeout_does_not_abort_remaining_cases() {
    let config = EngineConfig {
        case_timeout_ms: 1000,
        ..EngineConfig::default()
    };
    let request = request(
        "javascript",
        "function spin(n) { while (n === 0) {} return n; }",
        vec![
            case(json!({ "n": 0 }), json!(0)),
            case(json!({ "n": 4 }), json!(4)),
        ],
    );
    let Some(result) = evaluate(config, request).await else {
        return;
    };

    assert_eq!(result.results[0].error.as_deref(), Some("timeout"));
    assert_eq!(result.results[0].actual, Value::Null);
    assert!(result.results[1].passed);
}

#[tokio::test]
async fn test_thrown_error_is_reported_by_name() {
    let request = request(
        "javascript",
        "function f(x) { if (x < 0) throw new RangeError('negative'); return x; }",
        vec![case(json!({ "x": -1 }), json!(1)), case(json!({ "x": 1 }), json!(1))],
    );
    let Some(result) = evaluate(EngineConfig::default(), request).await else {
        return;
    };

    assert_eq!(result.results[0].error.as_deref(), Some("RangeError: negative"));
    assert!(result.results[1].passed);
}

#[tokio::test]
async fn test_syntax_error_fails_every_case() {
    let request = request(
        "javascript",
        "function broken(a) { return a +; }",
        vec![case(json!({ "a": 1 }), json!(1)), case(json!({ "a": 2 }), json!(2))],
    );
    let Some(result) = evaluate(EngineConfig::default(), request).await else {
        return;
    };

    assert_eq!(result.passed, 0);
    for case in &result.results {
        let error = case.error.as_deref().unwrap_or_default();
        assert!(error.starts_with("SyntaxError"), "{error}");
    }
}

#[tokio::test]
async fn test_console_noise_and_collections() {
    let code = r#"
        function summarize(xs) {
            console.log("debugging", xs);
            const seen = new Set(xs);
            const counts = new Map();
            for (const x of xs) counts.set(String(x), (counts.get(String(x)) || 0) + 1);
            return { unique: seen, counts };
        }
    "#;
    let request = request(
        "javascript",
        code,
        vec![case(
            json!({ "xs": [1, 2, 2] }),
            json!({ "counts": { "1": 1, "2": 2 }, "unique": [1, 2] }),
        )],
    );
    let Some(result) = evaluate(EngineConfig::default(), request).await else {
        return;
    };
    assert!(result.results[0].passed, "{:?}", result.results[0]);
}

#[tokio::test]
async fn test_async_function_is_awaited() {
    let request = request(
        "javascript",
        "async function later(x) { return x * 2; }",
        vec![case(json!({ "x": 21 }), json!(42))],
    );
    let Some(result) = evaluate(EngineConfig::default(), request).await else {
        return;
    };
    assert_eq!(result.passed, 1);
}

#[tokio::test]
async fn test_undefined_return_is_null() {
    let request = request(
        "javascript",
        "function nothing() {}",
        vec![case(json!({}), Value::Null)],
    );
    let Some(result) = evaluate(EngineConfig::default(), request).await else {
        return;
    };
    assert!(result.results[0].passed);
}

#[tokio::test]
async fn test_python_floor_semantics() {
    let request = request(
        "python",
        "def divmod_like(a, b):\n    return a // b, a % b\n",
        vec![
            case(json!({ "a": -7, "b": 2 }), json!([-4, 1])),
            case(json!({ "a": 7, "b": 2 }), json!([3, 1])),
        ],
    );
    let Some(result) = evaluate(EngineConfig::default(), request).await else {
        return;
    };
    assert_eq!(result.passed, 2, "{:?}", result.results);
}

#[tokio::test]
async fn test_python_loop_and_comprehension() {
    let code = "def even_squares(n):\n    total = 0\n    for i in range(n):\n        total += i\n    return [x * x for x in range(n) if x % 2 == 0], total\n";
    let request = request(
        "python",
        code,
        vec![case(json!({ "n": 5 }), json!([[0, 4, 16], 10]))],
    );
    let Some(result) = evaluate(EngineConfig::default(), request).await else {
        return;
    };
    assert!(result.results[0].passed, "{:?}", result.results[0]);
}

#[tokio::test]
async fn test_java_two_sum() {
    let code = r#"
        import java.util.*;

        public class Solution {
            public int[] twoSum(int[] nums, int target) {
                Map<Integer, Integer> seen = new HashMap<>();
                for (int i = 0; i < nums.length; i++) {
                    int need = target - nums[i];
                    if (seen.containsKey(need)) {
                        return new int[] { seen.get(need), i };
                    }
                    seen.put(nums[i], i);
                }
                return new int[0];
            }
        }
    "#;
    let request = request(
        "java",
        code,
        vec![
            case(json!({ "nums": [2, 7, 11, 15], "target": 9 }), json!([0, 1])),
            case(json!({ "nums": [3, 2, 4], "target": 6 }), json!([1, 2])),
        ],
    );
    let Some(result) = evaluate(EngineConfig::default(), request).await else {
        return;
    };
    assert_eq!(result.passed, 2, "{:?}", result.results);
}

#[tokio::test]
async fn test_cpp_integer_division_and_main_is_ignored() {
    let code = r#"
        #include <iostream>
        using namespace std;

        int half(int n) {
            return n / 2;
        }

        int main() {
            cout << half(7) << endl;
            return 0;
        }
    "#;
    let request = request(
        "cpp",
        code,
        vec![
            case(json!({ "n": 7 }), json!(3)),
            case(json!({ "n": -7 }), json!(-3)),
        ],
    );
    let Some(result) = evaluate(EngineConfig::default(), request).await else {
        return;
    };
    assert_eq!(result.passed, 2, "{:?}", result.results);
}

#[tokio::test]
async fn test_python_composite_operators() {
    let code = "def f(a, b):\n    return [a == b, sorted(a) == [1, 2], a + b, \"ab\" * 3, [1] * 2, str(True), round(2.5), a < b]\n";
    let request = request(
        "python",
        code,
        vec![case(
            json!({ "a": [2, 1], "b": [1, 2] }),
            json!([false, true, [2, 1, 1, 2], "ababab", [1, 1], "True", 2, false]),
        )],
    );
    let Some(result) = evaluate(EngineConfig::default(), request).await else {
        return;
    };
    assert!(result.results[0].passed, "{:?}", result.results[0]);
}

#[tokio::test]
async fn test_python_set_operators_and_tuple_membership() {
    let code = "def f(xs, ys):\n    a = set(xs)\n    b = set(ys)\n    seen = set()\n    seen.add((1, 2))\n    return sorted(a | b), sorted(a & b), sorted(a - b), (1, 2) in seen, (2, 1) in seen\n";
    let request = request(
        "python",
        code,
        vec![case(
            json!({ "xs": [1, 2], "ys": [2, 3] }),
            json!([[1, 2, 3], [2], [1], true, false]),
        )],
    );
    let Some(result) = evaluate(EngineConfig::default(), request).await else {
        return;
    };
    assert!(result.results[0].passed, "{:?}", result.results[0]);
}

#[tokio::test]
async fn test_cpp_vector_equality() {
    let request = request(
        "cpp",
        "bool same(vector<int> a, vector<int> b) { return a == b; }",
        vec![
            case(json!({ "a": [1, 2], "b": [1, 2] }), json!(true)),
            case(json!({ "a": [1], "b": [2] }), json!(false)),
        ],
    );
    let Some(result) = evaluate(EngineConfig::default(), request).await else {
        return;
    };
    assert_eq!(result.passed, 2, "{:?}", result.results);
}

#[tokio::test]
async fn test_inputs_come_back_unchanged() {
    let values = [
        json!(1e21),
        json!(-2.5),
        json!("quote \" slash \\ newline \n tab \t \u{e9} \u{1f600}"),
        json!({ "nested": { "list": [1, null, true], "empty": {} } }),
        json!({ "__proto__": 1, "b": [] }),
        Value::Null,
    ];
    let cases = values
        .iter()
        .map(|value| case(json!({ "value": value }), value.clone()))
        .collect();
    let request = request("javascript", "function echo(value) { return value; }", cases);
    let Some(result) = evaluate(EngineConfig::default(), request).await else {
        return;
    };

    assert_eq!(result.passed, values.len(), "{:?}", result.results);
    for (case, value) in result.results.iter().zip(&values) {
        assert_eq!(&case.actual, value);
    }
}

#[tokio::test]
async fn test_parallel_cases_on_the_runtime() {
    let config = EngineConfig {
        max_parallel_cases: 3,
        ..EngineConfig::default()
    };
    let cases = (0..6).map(|n| case(json!({ "n": n }), json!(n * n))).collect();
    let request = request("javascript", "const square = (n) => n * n;", cases);
    let Some(result) = evaluate(config, request).await else {
        return;
    };

    assert_eq!(result.passed, 6);
    for (n, case) in result.results.iter().enumerate() {
        assert_eq!(case.input["n"], json!(n));
    }
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_docker_sandbox_end_to_end() {
    let config = EngineConfig {
        sandbox: SandboxKind::Docker,
        case_timeout_ms: 10_000,
        ..EngineConfig::default()
    };
    let executor = Executor::from_config(config).expect("Failed to connect to Docker");
    let request = request(
        "javascript",
        "function add(a, b) { return a + b; }",
        vec![
            case(json!({ "a": 1, "b": 2 }), json!(3)),
            case(json!({ "a": 2, "b": 2 }), json!(5)),
        ],
    );

    let result = executor.evaluate(&request).await.unwrap();
    assert_eq!(result.passed, 1);
    assert_eq!(result.results[1].actual, json!(4));
}
