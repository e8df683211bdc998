/// Executor - High-Level Orchestration
///
/// **Responsibility:**
/// Drive one evaluation request through the pipeline:
/// 1. Normalize the submission (adapter)
/// 2. Run every case in its own sandbox execution (harness)
/// 3. Judge each outcome and slot it back into request order (evaluator)
///
/// Adapter failures and oversized sources never fail the call: they
/// become an all-failing result. Only a broken sandbox surfaces as an error.
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};
use verdict_common::types::{EvaluationRequest, EvaluationResult, TestCase};

use crate::adapter::normalize;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::evaluator::{degenerate, judge, ResultAggregator};
use crate::harness::{run_case, CaseOutcome};
use crate::sandbox::{self, Sandbox};

pub struct Executor {
    sandbox: Arc<dyn Sandbox>,
    config: EngineConfig,
}

impl Executor {
    pub fn new(sandbox: Arc<dyn Sandbox>, config: EngineConfig) -> Self {
        Self { sandbox, config }
    }

    /// Build the executor with the sandbox `config` selects.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        let sandbox = sandbox::from_config(&config)?;
        Ok(Self::new(sandbox, config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sandbox(&self) -> &dyn Sandbox {
        self.sandbox.as_ref()
    }

    #[instrument(
        skip(self, request),
        fields(
            request_id = %uuid::Uuid::new_v4(),
            language = %request.language,
            cases = request.test_cases.len()
        )
    )]
    pub async fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResult> {
        let start = Instant::now();
        let cases = &request.test_cases;

        if request.code.len() > self.config.max_source_bytes {
            warn!(
                source_bytes = request.code.len(),
                limit = self.config.max_source_bytes,
                "Source rejected before execution"
            );
            let message = format!(
                "Source code exceeds maximum size of {} bytes",
                self.config.max_source_bytes
            );
            return Ok(degenerate(cases, &message));
        }

        let unit = match normalize(
            &request.language,
            &request.code,
            request.function_name.as_deref(),
        ) {
            Ok(unit) => unit,
            Err(e) => {
                warn!(error = %e, "Normalization failed; all cases fail");
                return Ok(degenerate(cases, &e.to_string()));
            }
        };

        let timeout = self.config.case_timeout();
        let parallel = self.config.max_parallel_cases.max(1);
        let sandbox = self.sandbox.as_ref();
        let unit = &unit;

        // Futures are built up front and boxed so the returned future stays `Send`.
        let runs: Vec<BoxFuture<'_, (usize, &TestCase, Result<CaseOutcome>)>> = cases
            .iter()
            .enumerate()
            .map(|(index, case)| {
                async move { (index, case, run_case(sandbox, unit, case, timeout).await) }.boxed()
            })
            .collect();

        let mut aggregator = ResultAggregator::new(cases);
        let mut outcomes = stream::iter(runs).buffer_unordered(parallel);

        while let Some((index, case, outcome)) = outcomes.next().await {
            let result = judge(case, outcome?);
            if let Some(error) = &result.error {
                debug!(index, error = %error, "Case faulted");
            } else if !result.passed {
                debug!(index, actual = %result.actual, "Case returned a wrong value");
            }
            aggregator.record(index, result);
        }

        let result = aggregator.finish();
        info!(
            function = %unit.function,
            passed = result.passed,
            total = result.total,
            duration_ms = start.elapsed().as_millis() as u64,
            "Evaluation complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::harness::RESULT_MARKER;
    use crate::sandbox::Execution;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers every program with a canned report and counts executions.
    struct ScriptedSandbox {
        report: String,
        runs: AtomicUsize,
    }

    impl ScriptedSandbox {
        fn returning(value: Value) -> Arc<Self> {
            Arc::new(Self {
                report: format!("{RESULT_MARKER}{}\n", json!({ "ok": true, "value": value })),
                runs: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Sandbox for ScriptedSandbox {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn execute(&self, _program: &str, _timeout: Duration) -> Result<Execution> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(Execution {
                stdout: self.report.clone(),
                exit_code: Some(0),
                ..Execution::default()
            })
        }

        async fn check(&self) -> Result<String> {
            Ok("scripted".to_string())
        }
    }

    struct BrokenSandbox;

    #[async_trait]
    impl Sandbox for BrokenSandbox {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn execute(&self, _program: &str, _timeout: Duration) -> Result<Execution> {
            Err(EngineError::Io(std::io::Error::other("daemon gone")))
        }

        async fn check(&self) -> Result<String> {
            Err(EngineError::Io(std::io::Error::other("daemon gone")))
        }
    }

    fn request(language: &str, code: &str, expected: &[Value]) -> EvaluationRequest {
        EvaluationRequest {
            code: code.to_string(),
            language: language.to_string(),
            test_cases: expected
                .iter()
                .enumerate()
                .map(|(i, expected)| TestCase {
                    input: json!({ "n": i }).as_object().cloned().unwrap_or_default(),
                    expected: expected.clone(),
                })
                .collect(),
            function_name: None,
        }
    }

    #[tokio::test]
    async fn test_each_case_gets_its_own_execution() {
        let sandbox = ScriptedSandbox::returning(json!(3));
        let executor = Executor::new(sandbox.clone(), EngineConfig::default());

        let result = executor
            .evaluate(&request("javascript", "function f(n) { return 3; }", &[json!(3), json!(4)]))
            .await
            .unwrap();

        assert_eq!(sandbox.runs.load(Ordering::SeqCst), 2);
        assert_eq!(result.total, 2);
        assert_eq!(result.passed, 1);
        assert!(result.results[0].passed);
        assert_eq!(result.results[1].actual, json!(3));
    }

    #[tokio::test]
    async fn test_parallel_cases_keep_order() {
        let sandbox = ScriptedSandbox::returning(json!(1));
        let config = EngineConfig {
            max_parallel_cases: 4,
            ..EngineConfig::default()
        };
        let executor = Executor::new(sandbox, config);
        let expected: Vec<Value> = (0..10).map(|i| json!(i)).collect();

        let result = executor
            .evaluate(&request("js", "const f = (n) => 1;", &expected))
            .await
            .unwrap();

        assert_eq!(result.passed, 1);
        for (i, case) in result.results.iter().enumerate() {
            assert_eq!(case.input["n"], json!(i));
        }
    }

    #[tokio::test]
    async fn test_adapter_failure_degenerates_without_running() {
        let sandbox = ScriptedSandbox::returning(json!(0));
        let executor = Executor::new(sandbox.clone(), EngineConfig::default());

        let result = executor
            .evaluate(&request("cobol", "whatever", &[json!(1), json!(2)]))
            .await
            .unwrap();

        assert_eq!(sandbox.runs.load(Ordering::SeqCst), 0);
        assert_eq!(result.passed, 0);
        assert_eq!(result.total, 2);
        for case in &result.results {
            assert_eq!(case.error.as_deref(), Some("Unsupported language: cobol"));
            assert_eq!(case.actual, Value::Null);
        }
    }

    #[tokio::test]
    async fn test_missing_function_degenerates() {
        let executor = Executor::new(ScriptedSandbox::returning(json!(0)), EngineConfig::default());
        let result = executor
            .evaluate(&request("python", "x = 1\n", &[json!(1)]))
            .await
            .unwrap();
        let error = result.results[0].error.as_deref().unwrap_or_default();
        assert!(error.starts_with("Function not found"), "{error}");
    }

    #[tokio::test]
    async fn test_oversized_source_is_rejected() {
        let config = EngineConfig {
            max_source_bytes: 16,
            ..EngineConfig::default()
        };
        let sandbox = ScriptedSandbox::returning(json!(0));
        let executor = Executor::new(sandbox.clone(), config);

        let result = executor
            .evaluate(&request("js", "function f() { return 'far too long'; }", &[json!(0)]))
            .await
            .unwrap();

        assert_eq!(sandbox.runs.load(Ordering::SeqCst), 0);
        assert_eq!(
            result.results[0].error.as_deref(),
            Some("Source code exceeds maximum size of 16 bytes")
        );
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_evaluation_runs_on_spawned_task() {
        let executor = Arc::new(Executor::new(
            ScriptedSandbox::returning(json!(7)),
            EngineConfig {
                max_parallel_cases: 2,
                ..EngineConfig::default()
            },
        ));
        let request = request("js", "function f(n) { return 7; }", &[json!(7), json!(7), json!(8)]);

        let pending = executor.evaluate(&request);
        assert_send(&pending);
        drop(pending);

        let handle = tokio::spawn({
            let executor = executor.clone();
            async move { executor.evaluate(&request).await }
        });
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.passed, 2);
        assert_eq!(result.total, 3);
    }

    #[tokio::test]
    async fn test_sandbox_failure_is_an_error() {
        let executor = Executor::new(Arc::new(BrokenSandbox), EngineConfig::default());
        let err = executor
            .evaluate(&request("js", "function f() {}", &[json!(null)]))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
