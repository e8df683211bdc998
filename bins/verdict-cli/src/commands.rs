// CLI commands for evaluating submissions locally
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use verdict_common::types::{EvaluationRequest, EvaluationResult, TestCase};
use verdict_engine::{normalize as normalize_source, EngineConfig, Executor, SandboxKind};

pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub language: String,
    pub file: PathBuf,
    pub cases: PathBuf,
    pub function: Option<String>,
    pub timeout_ms: Option<u64>,
    pub sandbox: Option<SandboxKind>,
    pub json: bool,
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read source file {}", path.display()))
}

/// Test cases from either a bare array or a request-shaped object.
fn load_cases(path: &Path) -> Result<Vec<TestCase>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read test cases {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse test cases {}", path.display()))?;

    let cases = match value {
        Value::Object(mut object) => object
            .remove("testCases")
            .context("Test case object has no testCases field")?,
        other => other,
    };
    let cases: Vec<TestCase> =
        serde_json::from_value(cases).context("Test cases must be a list of {input, expected}")?;
    if cases.is_empty() {
        bail!("No test cases in {}", path.display());
    }
    Ok(cases)
}

fn print_summary(result: &EvaluationResult) {
    for (index, case) in result.results.iter().enumerate() {
        let input = Value::Object(case.input.clone());
        if case.passed {
            println!("  Test {} ✓ {}", index + 1, input);
            continue;
        }
        println!("  Test {} ✗ {}", index + 1, input);
        match &case.error {
            Some(error) => println!("    Error:    {error}"),
            None => {
                println!("    Expected: {}", case.expected);
                println!("    Got:      {}", case.actual);
            }
        }
    }
    println!();
    println!("  Passed: {} / {}", result.passed, result.total);
}

/// Evaluate a file locally; returns whether every case passed.
pub async fn run(options: RunOptions) -> Result<bool> {
    let mut config =
        EngineConfig::load(options.config.as_deref()).context("Failed to load engine configuration")?;
    if let Some(timeout_ms) = options.timeout_ms {
        config.case_timeout_ms = timeout_ms;
    }
    if let Some(sandbox) = options.sandbox {
        config.sandbox = sandbox;
    }

    let request = EvaluationRequest {
        code: read_source(&options.file)?,
        language: options.language,
        test_cases: load_cases(&options.cases)?,
        function_name: options.function,
    };

    let executor = Executor::from_config(config).context("Failed to initialise sandbox")?;
    let result = executor
        .evaluate(&request)
        .await
        .context("Evaluation failed")?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("→ Evaluated {} ({})", options.file.display(), request.language);
        print_summary(&result);
    }
    Ok(result.all_passed())
}

pub fn normalize(language: &str, file: &Path, function: Option<&str>) -> Result<()> {
    let code = read_source(file)?;
    let unit = normalize_source(language, &code, function)
        .with_context(|| format!("Failed to normalize {}", file.display()))?;
    println!("// function: {}", unit.function);
    print!("{}", unit.code);
    if !unit.code.ends_with('\n') {
        println!();
    }
    Ok(())
}

pub async fn check(config: Option<&Path>) -> Result<()> {
    let config = EngineConfig::load(config).context("Failed to load engine configuration")?;
    let executor = Executor::from_config(config).context("Failed to initialise sandbox")?;
    let version = executor
        .sandbox()
        .check()
        .await
        .with_context(|| format!("{} runtime is not reachable", executor.sandbox().name()))?;
    println!("✓ {} sandbox ready: {}", executor.sandbox().name(), version);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_bare_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "cases.json", r#"[{ "input": { "b": 1, "a": 2 }, "expected": 3 }]"#);

        let cases = load_cases(&path).unwrap();
        assert_eq!(cases.len(), 1);
        let keys: Vec<&String> = cases[0].input.keys().collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(cases[0].expected, json!(3));
    }

    #[test]
    fn test_load_request_shaped_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "request.json",
            r#"{ "code": "ignored", "testCases": [{ "input": {}, "expected": null }] }"#,
        );
        assert_eq!(load_cases(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_or_malformed_cases() {
        let dir = tempfile::tempdir().unwrap();
        let empty = write(&dir, "empty.json", "[]");
        assert!(load_cases(&empty).is_err());

        let broken = write(&dir, "broken.json", r#"[{ "input": 3 }]"#);
        assert!(load_cases(&broken).is_err());

        let missing = write(&dir, "missing.json", r#"{ "cases": [] }"#);
        let err = load_cases(&missing).unwrap_err();
        assert!(err.to_string().contains("testCases"));
    }

    #[test]
    fn test_normalize_reports_adapter_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "solution.py", "class Solution:\n    pass\n");
        let err = normalize("python", &path, None).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported construct on line 1"));
    }
}
