//! Execution Harness
//!
//! Wraps a normalized unit into a standalone program for exactly one test
//! case, runs it in a fresh sandbox context and classifies what came back.
//!
//! The program reports through a single marker line on stdout:
//! `__VERDICT_RESULT__{"ok":true,"value":...}` or
//! `__VERDICT_RESULT__{"ok":false,"error":"..."}`. Anything else the
//! candidate prints is ignored, so `console.log` noise can never be taken
//! for the return value.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use verdict_common::types::TestCase;

use crate::adapter::NormalizedUnit;
use crate::error::{EngineError, Result};
use crate::marshal::render_call;
use crate::sandbox::{Execution, Sandbox};

pub const RESULT_MARKER: &str = "__VERDICT_RESULT__";

const RUNNER_OPEN: &str = r#"
;(async () => {
  const __verdictReplacer = (_key, value) => {
    if (value instanceof Map) return Object.fromEntries(value);
    if (value instanceof Set) return Array.from(value);
    if (typeof value === "bigint") return Number(value);
    return value;
  };
  const __verdictReport = (payload) => {
    const line = "\n__VERDICT_RESULT__" + JSON.stringify(payload, __verdictReplacer) + "\n";
    process.stdout.write(line, () => process.exit(0));
  };
  try {
    const value = await "#;

const RUNNER_CLOSE: &str = r#";
    __verdictReport({ ok: true, value: value === undefined ? null : value });
  } catch (error) {
    const message = error instanceof Error ? `${error.name}: ${error.message}` : String(error);
    __verdictReport({ ok: false, error: message });
  }
})();
"#;

/// What one case's program produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseOutcome {
    Returned(Value),
    Raised(String),
    TimedOut,
}

#[derive(Deserialize)]
struct Report {
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Standalone program that calls `unit.function` with `call`'s arguments.
pub fn build_program(unit: &NormalizedUnit, call: &str) -> String {
    let mut program =
        String::with_capacity(unit.code.len() + call.len() + RUNNER_OPEN.len() + RUNNER_CLOSE.len() + 1);
    program.push_str(&unit.code);
    program.push('\n');
    program.push_str(RUNNER_OPEN);
    program.push_str(call);
    program.push_str(RUNNER_CLOSE);
    program
}

/// Turn raw runtime output into an outcome.
pub fn classify(execution: &Execution) -> CaseOutcome {
    if execution.timed_out {
        return CaseOutcome::TimedOut;
    }

    let report = execution
        .stdout
        .lines()
        .rev()
        .find_map(|line| line.trim_end_matches('\r').strip_prefix(RESULT_MARKER));
    if let Some(report) = report {
        return match serde_json::from_str::<Report>(report) {
            Ok(Report { ok: true, value, .. }) => CaseOutcome::Returned(value),
            Ok(Report { error, .. }) => {
                CaseOutcome::Raised(error.unwrap_or_else(|| "Error".to_string()))
            }
            Err(_) if execution.truncated => CaseOutcome::Raised("Output limit exceeded".to_string()),
            Err(e) => CaseOutcome::Raised(format!("Malformed result: {e}")),
        };
    }

    if let Some(line) = execution.stderr.lines().find(|line| is_error_line(line)) {
        return CaseOutcome::Raised(line.trim_end().to_string());
    }

    let message = match execution.exit_code {
        _ if execution.truncated => "Output limit exceeded".to_string(),
        Some(0) => "Program finished without producing a result".to_string(),
        Some(code) => format!("Process exited with code {code}"),
        None => "Process terminated without an exit status".to_string(),
    };
    CaseOutcome::Raised(message)
}

/// `SyntaxError: ...`, `TypeError: ...`, a bare `Error`, and the like.
fn is_error_line(line: &str) -> bool {
    let name = line.split(':').next().unwrap_or_default();
    name.ends_with("Error") && name.chars().all(|c| c.is_ascii_alphabetic())
}

/// Run one test case in its own sandbox execution.
pub async fn run_case(
    sandbox: &dyn Sandbox,
    unit: &NormalizedUnit,
    case: &TestCase,
    timeout: Duration,
) -> Result<CaseOutcome> {
    let program = build_program(unit, &render_call(&unit.function, case));
    let execution = match sandbox.execute(&program, timeout).await {
        Ok(execution) => execution,
        Err(e @ EngineError::ProgramTooLarge { .. }) => return Ok(CaseOutcome::Raised(e.to_string())),
        Err(e) => return Err(e),
    };

    let outcome = classify(&execution);
    debug!(
        sandbox = sandbox.name(),
        duration_ms = execution.duration_ms,
        outcome = ?outcome,
        "Case executed"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use verdict_common::types::Language;

    fn unit(code: &str, function: &str) -> NormalizedUnit {
        NormalizedUnit {
            language: Language::JavaScript,
            code: code.to_string(),
            function: function.to_string(),
        }
    }

    fn finished(stdout: &str, stderr: &str, exit_code: i64) -> Execution {
        Execution {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code: Some(exit_code),
            ..Execution::default()
        }
    }

    #[test]
    fn test_program_layout() {
        let program = build_program(&unit("function add(a, b) { return a + b; } // end", "add"), "add(1, 2)");
        assert!(program.starts_with("function add(a, b) { return a + b; } // end\n"));
        assert!(program.contains("const value = await add(1, 2);"));
        assert!(program.contains(RESULT_MARKER));
    }

    #[test]
    fn test_marker_line_wins_over_noise() {
        let stdout = format!("3\ndebug output\n{RESULT_MARKER}{{\"ok\":true,\"value\":[1,2]}}\n");
        assert_eq!(
            classify(&finished(&stdout, "", 0)),
            CaseOutcome::Returned(json!([1, 2]))
        );
    }

    #[test]
    fn test_last_marker_line_is_the_report() {
        let stdout = format!(
            "{RESULT_MARKER}{{\"ok\":true,\"value\":\"forged\"}}\n{RESULT_MARKER}{{\"ok\":true,\"value\":7}}\n"
        );
        assert_eq!(classify(&finished(&stdout, "", 0)), CaseOutcome::Returned(json!(7)));
    }

    #[test]
    fn test_thrown_error_report() {
        let stdout = format!("{RESULT_MARKER}{{\"ok\":false,\"error\":\"TypeError: x is not a function\"}}\n");
        assert_eq!(
            classify(&finished(&stdout, "", 0)),
            CaseOutcome::Raised("TypeError: x is not a function".to_string())
        );
    }

    #[test]
    fn test_runtime_error_from_stderr() {
        let stderr = "/tmp/verdict-1/main.js:2\n  return a +;\n           ^\n\nSyntaxError: Unexpected token ';'\n    at internalCompileFunction (node:internal/vm:76:18)\n";
        assert_eq!(
            classify(&finished("", stderr, 1)),
            CaseOutcome::Raised("SyntaxError: Unexpected token ';'".to_string())
        );
    }

    #[test]
    fn test_exit_code_fallback() {
        assert_eq!(
            classify(&finished("", "FATAL ERROR: Reached heap limit", 134)),
            CaseOutcome::Raised("Process exited with code 134".to_string())
        );
        assert_eq!(
            classify(&finished("hello\n", "", 0)),
            CaseOutcome::Raised("Program finished without producing a result".to_string())
        );
    }

    #[test]
    fn test_timeout() {
        let execution = Execution {
            timed_out: true,
            ..Execution::default()
        };
        assert_eq!(classify(&execution), CaseOutcome::TimedOut);
    }

    #[test]
    fn test_truncated_report() {
        let execution = Execution {
            stdout: format!("{RESULT_MARKER}{{\"ok\":true,\"value\":[1,2,"),
            exit_code: Some(0),
            truncated: true,
            ..Execution::default()
        };
        assert_eq!(
            classify(&execution),
            CaseOutcome::Raised("Output limit exceeded".to_string())
        );
    }

    #[test]
    fn test_error_line_shape() {
        assert!(is_error_line("ReferenceError: y is not defined"));
        assert!(is_error_line("Error"));
        assert!(!is_error_line("    at Object.<anonymous> (main.js:1:1)"));
        assert!(!is_error_line("Some Error: spaced"));
    }
}
