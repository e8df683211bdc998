use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Source languages accepted by the engine.
///
/// JavaScript is the common execution form; the other three are normalized
/// into it before anything runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(rename = "javascript")]
    JavaScript,
    Python,
    Java,
    Cpp,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::JavaScript,
        Language::Python,
        Language::Java,
        Language::Cpp,
    ];

    /// Parse a wire tag, accepting the usual aliases.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" | "node" => Some(Language::JavaScript),
            "python" | "py" | "python3" => Some(Language::Python),
            "java" => Some(Language::Java),
            "cpp" | "c++" | "cxx" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "cpp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One test case. `input` keeps insertion order: it defines the positional
/// argument order of the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: Map<String, Value>,
    #[serde(default)]
    pub expected: Value,
}

/// A validated evaluation request.
///
/// `language` stays a raw tag so that an unknown language degrades into an
/// all-failing result rather than a rejected request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub code: String,
    pub language: String,
    pub test_cases: Vec<TestCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
}

/// Verdict for a single test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub passed: bool,
    pub input: Map<String, Value>,
    pub expected: Value,
    pub actual: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaseResult {
    /// A failed case with no produced value.
    pub fn fault(case: &TestCase, error: impl Into<String>) -> Self {
        Self {
            passed: false,
            input: case.input.clone(),
            expected: case.expected.clone(),
            actual: Value::Null,
            error: Some(error.into()),
        }
    }
}

/// Terminal output of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub passed: usize,
    pub total: usize,
    pub results: Vec<CaseResult>,
}

impl EvaluationResult {
    pub fn all_passed(&self) -> bool {
        self.total > 0 && self.passed == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_language_tags() {
        assert_eq!(Language::from_tag("python"), Some(Language::Python));
        assert_eq!(Language::from_tag("JS"), Some(Language::JavaScript));
        assert_eq!(Language::from_tag("c++"), Some(Language::Cpp));
        assert_eq!(Language::from_tag("cobol"), None);
        for lang in Language::ALL {
            assert_eq!(Language::from_tag(&lang.to_string()), Some(lang));
        }
    }

    #[test]
    fn test_request_preserves_input_order() {
        let raw = r#"{
            "code": "function f(b, a) { return b - a; }",
            "language": "javascript",
            "testCases": [{ "input": { "b": 5, "a": 2 }, "expected": 3 }]
        }"#;
        let request: EvaluationRequest = serde_json::from_str(raw).unwrap();
        let keys: Vec<&String> = request.test_cases[0].input.keys().collect();
        assert_eq!(keys, ["b", "a"]);
        assert!(request.function_name.is_none());
    }

    #[test]
    fn test_case_result_omits_missing_error() {
        let result = CaseResult {
            passed: true,
            input: Map::new(),
            expected: json!(3),
            actual: json!(3),
            error: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(value["actual"], json!(3));
    }

    #[test]
    fn test_fault_has_null_actual() {
        let case = TestCase {
            input: Map::new(),
            expected: json!([1, 2]),
        };
        let result = CaseResult::fault(&case, "timeout");
        assert!(!result.passed);
        assert_eq!(result.actual, Value::Null);
        assert_eq!(result.error.as_deref(), Some("timeout"));
    }
}
