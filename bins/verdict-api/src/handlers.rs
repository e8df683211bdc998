// HTTP route handlers for the Verdict API

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};
use verdict_common::types::EvaluationRequest;

use crate::metrics;
use crate::AppState;

/// Reasons a request is refused before evaluation starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Malformed JSON body: {0}")]
    MalformedJson(String),

    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("testCases must be a non-empty array")]
    EmptyTestCases,

    #[error("Invalid request: {0}")]
    Invalid(String),
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

fn require_string(body: &Value, field: &'static str) -> Result<(), ValidationError> {
    match body.get(field).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Ok(()),
        _ => Err(ValidationError::MissingField(field)),
    }
}

/// Check required fields, then decode the typed request.
pub fn validate(body: Value) -> Result<EvaluationRequest, ValidationError> {
    if !body.is_object() {
        return Err(ValidationError::NotAnObject);
    }
    require_string(&body, "code")?;
    require_string(&body, "language")?;
    match body.get("testCases") {
        None | Some(Value::Null) => return Err(ValidationError::MissingField("testCases")),
        Some(Value::Array(cases)) if cases.is_empty() => {
            return Err(ValidationError::EmptyTestCases)
        }
        Some(Value::Array(_)) => {}
        Some(_) => return Err(ValidationError::EmptyTestCases),
    }
    serde_json::from_value(body).map_err(|e| ValidationError::Invalid(e.to_string()))
}

/// POST /evaluate - Evaluate a submission against its test cases
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let request = match payload
        .map_err(|rejection| ValidationError::MalformedJson(rejection.body_text()))
        .and_then(|Json(body)| validate(body))
    {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejected evaluation request");
            return e.into_response();
        }
    };

    let start = Instant::now();
    match state.executor.evaluate(&request).await {
        Ok(result) => {
            metrics::record_evaluation(&request.language, &result, start.elapsed().as_secs_f64());
            info!(
                language = %request.language,
                passed = result.passed,
                total = result.total,
                "Evaluation served"
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => {
            metrics::record_internal_error(&request.language);
            error!(language = %request.language, error = %e, "Evaluation failed");
            internal_error()
        }
    }
}

/// Generic 500 body; details stay in the logs.
pub fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal error" })),
    )
        .into_response()
}

/// GET /health - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus exposition
pub async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_in_order() {
        assert_eq!(
            validate(json!({})).unwrap_err(),
            ValidationError::MissingField("code")
        );
        assert_eq!(
            validate(json!({ "code": "x" })).unwrap_err(),
            ValidationError::MissingField("language")
        );
        assert_eq!(
            validate(json!({ "code": "x", "language": "js" })).unwrap_err(),
            ValidationError::MissingField("testCases")
        );
    }

    #[test]
    fn test_blank_strings_count_as_missing() {
        let err = validate(json!({ "code": "", "language": "js", "testCases": [] })).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("code"));
    }

    #[test]
    fn test_empty_test_cases() {
        let err = validate(json!({ "code": "x", "language": "js", "testCases": [] })).unwrap_err();
        assert_eq!(err, ValidationError::EmptyTestCases);
        assert_eq!(err.to_string(), "testCases must be a non-empty array");
    }

    #[test]
    fn test_unknown_language_passes_validation() {
        let request = validate(json!({
            "code": "x",
            "language": "cobol",
            "testCases": [{ "input": {}, "expected": 1 }]
        }))
        .unwrap();
        assert_eq!(request.language, "cobol");
    }

    #[test]
    fn test_malformed_case_is_invalid() {
        let err = validate(json!({
            "code": "x",
            "language": "js",
            "testCases": [{ "input": [1, 2], "expected": 3 }]
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::Invalid(_)), "{err}");
    }

    #[test]
    fn test_non_object_body() {
        assert_eq!(validate(json!([1])).unwrap_err(), ValidationError::NotAnObject);
    }
}
