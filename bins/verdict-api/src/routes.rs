use axum::{
    response::Response,
    routing::{get, post},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/evaluate", post(handlers::evaluate))
        .route("/api/evaluate", post(handlers::evaluate))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "Handler panicked");
    handlers::internal_error()
}

/// Full application: routes, state and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods(cors::Any)
        .allow_headers(cors::Any);

    routes()
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt; // for `oneshot`
    use verdict_engine::error::{EngineError, Result};
    use verdict_engine::sandbox::{Execution, Sandbox};
    use verdict_engine::{harness::RESULT_MARKER, EngineConfig, Executor};

    /// Every program "returns" the same value.
    struct FixedSandbox(Value);

    #[async_trait]
    impl Sandbox for FixedSandbox {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn execute(&self, _program: &str, _timeout: Duration) -> Result<Execution> {
            Ok(Execution {
                stdout: format!("{RESULT_MARKER}{}\n", json!({ "ok": true, "value": self.0 })),
                exit_code: Some(0),
                ..Execution::default()
            })
        }

        async fn check(&self) -> Result<String> {
            Ok("fixed".to_string())
        }
    }

    struct FailingSandbox;

    #[async_trait]
    impl Sandbox for FailingSandbox {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn execute(&self, _program: &str, _timeout: Duration) -> Result<Execution> {
            Err(EngineError::Io(std::io::Error::other("no runtime")))
        }

        async fn check(&self) -> Result<String> {
            Err(EngineError::Io(std::io::Error::other("no runtime")))
        }
    }

    fn app(sandbox: Arc<dyn Sandbox>) -> Router {
        let executor = Executor::new(sandbox, EngineConfig::default());
        build_router(Arc::new(AppState { executor }))
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    const ADD_REQUEST: &str = r#"{
        "code": "function add(a, b) { return a + b; }",
        "language": "javascript",
        "testCases": [
            { "input": { "a": 2, "b": 3 }, "expected": 5 },
            { "input": { "a": 1, "b": 1 }, "expected": 3 }
        ]
    }"#;

    #[tokio::test]
    async fn test_evaluate_returns_scored_result() {
        let (status, body) = post_json(app(Arc::new(FixedSandbox(json!(5)))), "/evaluate", ADD_REQUEST).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["passed"], 1);
        assert_eq!(body["total"], 2);
        assert_eq!(body["results"][0]["passed"], true);
        assert_eq!(body["results"][1]["actual"], 5);
        assert_eq!(body["results"][1]["input"], json!({ "a": 1, "b": 1 }));
        assert!(body["results"][0].get("error").is_none());
    }

    #[tokio::test]
    async fn test_api_alias_route() {
        let (status, body) = post_json(app(Arc::new(FixedSandbox(json!(5)))), "/api/evaluate", ADD_REQUEST).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
    }

    #[tokio::test]
    async fn test_empty_test_cases_is_bad_request() {
        let body = r#"{ "code": "function f() {}", "language": "javascript", "testCases": [] }"#;
        let (status, body) = post_json(app(Arc::new(FixedSandbox(json!(0)))), "/evaluate", body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "testCases must be a non-empty array");
    }

    #[tokio::test]
    async fn test_missing_code_is_bad_request() {
        let body = r#"{ "language": "python", "testCases": [{ "input": {}, "expected": 1 }] }"#;
        let (status, body) = post_json(app(Arc::new(FixedSandbox(json!(0)))), "/evaluate", body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required field: code");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (status, body) = post_json(app(Arc::new(FixedSandbox(json!(0)))), "/evaluate", "{ not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Malformed JSON body"));
    }

    #[tokio::test]
    async fn test_unsupported_language_is_a_degenerate_result() {
        let body = r#"{ "code": "x", "language": "cobol", "testCases": [{ "input": {}, "expected": 1 }, { "input": {}, "expected": 2 }] }"#;
        let (status, body) = post_json(app(Arc::new(FixedSandbox(json!(1)))), "/evaluate", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["passed"], 0);
        assert_eq!(body["total"], 2);
        assert_eq!(body["results"][1]["error"], "Unsupported language: cobol");
        assert_eq!(body["results"][1]["actual"], Value::Null);
    }

    #[tokio::test]
    async fn test_sandbox_failure_is_internal_error() {
        let (status, body) = post_json(app(Arc::new(FailingSandbox)), "/evaluate", ADD_REQUEST).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal error");
    }

    #[tokio::test]
    async fn test_health_and_cors() {
        let response = app(Arc::new(FixedSandbox(json!(0))))
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "https://exam.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let response = app(Arc::new(FixedSandbox(json!(0))))
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/evaluate")
                    .header("origin", "https://exam.example")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_success());
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = app(Arc::new(FixedSandbox(json!(5))));
        let _ = post_json(app.clone(), "/evaluate", ADD_REQUEST).await;

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("verdict_cases_total"), "{text}");
    }
}
