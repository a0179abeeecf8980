//! Lambda translator.
//!
//! Supported operations: CreateFunction, ListFunctions, GetFunction,
//! DeleteFunction, Invoke (synchronous). Function metadata lives in the
//! relational store; Invoke lazily creates one long-lived container per
//! function from a per-runtime base image and execs the handler inside
//! it per request. The container runtime contract has no stdin
//! streaming, so the event JSON is passed as the handler process's
//! single argument and stdout is the result. Concurrent invokes per
//! function are bounded; exceeding the bound is TooManyRequests.
//! Invocations past the function timeout return Lambda's unhandled-error
//! shape (a timeout leaves no partial stdout to attach — exec output is
//! only observable on completion).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_helpers::CallerContext;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    error::{EmulationError, EmulationResult},
    models::{EmulatedResource, ResourceFamily},
    state::EmulationState,
};

const DEFAULT_TIMEOUT_SECONDS: u64 = 3;
const DEFAULT_MEMORY_MB: u64 = 128;

pub fn router() -> Router<EmulationState> {
    Router::new()
        .route("/2015-03-31/functions", post(create_function).get(list_functions))
        .route("/2015-03-31/functions/{name}", get(get_function).delete(delete_function))
        .route("/2015-03-31/functions/{name}/invocations", post(invoke))
        .fallback(not_implemented)
}

async fn not_implemented() -> Response {
    error_response(&EmulationError::NotImplemented(
        "operation not supported by this emulator".into(),
    ))
}

pub fn error_response(error: &EmulationError) -> Response {
    let kind = match error {
        EmulationError::NotFound(_) => "ResourceNotFoundException",
        EmulationError::Forbidden(_) => "AccessDeniedException",
        EmulationError::Conflict(_) => "ResourceConflictException",
        EmulationError::InvalidRequest(_) => "InvalidParameterValueException",
        EmulationError::NotImplemented(_) => "InvalidAction",
        EmulationError::TooManyRequests(_) => "TooManyRequestsException",
        EmulationError::Timeout(_) => "RequestTimeoutException",
        EmulationError::Internal(_) => "ServiceException",
    };
    (
        error.status_code(),
        Json(json!({ "Type": kind, "message": error.to_string() })),
    )
        .into_response()
}

fn external_id(environment_id: Uuid, name: &str) -> String {
    format!("{environment_id}/{name}")
}

/// Per-runtime base image and interpreter argv.
fn runtime_materials(runtime: &str) -> EmulationResult<(&'static str, &'static str)> {
    match runtime {
        r if r.starts_with("python") => Ok(("python:3.12-alpine", "python3")),
        r if r.starts_with("nodejs") => Ok(("node:20-alpine", "node")),
        other => Err(EmulationError::InvalidRequest(format!(
            "unsupported runtime {other}"
        ))),
    }
}

fn function_json(row: &EmulatedResource) -> serde_json::Value {
    let name = row.attr_str("name").unwrap_or_default();
    json!({
        "FunctionName": name,
        "FunctionArn": format!("arn:aws:lambda:mockfactory:{}:function:{name}", row.environment_id),
        "Runtime": row.attr_str("runtime"),
        "Handler": row.attr_str("handler"),
        "MemorySize": row.attr_i64("memory_mb").unwrap_or(DEFAULT_MEMORY_MB as i64),
        "Timeout": row.attr_i64("timeout_seconds").unwrap_or(DEFAULT_TIMEOUT_SECONDS as i64),
        "Environment": { "Variables": row.attributes.get("env_vars").cloned().unwrap_or(json!({})) },
        "LastModified": row.updated_at.to_rfc3339(),
    })
}

async fn create_function(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path(environment_id): Path<Uuid>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Lambda, "CreateFunction")
            .await?;

        let name = body
            .get("FunctionName")
            .and_then(|n| n.as_str())
            .ok_or_else(|| EmulationError::InvalidRequest("FunctionName is required".into()))?
            .to_string();
        let runtime = body
            .get("Runtime")
            .and_then(|r| r.as_str())
            .ok_or_else(|| EmulationError::InvalidRequest("Runtime is required".into()))?
            .to_string();
        runtime_materials(&runtime)?;

        let id = external_id(environment_id, &name);
        if state.resources.get(ResourceFamily::Lambda, &id).await?.is_some() {
            return Err(EmulationError::Conflict(format!("function {name} already exists")));
        }

        let row = EmulatedResource::new(environment_id, ResourceFamily::Lambda, "function", id).with_attributes(json!({
            "name": name,
            "runtime": runtime,
            "handler": body.get("Handler").and_then(|h| h.as_str()).unwrap_or("handler.handler"),
            "memory_mb": body.get("MemorySize").and_then(|m| m.as_u64()).unwrap_or(DEFAULT_MEMORY_MB),
            "timeout_seconds": body.get("Timeout").and_then(|t| t.as_u64()).unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            "env_vars": body.pointer("/Environment/Variables").cloned().unwrap_or(json!({})),
            "code": body.pointer("/Code/ZipFile").cloned().unwrap_or(serde_json::Value::Null),
        }));
        state.resources.create(row).await
    }
    .await;

    match result {
        Ok(row) => (StatusCode::CREATED, Json(function_json(&row))).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn list_functions(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path(environment_id): Path<Uuid>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Lambda, "ListFunctions")
            .await?;
        state.resources.list(environment_id, ResourceFamily::Lambda, "function").await
    }
    .await;

    match result {
        Ok(functions) => Json(json!({
            "Functions": functions.iter().map(function_json).collect::<Vec<_>>(),
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn function_row(
    state: &EmulationState,
    environment_id: Uuid,
    name: &str,
) -> EmulationResult<EmulatedResource> {
    state
        .resources
        .get(ResourceFamily::Lambda, &external_id(environment_id, name))
        .await?
        .ok_or_else(|| EmulationError::NotFound(format!("function {name}")))
}

async fn get_function(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, name)): Path<(Uuid, String)>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Lambda, "GetFunction")
            .await?;
        function_row(&state, environment_id, &name).await
    }
    .await;

    match result {
        Ok(row) => Json(json!({ "Configuration": function_json(&row) })).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn delete_function(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, name)): Path<(Uuid, String)>,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Lambda, "DeleteFunction")
            .await?;
        let row = function_row(&state, environment_id, &name).await?;

        if let Some(container_id) = &row.container_id {
            let _ = state.runtime.stop(container_id, Duration::from_secs(5)).await;
            let _ = state.runtime.remove(container_id, true).await;
        }

        state.resources.delete(row.id).await
    }
    .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

/// Creates and starts the function's backing container on first invoke.
async fn ensure_container(state: &EmulationState, row: &mut EmulatedResource) -> EmulationResult<String> {
    if let Some(container_id) = &row.container_id {
        return Ok(container_id.clone());
    }

    let runtime = row.attr_str("runtime").unwrap_or_default();
    let (image, _interpreter) = runtime_materials(runtime)?;

    let mut env: HashMap<String, String> = HashMap::new();
    if let Some(vars) = row.attributes.get("env_vars").and_then(|v| v.as_object()) {
        for (key, value) in vars {
            env.insert(key.clone(), value.as_str().unwrap_or_default().to_string());
        }
    }

    let mut labels = HashMap::new();
    labels.insert("environment".to_string(), row.environment_id.to_string());
    labels.insert("service-kind".to_string(), "lambda".to_string());

    let spec = container_runtime::ContainerSpec {
        name: format!("mockfactory-lambda-{}", row.id),
        image: image.to_string(),
        env,
        command: Some(vec!["sleep".to_string(), "infinity".to_string()]),
        exposed_port: 8080,
        host_port: 0,
        labels,
    };

    let container_id = state.runtime.create(&spec).await?;
    state.runtime.start(&container_id).await?;

    row.container_id = Some(container_id.clone());
    *row = state.resources.update(row.clone()).await?;
    Ok(container_id)
}

async fn invoke(
    State(state): State<EmulationState>,
    caller: CallerContext,
    Path((environment_id, name)): Path<(Uuid, String)>,
    body: String,
) -> Response {
    let result = async {
        state
            .authorize(caller.user_id, environment_id, ResourceFamily::Lambda, "Invoke")
            .await?;

        let mut row = function_row(&state, environment_id, &name).await?;

        let semaphore = state.lambda_semaphore(&row.external_id);
        let Ok(_permit) = semaphore.try_acquire() else {
            return Err(EmulationError::TooManyRequests(format!(
                "function {name} has reached its concurrency bound"
            )));
        };

        let container_id = ensure_container(&state, &mut row).await?;

        let (_, interpreter) = runtime_materials(row.attr_str("runtime").unwrap_or_default())?;
        let handler = row.attr_str("handler").unwrap_or("handler.handler").to_string();
        let event = if body.is_empty() { "{}".to_string() } else { body };

        let argv = vec![
            interpreter.to_string(),
            "/var/task/bootstrap".to_string(),
            handler,
            event,
        ];

        let timeout = Duration::from_secs(row.attr_i64("timeout_seconds").unwrap_or(DEFAULT_TIMEOUT_SECONDS as i64) as u64);

        match tokio::time::timeout(timeout, state.runtime.exec(&container_id, &argv)).await {
            Ok(Ok(output)) if output.exit_code == 0 => Ok(InvokeOutcome::Ok(output.stdout)),
            Ok(Ok(output)) => Ok(InvokeOutcome::HandlerError(output.stderr)),
            Ok(Err(e)) => Err(EmulationError::from(e)),
            Err(_) => Ok(InvokeOutcome::TimedOut(timeout)),
        }
    }
    .await;

    match result {
        Ok(InvokeOutcome::Ok(stdout)) => (StatusCode::OK, stdout).into_response(),
        Ok(InvokeOutcome::HandlerError(stderr)) => (
            StatusCode::OK,
            [("x-amz-function-error", "Unhandled")],
            Json(json!({ "errorMessage": stderr })),
        )
            .into_response(),
        Ok(InvokeOutcome::TimedOut(timeout)) => (
            StatusCode::OK,
            [("x-amz-function-error", "Unhandled")],
            Json(json!({
                "errorMessage": format!("Task timed out after {:.2} seconds", timeout.as_secs_f64()),
                "stdout": "",
            })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

enum InvokeOutcome {
    Ok(String),
    HandlerError(String),
    TimedOut(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, harness_with_runtime, ScriptedRuntime};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(state: EmulationState) -> Router {
        Router::new()
            .nest("/{environment_id}/aws/lambda", super::router())
            .with_state(state)
    }

    fn request(owner: Uuid, method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-mockfactory-user-id", owner.to_string())
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn create_fn(app: &Router, owner: Uuid, environment_id: Uuid, name: &str) {
        let response = app
            .clone()
            .oneshot(request(
                owner,
                "POST",
                &format!("/{environment_id}/aws/lambda/2015-03-31/functions"),
                &format!(r#"{{"FunctionName":"{name}","Runtime":"python3.12","Handler":"app.handler","Timeout":1}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn create_and_get_round_trip() {
        let h = harness().await;
        let app = app(h.state.clone());
        create_fn(&app, h.owner, h.environment_id, "thumbnailer").await;

        let response = app
            .oneshot(request(
                h.owner,
                "GET",
                &format!("/{}/aws/lambda/2015-03-31/functions/thumbnailer", h.environment_id),
                "",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_slice(&response.into_body().collect().await.unwrap().to_bytes()).unwrap();
        assert_eq!(body["Configuration"]["FunctionName"], "thumbnailer");
        assert_eq!(body["Configuration"]["Runtime"], "python3.12");
    }

    #[tokio::test]
    async fn invoke_returns_handler_stdout() {
        let h = harness_with_runtime(Arc::new(ScriptedRuntime {
            stdout: r#"{"statusCode":200}"#.to_string(),
            exec_delay: std::time::Duration::ZERO,
        }))
        .await;
        let app = app(h.state.clone());
        create_fn(&app, h.owner, h.environment_id, "echo").await;

        let response = app
            .oneshot(request(
                h.owner,
                "POST",
                &format!("/{}/aws/lambda/2015-03-31/functions/echo/invocations", h.environment_id),
                r#"{"input":1}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"statusCode":200}"#);
    }

    #[tokio::test]
    async fn concurrency_bound_yields_too_many_requests() {
        // harness sets the per-function bound to 2; a slow exec keeps two
        // invokes in flight while the third arrives
        let h = harness_with_runtime(Arc::new(ScriptedRuntime {
            stdout: "{}".to_string(),
            exec_delay: std::time::Duration::from_millis(300),
        }))
        .await;
        let app = app(h.state.clone());
        create_fn(&app, h.owner, h.environment_id, "busy").await;

        let uri = format!("/{}/aws/lambda/2015-03-31/functions/busy/invocations", h.environment_id);
        let first = app.clone().oneshot(request(h.owner, "POST", &uri, "{}"));
        let second = app.clone().oneshot(request(h.owner, "POST", &uri, "{}"));
        let third = async {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            app.clone().oneshot(request(h.owner, "POST", &uri, "{}")).await
        };

        let (first, second, third) = tokio::join!(first, second, third);
        let statuses = [
            first.unwrap().status(),
            second.unwrap().status(),
            third.unwrap().status(),
        ];
        assert_eq!(statuses.iter().filter(|s| **s == StatusCode::TOO_MANY_REQUESTS).count(), 1);
        assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 2);
    }

    #[tokio::test]
    async fn invoke_past_timeout_reports_unhandled_error() {
        let h = harness_with_runtime(Arc::new(ScriptedRuntime {
            stdout: "{}".to_string(),
            exec_delay: std::time::Duration::from_millis(1500),
        }))
        .await;
        let app = app(h.state.clone());
        create_fn(&app, h.owner, h.environment_id, "slow").await; // Timeout: 1s

        let response = app
            .oneshot(request(
                h.owner,
                "POST",
                &format!("/{}/aws/lambda/2015-03-31/functions/slow/invocations", h.environment_id),
                "{}",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-amz-function-error").unwrap(), "Unhandled");
        let body = String::from_utf8(response.into_body().collect().await.unwrap().to_bytes().to_vec()).unwrap();
        assert!(body.contains("timed out"));
    }
}
