// HTTP entry points for the retry-loop runtime.
// Instance creation and status lookup, plus a deliberately flaky demo
// endpoint so the whole loop can be exercised against itself locally.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use redrive::prelude::*;

/// Payload used when an instance is created with an empty body
const DEMO_PAYLOAD: &[u8] = br#"{"demo":true}"#;

/// App state shared across routes
#[derive(Clone)]
struct AppState {
    runtime: LocalRuntime,
    store: Arc<InMemoryInputStore>,
    settings: Settings,
}

#[derive(Serialize)]
struct CreateInstanceResponse {
    instance_id: String,
    status_url: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Create a retry-loop instance around the posted payload.
///
/// An empty body falls back to the demo payload so the loop can be
/// kicked off with a bare `curl -X POST /instances`.
async fn create_instance(State(state): State<AppState>, body: Bytes) -> Response {
    let instance_id = Uuid::new_v4().simple().to_string();
    let payload = if body.is_empty() {
        DEMO_PAYLOAD.to_vec()
    } else {
        body.to_vec()
    };

    if let Err(err) = state.store.put(&instance_id, payload).await {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
    }

    let config = state.settings.retry_policy(Utc::now());
    match state
        .runtime
        .start(OrchestrationState::new(instance_id.clone(), config))
        .await
    {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(CreateInstanceResponse {
                status_url: format!("/instances/{instance_id}"),
                instance_id,
            }),
        )
            .into_response(),
        Err(ScheduleError::DuplicateInstance(id)) => {
            error_response(StatusCode::CONFLICT, format!("instance already exists: {id}"))
        }
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

async fn get_instance(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.runtime.status(&id).await {
        Some(status) => Json(status).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("no such instance: {id}")),
    }
}

#[derive(Deserialize)]
struct DemoParams {
    #[serde(default)]
    attempt: Option<u32>,
}

/// Flaky endpoint for demos: half the calls get rate limited with a
/// `Retry-After` that grows with the attempt number.
async fn demo_action(Query(params): Query<DemoParams>) -> Response {
    tokio::time::sleep(Duration::from_millis(700)).await;

    let attempt = params.attempt.unwrap_or(0);
    if rand::thread_rng().gen_bool(0.5) {
        let retry_after = (5 + attempt).to_string();
        tracing::info!(attempt, retry_after, "demo action rate limiting");
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after)],
        )
            .into_response()
    } else {
        tracing::info!(attempt, "demo action succeeding");
        StatusCode::OK.into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/instances", post(create_instance))
        .route("/instances/:id", get(get_instance))
        .route("/demo/action", get(demo_action).post(demo_action))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redrive=debug,redrive_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env();
    tracing::info!(
        bind_addr = %settings.bind_addr,
        action_url = %settings.action_url,
        max_attempts = settings.max_attempts,
        "starting redrive server"
    );

    let store = Arc::new(InMemoryInputStore::new());
    let action = Arc::new(
        HttpAction::new(settings.action_url.clone(), store.clone())
            .context("failed to build action HTTP client")?,
    );
    let runtime = LocalRuntime::new(action, store.clone());

    let cleanup = CleanupJob::new(
        runtime.clone(),
        RetentionPolicy::default(),
        settings.cleanup_interval(),
    );
    tokio::spawn(cleanup.run());

    let app = router(AppState {
        runtime,
        store,
        settings: settings.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    tracing::info!(addr = %settings.bind_addr, "listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let store = Arc::new(InMemoryInputStore::new());
        let action = Arc::new(
            HttpAction::new("http://127.0.0.1:1/never", store.clone()).expect("client builds"),
        );
        AppState {
            runtime: LocalRuntime::new(action, store.clone()),
            store,
            settings: Settings::default(),
        }
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_instance_returns_accepted() {
        let state = test_state();
        let app = router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/instances")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let instance_id = parsed["instance_id"].as_str().unwrap();
        assert!(!instance_id.is_empty());
        assert_eq!(
            parsed["status_url"],
            format!("/instances/{instance_id}")
        );

        // Empty body got the demo payload stored under the new id
        assert!(state.store.contains(instance_id));
    }

    #[tokio::test]
    async fn test_unknown_instance_is_not_found() {
        let app = router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/instances/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_demo_action_responds() {
        let app = router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/demo/action?attempt=3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .expect("rate limit carries Retry-After");
                assert_eq!(retry_after, "8");
            }
            other => panic!("unexpected status {other}"),
        }
    }
}
