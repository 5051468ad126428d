//! HTTP API: configuration reads, the push webhook, and health.

use crate::auth;
use crate::metrics_defs::{
    CONFIG_NOT_FOUND, CONFIG_REQUESTS, QUEUE_FULL, RATE_LIMITED, REQUEST_DURATION,
    WEBHOOK_ACCEPTED, WEBHOOK_REJECTED,
};
use crate::queue::UpdateQueue;
use crate::rate_limit::SlidingWindowLimiter;
use crate::signature;
use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use resolver::ConfigResolver;
use serde::{Deserialize, Serialize};
use shared::{counter, histogram};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct AppState {
    pub resolver: ConfigResolver,
    pub queue: UpdateQueue,
    pub limiter: SlidingWindowLimiter,
    pub auth_token: String,
    pub webhook_secret: String,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorBody {
            error: message.into(),
        }
    }
}

/// Assemble the service router. Everything except `/health` sits behind the
/// rate limiter; the configuration routes additionally require the bearer
/// token. The webhook authenticates through its payload signature instead.
pub fn router(state: Arc<AppState>) -> Router {
    let config_routes = Router::new()
        .route("/{app}/{env}", get(handle_config))
        .route("/{app}/{env}/{label}", get(handle_config_with_label))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    let limited = Router::new()
        .route("/webhook", post(handle_webhook))
        .merge(config_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            limit_requests,
        ));

    Router::new()
        .merge(limited)
        .route("/health", get(handle_health))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Bind and serve until a shutdown signal arrives, then drain in-flight
/// requests.
pub async fn serve(port: u16, state: Arc<AppState>) -> Result<(), ApiError> {
    let listener = TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(port, "http server listening");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received, draining"),
        Err(err) => {
            tracing::error!(error = %err, "could not install shutdown handler");
            std::future::pending::<()>().await;
        }
    }
}

async fn handle_health() -> Response {
    Json(serde_json::json!({"status": "ok"})).into_response()
}

async fn handle_config(
    State(state): State<Arc<AppState>>,
    Path((app, env)): Path<(String, String)>,
) -> Response {
    serve_config(state, &app, &env, "").await
}

async fn handle_config_with_label(
    State(state): State<Arc<AppState>>,
    Path((app, env, label)): Path<(String, String, String)>,
) -> Response {
    serve_config(state, &app, &env, &label).await
}

async fn serve_config(state: Arc<AppState>, app: &str, env: &str, label: &str) -> Response {
    counter!(CONFIG_REQUESTS).increment(1);
    let mut response = state.resolver.load_config(app, env, label).await;

    if response.property_sources.is_empty() {
        counter!(CONFIG_NOT_FOUND).increment(1);
        if response.error.is_none() {
            response.error = Some("no configuration found".to_string());
        }
        return (StatusCode::NOT_FOUND, Json(response)).into_response();
    }
    (StatusCode::OK, Json(response)).into_response()
}

#[derive(Deserialize)]
struct PushEvent {
    r#ref: String,
}

#[derive(Serialize)]
struct WebhookAck {
    status: &'static str,
    branch: String,
}

async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let signature_header = headers
        .get("x-hub-signature-256")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if !signature::verify(&state.webhook_secret, &body, signature_header) {
        counter!(WEBHOOK_REJECTED).increment(1);
        return (StatusCode::UNAUTHORIZED, Json(ErrorBody::new("unauthorized"))).into_response();
    }

    let Ok(event) = serde_json::from_slice::<PushEvent>(&body) else {
        return (StatusCode::BAD_REQUEST, Json(ErrorBody::new("invalid payload"))).into_response();
    };
    let branch = match event.r#ref.strip_prefix("refs/heads/") {
        Some(branch) if !branch.is_empty() => branch.to_string(),
        _ => {
            return (StatusCode::BAD_REQUEST, Json(ErrorBody::new("not a branch ref")))
                .into_response();
        }
    };

    if state.queue.enqueue(&branch) {
        counter!(WEBHOOK_ACCEPTED).increment(1);
        tracing::info!(branch = %branch, "webhook accepted");
        (
            StatusCode::ACCEPTED,
            Json(WebhookAck {
                status: "accepted",
                branch,
            }),
        )
            .into_response()
    } else {
        counter!(QUEUE_FULL).increment(1);
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(WebhookAck {
                status: "queue_full",
                branch,
            }),
        )
            .into_response()
    }
}

async fn limit_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);
    if !state.limiter.is_allowed(&key) {
        counter!(RATE_LIMITED).increment(1);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorBody::new("too many requests")),
        )
            .into_response();
    }
    next.run(request).await
}

// Falls back to a shared bucket when the listener did not attach peer
// info (e.g. in-process tests).
fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    histogram!(REQUEST_DURATION).record(elapsed.as_secs_f64());
    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = elapsed.as_millis() as u64,
        "request handled"
    );
    response
}
