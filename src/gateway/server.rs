//! # HTTP Server Module
//!
//! Builds the axum router, owns the state shared by every handler and runs
//! the listener with graceful shutdown.
//!
//! Shared state is read-only once the server starts: the configuration,
//! the backend client (one connection pool), the optional OAuth client and
//! the optional Prometheus handle. Requests never coordinate with each other.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::mode::AuthMode;
use crate::auth::oauth::{self, OAuthFlow};
use crate::core::config::PlatformConfig;
use crate::core::error::{PlatformError, PlatformResult};
use crate::observability::logging::{request_span, MakeCorrelationId, REQUEST_ID_HEADER};
use crate::proxy::client::BackendClient;
use crate::proxy::handlers;

/// State shared by all handlers
pub struct AppState {
    pub config: Arc<PlatformConfig>,
    pub backend: BackendClient,
    pub oauth: Option<OAuthFlow>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Build state from a loaded configuration
    pub fn new(config: PlatformConfig) -> PlatformResult<Self> {
        let backend = BackendClient::new(&config.backend)?;
        let oauth = config.auth.oauth.as_ref().map(OAuthFlow::new).transpose()?;

        if config.auth_mode() == AuthMode::OAuth && oauth.is_none() {
            warn!("Auth mode is oauth but no OAuth client is configured; login routes will fail");
        }

        Ok(Self {
            config: Arc::new(config),
            backend,
            oauth,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.config.auth_mode()
    }
}

/// Build the full application router
pub fn build_router(state: Arc<AppState>) -> Router {
    let request_id_header = header::HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/users/current", get(handlers::current_user))
        .route("/api/analytics/overview", get(handlers::analytics_overview))
        .route("/api/transcripts", get(handlers::transcripts))
        .route("/api/feedback", get(handlers::feedback))
        .route("/api/qa/evaluations", get(handlers::qa_evaluations))
        .route(
            "/api/auth/legacy-session/tenant/:tenant_id",
            put(handlers::switch_tenant),
        )
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/password/resetemail", post(handlers::password_reset))
        .route("/api/auth/login", get(oauth::login))
        .route("/api/auth/callback", get(oauth::callback))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id_header.clone(), MakeCorrelationId))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(PropagateRequestIdLayer::new(request_id_header)),
        )
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "auth_mode": state.auth_mode(),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "not_found",
                "message": "Metrics are disabled",
                "status": 404,
            })),
        )
            .into_response(),
    }
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not_found",
            "message": "No such route",
            "status": 404,
        })),
    )
        .into_response()
}

/// Listener plus router
pub struct PlatformServer {
    state: Arc<AppState>,
}

impl PlatformServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    pub async fn serve<F>(self, shutdown: F) -> PlatformResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.state.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| PlatformError::config(format!("Failed to bind {}: {}", addr, e)))?;

        info!(
            addr = %addr,
            auth_mode = %self.state.auth_mode(),
            backend = %self.state.backend.base_url(),
            "Platform web proxy listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}
