//! # Proxy Handlers
//!
//! One axum handler per backend resource. Every handler follows the same
//! path: check the resource against the active auth mode, then either answer
//! locally (mock mode, mode mismatch) or forward to the backend and relay.
//!
//! Handlers never return `Err`; every failure is rendered into the
//! resource's failure shape before it leaves this module.

use axum::body::{Body, Bytes};
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::core::error::PlatformError;
use crate::gateway::server::AppState;
use crate::observability::{record_proxy_call, ProxyOutcome};
use crate::proxy::client::{BackendResponse, ForwardRequest};
use crate::proxy::envelope::backend_message;
use crate::proxy::resource::{ModeAccess, ProxyResource};

/// `GET /api/users/current`
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let request = ForwardRequest::from_inbound(&uri, &headers);
    let call = ProxyCall::new(ProxyResource::CurrentUser, Method::GET, &uri);
    proxy(&state, call, request).await
}

/// `GET /api/analytics/overview`
pub async fn analytics_overview(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let request = ForwardRequest::from_inbound(&uri, &headers);
    let call = ProxyCall::new(ProxyResource::AnalyticsOverview, Method::GET, &uri);
    proxy(&state, call, request).await
}

/// `GET /api/transcripts`
pub async fn transcripts(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let request = ForwardRequest::from_inbound(&uri, &headers);
    let call = ProxyCall::new(ProxyResource::Transcripts, Method::GET, &uri);
    proxy(&state, call, request).await
}

/// `GET /api/feedback`
pub async fn feedback(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let request = ForwardRequest::from_inbound(&uri, &headers);
    let call = ProxyCall::new(ProxyResource::Feedback, Method::GET, &uri);
    proxy(&state, call, request).await
}

/// `GET /api/qa/evaluations`
pub async fn qa_evaluations(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let request = ForwardRequest::from_inbound(&uri, &headers);
    let call = ProxyCall::new(ProxyResource::QaEvaluations, Method::GET, &uri);
    proxy(&state, call, request).await
}

/// `PUT /api/auth/legacy-session/tenant/:tenant_id`
pub async fn switch_tenant(
    State(state): State<Arc<AppState>>,
    tenant_id: Result<Path<String>, PathRejection>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let tenant_id = match tenant_id {
        Ok(Path(tenant_id)) => tenant_id,
        Err(rejection) => {
            let err = PlatformError::invalid_request(rejection.body_text());
            warn!(error = %err, "Rejected tenant switch path");
            record_proxy_call(
                ProxyResource::TenantSwitch,
                ProxyOutcome::InvalidRequest,
                Duration::ZERO,
            );
            return err.into_response();
        }
    };
    info!(tenant_id = %tenant_id, "Tenant switch requested");
    let request = ForwardRequest::from_inbound(&uri, &headers).with_body(&headers, body);
    let call =
        ProxyCall::new(ProxyResource::TenantSwitch, Method::PUT, &uri).with_tenant(&tenant_id);
    proxy(&state, call, request).await
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = ForwardRequest::from_inbound(&uri, &headers).with_body(&headers, body);
    let call = ProxyCall::new(ProxyResource::Logout, Method::POST, &uri);
    proxy(&state, call, request).await
}

/// `POST /api/auth/password/resetemail`
pub async fn password_reset(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = ForwardRequest::from_inbound(&uri, &headers).with_body(&headers, body);
    let call = ProxyCall::new(ProxyResource::PasswordReset, Method::POST, &uri);
    proxy(&state, call, request).await
}

/// Backend path for an inbound route: the same path without the `/api` prefix
fn backend_path(uri: &Uri) -> &str {
    let path = uri.path();
    path.strip_prefix("/api").unwrap_or(path)
}

/// Inbound route a handler is serving
struct ProxyCall<'a> {
    resource: ProxyResource,
    method: Method,
    uri: &'a Uri,
    /// Decoded `:tenant_id` segment, tenant switch only
    tenant_id: Option<&'a str>,
}

impl<'a> ProxyCall<'a> {
    fn new(resource: ProxyResource, method: Method, uri: &'a Uri) -> Self {
        Self {
            resource,
            method,
            uri,
            tenant_id: None,
        }
    }

    fn with_tenant(mut self, tenant_id: &'a str) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }
}

async fn proxy(state: &AppState, call: ProxyCall<'_>, request: ForwardRequest) -> Response {
    let started = Instant::now();
    let mode = state.auth_mode();
    let resource = call.resource;

    let (outcome, response) = match resource.access(mode) {
        ModeAccess::Reject => {
            info!(resource = resource.as_str(), mode = %mode, "Operation not available in auth mode");
            let err = PlatformError::mode_mismatch(resource.operation(), mode);
            let response = resource
                .failure_shape()
                .render(&err, request.query.as_deref());
            (ProxyOutcome::ModeMismatch, response)
        }
        ModeAccess::Simulate => (ProxyOutcome::Simulated, simulate(state, &call)),
        ModeAccess::Forward => {
            forward(state, resource, call.method, backend_path(call.uri), &request).await
        }
    };

    record_proxy_call(resource, outcome, started.elapsed());
    response
}

async fn forward(
    state: &AppState,
    resource: ProxyResource,
    method: Method,
    path: &str,
    request: &ForwardRequest,
) -> (ProxyOutcome, Response) {
    let shape = resource.failure_shape();
    let query = request.query.as_deref();

    match state.backend.forward(method, path, request).await {
        Ok(backend) if backend.is_success() => (ProxyOutcome::Success, relay(resource, backend)),
        Ok(backend) => {
            let message = backend_message(backend.status, &backend.body);
            warn!(
                resource = resource.as_str(),
                status = backend.status.as_u16(),
                message = %message,
                "Backend rejected request"
            );
            let err = PlatformError::backend(backend.status.as_u16(), message);
            let mut response = shape.render(&err, query);
            if resource.relays_set_cookie() {
                append_set_cookies(&mut response, &backend.set_cookies);
            }
            (ProxyOutcome::BackendRejected, response)
        }
        Err(err) => {
            error!(resource = resource.as_str(), error = %err, "Proxy call failed");
            (ProxyOutcome::from_error(&err), shape.render(&err, query))
        }
    }
}

/// Pass a successful backend response through unchanged
fn relay(resource: ProxyResource, backend: BackendResponse) -> Response {
    let mut response = Response::new(Body::from(backend.body));
    *response.status_mut() = backend.status;
    let content_type = backend
        .content_type
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));
    response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    if resource.relays_set_cookie() {
        append_set_cookies(&mut response, &backend.set_cookies);
    }
    response
}

pub(crate) fn append_set_cookies(response: &mut Response, cookies: &[HeaderValue]) {
    for cookie in cookies {
        response
            .headers_mut()
            .append(header::SET_COOKIE, cookie.clone());
    }
}

/// Canned answers for mock mode
fn simulate(state: &AppState, call: &ProxyCall<'_>) -> Response {
    let resource = call.resource;
    match resource {
        ProxyResource::CurrentUser => Json(state.config.auth.mock_user.clone()).into_response(),
        ProxyResource::Logout => Json(json!({ "success": true })).into_response(),
        ProxyResource::TenantSwitch => {
            Json(json!({ "success": true, "tenantId": call.tenant_id })).into_response()
        }
        ProxyResource::PasswordReset => Json(json!({
            "success": true,
            "message": "Password reset email sent",
        }))
        .into_response(),
        ProxyResource::AnalyticsOverview
        | ProxyResource::Transcripts
        | ProxyResource::Feedback
        | ProxyResource::QaEvaluations
        | ProxyResource::OAuthCallback => {
            PlatformError::internal(format!("{} has no mock response", resource.as_str()))
                .into_response()
        }
    }
}
