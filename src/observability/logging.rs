//! # Structured Logging
//!
//! Subscriber set-up plus per-request correlation ids.
//!
//! Every inbound request gets an `x-request-id` (kept if the browser or an
//! ingress already sent one), the id is recorded on the request span and
//! echoed back on the response. Credential headers are never logged; spans
//! only record whether a cookie or authorization header was present.

use axum::extract::Request;
use axum::http::{header, HeaderValue};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::core::config::{LogFormat, ObservabilitySettings};
use crate::core::error::{PlatformError, PlatformResult};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation ID for tracking a request through the proxy and backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `tower-http` request-id generator backed by [`CorrelationId`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeCorrelationId;

impl MakeRequestId for MakeCorrelationId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(CorrelationId::new().as_str())
            .ok()
            .map(RequestId::new)
    }
}

/// Span for one inbound request
pub fn request_span(request: &Request) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
        has_cookie = request.headers().contains_key(header::COOKIE),
        has_authorization = request.headers().contains_key(header::AUTHORIZATION),
    )
}

/// Install the global subscriber
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to this
/// crate and `tower_http`.
pub fn init_logging(settings: &ObservabilitySettings) -> PlatformResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "platform_web_proxy={level},tower_http={level}",
            level = settings.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = match settings.log_format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
    };

    result.map_err(|e| PlatformError::config(format!("Failed to initialize logging: {}", e)))
}
