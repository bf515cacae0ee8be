//! # Proxy Metrics
//!
//! Counters and latency histograms per proxied resource, exported in
//! Prometheus text format on `/metrics`. Recording is a no-op until a
//! recorder is installed, so handlers call these helpers unconditionally.

use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::error::{PlatformError, PlatformResult};
use crate::proxy::resource::ProxyResource;

pub const PROXY_REQUESTS_TOTAL: &str = "platform_proxy_requests_total";
pub const PROXY_REQUEST_DURATION: &str = "platform_proxy_request_duration_seconds";

/// Final result of one proxy call, as a metric label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyOutcome {
    Success,
    BackendRejected,
    NetworkError,
    ModeMismatch,
    Simulated,
    InvalidRequest,
    Internal,
}

impl ProxyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::BackendRejected => "backend_rejected",
            Self::NetworkError => "network_error",
            Self::ModeMismatch => "mode_mismatch",
            Self::Simulated => "simulated",
            Self::InvalidRequest => "invalid_request",
            Self::Internal => "internal",
        }
    }

    pub fn from_error(err: &PlatformError) -> Self {
        match err {
            PlatformError::BackendRejected { .. } => Self::BackendRejected,
            PlatformError::Network { .. } => Self::NetworkError,
            PlatformError::ModeMismatch { .. } => Self::ModeMismatch,
            PlatformError::InvalidRequest { .. } => Self::InvalidRequest,
            PlatformError::Configuration { .. } | PlatformError::Internal { .. } => Self::Internal,
        }
    }
}

/// Install the global Prometheus recorder
pub fn install_prometheus() -> PlatformResult<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| PlatformError::config(format!("Failed to install metrics recorder: {}", e)))
}

pub fn record_proxy_call(resource: ProxyResource, outcome: ProxyOutcome, elapsed: Duration) {
    counter!(
        PROXY_REQUESTS_TOTAL,
        "resource" => resource.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!(PROXY_REQUEST_DURATION, "resource" => resource.as_str())
        .record(elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_proxy_call(
            ProxyResource::Transcripts,
            ProxyOutcome::NetworkError,
            Duration::from_millis(12),
        );
        assert_eq!(
            ProxyOutcome::from_error(&PlatformError::network("refused")),
            ProxyOutcome::NetworkError
        );
        assert_eq!(ProxyOutcome::BackendRejected.as_str(), "backend_rejected");
    }
}
