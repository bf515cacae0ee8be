//! Outbound client shared by every proxy handler.
//!
//! One `reqwest::Client` (and so one connection pool) lives for the whole
//! process. A forward is a single best-effort call: no retries, no caching.
//! Any HTTP status, success or not, comes back as `Ok`; only transport
//! failures (refused connection, DNS, timeout) become
//! [`PlatformError::Network`].

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use std::time::Instant;
use tracing::{debug, warn};

use crate::core::config::BackendSettings;
use crate::core::error::{PlatformError, PlatformResult};

/// Credentials and payload copied from the browser request
///
/// Header values are kept as opaque bytes; cookies are never parsed.
#[derive(Debug, Clone, Default)]
pub struct ForwardRequest {
    pub query: Option<String>,
    pub cookies: Vec<HeaderValue>,
    pub authorization: Option<HeaderValue>,
    pub content_type: Option<HeaderValue>,
    pub body: Option<Bytes>,
}

impl ForwardRequest {
    /// Copy query string, `Cookie` and `Authorization` from an inbound request
    pub fn from_inbound(uri: &Uri, headers: &HeaderMap) -> Self {
        Self {
            query: uri.query().map(str::to_string),
            cookies: headers.get_all(header::COOKIE).iter().cloned().collect(),
            authorization: headers.get(header::AUTHORIZATION).cloned(),
            content_type: None,
            body: None,
        }
    }

    /// Attach a request body together with the inbound content type
    pub fn with_body(mut self, headers: &HeaderMap, body: Bytes) -> Self {
        if !body.is_empty() {
            self.content_type = headers.get(header::CONTENT_TYPE).cloned();
            self.body = Some(body);
        }
        self
    }

    /// Attach a JSON body built by the proxy itself
    pub fn with_json(mut self, value: &serde_json::Value) -> PlatformResult<Self> {
        let body = serde_json::to_vec(value)
            .map_err(|e| PlatformError::internal(format!("Failed to encode body: {}", e)))?;
        self.content_type = Some(HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(body));
        Ok(self)
    }

    /// Replace the forwarded query string
    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query;
        self
    }
}

/// What the backend answered
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub set_cookies: Vec<HeaderValue>,
    pub body: Bytes,
}

impl BackendResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(settings: &BackendSettings) -> PlatformResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(settings.user_agent.clone());
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| PlatformError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full backend URL for `path`, with the inbound query appended verbatim
    pub fn url_for(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.base_url, path, q),
            _ => format!("{}{}", self.base_url, path),
        }
    }

    /// Send one request to the backend and collect the whole response
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        request: &ForwardRequest,
    ) -> PlatformResult<BackendResponse> {
        let url = self.url_for(path, request.query.as_deref());
        let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
            .map_err(|e| PlatformError::internal(format!("Unsupported method: {}", e)))?;

        let mut outbound = self.http.request(method.clone(), &url);
        for cookie in &request.cookies {
            outbound = outbound.header("cookie", cookie.as_bytes());
        }
        if let Some(auth) = &request.authorization {
            outbound = outbound.header("authorization", auth.as_bytes());
        }
        if let Some(content_type) = &request.content_type {
            outbound = outbound.header("content-type", content_type.as_bytes());
        }
        if let Some(body) = &request.body {
            outbound = outbound.body(body.clone());
        }

        let started = Instant::now();
        let response = outbound.send().await.map_err(|e| {
            warn!(method = %method, url = %url, error = %e, "Backend unreachable");
            PlatformError::from(e)
        })?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|e| PlatformError::internal(format!("Invalid backend status: {}", e)))?;
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok());
        let set_cookies = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| HeaderValue::from_bytes(v.as_bytes()).ok())
            .collect();
        // A rejection keeps its status even when its body cannot be read
        let body = if status.is_success() {
            response.bytes().await?
        } else {
            response.bytes().await.unwrap_or_else(|e| {
                warn!(method = %method, url = %url, error = %e, "Failed to read backend error body");
                Bytes::new()
            })
        };

        debug!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Backend responded"
        );

        Ok(BackendResponse {
            status,
            content_type,
            set_cookies,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::new(&BackendSettings {
            base_url: base.to_string(),
            ..BackendSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_for_joins_and_appends_query() {
        let c = client("http://backend:8000/api/");
        assert_eq!(c.base_url(), "http://backend:8000/api");
        assert_eq!(c.url_for("/transcripts", None), "http://backend:8000/api/transcripts");
        assert_eq!(
            c.url_for("/transcripts", Some("page=2&q=a%20b")),
            "http://backend:8000/api/transcripts?page=2&q=a%20b"
        );
        assert_eq!(c.url_for("/feedback", Some("")), "http://backend:8000/api/feedback");
    }

    #[test]
    fn test_forward_request_copies_credentials_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session=abc; theme=dark"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t0ken"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let uri: Uri = "/api/feedback?rating=5".parse().unwrap();

        let req = ForwardRequest::from_inbound(&uri, &headers);
        assert_eq!(req.query.as_deref(), Some("rating=5"));
        assert_eq!(req.cookies, vec![HeaderValue::from_static("session=abc; theme=dark")]);
        assert_eq!(req.authorization, Some(HeaderValue::from_static("Bearer t0ken")));
        assert!(req.content_type.is_none());

        let empty = req.clone().with_body(&headers, Bytes::new());
        assert!(empty.body.is_none());

        let with_body = req.with_body(&headers, Bytes::from_static(b"{}"));
        assert_eq!(with_body.content_type, Some(HeaderValue::from_static("application/json")));
    }
}
