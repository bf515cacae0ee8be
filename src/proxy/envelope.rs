//! Failure shapes returned to the browser.
//!
//! Successful backend bodies are never touched. Failures become either the
//! plain `{error, message, status}` envelope or, for paginated list
//! resources, an empty page carrying the same three fields so list views can
//! render "no rows" without a special error branch.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::error::PlatformError;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Normalized failure body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
    pub status: u16,
}

/// Empty paginated list returned when a list resource fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmptyPage {
    pub items: Vec<serde_json::Value>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    #[serde(flatten)]
    pub failure: ErrorEnvelope,
}

/// How a resource reports failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureShape {
    Envelope,
    EmptyPage,
}

impl FailureShape {
    /// Render `err` in this shape, echoing paging parameters from the query
    pub fn render(self, err: &PlatformError, query: Option<&str>) -> Response {
        let status = err.status_code();
        match self {
            FailureShape::Envelope => (status, Json(err.envelope())).into_response(),
            FailureShape::EmptyPage => {
                let paging = PageParams::from_query(query);
                let body = EmptyPage {
                    items: Vec::new(),
                    total: 0,
                    page: paging.page,
                    page_size: paging.page_size,
                    failure: err.envelope(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Paging parameters echoed back in an empty page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u32,
    pub page_size: u32,
}

impl PageParams {
    /// Accepts `page` and any of `pageSize`, `page_size`, `limit`.
    /// Unparseable or zero values keep the defaults.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        };
        let Some(query) = query else {
            return params;
        };
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let parsed = value.parse::<u32>().ok().filter(|v| *v > 0);
            match (&*key, parsed) {
                ("page", Some(v)) => params.page = v,
                ("pageSize" | "page_size" | "limit", Some(v)) => params.page_size = v,
                _ => {}
            }
        }
        params
    }
}

/// Best-effort human message from a backend error body
///
/// Looks for `message`, `detail` or `error` string fields in a JSON body,
/// then falls back to the raw text, then to the status' canonical reason.
pub fn backend_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
        for field in ["message", "detail", "error"] {
            if let Some(text) = json.get(field).and_then(|v| v.as_str()) {
                if !text.trim().is_empty() {
                    return text.to_string();
                }
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() && !text.starts_with('{') && !text.starts_with('<') {
        return text.chars().take(512).collect();
    }

    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Backend returned status {}", status.as_u16()))
}
