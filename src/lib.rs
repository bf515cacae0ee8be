//! # Platform Web Proxy - Core Library Crate
//!
//! Server side of the Platform Web dashboard. The crate resolves which
//! authentication mode the deployment runs in (mock, OAuth or legacy cookie
//! sessions) and exposes thin proxy routes that forward browser requests,
//! cookies and authorization header included, to the backend API server.
//!
//! ## Layout
//! - `core`: configuration and the error type
//! - `auth`: auth-mode resolution and the OAuth login flow
//! - `proxy`: backend client, per-resource handlers, failure envelopes
//! - `gateway`: router, shared state and the listener
//! - `observability`: logging set-up, correlation ids and metrics

/// Configuration and error handling
pub mod core;

/// Auth-mode resolution and OAuth login routes
pub mod auth;

/// Request forwarding to the backend API
pub mod proxy;

/// Router and server lifecycle
pub mod gateway;

/// Logging, correlation ids and Prometheus metrics
pub mod observability;

pub use crate::auth::mode::AuthMode;
pub use crate::core::config::PlatformConfig;
pub use crate::core::error::{PlatformError, PlatformResult};
pub use crate::gateway::server::{build_router, AppState, PlatformServer};
