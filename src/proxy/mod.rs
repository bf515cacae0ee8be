// Outbound backend client
pub mod client;

// Failure envelopes and empty-result shapes
pub mod envelope;

// Axum handlers, one per proxied resource
pub mod handlers;

// Per-resource mode gating and failure shape
pub mod resource;

pub use client::{BackendClient, BackendResponse, ForwardRequest};
pub use envelope::{EmptyPage, ErrorEnvelope, FailureShape};
pub use resource::{ModeAccess, ProxyResource};
