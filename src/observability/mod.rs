// Structured logging and request correlation
pub mod logging;

// Prometheus metrics for proxied calls
pub mod metrics;

pub use self::logging::{init_logging, CorrelationId, MakeCorrelationId};
pub use self::metrics::{install_prometheus, record_proxy_call, ProxyOutcome};
