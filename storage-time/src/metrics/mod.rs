//! Metrics and instrumentation.
//!
//! Typical usage:
//!
//! ```ignore
//! use storage_time::metrics::MetricsRegistry;
//!
//! let registry = MetricsRegistry::new()?;
//! let contract = VerificationContract::new(reputation, &cfg, SystemClock)
//!     .with_metrics(registry.protocol.clone());
//!
//! // Later, hand the text exposition to whatever serves /metrics:
//! let body = registry.gather_text();
//! ```

pub mod prometheus;

pub use self::prometheus::{MetricsRegistry, ProtocolMetrics};
