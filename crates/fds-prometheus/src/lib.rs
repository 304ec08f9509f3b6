//! Prometheus metrics backend for the anti-affinity reconciler.
//!
//! [`PrometheusMetrics`] implements [`fds_core::MetricsBackend`]; inject it with
//! [`fds_core::Reconciler::with_metrics`] and serve [`PrometheusMetrics::encode`]
//! from whatever HTTP server the binary runs.
//!
//! ## Metrics
//! - `fds_passes_total{status}` - Counter
//! - `fds_pass_duration_seconds{status}` - Histogram
//! - `fds_workloads_total{outcome}` - Counter
//! - `fds_fetch_errors_total{stage}` - Counter
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use fds_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = Arc::new(PrometheusMetrics::new()?);
//! let handle: fds_core::MetricsHandle = metrics.clone();
//! # let _ = handle;
//!
//! let body = metrics.encode()?;
//! assert!(body.is_empty() || body.contains("fds_"));
//! # Ok(())
//! # }
//! ```
mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
