//! Kubernetes API adapter for the anti-affinity reconciler.
//!
//! [`KubeConfig::resolve`] locates credentials, [`KubeClient`] implements
//! [`fds_core::ClusterState`] over the REST API.
pub mod client;
pub mod config;
pub mod error;
mod wire;

pub use client::{KubeClient, REQUEST_TIMEOUT};
pub use config::{Auth, ConfigSource, KubeConfig, SERVICE_ACCOUNT_DIR};
pub use error::{ConfigError, ConfigResult};
