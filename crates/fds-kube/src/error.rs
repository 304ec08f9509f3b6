use std::path::PathBuf;

use thiserror::Error;

/// Failure to resolve cluster credentials or build the HTTP client.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no cluster credentials found (tried in-cluster, KUBECONFIG and ~/.kube/config)")]
    NotFound,

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid kubeconfig: {0}")]
    Parse(String),

    #[error("kubeconfig has no {kind} named '{name}'")]
    MissingEntry { kind: &'static str, name: String },

    #[error("kubeconfig user '{user}' authenticates through an unsupported {mechanism}")]
    UnsupportedAuth { user: String, mechanism: &'static str },

    #[error("invalid base64 in '{field}': {reason}")]
    Decode { field: &'static str, reason: String },

    #[error("failed to build http client: {0}")]
    Client(String),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
