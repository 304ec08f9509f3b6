//! Cluster connection settings and their resolution.
//!
//! [`KubeConfig::resolve`] tries, in order:
//! 1. an explicit kubeconfig path (a failure is logged and falls through);
//! 2. in-cluster service account credentials;
//! 3. the `KUBECONFIG` environment variable;
//! 4. `$HOME/.kube/config`.
mod kubeconfig;

use std::{
    fmt,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};

/// Directory where the service account token and CA are mounted inside a pod.
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// How requests authenticate against the API server.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// Anonymous.
    None,
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// Bearer token read from `path`; the file is re-read when the server rejects it.
    TokenFile { path: PathBuf, token: String },
    /// Mutual TLS with a PEM certificate and key.
    ClientCert { cert_pem: Vec<u8>, key_pem: Vec<u8> },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Auth::TokenFile { path, .. } => write!(f, "TokenFile({}, <redacted>)", path.display()),
            Auth::ClientCert { .. } => f.write_str("ClientCert(<redacted>)"),
        }
    }
}

/// Where the settings came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--kubeconfig` path.
    Explicit(PathBuf),
    /// Service account mounted into the pod.
    InCluster,
    /// `KUBECONFIG` environment variable.
    Env(PathBuf),
    /// `$HOME/.kube/config`.
    Home(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(p) => write!(f, "kubeconfig {}", p.display()),
            ConfigSource::InCluster => f.write_str("in-cluster service account"),
            ConfigSource::Env(p) => write!(f, "KUBECONFIG {}", p.display()),
            ConfigSource::Home(p) => write!(f, "default kubeconfig {}", p.display()),
        }
    }
}

/// Everything needed to talk to one API server.
#[derive(Debug, Clone)]
pub struct KubeConfig {
    /// Base URL, e.g. `https://10.0.0.1:443`.
    pub server: String,
    pub auth: Auth,
    /// Extra trusted root certificate (PEM).
    pub ca_pem: Option<Vec<u8>>,
    /// Skip TLS verification.
    pub insecure: bool,
    pub source: ConfigSource,
}

impl KubeConfig {
    /// Resolve settings from the first available source.
    pub fn resolve(explicit: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = explicit {
            match kubeconfig::load(path, ConfigSource::Explicit(path.to_path_buf())) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to load explicit kubeconfig, falling back"
                ),
            }
        }

        match Self::in_cluster() {
            Ok(Some(cfg)) => return Ok(cfg),
            Ok(None) => debug!("not running in a cluster"),
            Err(e) => warn!(error = %e, "in-cluster configuration unusable, falling back"),
        }

        if let Some(path) = env_kubeconfig() {
            return kubeconfig::load(&path, ConfigSource::Env(path.clone()));
        }
        match dirs::home_dir() {
            Some(home) => {
                let path = home.join(".kube").join("config");
                kubeconfig::load(&path, ConfigSource::Home(path.clone()))
            }
            None => Err(ConfigError::NotFound),
        }
    }

    /// Service account settings, or `None` outside a pod.
    pub fn in_cluster() -> ConfigResult<Option<Self>> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").ok();
        let port = std::env::var("KUBERNETES_SERVICE_PORT").ok();
        match (host, port) {
            (Some(host), Some(port)) if !host.is_empty() && !port.is_empty() => {
                Self::in_cluster_from(&host, &port, Path::new(SERVICE_ACCOUNT_DIR)).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn in_cluster_from(host: &str, port: &str, dir: &Path) -> ConfigResult<Self> {
        let token_path = dir.join("token");
        let token = read_token(&token_path)?;

        let ca_path = dir.join("ca.crt");
        let ca_pem = std::fs::read(&ca_path).map_err(|e| ConfigError::io(ca_path, e))?;

        let host = if host.contains(':') {
            format!("[{host}]")
        } else {
            host.to_string()
        };
        Ok(Self {
            server: format!("https://{host}:{port}"),
            auth: Auth::TokenFile {
                path: token_path,
                token,
            },
            ca_pem: Some(ca_pem),
            insecure: false,
            source: ConfigSource::InCluster,
        })
    }
}

/// Read a bearer token file, trimming the trailing newline.
pub(crate) fn read_token(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path)
        .map(|raw| raw.trim().to_string())
        .map_err(|e| ConfigError::io(path, e))
}

/// First entry of `KUBECONFIG`, if set.
fn env_kubeconfig() -> Option<PathBuf> {
    let raw = std::env::var_os("KUBECONFIG")?;
    std::env::split_paths(&raw).find(|p| !p.as_os_str().is_empty())
}
