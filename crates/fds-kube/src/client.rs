//! Kubernetes REST client implementing [`ClusterState`].
//!
//! Endpoints:
//! - `GET /api/v1/nodes`
//! - `GET /apis/apps/v1/deployments` or `/apis/apps/v1/namespaces/{ns}/deployments`
//! - `GET /api/v1/namespaces/{ns}/pods?labelSelector=..`
//! - `PUT /apis/apps/v1/namespaces/{ns}/deployments/{name}`
use std::{fmt, path::PathBuf, sync::RwLock, time::Duration};

use async_trait::async_trait;
use reqwest::{Certificate, Identity, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use fds_core::{ClusterState, FetchError, UpdateError};
use fds_model::{LabelSelector, Node, Pod, Workload};

use crate::{
    config::{Auth, KubeConfig, read_token},
    error::{ConfigError, ConfigResult},
    wire::{self, List, NodeObject, PodObject},
};

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure of a single API request, before it is mapped to a caller-facing error.
#[derive(Debug)]
enum RequestError {
    Transport(String),
    Status { status: StatusCode, body: String },
    Decode(String),
}

impl RequestError {
    fn is_unauthorized(&self) -> bool {
        matches!(self, RequestError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Transport(e) => write!(f, "transport error: {e}"),
            RequestError::Status { status, body } => write!(f, "{status}: {body}"),
            RequestError::Decode(e) => write!(f, "invalid response: {e}"),
        }
    }
}

/// Map a failed update onto [`UpdateError`].
fn update_error(err: RequestError) -> UpdateError {
    match err {
        RequestError::Transport(e) => UpdateError::Transport(e),
        RequestError::Decode(e) => UpdateError::Api {
            status: 0,
            body: e,
        },
        RequestError::Status { status, body } => match status.as_u16() {
            401 | 403 => UpdateError::Forbidden(body),
            404 => UpdateError::NotFound(body),
            409 => UpdateError::Conflict(body),
            status => UpdateError::Api { status, body },
        },
    }
}

/// API server client.
///
/// A token backed by a file (projected service account tokens rotate) is re-read
/// once when a request comes back `401 Unauthorized`, and the request is retried
/// if the token changed.
pub struct KubeClient {
    http: reqwest::Client,
    server: String,
    token: RwLock<Option<String>>,
    token_file: Option<PathBuf>,
}

impl fmt::Debug for KubeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let has_token = self.token.read().map(|t| t.is_some()).unwrap_or(false);
        f.debug_struct("KubeClient")
            .field("server", &self.server)
            .field("token", &has_token.then_some("<redacted>"))
            .field("token_file", &self.token_file)
            .finish()
    }
}

impl KubeClient {
    /// Build a client from resolved settings.
    pub fn new(cfg: KubeConfig) -> ConfigResult<Self> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(REQUEST_TIMEOUT);

        if let Some(ca) = &cfg.ca_pem {
            let cert = Certificate::from_pem(ca).map_err(|e| ConfigError::Client(e.to_string()))?;
            builder = builder.add_root_certificate(cert);
        }
        if cfg.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let (token, token_file) = match cfg.auth {
            Auth::None => (None, None),
            Auth::Bearer(token) => (Some(token), None),
            Auth::TokenFile { path, token } => (Some(token), Some(path)),
            Auth::ClientCert {
                mut cert_pem,
                key_pem,
            } => {
                cert_pem.push(b'\n');
                cert_pem.extend_from_slice(&key_pem);
                let identity =
                    Identity::from_pem(&cert_pem).map_err(|e| ConfigError::Client(e.to_string()))?;
                builder = builder.identity(identity);
                (None, None)
            }
        };

        let http = builder
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            http,
            server: cfg.server.trim_end_matches('/').to_string(),
            token: RwLock::new(token),
            token_file,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        let token = self.token.read().ok().and_then(|t| t.clone());
        match token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Re-read the token file; `true` if a different token was loaded.
    fn reload_token(&self) -> bool {
        let Some(path) = &self.token_file else {
            return false;
        };
        let fresh = match read_token(path) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "failed to re-read bearer token");
                return false;
            }
        };
        match self.token.write() {
            Ok(mut current) if current.as_deref() != Some(fresh.as_str()) => {
                *current = Some(fresh);
                true
            }
            _ => false,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, RequestError> {
        let retry = req.try_clone();
        let err = match self.send_once(req).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };
        match retry {
            Some(retry) if err.is_unauthorized() && self.reload_token() => {
                debug!("bearer token rotated, retrying request");
                self.send_once(retry).await
            }
            _ => Err(err),
        }
    }

    async fn send_once(&self, req: RequestBuilder) -> Result<Response, RequestError> {
        let response = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RequestError::Status { status, body });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RequestError> {
        let url = self.url(path);
        debug!(url = %url, "GET");

        let mut req = self.http.get(&url);
        if !query.is_empty() {
            req = req.query(query);
        }
        self.send(req)
            .await?
            .json()
            .await
            .map_err(|e| RequestError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ClusterState for KubeClient {
    async fn list_nodes(&self) -> Result<Vec<Node>, FetchError> {
        let list: List<NodeObject> = self
            .get_json("/api/v1/nodes", &[])
            .await
            .map_err(|e| FetchError::Nodes(e.to_string()))?;
        Ok(list.items.into_iter().map(Node::from).collect())
    }

    async fn list_workloads(&self, namespace: &str) -> Result<Vec<Workload>, FetchError> {
        let path = if namespace.is_empty() {
            "/apis/apps/v1/deployments".to_string()
        } else {
            format!("/apis/apps/v1/namespaces/{namespace}/deployments")
        };
        let list: List<Value> = self
            .get_json(&path, &[])
            .await
            .map_err(|e| FetchError::Workloads(e.to_string()))?;

        list.items
            .into_iter()
            .map(wire::workload_from_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| FetchError::Workloads(format!("invalid deployment: {e}")))
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Pod>, FetchError> {
        let query = selector.to_query();
        let path = format!("/api/v1/namespaces/{namespace}/pods");
        let mut params = Vec::with_capacity(1);
        if !query.is_empty() {
            params.push(("labelSelector", query.as_str()));
        }

        let list: List<PodObject> =
            self.get_json(&path, &params)
                .await
                .map_err(|e| FetchError::Pods {
                    namespace: namespace.to_string(),
                    selector: query.clone(),
                    reason: e.to_string(),
                })?;
        Ok(list
            .items
            .into_iter()
            .map(|p| p.into_pod(namespace))
            .collect())
    }

    async fn update_workload(&self, workload: &Workload) -> Result<(), UpdateError> {
        let body = wire::updated_object(workload)?;
        let url = self.url(&format!(
            "/apis/apps/v1/namespaces/{}/deployments/{}",
            workload.namespace, workload.name
        ));
        debug!(url = %url, "PUT");

        self.send(self.http.put(&url).json(&body))
            .await
            .map(|_| ())
            .map_err(|e| {
                debug!(workload = %workload.reference(), error = %e, "update rejected");
                update_error(e)
            })
    }
}
