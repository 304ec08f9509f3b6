//! Kubeconfig file format (the subset needed to reach one cluster).
use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;

use crate::{
    config::{Auth, ConfigSource, KubeConfig, read_token},
    error::{ConfigError, ConfigResult},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Kubeconfig {
    #[serde(default)]
    current_context: Option<String>,
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default)]
    users: Vec<NamedUser>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterEntry {
    server: String,
    #[serde(default)]
    certificate_authority: Option<String>,
    #[serde(default)]
    certificate_authority_data: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    cluster: String,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    #[serde(default)]
    user: UserEntry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct UserEntry {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, rename = "tokenFile")]
    token_file: Option<String>,
    #[serde(default)]
    client_certificate: Option<String>,
    #[serde(default)]
    client_certificate_data: Option<String>,
    #[serde(default)]
    client_key: Option<String>,
    #[serde(default)]
    client_key_data: Option<String>,
    /// Credential plugin command; only detected.
    #[serde(default)]
    exec: Option<serde_yaml::Value>,
    /// Legacy auth provider (gcp, oidc, ...); only detected.
    #[serde(default)]
    auth_provider: Option<serde_yaml::Value>,
}

/// Read and parse a kubeconfig file.
///
/// Relative file references inside the kubeconfig are resolved against its directory.
pub(crate) fn load(path: &Path, source: ConfigSource) -> ConfigResult<KubeConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse(&raw, base, source)
}

/// Parse kubeconfig YAML and select the current context.
pub(crate) fn parse(raw: &str, base: &Path, source: ConfigSource) -> ConfigResult<KubeConfig> {
    let doc: Kubeconfig = serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let context_name = doc
        .current_context
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ConfigError::Parse("current-context is not set".into()))?;
    let context = doc
        .contexts
        .iter()
        .find(|c| c.name == context_name)
        .map(|c| &c.context)
        .ok_or_else(|| ConfigError::MissingEntry {
            kind: "context",
            name: context_name.to_string(),
        })?;
    let cluster = doc
        .clusters
        .iter()
        .find(|c| c.name == context.cluster)
        .map(|c| &c.cluster)
        .ok_or_else(|| ConfigError::MissingEntry {
            kind: "cluster",
            name: context.cluster.clone(),
        })?;

    let user = match &context.user {
        Some(name) => Some(doc.users.iter().find(|u| &u.name == name).ok_or_else(|| {
            ConfigError::MissingEntry {
                kind: "user",
                name: name.clone(),
            }
        })?),
        None => None,
    };

    let ca_pem = read_blob(
        cluster.certificate_authority_data.as_deref(),
        cluster.certificate_authority.as_deref(),
        "certificate-authority-data",
        base,
    )?;
    let auth = match user {
        Some(user) => user_auth(user, base)?,
        None => Auth::None,
    };

    Ok(KubeConfig {
        server: cluster.server.clone(),
        auth,
        ca_pem,
        insecure: cluster.insecure_skip_tls_verify,
        source,
    })
}

fn user_auth(named: &NamedUser, base: &Path) -> ConfigResult<Auth> {
    let user = &named.user;
    if let Some(token) = user.token.as_deref().filter(|t| !t.is_empty()) {
        return Ok(Auth::Bearer(token.to_string()));
    }
    if let Some(file) = &user.token_file {
        let path = resolve_path(base, file);
        let token = read_token(&path)?;
        return Ok(Auth::TokenFile { path, token });
    }

    let cert = read_blob(
        user.client_certificate_data.as_deref(),
        user.client_certificate.as_deref(),
        "client-certificate-data",
        base,
    )?;
    let key = read_blob(
        user.client_key_data.as_deref(),
        user.client_key.as_deref(),
        "client-key-data",
        base,
    )?;
    match (cert, key) {
        (Some(cert_pem), Some(key_pem)) => Ok(Auth::ClientCert { cert_pem, key_pem }),
        (None, None) => {
            let plugin = if user.exec.is_some() {
                Some("exec credential plugin")
            } else if user.auth_provider.is_some() {
                Some("auth provider")
            } else {
                None
            };
            match plugin {
                Some(mechanism) => Err(ConfigError::UnsupportedAuth {
                    user: named.name.clone(),
                    mechanism,
                }),
                None => Ok(Auth::None),
            }
        }
        _ => Err(ConfigError::Parse(
            "client certificate and client key must be set together".into(),
        )),
    }
}

/// Inline base64 data wins over a file reference.
fn read_blob(
    data: Option<&str>,
    file: Option<&str>,
    field: &'static str,
    base: &Path,
) -> ConfigResult<Option<Vec<u8>>> {
    if let Some(data) = data.filter(|d| !d.is_empty()) {
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| ConfigError::Decode {
                field,
                reason: e.to_string(),
            })?;
        return Ok(Some(bytes));
    }
    match file.filter(|f| !f.is_empty()) {
        Some(file) => {
            let path = resolve_path(base, file);
            std::fs::read(&path)
                .map(Some)
                .map_err(|e| ConfigError::io(path, e))
        }
        None => Ok(None),
    }
}

fn resolve_path(base: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
