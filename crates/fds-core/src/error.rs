use thiserror::Error;

/// Failure to read cluster state.
///
/// `Nodes` and `Workloads` are fatal for a pass; `Pods` only skips one workload.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to list nodes: {0}")]
    Nodes(String),

    #[error("failed to list workloads: {0}")]
    Workloads(String),

    #[error("failed to list pods in '{namespace}' for selector '{selector}': {reason}")]
    Pods {
        namespace: String,
        selector: String,
        reason: String,
    },
}

impl FetchError {
    /// Short stage label used in logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            FetchError::Nodes(_) => "nodes",
            FetchError::Workloads(_) => "workloads",
            FetchError::Pods { .. } => "pods",
        }
    }
}

/// Failure to submit the remediation write for a workload.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("update conflict: {0}")]
    Conflict(String),

    #[error("update forbidden: {0}")]
    Forbidden(String),

    #[error("workload not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("api error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("invalid workload object: {0}")]
    InvalidObject(String),

    #[error("failed to format restart timestamp: {0}")]
    Timestamp(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_labels() {
        assert_eq!(FetchError::Nodes("x".into()).stage(), "nodes");
        assert_eq!(FetchError::Workloads("x".into()).stage(), "workloads");
        let pods = FetchError::Pods {
            namespace: "default".into(),
            selector: "app=web".into(),
            reason: "timeout".into(),
        };
        assert_eq!(pods.stage(), "pods");
        assert!(pods.to_string().contains("app=web"));
    }
}
