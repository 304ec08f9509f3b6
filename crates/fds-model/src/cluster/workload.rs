use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{LabelSelector, Labels};

/// Replicated workload owning pods through its label selector.
///
/// Pod ownership is never cached: the pod set is re-resolved from `selector`
/// on every pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    /// Workload namespace.
    pub namespace: String,
    /// Workload name.
    pub name: String,
    /// Selector over owned pods.
    #[serde(default)]
    pub selector: LabelSelector,
    /// Annotations on the pod template.
    ///
    /// Writing a new value here and submitting the workload triggers a rollout.
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub template_annotations: Labels,
    /// Full object as last read from the cluster.
    ///
    /// Adapters re-submit it on update so that nothing but the template annotations changes.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub object: serde_json::Value,
}

impl Workload {
    /// Create a workload with the given selector and no template annotations.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        selector: LabelSelector,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            selector,
            template_annotations: Labels::new(),
            object: serde_json::Value::Null,
        }
    }

    /// Lightweight `namespace/name` reference for logs and reports.
    pub fn reference(&self) -> WorkloadRef {
        WorkloadRef {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

/// `namespace/name` identity of a workload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkloadRef {
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
