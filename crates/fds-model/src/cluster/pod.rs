use serde::{Deserialize, Serialize};

use crate::{LabelSelector, Labels, ModelResult, Selector};

/// Required-during-scheduling pod anti-affinity term.
///
/// Pods matched by `label_selector` must not share the same value of the
/// node label `topology_key` with the pod carrying this term.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AntiAffinityTerm {
    /// Selector over peer pod labels. An absent selector matches no pod.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,
    /// Node label whose value identifies the topology domain.
    pub topology_key: String,
}

impl AntiAffinityTerm {
    /// Create a term with a selector.
    pub fn new(label_selector: LabelSelector, topology_key: impl Into<String>) -> Self {
        Self {
            label_selector: Some(label_selector),
            topology_key: topology_key.into(),
        }
    }

    /// Compile the term selector.
    ///
    /// An absent selector compiles to [`Selector::nothing`].
    pub fn compile_selector(&self) -> ModelResult<Selector> {
        match &self.label_selector {
            Some(sel) => sel.compile(),
            None => Ok(Selector::nothing()),
        }
    }
}

/// Scheduled (or pending) pod as seen by the controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    /// Pod name.
    pub name: String,
    /// Pod namespace.
    pub namespace: String,
    /// Node the pod is bound to; `None` while pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// Pod labels.
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    /// Required anti-affinity terms, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anti_affinity: Vec<AntiAffinityTerm>,
}

impl Pod {
    /// Create a pod without node binding, labels or terms.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            node_name: None,
            labels: Labels::new(),
            anti_affinity: Vec::new(),
        }
    }

    /// Bind the pod to a node.
    pub fn on_node(mut self, node: impl Into<String>) -> Self {
        self.node_name = Some(node.into());
        self
    }

    /// Attach a label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key, value);
        self
    }

    /// Append an anti-affinity term.
    pub fn with_anti_affinity(mut self, term: AntiAffinityTerm) -> Self {
        self.anti_affinity.push(term);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_selector_compiles_to_nothing() {
        let term = AntiAffinityTerm {
            label_selector: None,
            topology_key: "zone".into(),
        };
        let sel = term.compile_selector().unwrap();
        assert!(!sel.matches(&Labels::new()));
    }

    #[test]
    fn builders_set_fields() {
        let pod = Pod::new("default", "web-0")
            .on_node("node-1")
            .with_label("app", "web")
            .with_anti_affinity(AntiAffinityTerm::new(
                LabelSelector::from_labels([("app", "web")].into_iter().collect()),
                "zone",
            ));

        assert_eq!(pod.node_name.as_deref(), Some("node-1"));
        assert_eq!(pod.labels.get("app"), Some("web"));
        assert_eq!(pod.anti_affinity.len(), 1);
        assert_eq!(pod.anti_affinity[0].topology_key, "zone");
    }
}
