//! Node-name → topology label lookup built once per pass from the node snapshot.
use std::collections::HashMap;

use fds_model::{Labels, Node};
use tracing::debug;

/// Topology domain of a pod for one topology key.
///
/// `Unresolved` covers a pod without node binding, a node missing from the snapshot,
/// and a node without (or with an empty) value for the key.
/// It is never in the same domain as anything, including another `Unresolved`.
#[derive(Clone, Copy, Debug)]
pub enum TopologyValue<'a> {
    Resolved(&'a str),
    Unresolved,
}

impl<'a> TopologyValue<'a> {
    /// Returns `true` if the value was resolved.
    pub fn is_resolved(&self) -> bool {
        matches!(self, TopologyValue::Resolved(_))
    }

    /// Returns `true` only when both values are resolved and equal.
    pub fn same_domain(&self, other: &TopologyValue<'_>) -> bool {
        match (self, other) {
            (TopologyValue::Resolved(a), TopologyValue::Resolved(b)) => a == b,
            _ => false,
        }
    }
}

/// Immutable index of node topology labels.
///
/// Shared read-only between workload evaluations of the same pass.
#[derive(Debug, Default)]
pub struct TopologyIndex {
    nodes: HashMap<String, Labels>,
}

impl TopologyIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Build an index from a node snapshot.
    ///
    /// Node names are unique in a consistent snapshot; on a duplicate the last entry wins.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut index = Self::new();
        for node in nodes {
            index.insert(node);
        }
        index
    }

    /// Add or replace a node.
    pub fn insert(&mut self, node: Node) {
        if self.nodes.insert(node.name.clone(), node.labels).is_some() {
            debug!(node = %node.name, "duplicate node name in snapshot, keeping the last one");
        }
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node is indexed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve the value of `key` on the node named `node_name`.
    pub fn resolve(&self, node_name: Option<&str>, key: &str) -> TopologyValue<'_> {
        node_name
            .and_then(|name| self.nodes.get(name))
            .and_then(|labels| labels.get(key))
            .filter(|value| !value.is_empty())
            .map_or(TopologyValue::Unresolved, TopologyValue::Resolved)
    }
}
