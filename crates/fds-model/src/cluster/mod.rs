//! Read-only mirror of the cluster objects the controller reasons about.
//!
//! These are rebuilt from live state on every reconciliation pass and never persisted.
mod node;
pub use node::Node;

mod pod;
pub use pod::{AntiAffinityTerm, Pod};

mod workload;
pub use workload::{Workload, WorkloadRef};
