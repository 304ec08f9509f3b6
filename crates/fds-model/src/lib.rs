mod domain;
pub use domain::{Labels, RESTARTED_AT_ANNOTATION, WORKLOAD_KIND};

mod error;
pub use error::{ModelError, ModelResult};

mod selector;
pub use selector::{LabelSelector, Operator, Requirement, Selector};

mod cluster;
pub use cluster::{AntiAffinityTerm, Node, Pod, Workload, WorkloadRef};
