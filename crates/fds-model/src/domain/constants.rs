//! Common model-level constants.
//!
//! Well-known keys shared between the core engine and the cluster adapters.

/// Pod-template annotation used to force a rolling restart of a workload.
///
/// The remediation step writes the current timestamp under this key.
/// Any change to the pod template makes the workload controller roll every pod,
/// while replicas, images and the rest of the spec stay untouched.
pub const RESTARTED_AT_ANNOTATION: &str = "fargate-descheduler.10h.in/restartedAt";

/// Kind of workload object the controller reconciles.
pub const WORKLOAD_KIND: &str = "Deployment";
