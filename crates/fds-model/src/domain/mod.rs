mod labels;
pub use labels::Labels;

mod constants;
pub use constants::{RESTARTED_AT_ANNOTATION, WORKLOAD_KIND};
