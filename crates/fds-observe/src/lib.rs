//! Logging setup for the descheduler agent.
//!
//! [`init_logger`] installs a global `tracing` subscriber (text, JSON or journald).
//! With the `subscriber` feature, [`PassEventLogger`] turns taskvisor supervision
//! events for the periodic reconciliation task into log records.
mod logger;
pub use logger::*;

mod subscriber;

#[cfg(feature = "subscriber")]
pub use subscriber::*;
