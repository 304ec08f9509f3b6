mod config;
mod error;
mod install;
mod object;

pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use object::{LoggerFormat, LoggerLevel, LoggerTimeZone, LoggerTimer, init_local_offset};

/// Install the global `tracing` subscriber described by `cfg`.
///
/// Must be called once, early in `main`. A second call fails with
/// [`LoggerError::AlreadyInitialized`].
///
/// When `cfg.tz` is [`LoggerTimeZone::Local`], call [`init_local_offset`] first,
/// before the async runtime spawns worker threads.
///
/// # Examples
/// ```rust
/// use fds_observe::{LoggerConfig, init_logger};
///
/// let cfg = LoggerConfig::default();
/// init_logger(&cfg).expect("logger must initialize once");
/// tracing::info!("descheduler starting");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    match cfg.format {
        LoggerFormat::Text => install::text(cfg),
        LoggerFormat::Json => install::json(cfg),
        LoggerFormat::Journald => install::journald(cfg),
    }
}
