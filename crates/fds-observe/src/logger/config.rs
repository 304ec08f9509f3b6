use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::logger::{
    error::LoggerResult,
    object::{LoggerFormat, LoggerLevel, LoggerTimeZone},
};

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Output format.
    pub format: LoggerFormat,
    /// Filter expression (e.g. `"info"`, `"fds_core=debug,info"`).
    pub level: LoggerLevel,
    /// Timezone of record timestamps.
    pub tz: LoggerTimeZone,
    /// Include the emitting module in each record.
    pub with_targets: bool,
    /// Colored text output; ignored unless stdout is a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Build a config from command line strings, keeping defaults for the rest.
    pub fn from_args(format: &str, level: &str) -> LoggerResult<Self> {
        Ok(Self {
            format: format.parse()?,
            level: level.parse()?,
            ..Default::default()
        })
    }

    /// Returns `true` if colored output should be used right now.
    ///
    /// Checked at initialization time, not at parse time, so redirections are seen.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}
