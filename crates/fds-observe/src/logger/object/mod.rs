mod format;
pub use format::LoggerFormat;

mod level;
pub use level::LoggerLevel;

mod timezone;
pub use timezone::{LoggerTimeZone, LoggerTimer, init_local_offset};
