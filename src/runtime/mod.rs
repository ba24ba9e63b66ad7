mod config;
mod error;
mod log;

pub use self::config::*;
pub use self::error::{BucketFailure, Error, Result};
pub use self::log::{setup_global_logger, LogLevel};
