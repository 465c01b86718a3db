/// Layer and kernel selection.
pub mod setup;
/// Target cluster description.
pub mod target;

mod base;
mod logger;

pub use base::*;
pub use logger::{LogCrateLevel, Logger, LoggerConfig, SetupLogLevel};
pub use setup::{MAX_DIMENSION, SetupConfig, output_dim};
pub use target::TargetConfig;
