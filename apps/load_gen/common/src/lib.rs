pub mod config;
pub mod error;
pub mod logger;
pub mod probe;

pub use config::{Cli, ServiceConfig, Settings};
pub use error::LoadGenError;
pub use logger::{Fields, Log, LogFormat, LogLevel};
pub use probe::LoadGenerator;
