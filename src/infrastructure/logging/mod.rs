//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty formatting on stderr
//! - Rolling JSON log files
//! - Secret scrubbing for API error bodies

pub mod config;
pub mod logger;
pub mod secret_scrubbing;

pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
pub use secret_scrubbing::SecretScrubber;
