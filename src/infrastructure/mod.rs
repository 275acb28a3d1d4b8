//! Infrastructure layer module
//!
//! This module contains the plumbing shared by adapters and the CLI:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)
//! - Outbound HTTP support: error classification, retry, rate limiting
//! - The on-disk corpus snapshot
//! - Project setup and service wiring

pub mod config;
pub mod corpus;
pub mod http;
pub mod logging;
pub mod setup;
