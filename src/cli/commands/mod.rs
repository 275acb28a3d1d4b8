//! CLI command implementations.

pub mod ask;
pub mod fetch;
pub mod index;
pub mod init;
pub mod search;
pub mod stats;
