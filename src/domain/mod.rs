//! Domain layer: corpus models, port traits, and the error taxonomy.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
