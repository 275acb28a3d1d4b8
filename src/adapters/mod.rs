//! Adapters implementing the domain ports against external systems.

pub mod embeddings;
pub mod generation;
pub mod local_index;
pub mod postgres;
pub mod sefaria;
