//! Sefaria text API adapter.

mod client;
pub mod text;

pub use client::SefariaClient;
