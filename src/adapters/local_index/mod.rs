//! In-process flat vector index persisted to a directory.
//!
//! The directory holds two files that must load together:
//! `{collection}.index` (little-endian f32 vectors) and
//! `{collection}.meta.json` (chunk metadata in index order).

mod format;
mod store;

pub use store::LocalIndex;
