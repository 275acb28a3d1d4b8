//! Answer generator adapters.

pub mod gemini;

pub use gemini::GeminiGenerator;
