//! External service integrations.
//!
//! Provides the Google Gemini client used for generation, embeddings and
//! image description. The graph store lives in `crate::graph`.

pub mod gemini;

pub use gemini::GeminiClient;
