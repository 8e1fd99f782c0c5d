//! Provider adapters implementing the [`crate::domain::ports::ModelProvider`] port.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
