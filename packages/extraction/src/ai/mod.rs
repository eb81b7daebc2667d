//! Completion service implementations.

pub mod openai;

pub use openai::OpenAiCompletion;
