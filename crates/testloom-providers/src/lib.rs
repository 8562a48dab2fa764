//! Testloom Providers - HTTP text generation backends
//!
//! Every client implements [`testloom_core::TextGenerator`]: one prompt in,
//! the response's text fragments out. Failures are mapped onto
//! [`GenerationError`] and left to the caller; nothing here retries.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, clippy::all)]

pub mod gemini;
pub mod openai_compatible;
pub mod router;

pub use gemini::GeminiClient;
pub use openai_compatible::OpenAICompatibleClient;
pub use router::build_generator;

use testloom_core::GenerationError;

pub(crate) const DEFAULT_TEMPERATURE: f64 = 0.3;
pub(crate) const DEFAULT_MAX_TOKENS: u32 = 2048;

// Error text ends up in logs and output files, so the URL is stripped.
pub(crate) fn request_error(error: reqwest::Error) -> GenerationError {
    GenerationError::Request(error.without_url().to_string())
}

pub(crate) fn decode_error(error: reqwest::Error) -> GenerationError {
    GenerationError::Decode(error.without_url().to_string())
}
