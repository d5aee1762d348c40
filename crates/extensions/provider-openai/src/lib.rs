//! OpenAI-compatible text generator for pagecase.

mod api;
mod provider;

pub use provider::{OpenAIGenerator, DEFAULT_API_URL};
