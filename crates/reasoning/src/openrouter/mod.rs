//! OpenRouter chat completions client with image support

pub mod client;
pub mod types;

pub use client::{OpenRouterClient, OpenRouterConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use types::*;
