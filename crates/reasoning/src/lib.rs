//! Reasoning service capability
//!
//! A reasoning service maps a prompt plus optional images to free text. The
//! pipeline treats every answer as untrusted text and never as structured data.
//!
//! - **[`ReasoningService`]**: the capability trait used by analyzers and the
//!   final aggregation call
//! - **[`OpenRouterClient`]**: OpenAI-compatible chat completions over HTTP
//! - **[`ImageAttachment`]**: base64 image payloads for multimodal prompts

pub mod error;
pub mod image;
pub mod openrouter;
pub mod service;

pub use error::{ReasoningError, ReasoningResult};
pub use crate::image::ImageAttachment;
pub use openrouter::{OpenRouterClient, OpenRouterConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use service::{query_text, ReasoningRequest, ReasoningService};
