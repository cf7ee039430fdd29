//! Progress events for forensic pipeline runs
//!
//! This crate provides the progress event types and the channel that carries
//! them from a running pipeline to a live observer.

mod channel;
mod types;

pub use channel::{ProgressChannel, ProgressItem, ProgressPublisher};
pub use types::*;
