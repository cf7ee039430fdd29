//! Forensic analysis orchestration.
//!
//! - [`Pipeline`] runs an ordered list of [`Analyzer`]s over one image,
//!   isolates their failures, and streams progress events
//! - [`JudgeSystem`] is the bounded Pro-Fake / Pro-Real / judge debate
//! - [`FinalAggregator`] makes the closing reasoning call over all evidence
//! - [`ResponseParser`] recovers JSON from free-text model answers

pub mod aggregate;
pub mod analyzer;
pub mod analyzers;
pub mod debate;
pub mod error;
pub mod json_recovery;
pub mod pipeline;

pub use aggregate::{FinalAggregator, FinalAnswer};
pub use analyzer::Analyzer;
pub use analyzers::{default_analyzers, AnalyzerSettings, ReverseSearchConfig};
pub use debate::{DebateConfig, DebateOutcome, JudgeSystem};
pub use error::{OrchestratorError, Result};
pub use json_recovery::{Extraction, ResponseParser};
pub use pipeline::{Pipeline, RunHandle};
