//! Event types for pipeline progress reporting

use chrono::{DateTime, Utc};
use forensics_core::{AggregatedContext, StepResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping every progress event with ordering metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// Run that produced the event
    pub run_id: Uuid,
    /// Position of the event within its run, starting at 0
    pub sequence: u64,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: ProgressEvent,
}

impl EventEnvelope {
    pub fn new(run_id: Uuid, sequence: u64, event: ProgressEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            sequence,
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Every state transition of a pipeline run.
///
/// Serializes as `{"type": "<tag>", "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Run accepted, no analyzer has started yet
    Start { message: String, total_steps: usize },

    /// An analyzer is about to run
    StepStart {
        step: String,
        display_name: String,
        step_number: usize,
        total_steps: usize,
    },

    /// An analyzer produced a result
    StepComplete {
        step: String,
        display_name: String,
        result: StepResult,
    },

    /// An analyzer failed; the run continues
    StepError {
        step: String,
        display_name: String,
        error: String,
    },

    /// All analyzers done, final aggregation call starting
    FinalAnalysisStart { message: String },

    /// Verdict of the final aggregation call
    FinalResult(FinalResultData),

    /// Run finished normally
    Complete { message: String },

    /// Run aborted by a failure outside any analyzer
    Error { error: String },
}

/// Payload of the `final_result` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct FinalResultData {
    /// Probability (0-100) that the image is fake; null when unparsable
    pub probability_score: Option<u8>,
    pub explanation: Option<String>,
    /// Set when the response could not be parsed and `explanation` holds the raw text
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub raw_output: bool,
    pub full_context: AggregatedContext,
}

impl ProgressEvent {
    pub fn start(total_steps: usize) -> Self {
        Self::Start {
            message: "Pipeline started".to_string(),
            total_steps,
        }
    }

    pub fn final_analysis_start() -> Self {
        Self::FinalAnalysisStart {
            message: "Performing final analysis...".to_string(),
        }
    }

    pub fn complete() -> Self {
        Self::Complete {
            message: "Pipeline completed successfully".to_string(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// Wire tag of the event
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::StepStart { .. } => "step_start",
            Self::StepComplete { .. } => "step_complete",
            Self::StepError { .. } => "step_error",
            Self::FinalAnalysisStart { .. } => "final_analysis_start",
            Self::FinalResult(_) => "final_result",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    /// Whether no further events follow this one in the same run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}
