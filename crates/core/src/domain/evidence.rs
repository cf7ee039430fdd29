use serde::{Deserialize, Serialize};

use super::task::TaskInput;

/// Output of one successful analyzer invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct StepResult {
    /// Identity of the analyzer that produced this result
    pub source: String,
    /// Plain string or arbitrary JSON tree
    #[cfg_attr(feature = "typescript", ts(type = "unknown"))]
    pub content: serde_json::Value,
}

impl StepResult {
    pub fn new(source: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            source: source.into(),
            content,
        }
    }

    pub fn text(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(source, serde_json::Value::String(content.into()))
    }
}

/// Evidence accumulated over one pipeline run.
///
/// Append-only. Result order mirrors step order and is preserved when the
/// context is serialized for the final aggregation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AggregatedContext {
    pub task_input: TaskInput,
    #[serde(default)]
    results: Vec<StepResult>,
}

impl AggregatedContext {
    pub fn new(task_input: TaskInput) -> Self {
        Self {
            task_input,
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, result: StepResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn result_from(&self, source: &str) -> Option<&StepResult> {
        self.results.iter().find(|r| r.source == source)
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
