use std::sync::Arc;

use forensics_core::{validate_score, AggregatedContext};
use reasoning::{query_text, ReasoningRequest, ReasoningService};
use serde_json::Value;
use tracing::{debug, warn};

use crate::analyzer::try_load_image;
use crate::error::Result;
use crate::json_recovery::{Extraction, ResponseParser};

pub const SCORE_KEY: &str = "probability_score";

/// One terminal reasoning call over the whole aggregated context.
pub struct FinalAggregator {
    service: Arc<dyn ReasoningService>,
    attach_image: bool,
}

impl FinalAggregator {
    pub fn new(service: Arc<dyn ReasoningService>) -> Self {
        Self {
            service,
            attach_image: true,
        }
    }

    pub fn with_image(mut self, attach_image: bool) -> Self {
        self.attach_image = attach_image;
        self
    }

    pub fn prompt(context_json: &str) -> String {
        format!(
            r#"You are the final decision maker of an image forensics pipeline.
Several independent analysis steps examined the same image. Their results are listed below in the order they ran. Some steps may report errors; ignore those and weigh the remaining evidence.

## Collected Evidence
{context_json}

## Your Task
Decide how likely it is that the image is AI-generated or manipulated.

Return ONLY a JSON object with this structure:
{{
    "probability_score": <int 0-100> (Probability of being Fake),
    "explanation": "Concise explanation for the user, citing the evidence that drove the score"
}}"#
        )
    }

    /// Serialize the context into the prompt and return the raw answer text.
    pub async fn aggregate(&self, context: &AggregatedContext) -> Result<String> {
        let context_json = context.to_pretty_json()?;
        let image = if self.attach_image {
            try_load_image(&context.task_input).await
        } else {
            None
        };

        debug!(
            results = context.len(),
            with_image = image.is_some(),
            "Running final aggregation call"
        );

        Ok(query_text(
            self.service.as_ref(),
            ReasoningRequest::new(Self::prompt(&context_json)).with_image(image.as_ref()),
        )
        .await)
    }
}

/// Interpreted answer of the final aggregation call
#[derive(Debug, Clone, PartialEq)]
pub struct FinalAnswer {
    pub probability_score: Option<u8>,
    pub explanation: Option<String>,
    pub raw_output: bool,
}

impl FinalAnswer {
    pub fn from_response(response: &str) -> Self {
        match ResponseParser::extract_with_key(response, SCORE_KEY) {
            Extraction::Parsed(obj) | Extraction::Recovered(obj) => Self {
                probability_score: obj.get(SCORE_KEY).and_then(score_from_value),
                explanation: obj.get("explanation").and_then(explanation_from_value),
                raw_output: false,
            },
            Extraction::Raw => {
                warn!(
                    chars = response.len(),
                    "Final answer contained no JSON, passing raw text through"
                );
                Self {
                    probability_score: None,
                    explanation: Some(response.to_string()),
                    raw_output: true,
                }
            }
        }
    }
}

fn score_from_value(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }?;

    match validate_score(number) {
        Ok(score) => Some(score),
        Err(e) => {
            warn!(error = %e, "Ignoring out-of-range probability score");
            None
        }
    }
}

fn explanation_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
