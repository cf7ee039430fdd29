use std::sync::Arc;

use async_trait::async_trait;
use forensics_core::{StepResult, TaskInput};
use reasoning::{ImageAttachment, ReasoningRequest, ReasoningService};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::analyzer::Analyzer;
use crate::error::{OrchestratorError, Result};
use crate::json_recovery::ResponseParser;

const SYSTEM_PROMPT: &str = r#"You are an expert Visual Forensics Analyst specializing in AI-generated image detection.
Analyze the image for signs of generation by modern diffusion models (Stable Diffusion XL, DALL-E 3, Midjourney, Flux).

Systematically evaluate the image against these five indicators:

1. Physics & Spatial Logic: clipping (objects passing through each other), gravity violations, object permanence failures, depth contradictions.
2. Lighting & Specular Consistency: matching eye reflections, shadow directions consistent with the light source, specular highlights on glasses, jewelry and wet surfaces, subsurface scattering on skin, conflicting light sources.
3. Textural Anomalies: plastic or waxy skin without pores, airbrushed areas, smoothness beyond what the apparent age allows, abrupt transitions between detailed and smooth regions.
4. Anatomical & Functional Details: impossible poses, asymmetric accessories, zippers, buttons or laces that could not work, finger, toe and teeth counts, merged features.
5. Semantic/Contextual Gaps: seasonal or weather contradictions, mixed architectural styles or wrong signage, background crowds that do not interact, degraded patterns and gibberish text, implausible scenarios.

Protocol:
- Examine every indicator, even when early signs point one way.
- Weight physics and lighting violations above minor texture issues.
- Absence of obvious errors does not prove the image is real; modern generators are good.
- Real photos have noise, compression artifacts and imperfect focus. These are signs of authenticity.
- Be specific: cite locations and concrete evidence.

Respond with a valid JSON object in exactly this structure:
{
  "fake_probability": <float 0.0-1.0>,
  "reasoning_summary": "<concise summary of your analysis>",
  "flagged_artifacts": [
    {
      "indicator_type": "<one of the 5 indicator names>",
      "location": "<specific location in image>",
      "description": "<detailed description>",
      "severity": <float 0.0-1.0>
    }
  ],
  "confidence": <float 0.0-1.0>
}

fake_probability: 0.0 = certainly real, 1.0 = certainly AI-generated.
confidence: how certain you are of the assessment.
severity: impact of an individual artifact (0.0 = minor, 1.0 = smoking gun)."#;

const USER_PROMPT: &str = r#"Analyze this image for signs of AI generation using the five indicator framework.

1. Evaluate ALL 5 indicator categories
2. Identify specific artifacts with precise locations
3. Assess the overall probability of AI generation
4. Provide detailed reasoning

Return your analysis as a JSON object following the schema from the system prompt."#;

const TEMPERATURE: f32 = 0.0;
const MAX_TOKENS: u32 = 4096;

/// Structured report returned by the vision model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisualForensicsReport {
    pub fake_probability: f64,
    pub reasoning_summary: String,
    #[serde(deserialize_with = "list_or_empty")]
    pub flagged_artifacts: Vec<Value>,
    pub confidence: f64,
    #[serde(default)]
    pub model_used: String,
}

impl VisualForensicsReport {
    /// Recover the report from a model answer.
    pub fn parse(response: &str) -> std::result::Result<Self, String> {
        let obj = ResponseParser::extract_object(response)
            .ok_or_else(|| "No valid JSON found in response".to_string())?;
        let report: Self = serde_json::from_value(Value::Object(obj))
            .map_err(|e| format!("Failed to parse response: {e}"))?;

        for (field, value) in [
            ("fake_probability", report.fake_probability),
            ("confidence", report.confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{field} out of range: {value}"));
            }
        }
        Ok(report)
    }
}

fn list_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

/// Vision model inspection against five generation-artifact indicators.
pub struct VisualForensicsAgent {
    service: Arc<dyn ReasoningService>,
}

impl VisualForensicsAgent {
    pub const NAME: &'static str = "VisualForensicsAgent";
    pub const DISPLAY_NAME: &'static str = "Visual Forensics";

    pub fn new(service: Arc<dyn ReasoningService>) -> Self {
        Self { service }
    }

    fn failed(reason: impl Into<String>) -> OrchestratorError {
        OrchestratorError::analyzer_failed(Self::NAME, reason)
    }
}

#[async_trait]
impl Analyzer for VisualForensicsAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn display_name(&self) -> &str {
        Self::DISPLAY_NAME
    }

    async fn analyze(&self, input: &TaskInput) -> Result<StepResult> {
        if input.is_remote() {
            return Err(Self::failed("Visual forensics needs a local image file"));
        }

        let image = ImageAttachment::load(&input.image_ref)
            .await
            .map_err(|e| Self::failed(format!("Image not found: {e}")))?;

        let request = ReasoningRequest::new(USER_PROMPT)
            .with_system(SYSTEM_PROMPT)
            .with_image(Some(&image))
            .with_temperature(TEMPERATURE)
            .with_max_tokens(MAX_TOKENS);

        let response = self
            .service
            .query(request)
            .await
            .map_err(|e| Self::failed(format!("Visual forensics analysis failed: {e}")))?;
        debug!(chars = response.len(), "Visual forensics response received");

        let mut report = VisualForensicsReport::parse(&response).map_err(Self::failed)?;
        report.model_used = self.service.model_name().to_string();

        info!(
            fake_probability = report.fake_probability,
            artifacts = report.flagged_artifacts.len(),
            "Visual forensics complete"
        );

        Ok(StepResult::new(Self::NAME, serde_json::to_value(&report)?))
    }
}
