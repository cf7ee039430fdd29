use async_trait::async_trait;
use tracing::warn;

use crate::error::ReasoningResult;
use crate::image::ImageAttachment;

/// One prompt for the reasoning service
#[derive(Debug, Clone, Default)]
pub struct ReasoningRequest {
    /// Optional system instructions sent ahead of the prompt
    pub system: Option<String>,
    pub prompt: String,
    pub images: Vec<ImageAttachment>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ReasoningRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Attach an image if one is available
    pub fn with_image(mut self, image: Option<&ImageAttachment>) -> Self {
        if let Some(image) = image {
            self.images.push(image.clone());
        }
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Black-box text inference: prompt plus optional images in, free text out.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn query(&self, request: ReasoningRequest) -> ReasoningResult<String>;

    /// Model identifier reported alongside results
    fn model_name(&self) -> &str {
        "unknown"
    }
}

/// Query the service, turning any failure into error text.
///
/// Callers parse the answer defensively anyway, so a failed call is just
/// another unparsable response rather than a fatal error.
pub async fn query_text(service: &dyn ReasoningService, request: ReasoningRequest) -> String {
    match service.query(request).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, model = service.model_name(), "Reasoning service call failed");
            format!("Error querying reasoning service: {}", e)
        }
    }
}
