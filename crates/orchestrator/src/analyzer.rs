use async_trait::async_trait;
use forensics_core::{StepResult, TaskInput};
use reasoning::ImageAttachment;
use tracing::{debug, warn};

use crate::error::Result;

/// A pluggable pipeline step producing one [`StepResult`] from a [`TaskInput`].
///
/// Failures are reported through `Err`; the pipeline converts them into
/// `step_error` events and moves on to the next analyzer.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Stable identifier used as `step` in progress events
    fn name(&self) -> &str;

    /// Human readable name used as `display_name` in progress events
    fn display_name(&self) -> &str {
        self.name()
    }

    async fn analyze(&self, input: &TaskInput) -> Result<StepResult>;
}

/// Load the task image for a multimodal prompt, or `None` if it is not
/// available locally.
pub async fn try_load_image(input: &TaskInput) -> Option<ImageAttachment> {
    if input.is_remote() {
        debug!(image = %input.image_ref, "Remote image reference, prompting with text only");
        return None;
    }

    match ImageAttachment::load(&input.image_ref).await {
        Ok(image) => Some(image),
        Err(e) => {
            warn!(image = %input.image_ref, error = %e, "Could not load image, continuing without it");
            None
        }
    }
}
