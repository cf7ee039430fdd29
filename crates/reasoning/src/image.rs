use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::ImageFormat;
use tracing::debug;

use crate::error::{ReasoningError, ReasoningResult};

/// Image payload attached to a multimodal prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    /// MIME type, e.g. `image/png`
    pub media_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

impl ImageAttachment {
    pub fn from_bytes(bytes: &[u8], media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            data: BASE64.encode(bytes),
        }
    }

    /// Read and encode a local image file.
    pub async fn load(path: impl AsRef<Path>) -> ReasoningResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ReasoningError::image(path.display().to_string(), e))?;

        let media_type = sniff_media_type(&bytes)
            .or_else(|| media_type_from_extension(path))
            .ok_or_else(|| {
                ReasoningError::image(path.display().to_string(), "unrecognized image format")
            })?;

        debug!(
            path = %path.display(),
            media_type,
            size = bytes.len(),
            "Loaded image attachment"
        );

        Ok(Self::from_bytes(&bytes, media_type))
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// MIME type of the formats chat models accept as attachments
pub fn attachable_media_type(format: ImageFormat) -> Option<&'static str> {
    matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP
    )
    .then(|| format.to_mime_type())
}

/// Detect the image type from its leading bytes
pub fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes)
        .ok()
        .and_then(attachable_media_type)
}

fn media_type_from_extension(path: &Path) -> Option<&'static str> {
    ImageFormat::from_path(path)
        .ok()
        .and_then(attachable_media_type)
}
