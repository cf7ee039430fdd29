use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Input shared read-only by every analyzer and the reasoning service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TaskInput {
    /// Local path or remote URL of the image under analysis
    #[serde(rename = "image_path", alias = "image_ref")]
    pub image_ref: String,
    /// Optional caption or context supplied by the user
    #[serde(default)]
    pub text: Option<String>,
}

impl TaskInput {
    pub fn new(image_ref: impl Into<String>, text: Option<String>) -> Result<Self, CoreError> {
        let image_ref = image_ref.into().trim().to_string();
        if image_ref.is_empty() {
            return Err(CoreError::EmptyImageRef);
        }

        let text = text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Self { image_ref, text })
    }

    /// Whether the image reference points at an http(s) resource.
    pub fn is_remote(&self) -> bool {
        let lower = self.image_ref.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_input_creation() {
        let input = TaskInput::new("photo.png", Some("instagram".to_string())).unwrap();

        assert_eq!(input.image_ref, "photo.png");
        assert_eq!(input.text.as_deref(), Some("instagram"));
        assert!(!input.is_remote());
    }

    #[test]
    fn test_task_input_rejects_empty_ref() {
        let result = TaskInput::new("   ", None);
        assert!(matches!(result, Err(CoreError::EmptyImageRef)));
    }

    #[test]
    fn test_task_input_blank_text_is_none() {
        let input = TaskInput::new("photo.png", Some("  ".to_string())).unwrap();
        assert!(input.text.is_none());
        assert_eq!(input.text_or_empty(), "");
    }

    #[test]
    fn test_task_input_remote_detection() {
        let input = TaskInput::new("HTTPS://example.com/a.jpg", None).unwrap();
        assert!(input.is_remote());
    }

    #[test]
    fn test_task_input_serialization() {
        let input = TaskInput::new("photo.png", None).unwrap();
        let json = serde_json::to_value(&input).unwrap();

        assert_eq!(json["image_path"], "photo.png");
        assert!(json["text"].is_null());

        let parsed: TaskInput =
            serde_json::from_str(r#"{"image_ref":"a.png","text":"hi"}"#).unwrap();
        assert_eq!(parsed.image_ref, "a.png");
    }
}
