use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info, warn};

use super::types::*;
use crate::error::{ReasoningError, ReasoningResult};
use crate::service::{ReasoningRequest, ReasoningService};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

const DEFAULT_MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 60000;

/// Connection settings for an OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
        }
    }
}

impl OpenRouterConfig {
    /// Read the API key from the named environment variable
    pub fn with_api_key_from_env(mut self, var: &str) -> ReasoningResult<Self> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => {
                self.api_key = key.trim().to_string();
                Ok(self)
            }
            _ => Err(ReasoningError::MissingApiKey(var.to_string())),
        }
    }
}

/// Client for OpenRouter API
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    pub fn new(config: OpenRouterConfig) -> ReasoningResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ReasoningError::MissingApiKey("api_key".to_string()));
        }

        Ok(Self {
            client: Client::new(),
            config: OpenRouterConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    pub fn config(&self) -> &OpenRouterConfig {
        &self.config
    }

    async fn with_retry<T, F, Fut>(&self, operation: F, operation_name: &str) -> ReasoningResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = ReasoningResult<T>>,
    {
        let max_retries = self.config.max_retries;
        let mut retries = 0;
        let mut backoff_ms = self.config.initial_backoff_ms;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(ReasoningError::RateLimited { retry_after }) => {
                    if retries >= max_retries {
                        error!(
                            "{} failed after {} retries due to rate limiting",
                            operation_name, retries
                        );
                        return Err(ReasoningError::RateLimited { retry_after });
                    }

                    let wait_ms = retry_after
                        .map(|s| s * 1000)
                        .unwrap_or(backoff_ms)
                        .min(MAX_BACKOFF_MS);

                    warn!(
                        "{} rate limited, retrying in {}ms (attempt {}/{})",
                        operation_name,
                        wait_ms,
                        retries + 1,
                        max_retries
                    );

                    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                    retries += 1;
                    backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                }
                Err(ReasoningError::Api {
                    ref message,
                    status_code: Some(code),
                }) if code >= 500 => {
                    if retries >= max_retries {
                        error!(
                            "{} failed after {} retries due to server error: {}",
                            operation_name, retries, message
                        );
                        return Err(ReasoningError::Api {
                            message: message.clone(),
                            status_code: Some(code),
                        });
                    }

                    warn!(
                        "{} server error ({}), retrying in {}ms (attempt {}/{})",
                        operation_name,
                        code,
                        backoff_ms,
                        retries + 1,
                        max_retries
                    );

                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    retries += 1;
                    backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                }
                Err(e) => {
                    if retries > 0 {
                        info!(
                            "{} failed after {} retries: {}",
                            operation_name, retries, e
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> ReasoningResult<String> {
        self.with_retry(
            || async {
                self.chat_completion_inner(messages.clone(), temperature, max_tokens)
                    .await
            },
            "chat_completion",
        )
        .await
    }

    async fn chat_completion_inner(
        &self,
        messages: Vec<ChatMessage>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> ReasoningResult<String> {
        debug!(
            "Creating chat completion with {} messages, model {}",
            messages.len(),
            self.config.model
        );

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature,
            max_tokens,
            stream: Some(false),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                warn!("Rate limited by OpenRouter");
                return Err(ReasoningError::RateLimited { retry_after });
            }

            if let Ok(error_resp) = serde_json::from_str::<OpenRouterError>(&error_text) {
                error!(
                    "OpenRouter API error: {} (type: {:?})",
                    error_resp.error.message, error_resp.error.error_type
                );
                return Err(ReasoningError::Api {
                    message: error_resp.error.message,
                    status_code: Some(status.as_u16()),
                });
            }

            return Err(ReasoningError::Api {
                message: error_text,
                status_code: Some(status.as_u16()),
            });
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ReasoningError::EmptyCompletion)
    }
}

#[async_trait]
impl ReasoningService for OpenRouterClient {
    async fn query(&self, request: ReasoningRequest) -> ReasoningResult<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(ChatMessage::system(system));
        }
        let image_urls = request.images.iter().map(|i| i.to_data_url()).collect();
        messages.push(ChatMessage::user_with_images(request.prompt, image_urls));

        self.chat_completion(
            messages,
            request.temperature.or(self.config.temperature),
            request.max_tokens.or(self.config.max_tokens),
        )
        .await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
