use std::sync::Arc;

use async_trait::async_trait;
use forensics_core::{StepResult, TaskInput};
use reasoning::{query_text, ReasoningRequest, ReasoningService};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::analyzer::Analyzer;
use crate::error::{OrchestratorError, Result};

pub const DEFAULT_SERPAPI_URL: &str = "https://serpapi.com";
const ENGINE: &str = "google_reverse_image";

#[derive(Debug, Clone)]
pub struct ReverseSearchConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<String>,
    /// Number of hits reported in `top_results`
    pub max_results: usize,
}

impl Default for ReverseSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_SERPAPI_URL.to_string(),
            api_key: None,
            max_results: 5,
        }
    }
}

/// One reverse search hit
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub source: String,
}

impl SearchHit {
    fn from_value(value: &Value) -> Self {
        let field = |key: &str, fallback: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(fallback)
                .to_string()
        };
        Self {
            title: field("title", "No title"),
            link: field("link", "No link"),
            source: field("source", "Unknown source"),
        }
    }
}

/// Google reverse image search through SerpAPI, summarized by the reasoning
/// service. Only works for publicly reachable image URLs.
pub struct ReverseImageSearch {
    client: Client,
    config: ReverseSearchConfig,
    service: Arc<dyn ReasoningService>,
}

impl ReverseImageSearch {
    pub const NAME: &'static str = "ReverseImageSearch";
    pub const DISPLAY_NAME: &'static str = "Reverse Image Search";

    pub fn new(config: ReverseSearchConfig, service: Arc<dyn ReasoningService>) -> Self {
        Self {
            client: Client::new(),
            config,
            service,
        }
    }

    fn failed(reason: impl Into<String>) -> OrchestratorError {
        OrchestratorError::analyzer_failed(Self::NAME, reason)
    }

    pub fn analysis_prompt(hits: &[SearchHit]) -> String {
        let formatted = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                format!(
                    "{}. Title: {}\n   Source: {}\n   Link: {}",
                    i + 1,
                    hit.title,
                    hit.source,
                    hit.link
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            r#"Based only on the following reverse image search results, decide whether the searched image is a deepfake or AI-generated:

{formatted}

1. Consider what the titles and sources say about where the image appeared and how it was described
2. With that context, state whether the image is likely a deepfake or authentic, and why

Analysis:"#
        )
    }

    async fn search(&self, image_url: &str, api_key: &str) -> Result<Value> {
        let url = format!("{}/search.json", self.config.base_url.trim_end_matches('/'));
        debug!(url = %url, image = %image_url, "Querying SerpAPI");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("engine", ENGINE),
                ("image_url", image_url),
                ("api_key", api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OrchestratorError::ReverseSearch(format!(
                "SerpAPI returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl Analyzer for ReverseImageSearch {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn display_name(&self) -> &str {
        Self::DISPLAY_NAME
    }

    async fn analyze(&self, input: &TaskInput) -> Result<StepResult> {
        if !input.is_remote() {
            return Err(Self::failed(
                "Reverse image search needs a public http(s) image URL",
            ));
        }
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Self::failed("SerpAPI key is not configured"))?;

        let results = self.search(&input.image_ref, api_key).await?;

        let Some(image_results) = results.get("image_results").and_then(Value::as_array) else {
            let available_keys: Vec<&String> = results
                .as_object()
                .map(|obj| obj.keys().collect())
                .unwrap_or_default();
            warn!(?available_keys, "Reverse image search returned no image results");
            return Ok(StepResult::new(
                Self::NAME,
                json!({
                    "error": "No image results found",
                    "available_keys": available_keys,
                }),
            ));
        };

        let hits: Vec<SearchHit> = image_results.iter().map(SearchHit::from_value).collect();
        info!(results = hits.len(), "Reverse image search found matches");

        let analysis = query_text(
            self.service.as_ref(),
            ReasoningRequest::new(Self::analysis_prompt(&hits)),
        )
        .await;

        let top_results: Vec<&SearchHit> = hits.iter().take(self.config.max_results).collect();
        Ok(StepResult::new(
            Self::NAME,
            json!({
                "num_results": hits.len(),
                "analysis": analysis,
                "top_results": top_results,
            }),
        ))
    }
}
