use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use orchestrator::{
    default_analyzers, AnalyzerSettings, DebateConfig, FinalAggregator, Pipeline,
    ReverseSearchConfig,
};
use reasoning::{OpenRouterClient, OpenRouterConfig, ReasoningService};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

pub const CONFIG_FILE: &str = "forensics.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub port: u16,
    /// Directory with a built frontend, served as the fallback route
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_dir: Option<PathBuf>,
    /// Seconds without an event before the progress stream sends a heartbeat
    pub heartbeat_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: 3001,
            app_dir: None,
            heartbeat_secs: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningSection {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for ReasoningSection {
    fn default() -> Self {
        Self {
            base_url: reasoning::DEFAULT_BASE_URL.to_string(),
            model: reasoning::DEFAULT_MODEL.to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateSection {
    pub max_rounds: u32,
}

impl Default for DebateSection {
    fn default() -> Self {
        Self {
            max_rounds: DebateConfig::default().max_rounds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverseSearchSection {
    pub enabled: bool,
    pub base_url: String,
    pub api_key_env: String,
    pub max_results: usize,
}

impl Default for ReverseSearchSection {
    fn default() -> Self {
        let defaults = ReverseSearchConfig::default();
        Self {
            enabled: defaults.enabled,
            base_url: defaults.base_url,
            api_key_env: "SERPAPI_API_KEY".to_string(),
            max_results: defaults.max_results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Send the image along with the final aggregation prompt
    pub attach_image_to_final: bool,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            attach_image_to_final: true,
        }
    }
}

/// Application configuration stored in `forensics.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub reasoning: ReasoningSection,
    pub debate: DebateSection,
    pub reverse_search: ReverseSearchSection,
    pub pipeline: PipelineSection,
}

impl AppConfig {
    /// Read config from `path`, falling back to defaults
    pub async fn read(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "Config file does not exist, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path).await {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    debug!(path = %path.display(), "Config loaded successfully");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                Self::default()
            }
        }
    }

    /// Write config to `path`, creating parent directories
    pub async fn write(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(path, content).await?;
        debug!(path = %path.display(), "Config saved successfully");

        Ok(())
    }

    pub fn analyzer_settings(&self) -> AnalyzerSettings {
        let reverse_search = &self.reverse_search;
        let api_key = std::env::var(&reverse_search.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if reverse_search.enabled && api_key.is_none() {
            warn!(
                var = %reverse_search.api_key_env,
                "Reverse image search is enabled but no API key is set; the step will fail"
            );
        }

        AnalyzerSettings {
            reverse_search: ReverseSearchConfig {
                enabled: reverse_search.enabled,
                base_url: reverse_search.base_url.clone(),
                api_key,
                max_results: reverse_search.max_results,
            },
            debate: DebateConfig {
                max_rounds: self.debate.max_rounds,
            },
        }
    }

    /// Build the OpenRouter-backed reasoning client
    pub fn reasoning_service(&self) -> anyhow::Result<Arc<dyn ReasoningService>> {
        let section = &self.reasoning;
        let config = OpenRouterConfig {
            base_url: section.base_url.clone(),
            model: section.model.clone(),
            temperature: section.temperature,
            max_tokens: section.max_tokens,
            ..Default::default()
        }
        .with_api_key_from_env(&section.api_key_env)
        .with_context(|| format!("Set {} to your OpenRouter API key", section.api_key_env))?;

        let client = OpenRouterClient::new(config).context("Failed to create reasoning client")?;
        info!(model = %section.model, "Reasoning service configured");
        Ok(Arc::new(client))
    }

    /// Default analyzer line-up and final aggregation over `service`
    pub fn pipeline_with(&self, service: Arc<dyn ReasoningService>) -> Pipeline {
        let analyzers = default_analyzers(Arc::clone(&service), &self.analyzer_settings());
        let aggregator =
            FinalAggregator::new(service).with_image(self.pipeline.attach_image_to_final);
        Pipeline::new(analyzers, aggregator)
    }

    pub fn build_pipeline(&self) -> anyhow::Result<Pipeline> {
        Ok(self.pipeline_with(self.reasoning_service()?))
    }
}
