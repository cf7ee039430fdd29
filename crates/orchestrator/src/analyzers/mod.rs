//! Analyzers bundled with the default pipeline

mod metadata;
mod reverse_image_search;
mod visual_forensics;

use std::sync::Arc;

use reasoning::ReasoningService;

use crate::analyzer::Analyzer;
use crate::debate::{DebateConfig, JudgeSystem};

pub use metadata::{FileReport, GeneratorReport, ImageSize, MetadataAnalyzer};
pub use reverse_image_search::{
    ReverseImageSearch, ReverseSearchConfig, SearchHit, DEFAULT_SERPAPI_URL,
};
pub use visual_forensics::{VisualForensicsAgent, VisualForensicsReport};

#[derive(Debug, Clone, Default)]
pub struct AnalyzerSettings {
    pub reverse_search: ReverseSearchConfig,
    pub debate: DebateConfig,
}

/// Default analyzer line-up: reverse image search (when enabled), visual
/// forensics, judge system debate, metadata analysis.
pub fn default_analyzers(
    service: Arc<dyn ReasoningService>,
    settings: &AnalyzerSettings,
) -> Vec<Arc<dyn Analyzer>> {
    let mut analyzers: Vec<Arc<dyn Analyzer>> = Vec::with_capacity(4);

    if settings.reverse_search.enabled {
        analyzers.push(Arc::new(ReverseImageSearch::new(
            settings.reverse_search.clone(),
            Arc::clone(&service),
        )));
    }
    analyzers.push(Arc::new(VisualForensicsAgent::new(Arc::clone(&service))));
    analyzers.push(Arc::new(JudgeSystem::new(
        Arc::clone(&service),
        settings.debate.clone(),
    )));
    analyzers.push(Arc::new(MetadataAnalyzer));

    analyzers
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reasoning::{ReasoningRequest, ReasoningResult};

    struct Silent;

    #[async_trait]
    impl ReasoningService for Silent {
        async fn query(&self, _request: ReasoningRequest) -> ReasoningResult<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_default_order() {
        let analyzers = default_analyzers(Arc::new(Silent), &AnalyzerSettings::default());
        let names: Vec<_> = analyzers.iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            vec![
                "ReverseImageSearch",
                "VisualForensicsAgent",
                "JudgeSystem",
                "AIMetadataAnalyzer"
            ]
        );
        assert_eq!(analyzers[2].display_name(), "Judge System Debate");
    }

    #[test]
    fn test_reverse_search_can_be_disabled() {
        let settings = AnalyzerSettings {
            reverse_search: ReverseSearchConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let analyzers = default_analyzers(Arc::new(Silent), &settings);
        assert_eq!(analyzers.len(), 3);
        assert_eq!(analyzers[0].name(), "VisualForensicsAgent");
    }
}
