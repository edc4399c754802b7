//! fetch -> clean -> convert -> chunk -> extract -> merge

use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::ai::{CompletionClient, OpenAiClient};
use crate::chunk::split_text;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::extract::Extractor;
use crate::html;
use crate::renderer::{ChromeRenderer, PageRenderer};
use crate::report::AggregateReport;
use crate::PageRequest;

pub struct ReviewPipeline {
    renderer: Arc<dyn PageRenderer>,
    extractor: Extractor,
    chunk_size: NonZeroUsize,
}

impl ReviewPipeline {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        completion: Arc<dyn CompletionClient>,
        chunk_size: NonZeroUsize,
        concurrency: NonZeroUsize,
    ) -> Self {
        Self {
            renderer,
            extractor: Extractor::new(completion, concurrency),
            chunk_size,
        }
    }

    /// Wire up the Chromium renderer and OpenAI client from configuration.
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        let completion = OpenAiClient::new(config.completion)
            .map_err(|e| PipelineError::Unhandled(e.to_string()))?;
        Ok(Self::new(
            Arc::new(ChromeRenderer::new(config.renderer)),
            Arc::new(completion),
            config.chunk_size,
            config.concurrency,
        ))
    }

    /// Run the whole pipeline for one page.
    ///
    /// Chunks whose completion fails or whose output is not valid JSON are
    /// logged and contribute nothing; only render and internal failures
    /// abort the run.
    #[instrument(skip(self, request), fields(url = %request.url()))]
    pub async fn run(&self, request: &PageRequest) -> Result<AggregateReport, PipelineError> {
        let document = self.renderer.render(request).await?;
        info!(bytes = document.content_length(), "page rendered");

        let raw_html = document.into_html();
        let markdown = tokio::task::spawn_blocking(move || html::html_to_markdown(&raw_html))
            .await?
            .map_err(|e| PipelineError::Unhandled(format!("failed to convert HTML: {}", e)))?;

        let chunks = split_text(&markdown, self.chunk_size);
        info!(
            chars = markdown.chars().count(),
            chunks = chunks.clone().count(),
            "extracting reviews"
        );

        let results = self.extractor.extract_all(chunks).await;
        let report = AggregateReport::from_results(results);
        info!(reviews = report.reviews_count(), "extraction finished");
        Ok(report)
    }

    /// Convenience wrapper validating a raw URL string first.
    pub async fn run_url(&self, url: &str) -> Result<AggregateReport, PipelineError> {
        self.run(&PageRequest::new(url)?).await
    }
}
