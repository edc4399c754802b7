use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use review_service_cli::ai::CompletionClient;
use review_service_cli::chunk::DEFAULT_CHUNK_SIZE;
use review_service_cli::error::{CompletionError, RenderError};
use review_service_cli::renderer::PageRenderer;
use review_service_cli::{PageRequest, PipelineError, RenderedDocument, ReviewPipeline};
use serde_json::json;

struct StaticPage(String);

#[async_trait]
impl PageRenderer for StaticPage {
    async fn render(&self, _request: &PageRequest) -> Result<RenderedDocument, RenderError> {
        Ok(RenderedDocument::new(self.0.clone()))
    }
}

struct TimedOut;

#[async_trait]
impl PageRenderer for TimedOut {
    async fn render(&self, request: &PageRequest) -> Result<RenderedDocument, RenderError> {
        Err(RenderError::Timeout {
            url: request.url().to_string(),
            secs: 30,
        })
    }
}

/// Hands out canned replies in order and records every chunk it was sent.
#[derive(Default)]
struct CannedModel {
    replies: Mutex<Vec<Result<String, CompletionError>>>,
    chunks: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl CannedModel {
    fn new(replies: Vec<Result<String, CompletionError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            ..Default::default()
        })
    }
}

#[async_trait]
impl CompletionClient for CannedModel {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.chunks.lock().unwrap().push(user.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok("{\"reviews\": []}".to_string()))
    }
}

fn pipeline(
    renderer: impl PageRenderer + 'static,
    model: Arc<CannedModel>,
    chunk_size: usize,
) -> ReviewPipeline {
    ReviewPipeline::new(
        Arc::new(renderer),
        model,
        NonZeroUsize::new(chunk_size).unwrap(),
        NonZeroUsize::MIN,
    )
}

fn request() -> PageRequest {
    PageRequest::new("https://shop.example/widget").unwrap()
}

/// A page whose markdown is long enough to need exactly two small chunks.
fn two_chunk_page() -> String {
    format!("<html><body><p>{}</p></body></html>", "r".repeat(150))
}

#[tokio::test]
async fn malformed_chunk_does_not_lose_earlier_reviews() {
    let first = json!({
        "reviews": [
            { "title": "Great", "body": "Loved it", "rating": 5, "reviewer": "Ann" },
            { "title": "Okay", "body": "Fine", "rating": 3, "reviewer": "Bob" }
        ]
    });
    let model = CannedModel::new(vec![
        Ok(format!("```json\n{}\n```", first)),
        Ok("{\"reviews\": [ {\"title\": ".to_string()),
    ]);
    let pipeline = pipeline(StaticPage(two_chunk_page()), model.clone(), 100);

    let report = pipeline.run(&request()).await.unwrap();

    assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.reviews_count(), 2);
    let titles: Vec<_> = report
        .reviews()
        .iter()
        .map(|r| r.title.as_deref().unwrap())
        .collect();
    assert_eq!(titles, vec!["Great", "Okay"]);
}

#[tokio::test]
async fn completion_failure_is_absorbed_per_chunk() {
    let model = CannedModel::new(vec![
        Err(CompletionError::Api {
            status: 429,
            body: "slow down".to_string(),
        }),
        Ok(json!({ "reviews": [{ "title": "Late but here" }] }).to_string()),
    ]);
    let pipeline = pipeline(StaticPage(two_chunk_page()), model, 100);

    let report = pipeline.run(&request()).await.unwrap();

    assert_eq!(report.reviews_count(), 1);
    assert_eq!(report.reviews()[0].title.as_deref(), Some("Late but here"));
}

#[tokio::test]
async fn render_timeout_is_a_single_error_without_extraction() {
    let model = CannedModel::new(vec![]);
    let pipeline = pipeline(TimedOut, model.clone(), 6000);

    let err = pipeline.run(&request()).await.unwrap_err();

    assert!(matches!(err, PipelineError::Render(RenderError::Timeout { .. })));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn page_is_cleaned_and_converted_before_extraction() {
    let page = r#"<html><head><style>.x{}</style></head><body>
        <header>Site menu</header>
        <script>var secret = 1;</script>
        <p>"Solid build" - 4/5 by <a href="https://shop.example/u/kim">Kim</a></p>
        <footer>Legal</footer>
    </body></html>"#;
    let model = CannedModel::new(vec![]);
    let pipeline = ReviewPipeline::new(
        Arc::new(StaticPage(page.to_string())),
        model.clone(),
        DEFAULT_CHUNK_SIZE,
        NonZeroUsize::MIN,
    );

    let report = pipeline.run(&request()).await.unwrap();
    assert_eq!(report.reviews_count(), 0);

    let chunks = model.chunks.lock().unwrap();
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].contains("Solid build"));
    assert!(chunks[0].contains("https://shop.example/u/kim"));
    assert!(!chunks[0].contains("Site menu"));
    assert!(!chunks[0].contains("secret"));
    assert!(!chunks[0].contains("Legal"));
}

#[tokio::test]
async fn report_serializes_with_count() {
    let model = CannedModel::new(vec![Ok(
        json!({ "reviews": [{ "title": "A", "rating": 4.5 }, { "title": "B" }] }).to_string(),
    )]);
    let pipeline = pipeline(StaticPage("<p>reviews</p>".to_string()), model, 6000);

    let report = pipeline.run(&request()).await.unwrap();
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(
        value,
        json!({
            "reviews_count": 2,
            "reviews": [{ "title": "A", "rating": 4.5 }, { "title": "B" }]
        })
    );
}

#[tokio::test]
async fn blank_url_is_rejected_before_rendering() {
    let model = CannedModel::new(vec![]);
    let pipeline = pipeline(TimedOut, model, 6000);
    assert!(matches!(
        pipeline.run_url("  ").await,
        Err(PipelineError::InvalidRequest(_))
    ));
}
