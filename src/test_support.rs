//! In-process fakes and mock-server helpers shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use tokio::net::TcpListener;

use crate::core::config::{defaults, RagValves};
use crate::core::errors::{LoadError, ServiceError};
use crate::llm::{ChatRequest, CompletionProvider, Embedder, EmbedderFingerprint};
use crate::loader::youtube::data_api::{CommentPage, VideoPlatform, VideoResource};
use crate::loader::youtube::transcript::{TranscriptError, TranscriptSegment, TranscriptSource};
use crate::loader::{CrawlService, Document, DocumentMetadata};
use crate::pipeline::{ComponentFactory, PipelineComponents};
use crate::rag::Chunk;

// ---------------------------------------------------------------------------
// Mock HTTP servers
// ---------------------------------------------------------------------------

pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock listener");
    let addr = listener.local_addr().expect("mock address");
    (listener, format!("http://{}", addr))
}

pub fn spawn(listener: TcpListener, app: Router) {
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
}

/// Serves `app` on an ephemeral port and returns its base URL.
pub async fn serve(app: Router) -> String {
    let (listener, base) = bind().await;
    spawn(listener, app);
    base
}

/// A base URL nothing listens on.
pub async fn unused_base_url() -> String {
    let (listener, base) = bind().await;
    drop(listener);
    base
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn chunk(document_index: usize, text: &str) -> Chunk {
    Chunk {
        id: format!("{}:0", document_index),
        text: text.to_string(),
        source: format!("https://docs.example.com/{}", document_index),
        title: None,
        document_index,
        chunk_index: 0,
        start_offset: 0,
    }
}

pub fn page(url: &str, text: &str) -> Document {
    Document::new(text, DocumentMetadata::for_url(url))
}

/// OpenAI preset with both credentials filled in.
pub fn configured_valves() -> RagValves {
    RagValves {
        firecrawl_api_key: "fc-test".to_string(),
        completion_api_key: "sk-test".to_string(),
        ..defaults::firecrawl_openai_valves()
    }
}

pub fn fake_factory(
    crawler: Arc<FakeCrawler>,
    embedder: Arc<HashEmbedder>,
    completion: Arc<ScriptedCompletion>,
) -> ComponentFactory {
    Arc::new(move |valves: &RagValves| {
        PipelineComponents::assemble(
            crawler.clone(),
            embedder.clone(),
            completion.clone(),
            valves,
        )
    })
}

// ---------------------------------------------------------------------------
// Crawl service
// ---------------------------------------------------------------------------

pub struct FakeCrawler {
    pages: Vec<Document>,
    unreachable: bool,
    crawl_calls: AtomicUsize,
    scrape_calls: AtomicUsize,
}

impl FakeCrawler {
    pub fn with_pages(pages: Vec<Document>) -> Self {
        Self {
            pages,
            unreachable: false,
            crawl_calls: AtomicUsize::new(0),
            scrape_calls: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::with_pages(Vec::new())
        }
    }

    pub fn crawl_calls(&self) -> usize {
        self.crawl_calls.load(Ordering::SeqCst)
    }

    pub fn scrape_calls(&self) -> usize {
        self.scrape_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.crawl_calls() + self.scrape_calls()
    }

    fn respond(&self) -> Result<Vec<Document>, LoadError> {
        if self.unreachable {
            return Err(LoadError::Service(ServiceError::Unreachable {
                service: "crawl service",
                message: "connection refused".to_string(),
            }));
        }
        Ok(self.pages.clone())
    }
}

#[async_trait]
impl CrawlService for FakeCrawler {
    async fn scrape(&self, _url: &str) -> Result<Vec<Document>, LoadError> {
        self.scrape_calls.fetch_add(1, Ordering::SeqCst);
        self.respond()
    }

    async fn crawl(&self, _url: &str) -> Result<Vec<Document>, LoadError> {
        self.crawl_calls.fetch_add(1, Ordering::SeqCst);
        self.respond()
    }
}

// ---------------------------------------------------------------------------
// Embedders
// ---------------------------------------------------------------------------

/// Hashed bag-of-words vectors: texts sharing words point the same way.
pub struct HashEmbedder {
    fingerprint: EmbedderFingerprint,
    calls: AtomicUsize,
    fail_after: Option<usize>,
}

impl HashEmbedder {
    pub const DIMENSIONS: usize = 256;

    pub fn new() -> Self {
        Self::with_model("hash-bow")
    }

    pub fn with_model(model: &str) -> Self {
        Self {
            fingerprint: EmbedderFingerprint::new("hash", model, "memory://"),
            calls: AtomicUsize::new(0),
            fail_after: None,
        }
    }

    /// Succeeds for the first `n` calls, then reports the service as down.
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; Self::DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
        {
            let bucket = fnv1a(&word.to_lowercase()) as usize % Self::DIMENSIONS;
            vector[bucket] += 1.0;
        }
        vector
    }
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn fingerprint(&self) -> &EmbedderFingerprint {
        &self.fingerprint
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if matches!(self.fail_after, Some(limit) if call >= limit) {
            return Err(ServiceError::Unreachable {
                service: "embedding service",
                message: "connection refused".to_string(),
            });
        }
        Ok(Self::vector(text))
    }
}

/// Replays a fixed sequence of embedding results.
pub struct FixedEmbedder {
    fingerprint: EmbedderFingerprint,
    responses: Mutex<VecDeque<Result<Vec<f32>, ServiceError>>>,
}

impl FixedEmbedder {
    pub fn new(responses: Vec<Result<Vec<f32>, ServiceError>>) -> Self {
        Self {
            fingerprint: EmbedderFingerprint::new("fixed", "scripted", "memory://"),
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    fn fingerprint(&self) -> &EmbedderFingerprint {
        &self.fingerprint
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ServiceError> {
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or(Err(ServiceError::Empty {
                service: "embedding service",
            }))
    }
}

// ---------------------------------------------------------------------------
// Completion provider
// ---------------------------------------------------------------------------

pub struct ScriptedCompletion {
    reply: Option<String>,
    failure: Mutex<Option<ServiceError>>,
    requests: Mutex<Vec<(ChatRequest, String)>>,
}

impl ScriptedCompletion {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            failure: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: ServiceError) -> Self {
        Self {
            reply: None,
            failure: Mutex::new(Some(err)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub fn last_request(&self) -> Option<(ChatRequest, String)> {
        self.requests.lock().expect("requests lock").last().cloned()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ServiceError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push((request, model_id.to_string()));
        if let Some(err) = self.failure.lock().expect("failure lock").take() {
            return Err(err);
        }
        self.reply.clone().ok_or(ServiceError::Empty {
            service: "completion service",
        })
    }
}

// ---------------------------------------------------------------------------
// Video platform
// ---------------------------------------------------------------------------

pub const KNOWN_VIDEO_ID: &str = "dQw4w9WgXcQ";

/// Knows one video. Serves `pages` comment pages of two threads each, every
/// thread carrying one reply.
pub struct FakeVideoPlatform {
    duration: String,
    pages: usize,
    failing_page: Option<usize>,
    broken: bool,
    comment_calls: AtomicUsize,
}

impl FakeVideoPlatform {
    pub fn new(duration: &str, pages: usize) -> Self {
        Self {
            duration: duration.to_string(),
            pages,
            failing_page: None,
            broken: false,
            comment_calls: AtomicUsize::new(0),
        }
    }

    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::new("PT0S", 0)
        }
    }

    pub fn failing_comment_page(mut self, page: usize) -> Self {
        self.failing_page = Some(page);
        self
    }

    pub fn comment_calls(&self) -> usize {
        self.comment_calls.load(Ordering::SeqCst)
    }

    fn rejected() -> ServiceError {
        ServiceError::Status {
            service: "YouTube Data API",
            status: 400,
            body: "API key not valid".to_string(),
        }
    }
}

#[async_trait]
impl VideoPlatform for FakeVideoPlatform {
    async fn video(&self, video_id: &str) -> Result<Option<VideoResource>, ServiceError> {
        if self.broken {
            return Err(Self::rejected());
        }
        if video_id != KNOWN_VIDEO_ID {
            return Ok(None);
        }
        let resource = serde_json::from_value(json!({
            "id": KNOWN_VIDEO_ID,
            "snippet": {
                "title": "Test Video",
                "channelTitle": "Test Channel",
                "publishedAt": "2024-01-01T00:00:00Z"
            },
            "contentDetails": { "duration": self.duration }
        }))
        .expect("video fixture");
        Ok(Some(resource))
    }

    async fn comment_page(
        &self,
        _video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentPage, ServiceError> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        let page: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        if self.failing_page == Some(page) || self.broken {
            return Err(Self::rejected());
        }
        if page >= self.pages {
            return Ok(CommentPage::default());
        }

        let threads: Vec<_> = (0..2)
            .map(|i| {
                json!({
                    "snippet": { "topLevelComment": { "snippet": { "textDisplay": format!("p{page}c{i}") } } },
                    "replies": { "comments": [ { "snippet": { "textDisplay": format!("reply to p{page}c{i}") } } ] }
                })
            })
            .collect();
        let next = (page + 1 < self.pages).then(|| (page + 1).to_string());
        Ok(serde_json::from_value(json!({ "items": threads, "nextPageToken": next }))
            .expect("comment fixture"))
    }
}

pub struct FakeTranscripts {
    lines: Option<Vec<String>>,
}

impl FakeTranscripts {
    pub fn lines(lines: &[&str]) -> Self {
        Self {
            lines: Some(lines.iter().map(|line| line.to_string()).collect()),
        }
    }

    pub fn unavailable() -> Self {
        Self { lines: None }
    }
}

#[async_trait]
impl TranscriptSource for FakeTranscripts {
    async fn transcript(
        &self,
        _video_id: &str,
        language: &str,
    ) -> Result<Vec<TranscriptSegment>, TranscriptError> {
        let Some(lines) = &self.lines else {
            return Err(TranscriptError::LanguageUnavailable {
                requested: language.to_string(),
                available: "en".to_string(),
            });
        };
        Ok(lines
            .iter()
            .enumerate()
            .map(|(i, text)| TranscriptSegment {
                text: text.clone(),
                start: i as f64,
                duration: 1.0,
            })
            .collect())
    }
}
