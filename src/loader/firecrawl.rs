use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::{Document, DocumentMetadata};
use crate::core::config::RagValves;
use crate::core::errors::{ConfigError, LoadError, ServiceError};
use crate::core::http::{build_client, read_json, trim_base_url};

const SERVICE: &str = "crawl service";
const MARKDOWN_FORMATS: [&str; 1] = ["markdown"];

/// Source of crawled pages, one `Document` per page.
#[async_trait]
pub trait CrawlService: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<Vec<Document>, LoadError>;
    async fn crawl(&self, url: &str) -> Result<Vec<Document>, LoadError>;
}

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub page_limit: usize,
    pub poll_interval: Duration,
    pub deadline: Duration,
}

impl CrawlOptions {
    pub fn from_valves(valves: &RagValves) -> Self {
        Self {
            page_limit: valves.crawl_page_limit,
            poll_interval: Duration::from_millis(valves.crawl_poll_interval_ms),
            deadline: Duration::from_secs(valves.crawl_timeout_secs),
        }
    }
}

/// Firecrawl v1 REST client.
#[derive(Clone)]
pub struct FirecrawlClient {
    base_url: String,
    client: Client,
    options: CrawlOptions,
}

impl FirecrawlClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        request_timeout: Duration,
        options: CrawlOptions,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: trim_base_url(base_url),
            client: build_client(request_timeout, Some(api_key))?,
            options,
        })
    }

    fn is_same_origin(&self, url: &str) -> bool {
        match (Url::parse(&self.base_url), Url::parse(url)) {
            (Ok(base), Ok(other)) => base.origin() == other.origin(),
            _ => false,
        }
    }

    async fn get_status(&self, url: &str) -> Result<CrawlStatus, LoadError> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ServiceError::transport(SERVICE, err))?;
        Ok(read_json(SERVICE, res).await?)
    }

    async fn wait_for_job(&self, job_id: &str) -> Result<CrawlStatus, LoadError> {
        let status_url = format!("{}/v1/crawl/{}", self.base_url, job_id);
        let started = Instant::now();

        loop {
            let status = self.get_status(&status_url).await?;
            debug!(
                job_id,
                status = %status.status,
                completed = status.completed,
                total = status.total,
                "Polled crawl job"
            );

            match status.status.as_str() {
                "completed" => return Ok(status),
                "failed" | "cancelled" => {
                    return Err(LoadError::CrawlFailed {
                        job_id: job_id.to_string(),
                        status: status.error.unwrap_or(status.status),
                    })
                }
                _ => {}
            }

            if started.elapsed() + self.options.poll_interval > self.options.deadline {
                return Err(LoadError::Timeout {
                    job_id: job_id.to_string(),
                    seconds: self.options.deadline.as_secs(),
                });
            }
            sleep(self.options.poll_interval).await;
        }
    }
}

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'static str; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CrawlRequest<'a> {
    url: &'a str,
    limit: usize,
    scrape_options: ScrapeOptions,
}

#[derive(Serialize)]
struct ScrapeOptions {
    formats: [&'static str; 1],
}

#[derive(Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<FirecrawlPage>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct CrawlStarted {
    #[serde(default)]
    success: bool,
    id: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct CrawlStatus {
    status: String,
    #[serde(default)]
    total: u64,
    #[serde(default)]
    completed: u64,
    #[serde(default)]
    data: Vec<FirecrawlPage>,
    next: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct FirecrawlPage {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    metadata: PageMetadata,
}

#[derive(Deserialize, Default)]
struct PageMetadata {
    #[serde(default, deserialize_with = "lenient_text")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    language: Option<String>,
    #[serde(default, rename = "sourceURL", deserialize_with = "lenient_text")]
    source_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    url: Option<String>,
    #[serde(
        default,
        rename = "publishedTime",
        alias = "article:published_time",
        deserialize_with = "lenient_text"
    )]
    published_time: Option<String>,
}

/// Page metadata fields arrive as a string, a list of strings or not at all.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let text = match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Array(items)) => items
            .into_iter()
            .find_map(|item| item.as_str().map(str::to_string)),
        _ => None,
    };
    Ok(text.filter(|text| !text.trim().is_empty()))
}

impl FirecrawlPage {
    fn into_document(self, requested_url: &str) -> Document {
        let meta = self.metadata;
        Document::new(
            self.markdown.unwrap_or_default(),
            DocumentMetadata {
                url: meta
                    .source_url
                    .or(meta.url)
                    .unwrap_or_else(|| requested_url.to_string()),
                title: meta.title,
                description: meta.description,
                language: meta.language,
                published_at: meta.published_time,
            },
        )
    }
}

#[async_trait]
impl CrawlService for FirecrawlClient {
    async fn scrape(&self, url: &str) -> Result<Vec<Document>, LoadError> {
        let endpoint = format!("{}/v1/scrape", self.base_url);
        let res = self
            .client
            .post(&endpoint)
            .json(&ScrapeRequest {
                url,
                formats: MARKDOWN_FORMATS,
            })
            .send()
            .await
            .map_err(|err| ServiceError::transport(SERVICE, err))?;
        let payload: ScrapeResponse = read_json(SERVICE, res).await?;

        if !payload.success {
            return Err(LoadError::Rejected {
                message: payload
                    .error
                    .unwrap_or_else(|| "scrape was not successful".to_string()),
            });
        }
        let page = payload.data.ok_or(ServiceError::Empty { service: SERVICE })?;
        Ok(vec![page.into_document(url)])
    }

    async fn crawl(&self, url: &str) -> Result<Vec<Document>, LoadError> {
        let endpoint = format!("{}/v1/crawl", self.base_url);
        let res = self
            .client
            .post(&endpoint)
            .json(&CrawlRequest {
                url,
                limit: self.options.page_limit,
                scrape_options: ScrapeOptions {
                    formats: MARKDOWN_FORMATS,
                },
            })
            .send()
            .await
            .map_err(|err| ServiceError::transport(SERVICE, err))?;
        let started: CrawlStarted = read_json(SERVICE, res).await?;

        let job_id = match (started.success, started.id) {
            (true, Some(id)) => id,
            (_, _) => {
                return Err(LoadError::Rejected {
                    message: started
                        .error
                        .unwrap_or_else(|| "crawl job was not accepted".to_string()),
                })
            }
        };
        info!("Crawl job {} started for {}", job_id, url);

        let mut status = self.wait_for_job(&job_id).await?;
        let mut pages = std::mem::take(&mut status.data);
        let mut next = status.next.take();

        // Large results are paginated; each page links to the next. The API
        // key is only sent back to the configured host.
        while let Some(next_url) = next {
            if pages.len() >= self.options.page_limit {
                break;
            }
            if !self.is_same_origin(&next_url) {
                warn!("Not following crawl page outside {}: {}", self.base_url, next_url);
                break;
            }
            let mut page = match self.get_status(&next_url).await {
                Ok(page) => page,
                Err(err) => {
                    warn!(
                        "Keeping {} page(s) of crawl job {}; next page failed: {}",
                        pages.len(),
                        job_id,
                        err
                    );
                    break;
                }
            };
            if page.data.is_empty() {
                break;
            }
            pages.append(&mut page.data);
            next = page.next;
        }
        pages.truncate(self.options.page_limit);

        info!("Crawl job {} returned {} page(s)", job_id, pages.len());
        Ok(pages
            .into_iter()
            .map(|page| page.into_document(url))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bind, serve, spawn, unused_base_url};
    use axum::extract::{Path, State};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn options() -> CrawlOptions {
        CrawlOptions {
            page_limit: 10,
            poll_interval: Duration::from_millis(10),
            deadline: Duration::from_secs(5),
        }
    }

    fn client(base: &str, options: CrawlOptions) -> FirecrawlClient {
        FirecrawlClient::new(base, "fc-test", Duration::from_secs(5), options)
            .expect("client builds")
    }

    #[tokio::test]
    async fn scrape_returns_single_document_with_metadata() {
        let app = Router::new().route(
            "/v1/scrape",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "success": true,
                    "data": {
                        "markdown": format!("# Page for {}", body["url"].as_str().unwrap_or("")),
                        "metadata": {
                            "title": "Docs",
                            "language": ["en", "de"],
                            "sourceURL": "https://docs.example.com/"
                        }
                    }
                }))
            }),
        );
        let base = serve(app).await;

        let docs = client(&base, options())
            .scrape("https://docs.example.com/")
            .await
            .expect("scrape succeeds");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text(), "# Page for https://docs.example.com/");
        assert_eq!(docs[0].metadata().title.as_deref(), Some("Docs"));
        assert_eq!(docs[0].metadata().language.as_deref(), Some("en"));
    }

    #[derive(Clone)]
    struct JobState {
        polls: Arc<AtomicUsize>,
        base: String,
    }

    #[tokio::test]
    async fn crawl_polls_until_completed_and_follows_next() {
        let (listener, base) = bind().await;
        let polls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/v1/crawl",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["scrapeOptions"]["formats"][0], "markdown");
                    Json(json!({ "success": true, "id": "job-1" }))
                }),
            )
            .route(
                "/v1/crawl/:id",
                get(|State(state): State<JobState>, Path(id): Path<String>| async move {
                    if id == "job-1-page2" {
                        return Json(json!({
                            "status": "completed",
                            "data": [{ "markdown": "third", "metadata": {} }]
                        }));
                    }
                    if state.polls.fetch_add(1, Ordering::SeqCst) < 2 {
                        return Json(json!({ "status": "scraping", "total": 3, "completed": 1 }));
                    }
                    Json(json!({
                        "status": "completed",
                        "total": 3,
                        "completed": 3,
                        "data": [
                            { "markdown": "first", "metadata": { "sourceURL": "https://a/1" } },
                            { "markdown": "second", "metadata": { "sourceURL": "https://a/2" } }
                        ],
                        "next": format!("{}/v1/crawl/job-1-page2", state.base)
                    }))
                }),
            )
            .with_state(JobState {
                polls: polls.clone(),
                base: base.clone(),
            });
        spawn(listener, app);

        let docs = client(&base, options())
            .crawl("https://a/")
            .await
            .expect("crawl succeeds");
        assert_eq!(polls.load(Ordering::SeqCst), 3);
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[1].metadata().url, "https://a/2");
        assert_eq!(docs[2].text(), "third");
        assert_eq!(docs[2].metadata().url, "https://a/");
    }

    #[tokio::test]
    async fn next_page_on_another_host_is_not_requested() {
        let foreign_hits = Arc::new(AtomicUsize::new(0));
        let counter = foreign_hits.clone();
        let foreign = serve(Router::new().route(
            "/v1/crawl/:id",
            get(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Json(json!({ "status": "completed", "data": [{ "markdown": "x" }] })) }
            }),
        ))
        .await;

        let app = Router::new()
            .route(
                "/v1/crawl",
                post(|| async { Json(json!({ "success": true, "id": "job" })) }),
            )
            .route(
                "/v1/crawl/:id",
                get(move || {
                    let next = format!("{}/v1/crawl/elsewhere", foreign);
                    async move {
                        Json(json!({
                            "status": "completed",
                            "data": [{ "markdown": "first" }],
                            "next": next
                        }))
                    }
                }),
            );
        let base = serve(app).await;

        let docs = client(&base, options()).crawl("https://a/").await.expect("crawl");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text(), "first");
        assert_eq!(foreign_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_next_page_keeps_collected_pages() {
        let (listener, base) = bind().await;
        let next = format!("{}/v1/crawl/job-page2", base);
        let app = Router::new()
            .route(
                "/v1/crawl",
                post(|| async { Json(json!({ "success": true, "id": "job" })) }),
            )
            .route(
                "/v1/crawl/:id",
                get(move |Path(id): Path<String>| {
                    let next = next.clone();
                    async move {
                        if id == "job-page2" {
                            return Err(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
                        }
                        Ok(Json(json!({
                            "status": "completed",
                            "data": [{ "markdown": "first" }, { "markdown": "second" }],
                            "next": next
                        })))
                    }
                }),
            );
        spawn(listener, app);

        let docs = client(&base, options()).crawl("https://a/").await.expect("crawl");
        let texts: Vec<&str> = docs.iter().map(|doc| doc.text()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn crawl_results_are_capped_at_the_page_limit() {
        let app = Router::new()
            .route(
                "/v1/crawl",
                post(|| async { Json(json!({ "success": true, "id": "big" })) }),
            )
            .route(
                "/v1/crawl/:id",
                get(|| async {
                    let pages: Vec<Value> = (0..5)
                        .map(|i| json!({ "markdown": format!("page {i}") }))
                        .collect();
                    Json(json!({ "status": "completed", "data": pages }))
                }),
            );
        let base = serve(app).await;
        let limited = CrawlOptions {
            page_limit: 2,
            ..options()
        };

        let docs = client(&base, limited).crawl("https://a/").await.expect("crawl");
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn failed_job_and_timeout_are_distinguished() {
        let app = Router::new()
            .route(
                "/v1/crawl",
                post(|Json(body): Json<Value>| async move {
                    let id = if body["url"] == "https://fail/" { "bad" } else { "slow" };
                    Json(json!({ "success": true, "id": id }))
                }),
            )
            .route(
                "/v1/crawl/:id",
                get(|Path(id): Path<String>| async move {
                    if id == "bad" {
                        Json(json!({ "status": "failed", "error": "blocked by robots.txt" }))
                    } else {
                        Json(json!({ "status": "scraping" }))
                    }
                }),
            );
        let base = serve(app).await;
        let short = CrawlOptions {
            deadline: Duration::from_millis(50),
            ..options()
        };
        let crawler = client(&base, short);

        let err = crawler.crawl("https://fail/").await.unwrap_err();
        assert!(
            matches!(err, LoadError::CrawlFailed { ref status, .. } if status == "blocked by robots.txt")
        );

        let err = crawler.crawl("https://slow/").await.unwrap_err();
        assert!(matches!(err, LoadError::Timeout { ref job_id, .. } if job_id == "slow"));
    }

    #[tokio::test]
    async fn rejected_and_unreachable_requests() {
        let app = Router::new().route(
            "/v1/crawl",
            post(|| async { Json(json!({ "success": false, "error": "Insufficient credits" })) }),
        );
        let base = serve(app).await;
        let err = client(&base, options()).crawl("https://a/").await.unwrap_err();
        assert!(matches!(err, LoadError::Rejected { ref message } if message == "Insufficient credits"));

        let offline = unused_base_url().await;
        let err = client(&offline, options()).crawl("https://a/").await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::Service(ServiceError::Unreachable { .. })
        ));
    }
}
