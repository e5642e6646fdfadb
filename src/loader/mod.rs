//! Source loading: website pages through the crawl service, and video
//! metadata through the video platform.

pub mod firecrawl;
pub mod youtube;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::errors::{LoadError, PipelineError};
pub use firecrawl::{CrawlOptions, CrawlService, FirecrawlClient};

/// Text of one loaded page plus where it came from. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    text: String,
    metadata: DocumentMetadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub published_at: Option<String>,
}

impl DocumentMetadata {
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlMode {
    /// Follow links from the start page, up to the page limit.
    #[default]
    Crawl,
    /// Fetch only the given page.
    Scrape,
}

pub struct WebLoader {
    crawler: Arc<dyn CrawlService>,
    mode: CrawlMode,
}

impl WebLoader {
    pub fn new(crawler: Arc<dyn CrawlService>, mode: CrawlMode) -> Self {
        Self { crawler, mode }
    }

    /// Loads every non-blank page reachable from `url`. Never returns an
    /// empty list.
    pub async fn load(&self, url: &str) -> Result<Vec<Document>, PipelineError> {
        let url = parse_web_url(url)?;

        let pages = match self.mode {
            CrawlMode::Crawl => self.crawler.crawl(&url).await?,
            CrawlMode::Scrape => self.crawler.scrape(&url).await?,
        };
        let fetched = pages.len();
        let documents: Vec<Document> = pages
            .into_iter()
            .filter(|doc| !doc.text().trim().is_empty())
            .collect();

        if documents.len() < fetched {
            warn!(
                "Dropped {} blank page(s) loaded from {}",
                fetched - documents.len(),
                url
            );
        }
        if documents.is_empty() {
            return Err(LoadError::Empty { url }.into());
        }

        info!("Loaded {} document(s) from {}", documents.len(), url);
        Ok(documents)
    }
}

fn parse_web_url(raw: &str) -> Result<String, PipelineError> {
    let trimmed = raw.trim();
    let parsed =
        reqwest::Url::parse(trimmed).map_err(|_| PipelineError::InvalidUrl(trimmed.to_string()))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed.to_string()),
        _ => Err(PipelineError::InvalidUrl(trimmed.to_string())),
    }
}
