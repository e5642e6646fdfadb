use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::core::errors::{ConfigError, ServiceError};
use crate::core::http::{build_client, read_json, trim_base_url};

const SERVICE: &str = "YouTube Data API";

/// The subset of the YouTube Data API the video loader needs.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// `Ok(None)` when the id is well-formed but no such video exists.
    async fn video(&self, video_id: &str) -> Result<Option<VideoResource>, ServiceError>;

    async fn comment_page(
        &self,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentPage, ServiceError>;
}

#[derive(Debug, Clone, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResource {
    pub id: String,
    pub snippet: VideoSnippet,
    #[serde(default)]
    pub content_details: ContentDetails,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub published_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentDetails {
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    #[serde(default)]
    pub items: Vec<CommentThread>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentThread {
    pub snippet: ThreadSnippet,
    #[serde(default)]
    pub replies: Option<ThreadReplies>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSnippet {
    pub top_level_comment: Comment,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadReplies {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub snippet: CommentSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSnippet {
    #[serde(default)]
    pub text_display: String,
}

impl CommentThread {
    /// The top-level text followed by its replies, each reply indented.
    pub fn into_lines(self) -> Vec<String> {
        let mut lines = vec![self.snippet.top_level_comment.snippet.text_display];
        if let Some(replies) = self.replies {
            lines.extend(
                replies
                    .comments
                    .into_iter()
                    .map(|reply| format!("    - {}", reply.snippet.text_display)),
            );
        }
        lines
    }
}

#[derive(Clone)]
pub struct YouTubeDataClient {
    api_base: String,
    api_key: String,
    client: Client,
}

impl YouTubeDataClient {
    pub fn new(api_base: &str, api_key: &str, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: trim_base_url(api_base),
            api_key: api_key.trim().to_string(),
            client: build_client(timeout, None)?,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, ServiceError> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ServiceError::transport(SERVICE, err))?;
        read_json(SERVICE, res).await
    }
}

#[async_trait]
impl VideoPlatform for YouTubeDataClient {
    async fn video(&self, video_id: &str) -> Result<Option<VideoResource>, ServiceError> {
        let url = format!(
            "{}/videos?id={}&part=contentDetails,snippet&key={}",
            self.api_base,
            urlencoding::encode(video_id),
            urlencoding::encode(&self.api_key)
        );
        let response: VideoListResponse = self.get(url).await?;
        Ok(response.items.into_iter().next())
    }

    async fn comment_page(
        &self,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentPage, ServiceError> {
        let mut url = format!(
            "{}/commentThreads?part=snippet,replies&videoId={}&textFormat=plainText&maxResults=100&key={}",
            self.api_base,
            urlencoding::encode(video_id),
            urlencoding::encode(&self.api_key)
        );
        if let Some(token) = page_token {
            url.push_str("&pageToken=");
            url.push_str(&urlencoding::encode(token));
        }
        self.get(url).await
    }
}
