//! Video mode of the source loader: metadata, transcript and comments of
//! one YouTube video assembled into a `VideoReport`.

pub mod data_api;
pub mod duration;
pub mod transcript;
pub mod video_id;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::errors::{PartialDataWarning, ServiceError};
pub use data_api::{VideoPlatform, YouTubeDataClient};
pub use duration::parse_duration_minutes;
pub use transcript::{TranscriptSource, WatchPageTranscripts};
pub use video_id::extract_video_id;

#[derive(Debug, Clone, PartialEq)]
pub struct VideoOptions {
    pub language: String,
    pub comments: bool,
    /// Caps collected comment lines (replies included). `None` is unlimited.
    pub max_comments: Option<usize>,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            comments: false,
            max_comments: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub published_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoReport {
    pub transcript: String,
    /// Whole minutes.
    pub duration: u64,
    pub comments: Vec<String>,
    pub metadata: VideoMetadata,
}

#[derive(Debug, Clone)]
pub struct VideoLoad {
    pub report: VideoReport,
    pub warnings: Vec<PartialDataWarning>,
}

#[derive(Debug, Error)]
pub enum VideoLoadError {
    #[error("Invalid YouTube URL")]
    InvalidUrl,
    #[error("Video not found: {0}")]
    NotFound(String),
    #[error("Failed to access YouTube API. Please check your YOUTUBE_API_KEY and ensure it is valid: {0}")]
    Platform(#[source] ServiceError),
}

pub struct VideoLoader {
    platform: Arc<dyn VideoPlatform>,
    transcripts: Arc<dyn TranscriptSource>,
}

impl VideoLoader {
    pub fn new(platform: Arc<dyn VideoPlatform>, transcripts: Arc<dyn TranscriptSource>) -> Self {
        Self {
            platform,
            transcripts,
        }
    }

    pub async fn load(
        &self,
        url: &str,
        options: &VideoOptions,
    ) -> Result<VideoLoad, VideoLoadError> {
        let video_id = extract_video_id(url).ok_or(VideoLoadError::InvalidUrl)?;

        let video = self
            .platform
            .video(&video_id)
            .await
            .map_err(VideoLoadError::Platform)?
            .ok_or_else(|| VideoLoadError::NotFound(video_id.clone()))?;

        let mut warnings = Vec::new();
        let transcript = match self.transcripts.transcript(&video_id, &options.language).await {
            Ok(segments) => transcript::join_segments(&segments),
            Err(err) => {
                let warning = PartialDataWarning::TranscriptUnavailable {
                    language: options.language.clone(),
                    reason: err.to_string(),
                };
                warn!("Video {}: {}", video_id, warning);
                warnings.push(warning);
                format!(
                    "Transcript not available in the selected language ({}). ({})",
                    options.language, err
                )
            }
        };

        let comments = if options.comments {
            let (comments, warning) = self.collect_comments(&video_id, options.max_comments).await;
            if let Some(warning) = warning {
                warn!("Video {}: {}", video_id, warning);
                warnings.push(warning);
            }
            comments
        } else {
            Vec::new()
        };

        info!(
            "Loaded video {} ({} comment line(s), {} warning(s))",
            video_id,
            comments.len(),
            warnings.len()
        );
        Ok(VideoLoad {
            report: VideoReport {
                transcript,
                duration: parse_duration_minutes(&video.content_details.duration),
                comments,
                metadata: VideoMetadata {
                    id: video.id,
                    title: video.snippet.title,
                    channel: video.snippet.channel_title,
                    published_at: video.snippet.published_at,
                },
            },
            warnings,
        })
    }

    /// Walks comment pages until the continuation token runs out or the cap
    /// is reached. A failing page keeps what was collected before it.
    async fn collect_comments(
        &self,
        video_id: &str,
        cap: Option<usize>,
    ) -> (Vec<String>, Option<PartialDataWarning>) {
        let mut comments = Vec::new();
        let mut page_token: Option<String> = None;

        while !cap.is_some_and(|cap| comments.len() >= cap) {
            let page = match self
                .platform
                .comment_page(video_id, page_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    let warning = PartialDataWarning::CommentsIncomplete {
                        fetched: comments.len(),
                        reason: err.to_string(),
                    };
                    return (comments, Some(warning));
                }
            };

            for thread in page.items {
                comments.extend(thread.into_lines());
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        if let Some(cap) = cap {
            comments.truncate(cap);
        }
        (comments, None)
    }
}
