use std::sync::Arc;

use serde_json::json;
use tracing::{error, info};

use crate::core::config::YoutubeSettings;
use crate::core::errors::ConfigError;
use crate::loader::youtube::{
    VideoLoader, VideoOptions, WatchPageTranscripts, YouTubeDataClient,
};

pub const TOOL_ID: &str = "youtube_metadata";
pub const TOOL_NAME: &str = "YouTube Video Metadata";

const MISSING_KEY: &str = "YOUTUBE_API_KEY not found in environment variable";

/// Returns a video's metadata, transcript and comments as one JSON string.
/// Every failure is reported inside the JSON as `{"error": "..."}`.
pub struct YoutubeMetadataTool {
    loader: Option<VideoLoader>,
    default_language: String,
    max_comments: Option<usize>,
}

impl YoutubeMetadataTool {
    /// Without an API key the tool still registers and answers with an error.
    pub fn from_settings(settings: &YoutubeSettings) -> Result<Self, ConfigError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty());

        let loader = match api_key {
            Some(key) => {
                let timeout = settings.request_timeout();
                let platform = YouTubeDataClient::new(&settings.api_base, key, timeout)?;
                let transcripts = WatchPageTranscripts::new(&settings.watch_base, timeout)?;
                Some(VideoLoader::new(Arc::new(platform), Arc::new(transcripts)))
            }
            None => None,
        };

        Ok(Self {
            loader,
            default_language: settings.default_language.clone(),
            max_comments: settings.max_comments,
        })
    }

    pub fn with_loader(loader: VideoLoader, settings: &YoutubeSettings) -> Self {
        Self {
            loader: Some(loader),
            default_language: settings.default_language.clone(),
            max_comments: settings.max_comments,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.loader.is_some()
    }

    /// Request options over the configured defaults.
    pub fn options(
        &self,
        language: Option<&str>,
        comments: bool,
        max_comments: Option<usize>,
    ) -> VideoOptions {
        VideoOptions {
            language: language
                .map(str::trim)
                .filter(|lang| !lang.is_empty())
                .unwrap_or(self.default_language.as_str())
                .to_string(),
            comments,
            max_comments: max_comments.or(self.max_comments),
        }
    }

    pub async fn extract_video_metadata(&self, url: &str, options: &VideoOptions) -> String {
        let Some(loader) = &self.loader else {
            return error_json(MISSING_KEY);
        };

        match loader.load(url, options).await {
            Ok(load) => {
                info!(
                    "Extracted metadata for video {} ({} warning(s))",
                    load.report.metadata.id,
                    load.warnings.len()
                );
                serde_json::to_string_pretty(&load.report)
                    .unwrap_or_else(|err| error_json(&err.to_string()))
            }
            Err(err) => {
                error!("YouTube metadata extraction failed for {}: {}", url, err);
                error_json(&err.to_string())
            }
        }
    }
}

fn error_json(message: &str) -> String {
    json!({ "error": message }).to_string()
}
