//! Caption retrieval from the public watch page.
//!
//! The watch page embeds a `"captionTracks":[...]` JSON array; each track
//! points at a timed-text XML document of `<text start dur>` segments.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use html_escape::decode_html_entities;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::core::errors::{ConfigError, ServiceError};
use crate::core::http::{build_client, read_text, trim_base_url};

const SERVICE: &str = "YouTube transcript service";
const CAPTION_TRACKS_KEY: &str = "\"captionTracks\":";

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("no transcripts are published for this video")]
    NoCaptions,
    #[error("no transcript found for language `{requested}` (available: {available})")]
    LanguageUnavailable { requested: String, available: String },
    #[error("caption data could not be parsed: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn transcript(
        &self,
        video_id: &str,
        language: &str,
    ) -> Result<Vec<TranscriptSegment>, TranscriptError>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Clone)]
pub struct WatchPageTranscripts {
    watch_base: String,
    client: Client,
}

impl WatchPageTranscripts {
    pub fn new(watch_base: &str, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            watch_base: trim_base_url(watch_base),
            client: build_client(timeout, None)?,
        })
    }

    async fn fetch_text(&self, url: &str) -> Result<String, ServiceError> {
        let res = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.8")
            .send()
            .await
            .map_err(|err| ServiceError::transport(SERVICE, err))?;
        read_text(SERVICE, res).await
    }
}

#[async_trait]
impl TranscriptSource for WatchPageTranscripts {
    async fn transcript(
        &self,
        video_id: &str,
        language: &str,
    ) -> Result<Vec<TranscriptSegment>, TranscriptError> {
        let page_url = format!(
            "{}/watch?v={}",
            self.watch_base,
            urlencoding::encode(video_id)
        );
        let html = self.fetch_text(&page_url).await?;
        let tracks = caption_tracks(&html)?;
        let track = select_track(&tracks, language)?;

        let track_url = if track.base_url.starts_with('/') {
            format!("{}{}", self.watch_base, track.base_url)
        } else {
            track.base_url.clone()
        };
        let xml = self.fetch_text(&track_url).await?;
        let segments = parse_timed_text(&xml);
        if segments.is_empty() {
            return Err(TranscriptError::Malformed("timed text has no segments".into()));
        }
        Ok(segments)
    }
}

/// Joins segment texts with single spaces, flattening embedded newlines.
pub fn join_segments(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\n', " ")
}

fn caption_tracks(html: &str) -> Result<Vec<CaptionTrack>, TranscriptError> {
    let Some(pos) = html.find(CAPTION_TRACKS_KEY) else {
        return Err(TranscriptError::NoCaptions);
    };
    let rest = html[pos + CAPTION_TRACKS_KEY.len()..].trim_start();
    let array = balanced_json_array(rest)
        .ok_or_else(|| TranscriptError::Malformed("unterminated caption track list".into()))?;
    let tracks: Vec<CaptionTrack> = serde_json::from_str(array)
        .map_err(|err| TranscriptError::Malformed(err.to_string()))?;
    if tracks.is_empty() {
        return Err(TranscriptError::NoCaptions);
    }
    Ok(tracks)
}

/// Returns the leading `[...]` of `text`, honouring nested brackets and
/// string literals.
fn balanced_json_array(text: &str) -> Option<&str> {
    if !text.starts_with('[') {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (index, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=index]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Manually created tracks win over auto-generated ones.
fn select_track<'a>(
    tracks: &'a [CaptionTrack],
    language: &str,
) -> Result<&'a CaptionTrack, TranscriptError> {
    let matching = |track: &&CaptionTrack| track.language_code.eq_ignore_ascii_case(language);
    tracks
        .iter()
        .filter(matching)
        .find(|track| !track.is_generated())
        .or_else(|| tracks.iter().find(matching))
        .ok_or_else(|| TranscriptError::LanguageUnavailable {
            requested: language.to_string(),
            available: tracks
                .iter()
                .map(|track| track.language_code.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

fn segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<text start="([^"]*)"(?: dur="([^"]*)")?[^>]*>(.*?)</text>"#)
            .expect("segment pattern is valid")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

fn parse_timed_text(xml: &str) -> Vec<TranscriptSegment> {
    segment_regex()
        .captures_iter(xml)
        .filter_map(|caps| {
            let raw = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
            // Caption bodies are entity-encoded twice (`&amp;#39;`).
            let once = decode_html_entities(raw);
            let decoded = decode_html_entities(&once);
            let text = tag_regex().replace_all(&decoded, "").trim().to_string();
            if text.is_empty() {
                return None;
            }
            let number = |index: usize| {
                caps.get(index)
                    .and_then(|m| m.as_str().parse::<f64>().ok())
                    .unwrap_or(0.0)
            };
            Some(TranscriptSegment {
                text,
                start: number(1),
                duration: number(2),
            })
        })
        .collect()
}
