use std::sync::OnceLock;

use regex::Regex;

const VIDEO_ID_PATTERN: &str = r"(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:[^/\n\s]+/\S+/|(?:v|e(?:mbed)?|shorts|live)/|\S*?[?&]v=)|youtu\.be/)([a-zA-Z0-9_-]{11})";

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VIDEO_ID_PATTERN).expect("video id pattern is valid"))
}

/// Extracts the 11-character video id from any common YouTube URL shape.
pub fn extract_video_id(url: &str) -> Option<String> {
    video_id_regex()
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn recognises_all_url_shapes() {
        let urls = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "http://youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "youtu.be/dQw4w9WgXcQ?si=abc",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/e/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/user/someone/dQw4w9WgXcQ",
        ];
        for url in urls {
            assert_eq!(extract_video_id(url).as_deref(), Some(ID), "{url}");
        }
    }

    #[test]
    fn rejects_other_urls() {
        assert_eq!(extract_video_id("https://example.com"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(extract_video_id(""), None);
    }
}
