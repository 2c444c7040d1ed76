//! Resolved playable streams.

use serde::{Deserialize, Serialize};
use url::Url;

use embed_resolver_http::Headers;

/// Stream type, as the playback layer understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamKind {
    /// HLS playlist.
    Hls,
    /// A single progressive file (mp4, mkv, ...).
    DirectFile,
}

impl StreamKind {
    /// Interpret a type string from a resolver response.
    pub fn from_type_hint(hint: &str) -> Option<Self> {
        let hint = hint.trim().to_ascii_lowercase();
        if hint.is_empty() {
            return None;
        }
        if hint.contains("hls") || hint.contains("m3u") || hint.contains("mpegurl") {
            Some(StreamKind::Hls)
        } else {
            Some(StreamKind::DirectFile)
        }
    }

    /// Infer from the URL path's extension.
    pub fn from_url(url: &str) -> Self {
        let path = Url::parse(url)
            .map(|u| u.path().to_ascii_lowercase())
            .unwrap_or_else(|_| url.to_ascii_lowercase());
        if path.ends_with(".m3u8") || path.ends_with(".m3u") {
            StreamKind::Hls
        } else {
            StreamKind::DirectFile
        }
    }

    /// The type hint when there is one, otherwise the URL.
    pub fn infer(url: &str, hint: Option<&str>) -> Self {
        hint.and_then(Self::from_type_hint)
            .unwrap_or_else(|| Self::from_url(url))
    }
}

/// A playable source for an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStream {
    pub url: String,
    /// Headers playback must send (at least `Referer`).
    pub headers: Headers,
    pub kind: StreamKind,
    /// Label of the candidate that produced this stream.
    pub source: String,
}

impl ResolvedStream {
    /// The `Referer` playback must send.
    pub fn referer(&self) -> Option<&str> {
        self.headers.get("Referer").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_url() {
        assert_eq!(StreamKind::from_url("https://cdn.test/a/master.m3u8"), StreamKind::Hls);
        assert_eq!(
            StreamKind::from_url("https://cdn.test/a/MASTER.M3U8?token=1"),
            StreamKind::Hls
        );
        assert_eq!(StreamKind::from_url("https://cdn.test/a/video.mp4"), StreamKind::DirectFile);
        assert_eq!(
            StreamKind::from_url("https://cdn.test/play?f=x.m3u8"),
            StreamKind::DirectFile
        );
    }

    #[test]
    fn test_type_hint_wins() {
        assert_eq!(
            StreamKind::infer("https://cdn.test/stream", Some("hls")),
            StreamKind::Hls
        );
        assert_eq!(
            StreamKind::infer("https://cdn.test/a.m3u8", Some("mp4")),
            StreamKind::DirectFile
        );
        assert_eq!(
            StreamKind::infer("https://cdn.test/a.m3u8", Some(" ")),
            StreamKind::Hls
        );
    }

    #[test]
    fn test_serializes_as_tag() {
        let json = serde_json::to_string(&StreamKind::DirectFile).unwrap();
        assert_eq!(json, "\"DIRECT_FILE\"");
    }
}
