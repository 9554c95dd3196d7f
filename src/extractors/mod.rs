use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

pub mod playlist;

use crate::transport::HttpClient;
use crate::Result;

/// Length of every YouTube video identifier
pub const VIDEO_ID_LEN: usize = 11;

/// Canonical 11-character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    /// Wrap an already extracted identifier, validating its shape
    pub fn new(id: &str) -> std::result::Result<Self, InvalidReference> {
        if is_valid_video_id(id) {
            Ok(Self(id.to_string()))
        } else {
            Err(InvalidReference(id.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this video
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VideoId {
    type Error = InvalidReference;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        VideoId::new(&value)
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

/// Opaque playlist identifier taken from a `list=` parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaylistId(String);

impl PlaylistId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn playlist_url(&self) -> String {
        format!("https://www.youtube.com/playlist?list={}", self.0)
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Input could not be turned into a video identifier
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not extract a valid video ID from '{0}'")]
pub struct InvalidReference(pub String);

/// What a user-supplied reference points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Playlist,
    Video,
}

fn video_id_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"v=([0-9A-Za-z_-]{11})").expect("valid regex"),
            Regex::new(r"be/([0-9A-Za-z_-]{11})").expect("valid regex"),
            Regex::new(r"^([0-9A-Za-z_-]{11})$").expect("valid regex"),
        ]
    })
}

fn playlist_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"list=([^&]+)").expect("valid regex"))
}

fn is_valid_video_id(id: &str) -> bool {
    id.len() == VIDEO_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract a video ID from a watch URL, a short link, or a bare ID.
///
/// Patterns are tried in order: `v=<id>`, `be/<id>`, then the whole trimmed
/// input. The first match wins.
pub fn extract_video_id(input: &str) -> std::result::Result<VideoId, InvalidReference> {
    let trimmed = input.trim();
    video_id_patterns()
        .iter()
        .find_map(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId(m.as_str().to_string()))
        .ok_or_else(|| InvalidReference(input.to_string()))
}

/// Extract the playlist ID carried by a `list=` parameter
pub fn extract_playlist_id(input: &str) -> Option<PlaylistId> {
    playlist_pattern()
        .captures(input.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| PlaylistId(m.as_str().to_string()))
}

/// Decide whether the input should be handled as a playlist
pub fn classify_input(input: &str) -> InputKind {
    if input.contains("playlist") && input.contains("list=") {
        InputKind::Playlist
    } else {
        InputKind::Video
    }
}

/// Enumerates the videos of a playlist
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaylistResolver: Send + Sync {
    /// Ordered watch URLs of every video in the playlist
    async fn resolve(&self, client: &HttpClient, playlist: &PlaylistId) -> Result<Vec<String>>;
}
