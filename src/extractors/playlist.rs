use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;

use super::{PlaylistId, PlaylistResolver, VideoId};
use crate::transport::HttpClient;
use crate::Result;

/// Playlist enumerator that scrapes the public playlist page.
///
/// Only the videos rendered into the initial page data are returned, which
/// covers the first hundred entries of a playlist.
pub struct YoutubePlaylist {
    entry_pattern: Regex,
}

impl YoutubePlaylist {
    pub fn new() -> Self {
        Self {
            entry_pattern: Regex::new(
                r#""playlistVideoRenderer":\{"videoId":"([0-9A-Za-z_-]{11})""#,
            )
            .expect("valid regex"),
        }
    }

    /// Pull ordered, de-duplicated watch URLs out of a playlist page
    pub fn parse_video_urls(&self, html: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entry_pattern
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| VideoId::new(m.as_str()).ok())
            .filter(|id| seen.insert(id.clone()))
            .map(|id| id.watch_url())
            .collect()
    }
}

#[async_trait]
impl PlaylistResolver for YoutubePlaylist {
    async fn resolve(&self, client: &HttpClient, playlist: &PlaylistId) -> Result<Vec<String>> {
        let url = playlist.playlist_url();
        tracing::debug!("Fetching playlist page: {}", url);

        let response = client.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to read playlist {}: HTTP {}", playlist, response.status());
        }

        let html = response.text().await?;
        let urls = self.parse_video_urls(&html);
        if urls.is_empty() {
            anyhow::bail!("Playlist {} has no readable videos", playlist);
        }

        tracing::info!("Playlist {} lists {} videos", playlist, urls.len());
        Ok(urls)
    }
}

impl Default for YoutubePlaylist {
    fn default() -> Self {
        Self::new()
    }
}
