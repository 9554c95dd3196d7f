use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use super::timedtext::parse_timed_text;
use super::{ApiError, TranscriptApi, TranscriptSegment};
use crate::extractors::VideoId;
use crate::transport::HttpClient;

const INNERTUBE_PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

/// One caption track advertised by the player
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    pub kind: Option<String>,
}

impl CaptionTrack {
    /// Auto-generated (speech recognition) track
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Pick the first requested language, preferring manual captions over
/// generated ones for the same language
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    languages.iter().find_map(|lang| {
        tracks
            .iter()
            .find(|t| &t.language_code == lang && !t.is_generated())
            .or_else(|| tracks.iter().find(|t| &t.language_code == lang))
    })
}

/// Transcript API backed by the watch page and the innertube player endpoint
pub struct YoutubeTranscriptApi {
    api_key_pattern: Regex,
}

impl YoutubeTranscriptApi {
    pub fn new() -> Self {
        Self {
            api_key_pattern: Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#)
                .expect("valid regex"),
        }
    }

    async fn fetch_watch_page(&self, client: &HttpClient, video_id: &VideoId) -> Result<String, ApiError> {
        let response = client
            .get(&video_id.watch_url())
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("Failed to fetch watch page: {}", e)))?;
        check_status(response.status(), video_id)?;

        response
            .text()
            .await
            .map_err(|e| ApiError::Http(format!("Failed to read watch page: {}", e)))
    }

    /// Pull the innertube key out of the watch page
    pub fn extract_api_key(&self, html: &str, video_id: &VideoId) -> Result<String, ApiError> {
        if html.contains("g-recaptcha") {
            return Err(ApiError::RequestBlocked(video_id.to_string()));
        }

        self.api_key_pattern
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ApiError::MalformedResponse(format!("no innertube key on watch page for {}", video_id)))
    }

    async fn fetch_player(
        &self,
        client: &HttpClient,
        video_id: &VideoId,
        api_key: &str,
    ) -> Result<PlayerResponse, ApiError> {
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": "20.10.38"
                }
            },
            "videoId": video_id.as_str()
        });

        let response = client
            .post(INNERTUBE_PLAYER_URL)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("Failed to query player: {}", e)))?;
        check_status(response.status(), video_id)?;

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Http(format!("Failed to read player response: {}", e)))?;

        serde_json::from_str(&text)
            .map_err(|e| ApiError::MalformedResponse(format!("player response: {}", e)))
    }

    async fn fetch_track(
        &self,
        client: &HttpClient,
        video_id: &VideoId,
        track: &CaptionTrack,
    ) -> Result<Vec<TranscriptSegment>, ApiError> {
        let url = track.base_url.replace("&fmt=srv3", "");
        if url.contains("&exp=xpe") {
            return Err(ApiError::PoTokenRequired(video_id.to_string()));
        }

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("Failed to fetch captions: {}", e)))?;
        check_status(response.status(), video_id)?;

        let xml = response
            .text()
            .await
            .map_err(|e| ApiError::Http(format!("Failed to read captions: {}", e)))?;

        parse_timed_text(&xml).map_err(|e| ApiError::MalformedResponse(e.to_string()))
    }
}

fn check_status(status: reqwest::StatusCode, video_id: &VideoId) -> Result<(), ApiError> {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ApiError::RequestBlocked(video_id.to_string()));
    }
    if !status.is_success() {
        return Err(ApiError::Http(format!("HTTP {}", status)));
    }
    Ok(())
}

/// Caption tracks of a playable video
fn caption_tracks(video_id: &VideoId, player: PlayerResponse) -> Result<Vec<CaptionTrack>, ApiError> {
    if let Some(playability) = &player.playability_status {
        let reason = playability.reason.as_deref().unwrap_or_default();
        match playability.status.as_str() {
            "OK" => {}
            "LOGIN_REQUIRED" if reason.contains("not a bot") => {
                return Err(ApiError::RequestBlocked(video_id.to_string()));
            }
            _ => {
                return Err(ApiError::VideoUnplayable {
                    video_id: video_id.to_string(),
                    reason: reason.to_string(),
                });
            }
        }
    }

    let tracks = player
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .map(|r| r.caption_tracks)
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(ApiError::TranscriptsDisabled(video_id.to_string()));
    }

    Ok(tracks)
}

#[async_trait]
impl TranscriptApi for YoutubeTranscriptApi {
    async fn fetch(
        &self,
        client: &HttpClient,
        video_id: &VideoId,
        languages: &[String],
    ) -> Result<Vec<TranscriptSegment>, ApiError> {
        let html = self.fetch_watch_page(client, video_id).await?;
        let api_key = self.extract_api_key(&html, video_id)?;
        let player = self.fetch_player(client, video_id, &api_key).await?;
        let tracks = caption_tracks(video_id, player)?;

        let track = select_track(&tracks, languages).ok_or_else(|| ApiError::NoTranscriptFound {
            video_id: video_id.to_string(),
            languages: languages.to_vec(),
        })?;

        tracing::debug!(
            "Using {} caption track '{}' for {}",
            if track.is_generated() { "generated" } else { "manual" },
            track.language_code,
            video_id
        );

        self.fetch_track(client, video_id, track).await
    }
}

impl Default for YoutubeTranscriptApi {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video() -> VideoId {
        VideoId::new("dQw4w9WgXcQ").unwrap()
    }

    fn track(lang: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://www.youtube.com/api/timedtext?lang={}", lang),
            language_code: lang.to_string(),
            kind: kind.map(str::to_string),
        }
    }

    #[test]
    fn test_rate_limit_means_blocked() {
        assert_eq!(
            check_status(reqwest::StatusCode::TOO_MANY_REQUESTS, &video()),
            Err(ApiError::RequestBlocked("dQw4w9WgXcQ".to_string()))
        );
    }

    #[test]
    fn test_other_error_statuses_are_http_errors() {
        assert!(matches!(
            check_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &video()),
            Err(ApiError::Http(ref msg)) if msg.contains("500")
        ));
        assert!(matches!(
            check_status(reqwest::StatusCode::FORBIDDEN, &video()),
            Err(ApiError::Http(_))
        ));
        assert_eq!(check_status(reqwest::StatusCode::OK, &video()), Ok(()));
    }

    #[test]
    fn test_select_track_prefers_manual() {
        let tracks = vec![track("id", Some("asr")), track("en", None), track("id", None)];
        let chosen = select_track(&tracks, &["id".to_string()]).unwrap();
        assert_eq!(chosen.language_code, "id");
        assert!(!chosen.is_generated());
    }

    #[test]
    fn test_select_track_falls_back_to_generated() {
        let tracks = vec![track("id", Some("asr")), track("en", None)];
        let chosen = select_track(&tracks, &["id".to_string()]).unwrap();
        assert!(chosen.is_generated());
        assert!(select_track(&tracks, &["fr".to_string()]).is_none());
    }

    #[test]
    fn test_extract_api_key() {
        let api = YoutubeTranscriptApi::new();
        let html = r#"ytcfg.set({"INNERTUBE_API_KEY": "AIzaSyA-test_key"});"#;
        assert_eq!(api.extract_api_key(html, &video()).unwrap(), "AIzaSyA-test_key");

        assert!(matches!(
            api.extract_api_key("<div class=\"g-recaptcha\"></div>", &video()),
            Err(ApiError::RequestBlocked(_))
        ));
        assert!(matches!(
            api.extract_api_key("<html></html>", &video()),
            Err(ApiError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_caption_tracks_from_player_response() {
        let player: PlayerResponse = serde_json::from_str(
            r#"{
                "playabilityStatus": {"status": "OK"},
                "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                    {"baseUrl": "https://example.com/a", "languageCode": "id", "kind": "asr"}
                ]}}
            }"#,
        )
        .unwrap();

        let tracks = caption_tracks(&video(), player).unwrap();
        assert_eq!(tracks.len(), 1);
        assert!(tracks[0].is_generated());
    }

    #[test]
    fn test_missing_captions_means_disabled() {
        let player: PlayerResponse =
            serde_json::from_str(r#"{"playabilityStatus": {"status": "OK"}}"#).unwrap();
        assert!(matches!(
            caption_tracks(&video(), player),
            Err(ApiError::TranscriptsDisabled(_))
        ));
    }

    #[test]
    fn test_bot_check_means_blocked() {
        let player: PlayerResponse = serde_json::from_str(
            r#"{"playabilityStatus": {"status": "LOGIN_REQUIRED", "reason": "Sign in to confirm you're not a bot"}}"#,
        )
        .unwrap();
        assert!(matches!(
            caption_tracks(&video(), player),
            Err(ApiError::RequestBlocked(_))
        ));
    }

    #[test]
    fn test_unplayable_video() {
        let player: PlayerResponse = serde_json::from_str(
            r#"{"playabilityStatus": {"status": "ERROR", "reason": "Video unavailable"}}"#,
        )
        .unwrap();
        assert!(matches!(
            caption_tracks(&video(), player),
            Err(ApiError::VideoUnplayable { .. })
        ));
    }
}
