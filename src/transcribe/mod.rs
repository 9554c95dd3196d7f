use anyhow::Context;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod fetcher;
pub mod innertube;
pub mod timedtext;

pub use fetcher::TranscriptFetcher;

use crate::config::Config;
use crate::extractors::playlist::YoutubePlaylist;
use crate::extractors::{self, InputKind, PlaylistResolver, VideoId};
use crate::output;
use crate::transport::HttpClient;
use crate::Result;

/// One timed caption unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Caption text
    pub text: String,

    /// Start offset in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

/// Failures reported by a transcript API
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Transcripts are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("No transcript found for video {video_id} in {languages:?}")]
    NoTranscriptFound { video_id: String, languages: Vec<String> },

    #[error("Request blocked for video {0}")]
    RequestBlocked(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Video {video_id} is unplayable: {reason}")]
    VideoUnplayable { video_id: String, reason: String },

    #[error("Captions for video {0} require a proof-of-origin token")]
    PoTokenRequired(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Transcript retrieval service: "fetch transcript for video ID in language"
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptApi: Send + Sync {
    async fn fetch(
        &self,
        client: &HttpClient,
        video_id: &VideoId,
        languages: &[String],
    ) -> std::result::Result<Vec<TranscriptSegment>, ApiError>;
}

/// Which tier produced a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptSource {
    Api,
    ApiWithoutProxy,
    TimedText,
}

impl fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptSource::Api => write!(f, "transcript API"),
            TranscriptSource::ApiWithoutProxy => write!(f, "transcript API (direct retry)"),
            TranscriptSource::TimedText => write!(f, "timed-text fallback"),
        }
    }
}

/// Why no transcript came back
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Unavailable {
    #[error("transcripts are disabled")]
    TranscriptsDisabled,

    #[error("no transcript in the requested language")]
    NoTranscriptFound,

    #[error("timed-text endpoint returned no captions")]
    TimedTextEmpty,

    #[error("timed-text endpoint answered HTTP {0}")]
    TimedTextStatus(u16),

    #[error("malformed caption response: {0}")]
    MalformedResponse(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// Result of running the fetch fallback chain for one video
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found {
        segments: Vec<TranscriptSegment>,
        source: TranscriptSource,
    },
    Unavailable(Unavailable),
}

impl FetchOutcome {
    /// Segments if any were found, empty otherwise
    pub fn segments(&self) -> &[TranscriptSegment] {
        match self {
            FetchOutcome::Found { segments, .. } => segments,
            FetchOutcome::Unavailable(_) => &[],
        }
    }

    pub fn source(&self) -> Option<TranscriptSource> {
        match self {
            FetchOutcome::Found { source, .. } => Some(*source),
            FetchOutcome::Unavailable(_) => None,
        }
    }
}

/// Per-video notification produced by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum VideoReport {
    Saved {
        video_id: VideoId,
        path: PathBuf,
        token_count: usize,
        source: TranscriptSource,
    },
    Skipped {
        video_id: VideoId,
        reason: String,
    },
    Invalid {
        input: String,
        reason: String,
    },
}

impl VideoReport {
    pub fn is_saved(&self) -> bool {
        matches!(self, VideoReport::Saved { .. })
    }
}

impl fmt::Display for VideoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoReport::Saved {
                video_id,
                path,
                token_count,
                source,
            } => write!(
                f,
                "Saved {}.json to {} ({} tokens, via {})",
                video_id,
                path.parent().unwrap_or(path).display(),
                token_count,
                source
            ),
            VideoReport::Skipped { video_id, reason } => {
                write!(f, "No transcript for {}: {}", video_id, reason)
            }
            VideoReport::Invalid { input, reason } => write!(f, "Skipped '{}': {}", input, reason),
        }
    }
}

/// Fetch → format → save orchestrator.
///
/// Owns the one HTTP client for its lifetime. Videos are processed strictly
/// one after another; a failure to find a transcript is reported and never
/// stops a playlist run. Only filesystem write failures become errors.
pub struct TranscriptPipeline {
    client: HttpClient,
    fetcher: TranscriptFetcher,
    playlists: Box<dyn PlaylistResolver>,
    language: String,
    show_progress: bool,
}

impl TranscriptPipeline {
    pub fn new(
        client: HttpClient,
        fetcher: TranscriptFetcher,
        playlists: Box<dyn PlaylistResolver>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            client,
            fetcher,
            playlists,
            language: language.into(),
            show_progress: false,
        }
    }

    /// Pipeline wired to the real YouTube collaborators
    pub fn from_config(config: &Config, client: HttpClient) -> Self {
        let fetcher = TranscriptFetcher::new(
            Box::new(innertube::YoutubeTranscriptApi::new()),
            Box::new(timedtext::TimedTextEndpoint::new(
                config.scraper.timed_text_url.clone(),
                Duration::from_secs(config.scraper.timed_text_timeout_secs),
            )),
        );

        Self::new(
            client,
            fetcher,
            Box::new(YoutubePlaylist::new()),
            config.scraper.language.clone(),
        )
    }

    /// Show a spinner while walking playlists
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Override the transcript language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Process a video or playlist reference into `target_dir`
    pub async fn process(&self, input: &str, target_dir: &Path) -> Result<Vec<VideoReport>> {
        match extractors::classify_input(input) {
            InputKind::Playlist => self.process_playlist(input, target_dir).await,
            InputKind::Video => Ok(vec![self.process_video(input, target_dir).await?]),
        }
    }

    /// Process a single video reference
    pub async fn process_video(&self, input: &str, target_dir: &Path) -> Result<VideoReport> {
        let video_id = match extractors::extract_video_id(input) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("{}", e);
                return Ok(VideoReport::Invalid {
                    input: input.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        tracing::info!("Fetching transcript for {}", video_id);
        let outcome = self.fetcher.fetch(&self.client, &video_id, &self.language).await;

        let source = match &outcome {
            FetchOutcome::Found { segments, source } if !segments.is_empty() => *source,
            FetchOutcome::Found { .. } => {
                return Ok(VideoReport::Skipped {
                    video_id,
                    reason: "transcript is empty".to_string(),
                });
            }
            FetchOutcome::Unavailable(reason) => {
                return Ok(VideoReport::Skipped {
                    video_id,
                    reason: reason.to_string(),
                });
            }
        };

        let record = output::format_output(outcome.segments(), &video_id);
        let path = output::save_record(&record, &video_id, target_dir)
            .with_context(|| format!("Failed to save transcript for {}", video_id))?;

        Ok(VideoReport::Saved {
            video_id,
            path,
            token_count: record.token_count,
            source,
        })
    }

    /// Process every video of a playlist into `<target_dir>/<playlist_id>/`
    pub async fn process_playlist(&self, input: &str, target_dir: &Path) -> Result<Vec<VideoReport>> {
        let playlist_id = extractors::extract_playlist_id(input)
            .with_context(|| format!("Could not extract playlist ID from '{}'", input))?;
        tracing::info!("Detected playlist ID: {}", playlist_id);

        let video_urls = self
            .playlists
            .resolve(&self.client, &playlist_id)
            .await
            .with_context(|| format!("Error reading playlist {}", playlist_id))?;

        let out_dir = target_dir.join(playlist_id.as_str());

        let progress = if self.show_progress {
            ProgressBar::new(video_urls.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap(),
        );
        progress.enable_steady_tick(Duration::from_millis(120));

        let mut reports = Vec::with_capacity(video_urls.len());
        for url in &video_urls {
            progress.set_message(url.clone());
            let report = self.process_video(url, &out_dir).await?;
            if !report.is_saved() {
                progress.println(report.to_string());
            }
            reports.push(report);
            progress.inc(1);
        }

        let saved = reports.iter().filter(|r| r.is_saved()).count();
        progress.finish_with_message(format!("{} of {} transcripts saved", saved, reports.len()));

        Ok(reports)
    }
}
