use super::timedtext::{parse_timed_text, TimedTextSource};
use super::{ApiError, FetchOutcome, TranscriptApi, TranscriptSource, Unavailable};
use crate::extractors::VideoId;
use crate::transport::HttpClient;

/// Two-tier transcript retrieval: the transcript API first, then the raw
/// timed-text endpoint.
///
/// A blocked API call is retried exactly once over a direct connection. The
/// direct client is then also used for the fallback request. Every path ends
/// in a [`FetchOutcome`]; nothing here returns an error.
pub struct TranscriptFetcher {
    api: Box<dyn TranscriptApi>,
    timed_text: Box<dyn TimedTextSource>,
}

impl TranscriptFetcher {
    pub fn new(api: Box<dyn TranscriptApi>, timed_text: Box<dyn TimedTextSource>) -> Self {
        Self { api, timed_text }
    }

    pub async fn fetch(&self, client: &HttpClient, video_id: &VideoId, language: &str) -> FetchOutcome {
        let languages = vec![language.to_string()];
        let mut fallback_client = client.clone();

        match self.api.fetch(client, video_id, &languages).await {
            Ok(segments) => {
                return FetchOutcome::Found {
                    segments,
                    source: TranscriptSource::Api,
                };
            }
            Err(ApiError::TranscriptsDisabled(_)) => {
                tracing::info!("Transcripts are disabled for video {}", video_id);
                return FetchOutcome::Unavailable(Unavailable::TranscriptsDisabled);
            }
            Err(ApiError::NoTranscriptFound { .. }) => {
                tracing::info!("No '{}' transcript found for video {}", language, video_id);
                return FetchOutcome::Unavailable(Unavailable::NoTranscriptFound);
            }
            Err(ApiError::RequestBlocked(_)) => {
                tracing::warn!("Request blocked for {}, retrying without proxy", video_id);
                match client.without_proxy() {
                    Ok(direct) => {
                        match self.api.fetch(&direct, video_id, &languages).await {
                            Ok(segments) => {
                                return FetchOutcome::Found {
                                    segments,
                                    source: TranscriptSource::ApiWithoutProxy,
                                };
                            }
                            Err(e) => tracing::warn!("Retry failed for {}: {}", video_id, e),
                        }
                        fallback_client = direct;
                    }
                    Err(e) => tracing::warn!("Could not build direct client: {:#}", e),
                }
            }
            Err(ApiError::MalformedResponse(reason)) => {
                tracing::warn!(
                    "Malformed transcript response for {} ({}), falling back to timed-text",
                    video_id,
                    reason
                );
            }
            Err(e) => {
                tracing::warn!("Transcript request failed for {}: {}", video_id, e);
                return FetchOutcome::Unavailable(Unavailable::Request(e.to_string()));
            }
        }

        self.fetch_timed_text(&fallback_client, video_id, language).await
    }

    async fn fetch_timed_text(&self, client: &HttpClient, video_id: &VideoId, language: &str) -> FetchOutcome {
        let response = match self.timed_text.fetch(client, video_id, language).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Timed-text fetch failed for {}: {:#}", video_id, e);
                return FetchOutcome::Unavailable(Unavailable::Request(format!("{:#}", e)));
            }
        };

        if !response.is_success() {
            return FetchOutcome::Unavailable(Unavailable::TimedTextStatus(response.status));
        }
        if response.body.trim().is_empty() {
            return FetchOutcome::Unavailable(Unavailable::TimedTextEmpty);
        }

        match parse_timed_text(&response.body) {
            Ok(segments) => FetchOutcome::Found {
                segments,
                source: TranscriptSource::TimedText,
            },
            Err(e) => {
                tracing::warn!("Timed-text parse failed for {}: {}", video_id, e);
                FetchOutcome::Unavailable(Unavailable::MalformedResponse(e.to_string()))
            }
        }
    }
}
