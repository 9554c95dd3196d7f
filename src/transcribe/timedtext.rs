use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::str::FromStr;
use std::time::Duration;

use super::TranscriptSegment;
use crate::extractors::VideoId;
use crate::transport::HttpClient;
use crate::Result;

/// Raw caption endpoint used when the transcript API gives up
pub const DEFAULT_TIMED_TEXT_URL: &str = "http://video.google.com/timedtext";

/// Status and body of a timed-text request
#[derive(Debug, Clone, PartialEq)]
pub struct TimedTextResponse {
    pub status: u16,
    pub body: String,
}

impl TimedTextResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Source of raw timed-text caption documents
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimedTextSource: Send + Sync {
    async fn fetch(
        &self,
        client: &HttpClient,
        video_id: &VideoId,
        language: &str,
    ) -> Result<TimedTextResponse>;
}

/// The public `timedtext` endpoint
pub struct TimedTextEndpoint {
    base_url: String,
    timeout: Duration,
}

impl TimedTextEndpoint {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    /// `GET <base>?lang=<language>&v=<id>` with the configured timeout
    fn request(&self, client: &HttpClient, video_id: &VideoId, language: &str) -> reqwest::RequestBuilder {
        client
            .get(&self.base_url)
            .query(&[("lang", language), ("v", video_id.as_str())])
            .timeout(self.timeout)
    }
}

impl Default for TimedTextEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_TIMED_TEXT_URL, Duration::from_secs(10))
    }
}

#[async_trait]
impl TimedTextSource for TimedTextEndpoint {
    async fn fetch(
        &self,
        client: &HttpClient,
        video_id: &VideoId,
        language: &str,
    ) -> Result<TimedTextResponse> {
        tracing::debug!("GET {} for {} ({})", self.base_url, video_id, language);

        let response = self.request(client, video_id, language).send().await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(TimedTextResponse { status, body })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TimedTextError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document has no root element")]
    NoRootElement,

    #[error("document ended inside an open element")]
    Truncated,
}

fn get_attr<T>(e: &BytesStart, attr: &str) -> Option<T>
where
    T: FromStr,
{
    e.try_get_attribute(attr)
        .ok()?
        .and_then(|a| a.unescape_value().ok()?.trim().parse().ok())
}

struct PendingSegment {
    start: f64,
    duration: f64,
    text: String,
}

impl PendingSegment {
    fn from_element(e: &BytesStart) -> Self {
        Self {
            start: get_attr(e, "start").unwrap_or(0.0),
            duration: get_attr(e, "dur").unwrap_or(0.0),
            text: String::new(),
        }
    }

    fn finish(self) -> TranscriptSegment {
        TranscriptSegment {
            text: self.text.trim().replace('\n', " "),
            start: self.start,
            duration: self.duration,
        }
    }
}

/// Parse a `<transcript><text start=".." dur="..">..</text></transcript>` document.
///
/// Only `<text>` elements that are direct children of the root become
/// segments. Missing or unparsable `start`/`dur` attributes read as 0.
pub fn parse_timed_text(xml: &str) -> std::result::Result<Vec<TranscriptSegment>, TimedTextError> {
    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut pending: Option<PendingSegment> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                if depth == 1 {
                    saw_root = true;
                } else if depth == 2 && e.name().as_ref() == b"text" {
                    pending = Some(PendingSegment::from_element(&e));
                }
            }
            Event::Empty(e) => {
                if depth == 0 {
                    saw_root = true;
                } else if depth == 1 && e.name().as_ref() == b"text" {
                    segments.push(PendingSegment::from_element(&e).finish());
                }
            }
            Event::Text(e) => {
                if let Some(segment) = pending.as_mut() {
                    segment.text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(segment) = pending.as_mut() {
                    segment.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    if let Some(segment) = pending.take() {
                        segments.push(segment.finish());
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => (),
        }
    }

    if !saw_root {
        return Err(TimedTextError::NoRootElement);
    }
    if depth != 0 {
        return Err(TimedTextError::Truncated);
    }

    Ok(segments)
}
