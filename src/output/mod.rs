use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod tokens;

pub use tokens::generate_token_report;

use crate::extractors::VideoId;
use crate::transcribe::TranscriptSegment;
use crate::Result;

/// Characters per estimated token
pub const CHARS_PER_TOKEN: usize = 4;

/// Persisted transcript of one video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    /// Segment texts joined by single spaces
    pub raw_content: String,

    /// Rough cost estimate, see [`estimate_tokens`]
    pub token_count: usize,

    /// Canonical watch URL
    pub url: String,
}

/// Approximate token count: one token per four characters, rounded down.
///
/// This is a cost heuristic, not a tokenizer. Dashboard totals are defined in
/// terms of this exact formula.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

/// Reduce segments to a single record
pub fn format_output(segments: &[TranscriptSegment], video_id: &VideoId) -> TranscriptRecord {
    let raw_content = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let token_count = estimate_tokens(&raw_content);

    TranscriptRecord {
        raw_content,
        token_count,
        url: video_id.watch_url(),
    }
}

/// Write `<target_dir>/<video_id>.json`, replacing any previous file
pub fn save_record(record: &TranscriptRecord, video_id: &VideoId, target_dir: &Path) -> Result<PathBuf> {
    fs_err::create_dir_all(target_dir)?;

    let path = target_dir.join(format!("{}.json", video_id));
    let content = serde_json::to_string_pretty(record).context("Failed to serialize transcript")?;
    fs_err::write(&path, content)?;

    tracing::info!("Formatted transcript saved to {}", path.display());
    Ok(path)
}
