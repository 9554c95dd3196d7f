//! Transcript Scraper - collect YouTube transcripts into a project tree
//!
//! Video and playlist references are resolved to video IDs, transcripts are
//! fetched through a Tor-proxied client (with a direct retry and the legacy
//! timed-text endpoint as fallbacks) and saved as one JSON record per video
//! under `<root>/<project>/<subproject>/`. Stats and token reports are
//! computed from the saved files.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod projects;
pub mod stats;
pub mod transcribe;
pub mod transport;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use extractors::{extract_video_id, InvalidReference, PlaylistId, VideoId};
pub use output::{format_output, save_record, TranscriptRecord};
pub use projects::{ProjectError, ProjectStore};
pub use transcribe::{FetchOutcome, TranscriptPipeline, TranscriptSegment, Unavailable, VideoReport};
pub use transport::{build_client, ConnectionStatus, HttpClient};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
