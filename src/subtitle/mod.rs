//! Subtitle module
//!
//! Converts caption tracks into transcripts:
//! - Line-oriented cue parsing with inline markup stripping
//! - Transcript assembly and text rendering

pub mod parser;

use serde::Serialize;

pub use parser::{parse_caption_track, TranscriptSegment};

/// Ordered transcript of one caption track
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    pub fn parse(track: &str) -> Self {
        Self {
            segments: parse_caption_track(track),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// One `[timestamp] text` line per segment
    pub fn to_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| format!("[{}] {}", s.timestamp, s.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Segment texts only, space-joined
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
