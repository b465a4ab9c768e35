//! Caption track parser
//!
//! Turns a WebVTT-style caption stream into ordered transcript segments.
//! The parser is a two-state machine over input lines: `Seeking` before the
//! first cue, `Accumulating` while collecting a cue's text lines.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Literal first line of a caption stream
const STREAM_HEADER: &str = "WEBVTT";

/// Cue timing separator
const TIMING_ARROW: &str = "-->";

/// One caption cue: its start timestamp and its text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptSegment {
    pub timestamp: String,
    pub text: String,
}

#[derive(Debug)]
enum State {
    Seeking,
    Accumulating { start: String, text: String },
}

/// Inline tags: `<c>`, `<00:00:01.200>`, `</c>`, `[Music]`
fn markup() -> &'static Regex {
    static MARKUP: OnceLock<Regex> = OnceLock::new();
    MARKUP.get_or_init(|| Regex::new(r"<[^>]*>|\[[^\]]*\]").expect("static regex"))
}

/// Remove inline markup and normalize whitespace
pub fn strip_markup(line: &str) -> String {
    let stripped = markup().replace_all(line, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_ignored(line: &str) -> bool {
    line.is_empty() || line == STREAM_HEADER || line.chars().all(|c| c.is_ascii_digit())
}

/// Parse a caption track into segments in source order.
///
/// Input without cues yields an empty vector.
pub fn parse_caption_track(input: &str) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();
    let mut state = State::Seeking;

    for raw in input.lines() {
        let line = raw.trim();

        if let Some((cue_start, _)) = line.split_once(TIMING_ARROW) {
            if let State::Accumulating { start, text } = state {
                if !text.is_empty() {
                    segments.push(TranscriptSegment {
                        timestamp: start,
                        text,
                    });
                }
            }
            state = State::Accumulating {
                start: cue_start.trim().to_string(),
                text: String::new(),
            };
            continue;
        }

        if is_ignored(line) {
            continue;
        }

        // Header metadata (Kind:, Language:) precedes the first cue
        if let State::Accumulating { text, .. } = &mut state {
            let clean = strip_markup(line);
            if clean.is_empty() {
                continue;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&clean);
        }
    }

    if let State::Accumulating { start, text } = state {
        if !text.is_empty() {
            segments.push(TranscriptSegment {
                timestamp: start,
                text,
            });
        }
    }

    segments
}
