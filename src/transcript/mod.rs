//! Transcript service
//!
//! Resolves a video URL to its id, asks the fetch tool for title, duration
//! and a caption track in one call, and parses the track. A video without
//! captions is a normal outcome and yields a placeholder transcript.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

use crate::cleanup::TempFiles;
use crate::config::{FetchConfig, ServerConfig, TranscriptConfig};
use crate::error::{ProcessorError, Result};
use crate::fetch::{fetch_error, FetchStrategy};
use crate::naming::new_artifact_id;
use crate::subtitle::Transcript;
use crate::tool::{Invocation, ToolRunner};

/// Transcript text used when no caption track is available
pub const TRANSCRIPT_UNAVAILABLE: &str = "Transcript not available for this video.";

const VIDEO_ID_LEN: usize = 11;

/// `POST /get-transcript` response body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResponse {
    pub video_id: String,
    pub title: String,
    /// Seconds; `None` when the tool could not tell
    pub duration: Option<f64>,
    pub transcript: String,
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract the 11-character video id from a watch, short-link, shorts,
/// embed or live URL.
pub fn extract_video_id(input: &str) -> Result<String> {
    let invalid = || ProcessorError::Validation(format!("Invalid YouTube URL: {}", input));

    let url = Url::parse(input.trim()).map_err(|_| invalid())?;
    let host = url.host_str().ok_or_else(invalid)?.to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .or_else(|| host.strip_prefix("music."))
        .unwrap_or(&host);

    let mut segments = url.path_segments().into_iter().flatten().filter(|s| !s.is_empty());

    let candidate = match host {
        "youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "youtube-nocookie.com" => match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("shorts") | Some("embed") | Some("live") | Some("v") => {
                segments.next().map(str::to_string)
            }
            _ => None,
        },
        _ => None,
    };

    candidate.filter(|id| is_video_id(id)).ok_or_else(invalid)
}

pub struct TranscriptService {
    runner: Arc<dyn ToolRunner>,
    temp_dir: PathBuf,
    fetch: FetchConfig,
    transcript: TranscriptConfig,
    strategy: FetchStrategy,
}

impl TranscriptService {
    pub fn new(runner: Arc<dyn ToolRunner>, config: &ServerConfig) -> Self {
        Self {
            runner,
            temp_dir: config.temp_dir.clone(),
            fetch: config.fetch.clone(),
            transcript: config.transcript.clone(),
            strategy: config.fetch.strategy(),
        }
    }

    fn build_invocation(&self, video_id: &str, output_stem: &Path) -> Invocation {
        let mut inv = Invocation::new(
            &self.fetch.binary,
            self.transcript.timeout(),
            self.fetch.max_output_bytes,
        );

        if let Some(extractor_args) = self.strategy.client.extractor_args() {
            inv.arg("--extractor-args").arg(extractor_args);
        }
        if let Some(cookies) = &self.strategy.credentials {
            inv.arg("--cookies").arg(cookies.as_os_str());
        }

        inv.args(["--skip-download", "--write-subs", "--write-auto-subs"]);
        inv.arg("--sub-langs").arg(&self.transcript.languages);
        inv.args(["--sub-format", "vtt", "--no-simulate", "--no-playlist"]);
        inv.args(["--print", "title", "--print", "duration"]);

        let mut template = output_stem.as_os_str().to_os_string();
        template.push(".%(ext)s");
        inv.arg("-o").arg(template);
        inv.arg("--")
            .arg(format!("https://www.youtube.com/watch?v={}", video_id));
        inv
    }

    pub async fn fetch(&self, url: &str) -> Result<TranscriptResponse> {
        let video_id = extract_video_id(url)?;
        tokio::fs::create_dir_all(&self.temp_dir).await?;

        let stem_id = new_artifact_id();
        let stem = self.temp_dir.join(&stem_id);
        let invocation = self.build_invocation(&video_id, &stem);

        tracing::info!(video_id = %video_id, job_id = %stem_id, "Fetching transcript");

        let mut files = TempFiles::new();
        let result = self.runner.run(&invocation).await;

        // Caption files may exist even when the tool failed afterwards
        let captions = self.caption_files(&stem_id).await;
        for path in &captions {
            files.track(path);
        }

        let output = result.map_err(|e| ProcessorError::Fetch(fetch_error(e)))?;
        let stdout = output.stdout_lossy();
        let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());
        let title = lines.next().unwrap_or("Unknown").to_string();
        let duration = lines.next().and_then(|d| d.parse::<f64>().ok());

        let transcript = match captions.iter().find(|p| has_extension(p, "vtt")) {
            Some(path) => match tokio::fs::read_to_string(path).await {
                Ok(track) => Transcript::parse(&track),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Unreadable caption track");
                    Transcript::default()
                }
            },
            None => Transcript::default(),
        };

        tracing::info!(
            video_id = %video_id,
            segments = transcript.segments.len(),
            "Transcript assembled"
        );

        let transcript = if transcript.is_empty() {
            TRANSCRIPT_UNAVAILABLE.to_string()
        } else {
            transcript.to_text()
        };

        Ok(TranscriptResponse {
            video_id,
            title,
            duration,
            transcript,
        })
    }

    /// Files the tool wrote for `stem_id`, sorted by name
    async fn caption_files(&self, stem_id: &str) -> Vec<PathBuf> {
        let prefix = format!("{}.", stem_id);
        let mut found = Vec::new();

        let mut dir = match tokio::fs::read_dir(&self.temp_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot list temp dir for caption files");
                return found;
            }
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                found.push(entry.path());
            }
        }

        found.sort();
        found
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().map(|e| e == ext).unwrap_or(false)
}
