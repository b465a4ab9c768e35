//! Fetch stage
//!
//! Materializes a bounded time window of a remote video as one local file by
//! invoking the external media-fetching tool under a [`FetchStrategy`].

pub mod credentials;
pub mod strategy;

use std::path::{Path, PathBuf};

use crate::config::FetchConfig;
use crate::error::{FetchError, FetchFailure, ToolError};
use crate::tool::{Invocation, ToolRunner};

pub use strategy::{ClientIdentity, FetchStrategy, WindowMode};

/// Time window to retrieve, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub duration: f64,
}

impl TimeWindow {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Format seconds for tool arguments: `30`, `12.5`, `0.333`
pub fn seconds_arg(secs: f64) -> String {
    let text = format!("{:.3}", secs);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Build the fetch tool invocation for one window
pub fn build_invocation(
    config: &FetchConfig,
    source: &str,
    window: TimeWindow,
    strategy: &FetchStrategy,
    output: &Path,
) -> Invocation {
    let mut inv = Invocation::new(&config.binary, config.timeout(), config.max_output_bytes);

    if let Some(extractor_args) = strategy.client.extractor_args() {
        inv.arg("--extractor-args").arg(extractor_args);
    }
    if let Some(cookies) = &strategy.credentials {
        inv.arg("--cookies").arg(cookies.as_os_str());
    }

    inv.arg("-f").arg(&config.format);
    inv.args(["--no-playlist", "--no-progress"]);

    match strategy.window {
        WindowMode::SliceDuringFetch => {
            inv.arg("--download-sections").arg(format!(
                "*{}-{}",
                seconds_arg(window.start),
                seconds_arg(window.end())
            ));
            inv.arg("--force-keyframes-at-cuts");
        }
        WindowMode::SectionRequest => {
            inv.arg("--downloader").arg("ffmpeg");
            inv.arg("--downloader-args").arg(format!(
                "ffmpeg_i:-ss {} -t {}",
                seconds_arg(window.start),
                seconds_arg(window.duration)
            ));
        }
    }

    inv.arg("-o").arg(output.as_os_str());
    inv.arg("--").arg(source);
    inv
}

/// Fetch `window` of `source` into `output`.
///
/// The caller owns `output` and must attempt to delete it whatever the result.
pub async fn fetch(
    runner: &dyn ToolRunner,
    config: &FetchConfig,
    source: &str,
    window: TimeWindow,
    strategy: &FetchStrategy,
    output: &Path,
) -> Result<PathBuf, FetchError> {
    let invocation = build_invocation(config, source, window, strategy, output);

    tracing::info!(
        start = window.start,
        duration = window.duration,
        client = ?strategy.client,
        window_mode = ?strategy.window,
        cookies = strategy.credentials.is_some(),
        "Fetching segment"
    );

    runner.run(&invocation).await.map_err(fetch_error)?;

    match tokio::fs::metadata(output).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(output.to_path_buf()),
        Ok(_) => Err(FetchError::new(
            FetchFailure::ToolFailure,
            format!("fetch tool produced an empty file at {}", output.display()),
        )),
        Err(_) => Err(FetchError::new(
            FetchFailure::ToolFailure,
            format!("fetch tool reported success but wrote no file at {}", output.display()),
        )),
    }
}

pub(crate) fn fetch_error(err: ToolError) -> FetchError {
    match err {
        ToolError::Timeout { .. } => FetchError::new(FetchFailure::Timeout, err.to_string()),
        ToolError::OutputTooLarge { .. } => {
            FetchError::new(FetchFailure::OutputTooLarge, err.to_string())
        }
        ToolError::Exited { stderr, status, .. } => {
            let detail = if stderr.trim().is_empty() { status } else { stderr };
            FetchError::new(FetchFailure::ToolFailure, detail)
        }
        other => FetchError::new(FetchFailure::ToolFailure, other.to_string()),
    }
}
