//! Segment requests
//!
//! The wire body is deserialized leniently (every field optional) and then
//! validated into an immutable [`SegmentRequest`], so a missing field is a
//! validation failure rather than a JSON error.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ProcessorError, Result};
use crate::fetch::TimeWindow;
use crate::render::overlay::{DEFAULT_CAPTION, DEFAULT_CTA};

/// Segment length when the request names none
pub const DEFAULT_DURATION_SECS: f64 = 60.0;

/// `POST /process-segment` body as received
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRequestBody {
    pub video_url: Option<String>,
    pub start_time: Option<f64>,
    pub duration: Option<f64>,
    pub caption: Option<String>,
    pub cta: Option<String>,
}

/// A validated segment request
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRequest {
    pub source: String,
    pub window: TimeWindow,
    pub caption: String,
    pub cta: String,
}

impl SegmentRequest {
    pub fn start(&self) -> f64 {
        self.window.start
    }

    pub fn duration(&self) -> f64 {
        self.window.duration
    }
}

impl TryFrom<SegmentRequestBody> for SegmentRequest {
    type Error = ProcessorError;

    fn try_from(body: SegmentRequestBody) -> Result<Self> {
        let (source, start) = match (body.video_url, body.start_time) {
            (Some(url), Some(start)) if !url.trim().is_empty() => (url.trim().to_string(), start),
            _ => {
                return Err(ProcessorError::Validation(
                    "videoUrl and startTime required".to_string(),
                ))
            }
        };

        validate_source(&source)?;

        if !start.is_finite() || start < 0.0 {
            return Err(ProcessorError::Validation(format!(
                "startTime must be a non-negative number of seconds, got {}",
                start
            )));
        }

        let duration = body.duration.unwrap_or(DEFAULT_DURATION_SECS);
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ProcessorError::Validation(format!(
                "duration must be a positive number of seconds, got {}",
                duration
            )));
        }

        Ok(Self {
            source,
            window: TimeWindow { start, duration },
            caption: body.caption.unwrap_or_else(|| DEFAULT_CAPTION.to_string()),
            cta: body.cta.unwrap_or_else(|| DEFAULT_CTA.to_string()),
        })
    }
}

fn validate_source(source: &str) -> Result<()> {
    let url = Url::parse(source)
        .map_err(|e| ProcessorError::Validation(format!("videoUrl is not a valid URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        scheme => Err(ProcessorError::Validation(format!(
            "videoUrl must be an http(s) URL, got scheme '{}'",
            scheme
        ))),
    }
}
