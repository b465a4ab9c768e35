use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the segment processor
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Fetch stage failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Render stage failed: {0}")]
    Render(#[from] RenderError),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProcessorError {
    /// Pipeline stage the error originated in, if any
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            ProcessorError::Fetch(_) => Some("fetch"),
            ProcessorError::Render(_) => Some("render"),
            _ => None,
        }
    }
}

/// Why the fetch stage failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    Timeout,
    OutputTooLarge,
    ToolFailure,
}

impl FetchFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchFailure::Timeout => "timeout",
            FetchFailure::OutputTooLarge => "output_too_large",
            FetchFailure::ToolFailure => "tool_failure",
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch stage error: a reason plus the captured diagnostic text
#[derive(Error, Debug, Clone)]
#[error("{reason}: {detail}")]
pub struct FetchError {
    pub reason: FetchFailure,
    pub detail: String,
}

impl FetchError {
    pub fn new(reason: FetchFailure, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

/// Why the render stage failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFailure {
    Timeout,
    ToolFailure,
}

impl RenderFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderFailure::Timeout => "timeout",
            RenderFailure::ToolFailure => "tool_failure",
        }
    }
}

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render stage error
#[derive(Error, Debug, Clone)]
#[error("{reason}: {detail}")]
pub struct RenderError {
    pub reason: RenderFailure,
    pub detail: String,
}

impl RenderError {
    pub fn new(reason: RenderFailure, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

/// Errors raised at the external-process boundary
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {limit:?}")]
    Timeout { program: String, limit: Duration },

    #[error("{program} produced more than {limit} bytes of output")]
    OutputTooLarge { program: String, limit: usize },

    #[error("{program} exited with {status}")]
    Exited {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ProcessorError>;
