//! External tool boundary
//!
//! The fetch and render stages describe the process they need as an
//! [`Invocation`]; a [`ToolRunner`] executes it. The production runner is
//! [`process::ProcessRunner`]; tests inject scripted runners.

pub mod process;

use async_trait::async_trait;
use std::ffi::OsString;
use std::time::Duration;

use crate::error::ToolError;

pub use process::ProcessRunner;

/// One external process call
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Executable name or path
    pub program: String,
    /// Arguments, passed verbatim (no shell)
    pub args: Vec<OsString>,
    /// Wall-clock limit; the process is killed once it elapses
    pub timeout: Duration,
    /// Ceiling for captured stdout and stderr, each
    pub max_output_bytes: usize,
}

impl Invocation {
    pub fn new(program: impl Into<String>, timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
            max_output_bytes,
        }
    }

    pub fn arg(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Value following `flag`, if present
    pub fn value_of(&self, flag: &str) -> Option<&OsString> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
    }

    /// Arguments as lossy strings, for logs and assertions
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Captured output of a successful invocation
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Executes external tools
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run to completion. Non-zero exit is [`ToolError::Exited`].
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError>;
}

/// Trim tool output for log lines
pub(crate) fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
