//! Test fixtures for integration tests
//!
//! [`FakeRunner`] stands in for the fetch and transcode tools: it writes the
//! files the real tools would write and can be scripted to fail per tool.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{DeliveryMode, ServerConfig};
use crate::error::ToolError;
use crate::state::AppState;
use crate::store::ArtifactStore;
use crate::tool::{Invocation, ToolOutput, ToolRunner};

pub const FETCH_BIN: &str = "yt-dlp";
pub const RENDER_BIN: &str = "ffmpeg";

/// Bytes the fake fetch tool writes
pub const RAW_BYTES: &[u8] = b"raw-segment";

/// What one fake tool does when invoked
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Write the expected output file and exit 0
    Succeed,
    /// Write a partial file, then exit non-zero with this stderr
    Fail(&'static str),
    /// Write a partial file, then hit the wall-clock limit
    Timeout,
}

pub struct FakeRunner {
    fetch: Behavior,
    render: Behavior,
    calls: Mutex<Vec<Invocation>>,
}

impl FakeRunner {
    pub fn new(fetch: Behavior, render: Behavior) -> Arc<Self> {
        Arc::new(Self {
            fetch,
            render,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn working() -> Arc<Self> {
        Self::new(Behavior::Succeed, Behavior::Succeed)
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    pub fn count(&self, program: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.program == program).count()
    }

    pub fn last(&self, program: &str) -> Option<Invocation> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|c| c.program == program)
            .cloned()
    }

    /// Content the fake transcoder writes: the filter graph it was given
    pub fn rendered_bytes(invocation: &Invocation) -> Vec<u8> {
        let graph = invocation
            .value_of("-vf")
            .map(|v| v.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("rendered|{}", graph).into_bytes()
    }
}

fn output_path(invocation: &Invocation) -> PathBuf {
    if invocation.program == FETCH_BIN {
        PathBuf::from(invocation.value_of("-o").expect("fetch without -o"))
    } else {
        PathBuf::from(invocation.args.last().expect("render without output"))
    }
}

fn act(behavior: &Behavior, invocation: &Invocation, full: &[u8]) -> Result<ToolOutput, ToolError> {
    let output = output_path(invocation);
    match behavior {
        Behavior::Succeed => {
            std::fs::write(&output, full).expect("write fake output");
            Ok(ToolOutput::default())
        }
        Behavior::Fail(stderr) => {
            std::fs::write(&output, b"partial").expect("write partial output");
            Err(ToolError::Exited {
                program: invocation.program.clone(),
                status: "exit status: 1".to_string(),
                stderr: stderr.to_string(),
            })
        }
        Behavior::Timeout => {
            std::fs::write(&output, b"partial").expect("write partial output");
            Err(ToolError::Timeout {
                program: invocation.program.clone(),
                limit: invocation.timeout,
            })
        }
    }
}

#[async_trait]
impl ToolRunner for FakeRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        self.calls.lock().push(invocation.clone());
        match invocation.program.as_str() {
            FETCH_BIN => act(&self.fetch, invocation, RAW_BYTES),
            RENDER_BIN => act(&self.render, invocation, &Self::rendered_bytes(invocation)),
            other => panic!("unexpected program {}", other),
        }
    }
}

pub fn config_in(dir: &Path, delivery: DeliveryMode) -> ServerConfig {
    let mut config = ServerConfig {
        temp_dir: dir.to_path_buf(),
        delivery,
        public_base_url: Some("http://shorts.test".to_string()),
        ..Default::default()
    };
    config.fetch.binary = FETCH_BIN.to_string();
    config.render.binary = RENDER_BIN.to_string();
    config
}

pub fn state_with(config: ServerConfig, runner: Arc<FakeRunner>) -> Arc<AppState> {
    let store = Arc::new(ArtifactStore::new(&config.store));
    Arc::new(AppState::with_parts(config, runner, store))
}

/// Files currently in `dir`
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .expect("read temp dir")
        .map(|e| e.expect("dir entry").path())
        .collect();
    files.sort();
    files
}
