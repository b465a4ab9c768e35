//! Pipeline orchestrator
//!
//! Runs one job: fetch the window, render it, then either return the bytes
//! inline or hand the file to the artifact store. Each stage runs at most
//! once. Every temp path is tracked by a [`TempFiles`] guard from the moment
//! it is derived, so all exits (including `?` returns) clean up. A failed job
//! also loses any other file carrying its id, e.g. a fetch tool's `.part`.

pub mod job;
pub mod request;

use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cleanup::{remove_job_files, TempFiles};
use crate::config::{DeliveryMode, FetchConfig, RenderConfig, ServerConfig};
use crate::error::{ProcessorError, Result};
use crate::fetch::{self, FetchStrategy};
use crate::render;
use crate::store::{ArtifactStore, StoredArtifact};
use crate::tool::ToolRunner;

pub use job::{JobState, PipelineJob};
pub use request::{SegmentRequest, SegmentRequestBody};

/// How a completed job delivers its output
#[derive(Debug)]
pub enum JobOutcome {
    /// Rendered bytes; the file is already gone
    Inline {
        bytes: Bytes,
        file_name: String,
        size: u64,
    },
    /// The store owns the file until expiry
    Stored {
        artifact: StoredArtifact,
        file_name: String,
    },
}

impl JobOutcome {
    pub fn size(&self) -> u64 {
        match self {
            JobOutcome::Inline { size, .. } => *size,
            JobOutcome::Stored { artifact, .. } => artifact.size,
        }
    }
}

pub struct Pipeline {
    runner: Arc<dyn ToolRunner>,
    store: Arc<ArtifactStore>,
    temp_dir: PathBuf,
    fetch: FetchConfig,
    render: RenderConfig,
    strategy: FetchStrategy,
}

impl Pipeline {
    pub fn new(runner: Arc<dyn ToolRunner>, config: &ServerConfig, store: Arc<ArtifactStore>) -> Self {
        Self {
            runner,
            store,
            temp_dir: config.temp_dir.clone(),
            fetch: config.fetch.clone(),
            render: config.render.clone(),
            strategy: config.fetch.strategy(),
        }
    }

    /// Use `strategy` instead of the configured one
    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> &FetchStrategy {
        &self.strategy
    }

    pub async fn run(&self, request: &SegmentRequest, delivery: DeliveryMode) -> Result<JobOutcome> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;

        let mut job = PipelineJob::new(&self.temp_dir);
        let result = self.execute(&mut job, request, delivery).await;
        if result.is_err() {
            let removed = remove_job_files(&self.temp_dir, job.id()).await;
            if removed > 0 {
                tracing::debug!(job_id = %job.id(), removed, "Removed leftover job files");
            }
        }
        result
    }

    async fn execute(
        &self,
        job: &mut PipelineJob,
        request: &SegmentRequest,
        delivery: DeliveryMode,
    ) -> Result<JobOutcome> {
        let mut files = TempFiles::new();
        files.track(&job.paths.raw);
        files.track(&job.paths.rendered);

        tracing::info!(
            job_id = %job.id(),
            start = request.start(),
            duration = request.duration(),
            delivery = ?delivery,
            "Starting segment job"
        );

        job.transition(JobState::Fetching)?;
        if let Err(e) = fetch::fetch(
            self.runner.as_ref(),
            &self.fetch,
            &request.source,
            request.window,
            &self.strategy,
            &job.paths.raw,
        )
        .await
        {
            return Err(job.fail(e.into()));
        }

        job.transition(JobState::Rendering)?;
        if let Err(e) = render::render(
            self.runner.as_ref(),
            &self.render,
            &job.paths.raw,
            &job.paths.rendered,
            &request.caption,
            &request.cta,
        )
        .await
        {
            return Err(job.fail(e.into()));
        }

        files.discard(&job.paths.raw);

        let outcome = match self.deliver(job, &mut files, delivery).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(job.fail(e)),
        };

        job.transition(JobState::Completed)?;
        tracing::info!(
            job_id = %job.id(),
            size = outcome.size(),
            elapsed_ms = job.elapsed_ms() as u64,
            "Segment job completed"
        );
        Ok(outcome)
    }

    async fn deliver(
        &self,
        job: &PipelineJob,
        files: &mut TempFiles,
        delivery: DeliveryMode,
    ) -> Result<JobOutcome> {
        let rendered = &job.paths.rendered;
        let file_name = job.paths.rendered_file_name();

        match delivery {
            DeliveryMode::Inline => {
                let bytes = tokio::fs::read(rendered).await.map_err(|e| {
                    ProcessorError::Internal(format!("failed to read rendered output: {}", e))
                })?;
                files.discard(rendered);
                Ok(JobOutcome::Inline {
                    size: bytes.len() as u64,
                    bytes: Bytes::from(bytes),
                    file_name,
                })
            }
            DeliveryMode::Deferred => {
                let size = tokio::fs::metadata(rendered)
                    .await
                    .map_err(|e| {
                        ProcessorError::Internal(format!("failed to stat rendered output: {}", e))
                    })?
                    .len();
                let path = files.release(rendered).unwrap_or_else(|| rendered.clone());
                let artifact = self.store.register(path, size);
                Ok(JobOutcome::Stored {
                    artifact,
                    file_name,
                })
            }
        }
    }
}
