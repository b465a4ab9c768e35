//! Application state
//!
//! Shared by every handler:
//! - Server configuration
//! - Segment pipeline and transcript service (sharing one tool runner)
//! - Artifact store
//! - Job slots bounding concurrent segment jobs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::pipeline::Pipeline;
use crate::store::ArtifactStore;
use crate::tool::{ProcessRunner, ToolRunner};
use crate::transcript::TranscriptService;

pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,

    pub pipeline: Pipeline,

    pub transcripts: TranscriptService,

    /// Deferred-delivery artifacts
    pub store: Arc<ArtifactStore>,

    /// One permit per running segment job
    pub job_slots: Arc<Semaphore>,

    /// Server shutdown flag
    pub shutdown: AtomicBool,
}

impl AppState {
    /// State backed by real external processes
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(ArtifactStore::new(&config.store));
        Self::with_parts(config, Arc::new(ProcessRunner), store)
    }

    /// State with an injected runner and store
    pub fn with_parts(
        config: ServerConfig,
        runner: Arc<dyn ToolRunner>,
        store: Arc<ArtifactStore>,
    ) -> Self {
        Self {
            pipeline: Pipeline::new(runner.clone(), &config, store.clone()),
            transcripts: TranscriptService::new(runner, &config),
            store,
            job_slots: Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1))),
            shutdown: AtomicBool::new(false),
            config,
        }
    }

    /// Segment jobs currently holding a slot
    pub fn jobs_in_flight(&self) -> usize {
        self.config
            .max_concurrent_jobs
            .max(1)
            .saturating_sub(self.job_slots.available_permits())
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Check if shutdown is requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}
