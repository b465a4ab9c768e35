//! Job lifecycle
//!
//! `Created → Fetching → Rendering → Completed`, with `Failed` reachable
//! from either running stage.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use crate::error::{ProcessorError, Result};
use crate::naming::ArtifactPaths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Fetching,
    Rendering,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Created => "created",
            JobState::Fetching => "fetching",
            JobState::Rendering => "rendering",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Created, JobState::Fetching)
                | (JobState::Fetching, JobState::Rendering)
                | (JobState::Rendering, JobState::Completed)
                | (JobState::Fetching, JobState::Failed)
                | (JobState::Rendering, JobState::Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution of the pipeline
#[derive(Debug)]
pub struct PipelineJob {
    pub paths: ArtifactPaths,
    state: JobState,
    started: Instant,
}

impl PipelineJob {
    pub fn new(temp_dir: &Path) -> Self {
        Self {
            paths: ArtifactPaths::generate(temp_dir),
            state: JobState::Created,
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.paths.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    pub fn transition(&mut self, next: JobState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(ProcessorError::Internal(format!(
                "job {}: illegal transition {} -> {}",
                self.paths.id, self.state, next
            )));
        }
        tracing::debug!(
            job_id = %self.paths.id,
            from = %self.state,
            to = %next,
            elapsed_ms = self.elapsed_ms() as u64,
            "Job state change"
        );
        self.state = next;
        Ok(())
    }

    /// Mark the job failed and hand back the error that caused it
    pub fn fail(&mut self, err: ProcessorError) -> ProcessorError {
        tracing::warn!(
            job_id = %self.paths.id,
            state = %self.state,
            stage = err.stage().unwrap_or("deliver"),
            error = %err,
            "Job failed"
        );
        if self.state.can_transition_to(JobState::Failed) {
            self.state = JobState::Failed;
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = PipelineJob::new(dir.path());
        assert_eq!(job.state(), JobState::Created);

        job.transition(JobState::Fetching).unwrap();
        job.transition(JobState::Rendering).unwrap();
        job.transition(JobState::Completed).unwrap();
        assert!(job.state().is_terminal());
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!JobState::Created.can_transition_to(JobState::Rendering));
        assert!(!JobState::Created.can_transition_to(JobState::Failed));
        assert!(!JobState::Completed.can_transition_to(JobState::Failed));
        assert!(!JobState::Failed.can_transition_to(JobState::Fetching));

        let dir = tempfile::tempdir().unwrap();
        let mut job = PipelineJob::new(dir.path());
        assert!(job.transition(JobState::Completed).is_err());
        assert_eq!(job.state(), JobState::Created);
    }

    #[test]
    fn test_fail_from_running_stage() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = PipelineJob::new(dir.path());
        job.transition(JobState::Fetching).unwrap();

        let err = job.fail(ProcessorError::Internal("boom".into()));
        assert!(matches!(err, ProcessorError::Internal(_)));
        assert_eq!(job.state(), JobState::Failed);
    }
}
