//! Artifact naming
//!
//! Every job derives its temporary file paths from one identifier made of a
//! millisecond timestamp and a random suffix, so concurrent jobs never share
//! a path in the temp directory.

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Length of the random part of an artifact id
const SUFFIX_LEN: usize = 12;

/// Generate a new artifact id, e.g. `1718035200123_3f9c0a1b2d4e`
pub fn new_artifact_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random = Uuid::new_v4().simple().to_string();
    format!("{}_{}", millis, &random[..SUFFIX_LEN])
}

/// Temporary paths owned by one pipeline job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub id: String,
    /// Output of the fetch stage
    pub raw: PathBuf,
    /// Output of the render stage
    pub rendered: PathBuf,
}

impl ArtifactPaths {
    pub fn new(temp_dir: &Path, id: &str) -> Self {
        Self {
            id: id.to_string(),
            raw: temp_dir.join(format!("{}.mp4", id)),
            rendered: temp_dir.join(Self::rendered_file_name_for(id)),
        }
    }

    /// Fresh id and paths inside `temp_dir`
    pub fn generate(temp_dir: &Path) -> Self {
        Self::new(temp_dir, &new_artifact_id())
    }

    /// File name of the rendered output, as reported to clients
    pub fn rendered_file_name(&self) -> String {
        Self::rendered_file_name_for(&self.id)
    }

    fn rendered_file_name_for(id: &str) -> String {
        format!("{}_processed.mp4", id)
    }
}
