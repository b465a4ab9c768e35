//! Artifact store
//!
//! Tracks rendered files handed over by deferred-delivery jobs and serves
//! them until a fixed TTL, counted from registration, runs out. Entries live
//! in a `DashMap`; resolving, opening and evicting one entry all go through
//! its shard lock, so a reader either sees a live entry with its file or
//! gets `NotFound`.

pub mod clock;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::cleanup::remove_quietly;
use crate::config::StoreConfig;
use crate::error::{ProcessorError, Result};

pub use clock::{Clock, ManualClock, SystemClock};

/// A rendered file owned by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredArtifact {
    pub id: String,
    pub path: PathBuf,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredArtifact {
    /// Expired once its age exceeds the TTL
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.mp4", self.id))
    }
}

/// Store statistics
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub entry_count: usize,
    pub total_size_bytes: u64,
    pub ttl_secs: u64,
    pub oldest_entry_age_secs: Option<i64>,
}

/// Registry of stored artifacts
pub struct ArtifactStore {
    entries: DashMap<String, StoredArtifact>,
    ttl: Duration,
    sweep_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl ArtifactStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: config.ttl(),
            sweep_interval: config.sweep_interval(),
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Take ownership of the file at `path` and issue a download handle
    pub fn register(&self, path: PathBuf, size: u64) -> StoredArtifact {
        let created_at = self.clock.now();
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        let artifact = StoredArtifact {
            id: Uuid::new_v4().simple().to_string(),
            path,
            size,
            created_at,
            expires_at: created_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        tracing::info!(
            artifact_id = %artifact.id,
            size = artifact.size,
            expires_at = %artifact.expires_at,
            "Registered artifact"
        );
        self.entries.insert(artifact.id.clone(), artifact.clone());
        artifact
    }

    /// Look up a live artifact
    pub fn resolve(&self, id: &str) -> Result<StoredArtifact> {
        let now = self.clock.now();
        match self.entries.get(id) {
            Some(entry) if !entry.is_expired(now) => Ok(entry.clone()),
            _ => Err(ProcessorError::NotFound(id.to_string())),
        }
    }

    /// Resolve and open the backing file under the entry lock.
    ///
    /// Eviction needs the same lock to delete the file, so the returned
    /// handle always refers to a file that existed when the entry was live.
    pub fn open(&self, id: &str) -> Result<(StoredArtifact, std::fs::File)> {
        let now = self.clock.now();
        let entry = self
            .entries
            .get(id)
            .filter(|entry| !entry.is_expired(now))
            .ok_or_else(|| ProcessorError::NotFound(id.to_string()))?;

        let file = std::fs::File::open(&entry.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessorError::NotFound(id.to_string())
            } else {
                ProcessorError::Io(e)
            }
        })?;
        Ok((entry.clone(), file))
    }

    /// Remove an artifact before its expiry
    pub fn discard(&self, id: &str) -> Result<()> {
        match self.entries.remove(id) {
            Some((_, artifact)) => {
                remove_quietly(&artifact.path);
                tracing::info!(artifact_id = %id, "Discarded artifact");
                Ok(())
            }
            None => Err(ProcessorError::NotFound(id.to_string())),
        }
    }

    /// Delete every expired artifact together with its registry entry.
    /// Returns the number evicted.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut evicted = 0;

        self.entries.retain(|id, artifact| {
            if artifact.is_expired(now) {
                remove_quietly(&artifact.path);
                tracing::debug!(artifact_id = %id, "Evicted expired artifact");
                evicted += 1;
                false
            } else {
                true
            }
        });

        evicted
    }

    /// Delete everything, e.g. on shutdown
    pub fn purge(&self) -> usize {
        let mut purged = 0;
        self.entries.retain(|_, artifact| {
            remove_quietly(&artifact.path);
            purged += 1;
            false
        });
        purged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        let now = self.clock.now();
        let mut total_size_bytes = 0;
        let mut oldest: Option<DateTime<Utc>> = None;

        for entry in self.entries.iter() {
            total_size_bytes += entry.size;
            oldest = Some(match oldest {
                Some(t) if t <= entry.created_at => t,
                _ => entry.created_at,
            });
        }

        StoreStats {
            entry_count: self.entries.len(),
            total_size_bytes,
            ttl_secs: self.ttl.as_secs(),
            oldest_entry_age_secs: oldest.map(|t| (now - t).num_seconds()),
        }
    }

    /// Start the periodic eviction task.
    ///
    /// The task holds a weak reference and ends once the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::downgrade(self);
        let period = self.sweep_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let evicted = store.evict_expired();
                if evicted > 0 {
                    tracing::info!(
                        evicted,
                        remaining = store.len(),
                        "Evicted expired artifacts"
                    );
                }
            }
        })
    }
}
