//! Fetch strategies
//!
//! A strategy bundles the knobs that historically lived in separate fetch
//! implementations: which client identity to present, whether a cookie file
//! is available, and how the time window is retrieved.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Client identity presented to the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientIdentity {
    /// Let the tool pick
    Default,
    Web,
    MobileWeb,
    Android,
    Ios,
    TvEmbedded,
}

impl ClientIdentity {
    /// Player client name understood by the fetch tool
    pub fn player_client(&self) -> Option<&'static str> {
        match self {
            ClientIdentity::Default => None,
            ClientIdentity::Web => Some("web"),
            ClientIdentity::MobileWeb => Some("mweb"),
            ClientIdentity::Android => Some("android"),
            ClientIdentity::Ios => Some("ios"),
            ClientIdentity::TvEmbedded => Some("tv_embedded"),
        }
    }

    /// Extractor argument selecting the client, if any
    pub fn extractor_args(&self) -> Option<String> {
        self.player_client()
            .map(|client| format!("youtube:player_client={}", client))
    }
}

/// How the requested time window is retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// The tool materializes only the window, cutting at forced keyframes
    SliceDuringFetch,
    /// The tool's downloader is asked for the window via a seek + duration range
    SectionRequest,
}

/// Complete fetch strategy for one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchStrategy {
    pub client: ClientIdentity,
    /// Cookie file injected when available
    pub credentials: Option<PathBuf>,
    pub window: WindowMode,
}

impl Default for FetchStrategy {
    fn default() -> Self {
        Self {
            client: ClientIdentity::MobileWeb,
            credentials: None,
            window: WindowMode::SliceDuringFetch,
        }
    }
}

impl FetchStrategy {
    pub fn with_client(mut self, client: ClientIdentity) -> Self {
        self.client = client;
        self
    }

    pub fn with_credentials(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials = Some(path.into());
        self
    }

    pub fn with_window(mut self, window: WindowMode) -> Self {
        self.window = window;
        self
    }
}
