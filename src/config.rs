//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::{ClientIdentity, FetchStrategy, WindowMode};

/// How a finished segment is handed back to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Base64 payload in the response body; the file is deleted right after reading
    Inline,
    /// Registered in the artifact store; the response carries a download handle
    Deferred,
}

impl std::str::FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inline" => Ok(DeliveryMode::Inline),
            "deferred" | "store" => Ok(DeliveryMode::Deferred),
            other => Err(format!("unknown delivery mode: {}", other)),
        }
    }
}

/// Fetch tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Fetch tool executable
    pub binary: String,

    /// Wall-clock limit for one fetch in seconds
    pub timeout_secs: u64,

    /// Ceiling for captured stdout/stderr in bytes
    pub max_output_bytes: usize,

    /// Client identity presented to the source
    pub client: ClientIdentity,

    /// Windowed retrieval mode
    pub window: WindowMode,

    /// Format selector passed to the tool
    pub format: String,

    /// Credential (cookie) file, if one has been provisioned
    pub cookies_file: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            timeout_secs: 300,
            max_output_bytes: 50 * 1024 * 1024,
            client: ClientIdentity::MobileWeb,
            window: WindowMode::SliceDuringFetch,
            format: "best[ext=mp4][height<=1080]/best[height<=1080]/best".to_string(),
            cookies_file: None,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Strategy value threaded into every fetch
    pub fn strategy(&self) -> FetchStrategy {
        FetchStrategy {
            client: self.client,
            credentials: self.cookies_file.clone(),
            window: self.window,
        }
    }
}

/// Transcoding tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Transcoding tool executable
    pub binary: String,

    /// Wall-clock limit for one render in seconds
    pub timeout_secs: u64,

    /// Ceiling for captured stdout/stderr in bytes
    pub max_output_bytes: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            timeout_secs: 600,
            max_output_bytes: 8 * 1024 * 1024,
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Artifact store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Lifetime of a stored artifact, counted from registration
    pub ttl_secs: u64,

    /// Interval between eviction sweeps
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,           // 10 minutes
            sweep_interval_secs: 300, // 5 minutes
        }
    }
}

impl StoreConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Transcript extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Caption languages requested from the fetch tool
    pub languages: String,

    /// Wall-clock limit for caption retrieval in seconds
    pub timeout_secs: u64,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            languages: "en.*".to_string(),
            timeout_secs: 120,
        }
    }
}

impl TranscriptConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Directory for per-job temporary files
    pub temp_dir: PathBuf,

    /// Segment delivery mode
    pub delivery: DeliveryMode,

    /// Prefix for download URLs in deferred responses (relative when unset)
    pub public_base_url: Option<String>,

    /// Fetch configuration
    pub fetch: FetchConfig,

    /// Render configuration
    pub render: RenderConfig,

    /// Artifact store configuration
    pub store: StoreConfig,

    /// Transcript configuration
    pub transcript: TranscriptConfig,

    /// Maximum jobs running at once
    pub max_concurrent_jobs: usize,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            temp_dir: std::env::temp_dir(),
            delivery: DeliveryMode::Inline,
            public_base_url: None,
            fetch: FetchConfig::default(),
            render: RenderConfig::default(),
            store: StoreConfig::default(),
            transcript: TranscriptConfig::default(),
            max_concurrent_jobs: 4,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Apply PORT / HOST / TEMP_DIR / DELIVERY_MODE from the environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT value {:?}", port),
            }
        }
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(dir) = lookup("TEMP_DIR") {
            self.temp_dir = PathBuf::from(dir);
        }
        if let Some(mode) = lookup("DELIVERY_MODE") {
            match mode.parse() {
                Ok(mode) => self.delivery = mode,
                Err(e) => tracing::warn!("Ignoring DELIVERY_MODE: {}", e),
            }
        }
    }

    /// Default location the cookie payload is written to
    pub fn default_cookies_path(&self) -> PathBuf {
        self.temp_dir.join("yt-cookies.txt")
    }
}
