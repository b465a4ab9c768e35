//! Configuration file support
//!
//! Loads server configuration from TOML files. Every section is optional;
//! missing values fall back to [`ServerConfig::default`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{DeliveryMode, ServerConfig};
use crate::error::{ProcessorError, Result};
use crate::fetch::{ClientIdentity, WindowMode};

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: Option<ServerSettings>,
    /// Fetch tool settings
    pub fetch: Option<FetchSettings>,
    /// Render tool settings
    pub render: Option<RenderSettings>,
    /// Artifact store settings
    pub store: Option<StoreSettings>,
    /// Transcript settings
    pub transcript: Option<TranscriptSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
    /// Limits settings
    pub limits: Option<LimitsSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub temp_dir: Option<PathBuf>,
    pub delivery: Option<DeliveryMode>,
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchSettings {
    pub binary: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_output_bytes: Option<usize>,
    pub client: Option<ClientIdentity>,
    pub window: Option<WindowMode>,
    pub format: Option<String>,
    pub cookies_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderSettings {
    pub binary: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_output_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSettings {
    pub ttl_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptSettings {
    pub languages: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsSettings {
    /// Maximum jobs running at once
    pub max_concurrent_jobs: Option<usize>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ProcessorError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ProcessorError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Convert to ServerConfig, layering file values over the defaults
    pub fn into_server_config(self) -> ServerConfig {
        let mut config = ServerConfig::default();

        if let Some(server) = self.server {
            config.host = server.host.unwrap_or(config.host);
            config.port = server.port.unwrap_or(config.port);
            config.temp_dir = server.temp_dir.unwrap_or(config.temp_dir);
            config.delivery = server.delivery.unwrap_or(config.delivery);
            config.public_base_url = server.public_base_url.or(config.public_base_url);
        }

        if let Some(fetch) = self.fetch {
            let f = &mut config.fetch;
            if let Some(binary) = fetch.binary {
                f.binary = binary;
            }
            f.timeout_secs = fetch.timeout_secs.unwrap_or(f.timeout_secs);
            f.max_output_bytes = fetch.max_output_bytes.unwrap_or(f.max_output_bytes);
            f.client = fetch.client.unwrap_or(f.client);
            f.window = fetch.window.unwrap_or(f.window);
            if let Some(format) = fetch.format {
                f.format = format;
            }
            f.cookies_file = fetch.cookies_file;
        }

        if let Some(render) = self.render {
            let r = &mut config.render;
            if let Some(binary) = render.binary {
                r.binary = binary;
            }
            r.timeout_secs = render.timeout_secs.unwrap_or(r.timeout_secs);
            r.max_output_bytes = render.max_output_bytes.unwrap_or(r.max_output_bytes);
        }

        if let Some(store) = self.store {
            config.store.ttl_secs = store.ttl_secs.unwrap_or(config.store.ttl_secs);
            config.store.sweep_interval_secs = store
                .sweep_interval_secs
                .unwrap_or(config.store.sweep_interval_secs);
        }

        if let Some(transcript) = self.transcript {
            if let Some(languages) = transcript.languages {
                config.transcript.languages = languages;
            }
            config.transcript.timeout_secs = transcript
                .timeout_secs
                .unwrap_or(config.transcript.timeout_secs);
        }

        if let Some(logging) = self.logging {
            config.log_level = logging.level.unwrap_or(config.log_level);
            config.log_format = logging.format.unwrap_or(config.log_format);
        }

        if let Some(max) = self.limits.and_then(|l| l.max_concurrent_jobs) {
            config.max_concurrent_jobs = max.max(1);
        }

        config
    }
}
