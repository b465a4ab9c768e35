//! Cookie-file provisioning
//!
//! A cookie payload supplied out-of-band is written to a fixed local path once
//! at startup; the path is then carried by [`FetchConfig::cookies_file`] into
//! every [`super::FetchStrategy`].

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::ServerConfig;
use crate::error::Result;

/// Environment variable holding the cookie-file payload
pub const COOKIES_ENV: &str = "YOUTUBE_COOKIES";

/// Write `payload` to `path`, readable by the owner only
pub fn materialize(payload: &str, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(payload.as_bytes())?;
    if !payload.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    Ok(path.to_path_buf())
}

/// Resolve the cookie file for `config` from the process environment
pub fn provision(config: &mut ServerConfig) -> Result<Option<PathBuf>> {
    provision_with(config, |key| std::env::var(key).ok())
}

fn provision_with<F>(config: &mut ServerConfig, lookup: F) -> Result<Option<PathBuf>>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(payload) = lookup(COOKIES_ENV).filter(|p| !p.trim().is_empty()) {
        let path = config
            .fetch
            .cookies_file
            .clone()
            .unwrap_or_else(|| config.default_cookies_path());
        let path = materialize(&payload, &path)?;
        tracing::info!("Cookie file written to {}", path.display());
        config.fetch.cookies_file = Some(path.clone());
        return Ok(Some(path));
    }

    match config.fetch.cookies_file.take() {
        Some(path) if path.is_file() => {
            tracing::info!("Using cookie file {}", path.display());
            config.fetch.cookies_file = Some(path.clone());
            Ok(Some(path))
        }
        Some(path) => {
            tracing::warn!(
                "Configured cookie file {} does not exist; fetching without credentials",
                path.display()
            );
            Ok(None)
        }
        None => Ok(None),
    }
}
