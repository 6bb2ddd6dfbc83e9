use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::StorageError;

/// Largest object the store accepts in a single PUT (5 GiB).
pub const MAXIMUM_ALLOWED_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Chunk size used when streaming bodies to and from the store.
pub const TRANSFER_BUF_SIZE: usize = 1024 * 1024;

/// Bucket name that is readable without a token.
pub const PUBLIC_BUCKET: &str = "public";

/// Client configuration loaded from `~/.config/dt-data/config.toml`.
///
/// URL templates use `{action}`, `{bucket}`, `{name}` and `{object}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Authorization endpoint; answers with a signed URL for one action on one object.
    pub api_url: String,
    /// Unauthenticated URL for objects of the public bucket.
    pub public_storage_url: String,
    /// Full bucket name built from the short storage name.
    pub bucket_name: String,
    /// Request header carrying the token on authorization calls.
    pub token_header: String,
    /// Size of each part of a multipart upload.
    pub part_size_bytes: u64,
    /// Read/write chunk size for streamed bodies.
    pub transfer_buf_bytes: usize,
    pub connect_timeout_secs: u64,
    /// Abort a transfer whose throughput stays below this many bytes/s...
    pub low_speed_limit_bytes: u32,
    /// ...for this many seconds.
    pub low_speed_time_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "https://data.duckietown.org/v1/{action}/{bucket}/{object}".to_string(),
            public_storage_url: "https://{bucket}.duckietown.org/{object}".to_string(),
            bucket_name: "duckietown-{name}-storage".to_string(),
            token_header: "X-Duckietown-Token".to_string(),
            part_size_bytes: MAXIMUM_ALLOWED_SIZE,
            transfer_buf_bytes: TRANSFER_BUF_SIZE,
            connect_timeout_secs: 30,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn low_speed_time(&self) -> Duration {
        Duration::from_secs(self.low_speed_time_secs)
    }

    /// Reject settings that cannot drive a transfer.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.part_size_bytes == 0 {
            return Err(StorageError::InvalidArgument(
                "part_size_bytes must be positive".to_string(),
            ));
        }
        if self.transfer_buf_bytes == 0 {
            return Err(StorageError::InvalidArgument(
                "transfer_buf_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Full bucket name for a short storage name (e.g. `user` -> `duckietown-user-storage`).
    pub fn full_bucket_name(&self, name: &str) -> String {
        self.bucket_name.replace("{name}", name)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dt-data")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ClientConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ClientConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<ClientConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: ClientConfig = toml::from_str(&data)
        .with_context(|| format!("invalid config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.part_size_bytes, 5 * 1024 * 1024 * 1024);
        assert_eq!(cfg.transfer_buf_bytes, 1024 * 1024);
        assert_eq!(cfg.token_header, "X-Duckietown-Token");
        assert_eq!(cfg.full_bucket_name("user"), "duckietown-user-storage");
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ClientConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ClientConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.api_url, cfg.api_url);
        assert_eq!(parsed.part_size_bytes, cfg.part_size_bytes);
        assert_eq!(parsed.low_speed_time_secs, cfg.low_speed_time_secs);
    }

    #[test]
    fn validate_rejects_zero_sizes() {
        assert!(ClientConfig::default().validate().is_ok());
        let mut cfg = ClientConfig::default();
        cfg.transfer_buf_bytes = 0;
        assert!(matches!(cfg.validate(), Err(StorageError::InvalidArgument(_))));
        cfg.transfer_buf_bytes = 1024;
        cfg.part_size_bytes = 0;
        assert!(matches!(cfg.validate(), Err(StorageError::InvalidArgument(_))));
    }

    #[test]
    fn load_from_path_rejects_zero_part_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = ClientConfig::default();
        cfg.part_size_bytes = 0;
        fs::write(&path, toml::to_string_pretty(&cfg).unwrap()).unwrap();
        assert!(load_from_path(&path).is_err());

        cfg.part_size_bytes = 4096;
        fs::write(&path, toml::to_string_pretty(&cfg).unwrap()).unwrap();
        assert_eq!(load_from_path(&path).unwrap().part_size_bytes, 4096);
    }
}
