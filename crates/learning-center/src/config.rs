use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded explicitly from environment variables.
///
/// The data directory must be provided by the caller; the bind address and
/// remote-image cache location have defaults derived from it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Plugin data root. `templates/` and `user_progress/` live under it.
    pub data_dir: PathBuf,
    /// HTTP listen address.
    pub bind: SocketAddr,
    /// Remote image cache directory.
    pub remote_cache_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `LEARNING_CENTER_DATA_DIR`: plugin data root
    ///
    /// Optional:
    /// - `LEARNING_CENTER_BIND`: listen address (default `127.0.0.1:8189`)
    /// - `REMOTE_IMAGE_CACHE_DIR`: image cache dir (default
    ///   `<data_dir>/temp/remote_cache`)
    pub fn from_env() -> Result<Self, AppError> {
        let data_dir = std::env::var("LEARNING_CENTER_DATA_DIR").map_err(|_| {
            AppError::Config("LEARNING_CENTER_DATA_DIR environment variable is required".to_string())
        })?;
        let data_dir = PathBuf::from(data_dir);

        let bind = match std::env::var("LEARNING_CENTER_BIND") {
            Ok(raw) => raw.parse().map_err(|_| {
                AppError::Config(format!("LEARNING_CENTER_BIND is not a socket address: {raw}"))
            })?,
            Err(_) => SocketAddr::from(([127, 0, 0, 1], 8189)),
        };

        let remote_cache_dir = std::env::var("REMOTE_IMAGE_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("temp").join("remote_cache"));

        Ok(Self {
            data_dir,
            bind,
            remote_cache_dir,
        })
    }

    /// Root directory scanned for chapters.
    pub fn templates_dir(&self) -> PathBuf {
        self.data_dir.join("templates")
    }

    pub fn user_progress_dir(&self) -> PathBuf {
        self.data_dir.join("user_progress")
    }

    /// The single progress document.
    pub fn progress_file(&self) -> PathBuf {
        self.user_progress_dir().join("progress.json")
    }
}
