//! Error types for grafsync-client.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while configuring a connection or building the client.
///
/// Errors of individual API calls are [`grafsync_core::ApiError`]s.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid Grafana URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Neither an API key nor a username/password pair was given.
    #[error(
        "no credentials for {url}: provide an API key or both username and password (directly or in the URL)"
    )]
    MissingCredentials { url: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CA certificate in {path}: {source}")]
    Certificate {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config file not found at {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("unknown instance '{name}': not a URL and not a profile in {path}")]
    UnknownProfile { name: String, path: PathBuf },

    /// `dirs::config_dir()` returned `None`.
    #[error("cannot determine config directory; set $XDG_CONFIG_HOME or $HOME")]
    ConfigDirNotFound,
}

pub(crate) fn io_err(path: &Path, source: std::io::Error) -> ClientError {
    ClientError::Io {
        path: path.to_path_buf(),
        source,
    }
}
