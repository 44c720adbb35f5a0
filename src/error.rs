//! Typed error kinds for the calendar pipeline.
//!
//! Each stage reports its own kind so the data service can decide how to
//! fall back by matching on it instead of probing return values.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure while obtaining a fresh snapshot from the remote page.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("failed to launch headless browser: {0}")]
    BrowserLaunch(String),

    #[error("browser protocol error: {0}")]
    Browser(String),

    #[error("navigation to {url} exceeded {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("page render failed: {0}")]
    Render(String),
}

impl From<chromiumoxide::error::CdpError> for ExtractionError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        ExtractionError::Browser(e.to_string())
    }
}

/// Failure while reading or writing the flat-file snapshot.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv encoding error: {0}")]
    Encode(String),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure while loading `config/calendar.toml`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
