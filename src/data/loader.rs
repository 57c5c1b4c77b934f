//! Dataset loading from disk or over HTTP.
//!
//! The dataset is fetched exactly once at startup. Any failure is fatal to
//! the experience and is reported to the user; there is no retry.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::Dataset;

/// Where the conflict JSON comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    /// Interpret a CLI/config string: `http://` and `https://` are URLs,
    /// everything else a path.
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            DataSource::Url(raw.to_string())
        } else {
            DataSource::File(PathBuf::from(raw))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => f.write_str(url),
        }
    }
}

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("data request failed with HTTP status {status}")]
    Http { status: u16 },
    #[error("network error while fetching data: {0}")]
    Network(String),
    #[error("data file is not valid conflict JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("data file contains no conflicts")]
    Empty,
    #[error("conflict {name:?} ends ({end}) before it starts ({start})")]
    InvalidRecord { name: String, start: i32, end: i32 },
}

impl LoadError {
    /// Message shown to the user when the story cannot start.
    pub fn user_message(&self) -> String {
        format!(
            "Failed to load data ({}). Check that the data file exists or that the server is reachable.",
            self
        )
    }
}

/// Read and parse the dataset.
pub fn load_dataset(source: &DataSource) -> Result<Dataset, LoadError> {
    let body = match source {
        DataSource::File(path) => std::fs::read_to_string(path)?,
        DataSource::Url(url) => fetch_text(url)?,
    };
    let dataset = Dataset::from_json_str(&body)?;
    tracing::info!(source = %source, conflicts = dataset.len(), "data loaded");
    Ok(dataset)
}

fn fetch_text(url: &str) -> Result<String, LoadError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| LoadError::Network(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| LoadError::Network(e.to_string()))?;

    if !response.status().is_success() {
        return Err(LoadError::Http { status: response.status().as_u16() });
    }

    response.text().map_err(|e| LoadError::Network(e.to_string()))
}
