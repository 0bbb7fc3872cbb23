use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TangoError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("Zip error: {0}")]
    Zip(Box<zip::result::ZipError>),

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Lookup failed: {0}")]
    Fetch(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("AnkiConnect error: {0}")]
    AnkiConnect(String),

    #[error("TangoError: {0}")]
    Custom(String),
}

impl TangoError {
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        TangoError::Parse { path: path.into(), message: message.into() }
    }
}

impl From<std::io::Error> for TangoError {
    fn from(error: std::io::Error) -> Self {
        TangoError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for TangoError {
    fn from(error: reqwest::Error) -> Self {
        TangoError::Reqwest(Box::new(error))
    }
}

impl From<zip::result::ZipError> for TangoError {
    fn from(error: zip::result::ZipError) -> Self {
        TangoError::Zip(Box::new(error))
    }
}
