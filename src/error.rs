// Post Curator Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CuratorError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Scoring error: {0}")]
    Scoring(String),

    #[error("Folder not accessible: {0}")]
    FolderAccess(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid score: {0}")]
    InvalidScore(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for CuratorError {
    fn from(err: anyhow::Error) -> Self {
        CuratorError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CuratorError>;
