use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("could not create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("yt-dlp could not be started ({program}): {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("yt-dlp failed (code={code:?}): {message}")]
    ToolFailed { code: Option<i32>, message: String },

    #[error("download canceled by user")]
    Canceled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DownloadError>;
