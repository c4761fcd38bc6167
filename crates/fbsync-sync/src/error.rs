use fbsync_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("device login failed: {0}")]
    Login(String),
    #[error("device rejected the phonebook: {0}")]
    UploadRejected(String),
    #[cfg(any(feature = "dav-sync", feature = "box-sync"))]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[cfg(any(feature = "dav-sync", feature = "box-sync"))]
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
