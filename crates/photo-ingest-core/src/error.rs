use std::path::PathBuf;
use thiserror::Error;

use crate::persistence::PersistenceError;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the photo-ingest library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode or encode error
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Embedded metadata could not be read or rewritten
    #[error("EXIF error: {0}")]
    Exif(#[from] exif::Error),

    /// Record store error
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// File not found error
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Source path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A thumbnail or preview could not be produced
    #[error("Rendition failed for {path}: {cause}")]
    Rendition { path: PathBuf, cause: String },

    /// Invalid content hash used as a lookup key
    #[error("Invalid content hash: {0}")]
    InvalidHash(String),

    /// Unknown error
    #[error("Unknown error: {0}")]
    Unknown(String),
}
