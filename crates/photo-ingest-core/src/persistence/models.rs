use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::metadata;

/// A photo as stored in the record store
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    /// ID in the database
    pub id: i64,

    /// Path of the file this record was ingested from
    pub source_path: PathBuf,

    /// Perceptual hash of the thumbnail, 16 lowercase hex digits
    pub content_hash: String,

    /// Encoded JPEG thumbnail
    pub thumbnail: Vec<u8>,

    /// Sanitized EXIF payload, if the source carried one
    pub metadata: Option<Vec<u8>>,

    /// When the record was inserted (unix seconds)
    pub ingested_at: i64,
}

impl PhotoRecord {
    /// The original capture date/time string
    pub fn taken_timestamp(&self) -> Option<String> {
        metadata::taken_timestamp(self.metadata.as_deref()?)
    }

    pub fn taken_at(&self) -> Option<NaiveDateTime> {
        metadata::taken_at(self.metadata.as_deref()?)
    }

    /// Signed decimal (latitude, longitude)
    pub fn gps_coordinates(&self) -> Option<(f64, f64)> {
        metadata::gps_coordinates(self.metadata.as_deref()?)
    }

    pub fn ingested_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.ingested_at, 0)
    }

    /// Final path component of the source, for display
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }
}

/// Fields supplied by the pipeline when inserting a record
#[derive(Debug, Clone, PartialEq)]
pub struct NewPhoto {
    pub source_path: PathBuf,
    pub content_hash: String,
    pub thumbnail: Vec<u8>,
    pub metadata: Option<Vec<u8>>,
}

impl NewPhoto {
    pub fn new(source_path: &Path, content_hash: impl Into<String>, thumbnail: Vec<u8>) -> Self {
        Self {
            source_path: source_path.to_path_buf(),
            content_hash: content_hash.into(),
            thumbnail,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Option<Vec<u8>>) -> Self {
        self.metadata = metadata;
        self
    }
}
