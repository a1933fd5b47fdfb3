//! Core functionality for ingesting and deduplicating photos.
//!
//! This library provides the components of the ingestion pipeline:
//! - File discovery and extension classification
//! - Thumbnail and preview renditions
//! - Perceptual hashing of thumbnails as the deduplication key
//! - EXIF extraction, sanitization and derived views
//! - Sharded preview storage and the SQLite record store

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use config::*;
pub use error::{Error, Result};
pub use ingest::{
    ExistingMatch, FailureKind, IngestOutcome, IngestReport, IngestSummary, MetadataStatus,
    PhotoIngestor,
};
pub use persistence::{NewPhoto, PersistenceError, PhotoRecord, RecordStore, SqliteStore};
pub use processing::PHash;
pub use storage::PreviewStore;
pub use types::*;

// -- Public Modules --
pub mod config;
pub mod discovery;
pub mod ingest;
pub mod logging;
pub mod metadata;
pub mod persistence;
pub mod processing;
pub mod storage;
pub mod types;

// -- Test Modules --
#[cfg(test)]
pub mod test_utils;
