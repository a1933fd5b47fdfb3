//! Ingestion orchestrator.
//!
//! Each discovered file moves through
//! `thumbnail -> hash -> dedup check -> preview -> metadata -> persist` and
//! ends in exactly one [`IngestOutcome`]. A failing file never stops the run.

use indicatif::ProgressBar;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::config::Config;
use crate::discovery::{discover_files, validate_source_dir};
use crate::error::{Error, Result};
use crate::logging::{log_duplicate, log_file_error, log_metadata_error, log_rendition_error};
use crate::metadata::extract_sanitized;
use crate::persistence::{NewPhoto, PhotoRecord, RecordStore, SqliteStore};
use crate::processing::{fingerprint, load_source, render, RenditionSpec};
use crate::storage::PreviewStore;
use crate::types::{DiscoveredFile, FileClass};

/// Label for rendition failures that happen before any tier is rendered
const DECODE_STAGE: &str = "decode";

/// Pipeline stage at which a file failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// Decode, resize or encode of a thumbnail or preview
    Rendition,
    /// Fingerprinting the thumbnail
    Hash,
    /// Writing the large preview
    Preview,
    /// Record store lookup or insert
    Persistence,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rendition => "rendition",
            Self::Hash => "hash",
            Self::Preview => "preview",
            Self::Persistence => "persistence",
        };
        f.write_str(name)
    }
}

/// What happened to a persisted file's embedded metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetadataStatus {
    /// Sanitized metadata was stored
    Present,
    /// The file carried no metadata
    Absent,
    /// Metadata was present but unreadable; stored as absent
    Failed,
}

/// The record a duplicate was matched against
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingMatch {
    pub id: i64,
    pub source_path: PathBuf,
}

impl From<&PhotoRecord> for ExistingMatch {
    fn from(record: &PhotoRecord) -> Self {
        Self {
            id: record.id,
            source_path: record.source_path.clone(),
        }
    }
}

/// Terminal state of one discovered file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum IngestOutcome {
    Persisted {
        path: PathBuf,
        id: i64,
        content_hash: String,
        metadata: MetadataStatus,
    },
    Duplicate {
        path: PathBuf,
        content_hash: String,
        /// `None` only if the winning record vanished before it could be read back
        existing: Option<ExistingMatch>,
    },
    Failed {
        path: PathBuf,
        kind: FailureKind,
        cause: String,
    },
    /// Recognized RAW file, not processed
    SkippedRaw { path: PathBuf },
    /// Not a photo format this pipeline knows; left untouched
    Ignored { path: PathBuf },
}

impl IngestOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Persisted { path, .. }
            | Self::Duplicate { path, .. }
            | Self::Failed { path, .. }
            | Self::SkippedRaw { path }
            | Self::Ignored { path } => path,
        }
    }

    pub fn content_hash(&self) -> Option<&str> {
        match self {
            Self::Persisted { content_hash, .. } | Self::Duplicate { content_hash, .. } => {
                Some(content_hash)
            }
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// End-of-run counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Ingestible files found by the walk (common and RAW)
    pub discovered: usize,
    /// Common files that reached a terminal state
    pub processed: usize,
    pub persisted: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub raw_skipped: usize,
    /// Files handed to the pipeline that are neither common nor RAW
    pub ignored: usize,
    /// Persisted files whose metadata could not be read
    pub metadata_failures: usize,
    /// Shutdown was requested before every file was started
    pub interrupted: bool,
}

impl IngestSummary {
    pub fn from_outcomes(discovered: usize, outcomes: &[IngestOutcome]) -> Self {
        let mut summary = Self {
            discovered,
            interrupted: outcomes.len() < discovered,
            ..Default::default()
        };

        for outcome in outcomes {
            match outcome {
                IngestOutcome::Persisted { metadata, .. } => {
                    summary.persisted += 1;
                    if *metadata == MetadataStatus::Failed {
                        summary.metadata_failures += 1;
                    }
                }
                IngestOutcome::Duplicate { .. } => summary.duplicates += 1,
                IngestOutcome::Failed { .. } => summary.failed += 1,
                IngestOutcome::SkippedRaw { .. } => summary.raw_skipped += 1,
                IngestOutcome::Ignored { .. } => summary.ignored += 1,
            }
        }
        summary.processed = summary.persisted + summary.duplicates + summary.failed;

        summary
    }
}

impl fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} persisted, {} duplicates skipped, {} failed, {} RAW skipped",
            self.processed, self.persisted, self.duplicates, self.failed, self.raw_skipped
        )?;
        if self.ignored > 0 {
            write!(f, ", {} ignored", self.ignored)?;
        }
        if self.interrupted {
            write!(f, " (interrupted)")?;
        }
        Ok(())
    }
}

/// Per-file outcomes in traversal order plus the summary
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source: PathBuf,
    pub outcomes: Vec<IngestOutcome>,
    pub summary: IngestSummary,
}

/// Drives the ingestion pipeline against a record store and preview tree
pub struct PhotoIngestor<S: RecordStore> {
    config: Config,
    store: S,
    previews: PreviewStore,
    thumbnail_spec: RenditionSpec,
    preview_spec: RenditionSpec,
    hash_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    progress: ProgressBar,
    shutdown: Arc<AtomicBool>,
}

impl PhotoIngestor<SqliteStore> {
    /// Open the configured SQLite store and preview root
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let store = SqliteStore::open(&config.database_path)?;
        Self::new(config, store)
    }
}

impl<S: RecordStore> PhotoIngestor<S> {
    pub fn new(config: Config, store: S) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            previews: PreviewStore::new(&config.preview_root),
            thumbnail_spec: RenditionSpec::thumbnail(&config),
            preview_spec: RenditionSpec::preview(&config),
            config,
            store,
            hash_locks: Mutex::new(HashMap::new()),
            progress: ProgressBar::hidden(),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Report per-file progress on `bar`
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = bar;
        self
    }

    /// Share a shutdown flag; once set, no new file is started
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Ingest every photo under `directory`.
    ///
    /// A relative `directory` is resolved against the current working
    /// directory, so reported and stored paths are always absolute.
    /// Only a missing or unreadable source directory is an `Err`; per-file
    /// problems are reported as outcomes.
    pub fn run(&self, directory: &Path) -> Result<IngestReport> {
        let start_time = Instant::now();
        validate_source_dir(directory)?;
        // Stored source paths must not depend on the working directory
        let directory = std::path::absolute(directory)?;
        let directory = directory.as_path();

        info!("Discovering photos in {}", directory.display());
        let files = discover_files(directory, &self.config)?;
        let common = files
            .iter()
            .filter(|f| f.class == FileClass::Common)
            .count();
        info!(
            "Found {} ingestible files ({} RAW)",
            files.len(),
            files.len() - common
        );
        if common == 0 {
            warn!("No files to ingest in '{}'", directory.display());
        }

        self.progress.set_length(files.len() as u64);
        let outcomes = self.process_all(&files)?;
        self.progress.finish_and_clear();

        let summary = IngestSummary::from_outcomes(files.len(), &outcomes);
        info!(
            "Ingest of {} finished in {:.2?}: {}",
            directory.display(),
            start_time.elapsed(),
            summary
        );

        Ok(IngestReport {
            source: directory.to_path_buf(),
            outcomes,
            summary,
        })
    }

    fn process_all(&self, files: &[DiscoveredFile]) -> Result<Vec<IngestOutcome>> {
        let threads = self.config.effective_threads();

        if threads <= 1 {
            let mut outcomes = Vec::with_capacity(files.len());
            for file in files {
                if self.shutdown_requested() {
                    warn!("Shutdown requested, stopping before {}", file.path.display());
                    break;
                }
                outcomes.push(self.process(file));
            }
            return Ok(outcomes);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| Error::Configuration(format!("Cannot build thread pool: {}", e)))?;
        debug!("Ingesting on {} threads", threads);

        Ok(pool.install(|| {
            files
                .par_iter()
                .filter_map(|file| {
                    if self.shutdown_requested() {
                        None
                    } else {
                        Some(self.process(file))
                    }
                })
                .collect()
        }))
    }

    fn process(&self, file: &DiscoveredFile) -> IngestOutcome {
        self.progress.set_message(
            file.path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );

        let outcome = match file.class {
            FileClass::Common => self.ingest_file(&file.path),
            FileClass::Raw => {
                debug!("Skipping RAW file {}", file.path.display());
                IngestOutcome::SkippedRaw {
                    path: file.path.clone(),
                }
            }
            FileClass::NotIngestible => {
                debug!("Ignoring non-photo file {}", file.path.display());
                IngestOutcome::Ignored {
                    path: file.path.clone(),
                }
            }
        };

        self.progress.inc(1);
        outcome
    }

    /// Run the full pipeline for one common-format file
    pub fn ingest_file(&self, path: &Path) -> IngestOutcome {
        let img = match load_source(path) {
            Ok(img) => img,
            Err(e) => return self.rendition_failed(path, DECODE_STAGE, e),
        };

        let thumbnail = match render(&img, &self.thumbnail_spec) {
            Ok(bytes) => bytes,
            Err(e) => return self.rendition_failed(path, self.thumbnail_spec.tier, e),
        };

        let content_hash = match fingerprint(&thumbnail) {
            Ok(hash) => hash.to_hex(),
            Err(e) => return self.fail(path, FailureKind::Hash, e),
        };
        debug!("{} -> {}", path.display(), content_hash);

        // Check, preview and insert are serialized per hash
        let lock = self.hash_lock(&content_hash);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        match self.store.get_by_hash(&content_hash) {
            Ok(Some(existing)) => return self.duplicate(path, content_hash, Some(&existing)),
            Ok(None) => {}
            Err(e) => return self.fail(path, FailureKind::Persistence, e),
        }

        let preview = match render(&img, &self.preview_spec) {
            Ok(bytes) => bytes,
            Err(e) => return self.rendition_failed(path, self.preview_spec.tier, e),
        };
        drop(img);

        if let Err(e) = self.previews.write(&content_hash, &preview) {
            return self.fail(path, FailureKind::Preview, e);
        }

        let (metadata, metadata_status) =
            match extract_sanitized(path, &self.config.strip_tags) {
                Ok(Some(blob)) => (Some(blob), MetadataStatus::Present),
                Ok(None) => (None, MetadataStatus::Absent),
                Err(e) => {
                    log_metadata_error(path, &e);
                    (None, MetadataStatus::Failed)
                }
            };

        let photo = NewPhoto::new(path, content_hash.clone(), thumbnail).with_metadata(metadata);
        match self.store.insert(&photo) {
            Ok(id) => {
                info!("Persisted \"{}\" as #{} ({})", path.display(), id, content_hash);
                IngestOutcome::Persisted {
                    path: path.to_path_buf(),
                    id,
                    content_hash,
                    metadata: metadata_status,
                }
            }
            // Lost a race the per-hash lock did not cover
            Err(e) if e.is_duplicate() => {
                let existing = self.store.get_by_hash(&content_hash).ok().flatten();
                self.duplicate(path, content_hash, existing.as_ref())
            }
            Err(e) => self.fail(path, FailureKind::Persistence, e),
        }
    }

    fn hash_lock(&self, content_hash: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .hash_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(content_hash.to_string()).or_default().clone()
    }

    fn duplicate(
        &self,
        path: &Path,
        content_hash: String,
        existing: Option<&PhotoRecord>,
    ) -> IngestOutcome {
        match existing {
            Some(record) => log_duplicate(path, &record.source_path),
            None => warn!(
                "Duplicate found for \"{}\" ({}). Skipping.",
                path.display(),
                content_hash
            ),
        }

        IngestOutcome::Duplicate {
            path: path.to_path_buf(),
            content_hash,
            existing: existing.map(ExistingMatch::from),
        }
    }

    /// `stage` is the source decode or the tier being rendered
    fn rendition_failed(
        &self,
        path: &Path,
        stage: impl fmt::Display,
        cause: impl fmt::Display,
    ) -> IngestOutcome {
        let stage = stage.to_string();
        log_rendition_error(path, &stage, &cause);

        IngestOutcome::Failed {
            path: path.to_path_buf(),
            kind: FailureKind::Rendition,
            cause: format!("{}: {}", stage, cause),
        }
    }

    fn fail(&self, path: &Path, kind: FailureKind, cause: impl fmt::Display) -> IngestOutcome {
        log_file_error(path, &kind.to_string(), &cause);

        IngestOutcome::Failed {
            path: path.to_path_buf(),
            kind,
            cause: cause.to_string(),
        }
    }
}
