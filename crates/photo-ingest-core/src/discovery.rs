use log::{debug, warn};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{DiscoveredFile, FileClass};

/// Check that a source root exists and is a directory
pub fn validate_source_dir(directory: &Path) -> Result<()> {
    if !directory.exists() {
        return Err(Error::FileNotFound(directory.to_path_buf()));
    }
    if !directory.is_dir() {
        return Err(Error::NotADirectory(directory.to_path_buf()));
    }
    Ok(())
}

/// Discover ingestible files (common and RAW) under a single directory.
///
/// Entries are visited in file-name order within each directory, so the
/// traversal order (and therefore which of several duplicates is ingested
/// first) is stable between runs over the same tree.
pub fn discover_files(directory: &Path, config: &Config) -> Result<Vec<DiscoveredFile>> {
    validate_source_dir(directory)?;

    let max_depth = config.max_depth.unwrap_or(usize::MAX);
    let mut files = Vec::new();

    for entry in WalkDir::new(directory)
        .max_depth(max_depth)
        .follow_links(config.follow_links)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Unreadable subdirectories don't abort the walk
                warn!("Skipping unreadable entry during discovery: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let class = classify(entry.path(), config);
        if class == FileClass::NotIngestible {
            debug!("Not ingestible, skipping: {}", entry.path().display());
            continue;
        }

        files.push(DiscoveredFile {
            path: entry.into_path(),
            class,
        });
    }

    Ok(files)
}

/// Classify a single path using the configured extension sets
pub fn classify(path: &Path, config: &Config) -> FileClass {
    FileClass::from_path(path, &config.common_extensions, &config.raw_extensions)
}

/// Returns if the given path would be decoded and ingested
pub fn is_ingestible_path(path: &Path, config: &Config) -> bool {
    classify(path, config).is_processable()
}

// -- Tests --
