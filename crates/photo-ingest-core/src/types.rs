use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Capability tier of a filesystem entry, decided by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileClass {
    /// Raster format that is decoded, hashed and persisted
    Common,

    /// Camera RAW format; recognized but not processed
    Raw,

    /// Anything else; skipped silently
    NotIngestible,
}

impl FileClass {
    /// Classify a path by its lowercased extension against the two extension sets
    pub fn from_path(
        path: &Path,
        common_extensions: &BTreeSet<String>,
        raw_extensions: &BTreeSet<String>,
    ) -> Self {
        let ext = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => ext.to_lowercase(),
            None => return Self::NotIngestible,
        };

        if common_extensions.contains(&ext) {
            Self::Common
        } else if raw_extensions.contains(&ext) {
            Self::Raw
        } else {
            Self::NotIngestible
        }
    }

    /// Check if the class goes through the full pipeline
    pub fn is_processable(&self) -> bool {
        matches!(self, Self::Common)
    }
}

/// A file found while walking the source tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,

    /// Extension class
    pub class: FileClass,
}
