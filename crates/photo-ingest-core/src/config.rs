use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::metadata::StripTag;

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// A bounding box (width, height) that renditions are fitted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetBox {
    pub width: u32,
    pub height: u32,
}

impl TargetBox {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Configuration for the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Box the inline thumbnail is fitted into
    pub thumbnail_size: TargetBox,

    /// Box the large preview is fitted into
    pub preview_size: TargetBox,

    /// JPEG quality of the inline thumbnail
    pub thumbnail_quality: u8,

    /// JPEG quality of the large preview
    pub preview_quality: u8,

    /// Root directory of the sharded large-preview tree
    pub preview_root: PathBuf,

    /// Path to the SQLite record store
    pub database_path: PathBuf,

    /// Lowercase extensions that are decoded and ingested
    pub common_extensions: BTreeSet<String>,

    /// Lowercase extensions recognized as camera RAW (not processed)
    pub raw_extensions: BTreeSet<String>,

    /// Metadata fields removed before persistence
    pub strip_tags: Vec<StripTag>,

    /// Maximum directory depth for scanning
    pub max_depth: Option<usize>,

    /// Whether symbolic links are followed while walking the source tree
    pub follow_links: bool,

    /// Number of worker threads (1 = sequential, 0 = one per CPU)
    pub threads: usize,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            thumbnail_size: TargetBox::new(80, 80),
            preview_size: TargetBox::new(1600, 1600),
            thumbnail_quality: 90,
            preview_quality: 85,
            preview_root: data_dir.join("large"),
            database_path: data_dir.join("photos.db"),
            common_extensions: ["png", "jpg", "jpeg", "gif"]
                .into_iter()
                .map(String::from)
                .collect(),
            raw_extensions: ["cr2", "nef", "arw"]
                .into_iter()
                .map(String::from)
                .collect(),
            strip_tags: vec![StripTag::Thumbnail, StripTag::MakerNote, StripTag::UserComment],
            max_depth: None,
            follow_links: false,
            threads: 1,
            log_level: LogLevel::Info,
        }
    }
}

/// Location for the database and previews when none is configured
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photo-ingest")
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, size) in [
            ("thumbnail_size", self.thumbnail_size),
            ("preview_size", self.preview_size),
        ] {
            if size.width == 0 || size.height == 0 {
                return Err(Error::Configuration(format!(
                    "{} must be at least 1x1, got {}x{}",
                    name, size.width, size.height
                )));
            }
            // JPEG frame dimensions are 16-bit
            if size.width > u32::from(u16::MAX) || size.height > u32::from(u16::MAX) {
                return Err(Error::Configuration(format!(
                    "{} must be at most {}x{}, got {}x{}",
                    name,
                    u16::MAX,
                    u16::MAX,
                    size.width,
                    size.height
                )));
            }
        }

        for (name, quality) in [
            ("thumbnail_quality", self.thumbnail_quality),
            ("preview_quality", self.preview_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(Error::Configuration(format!(
                    "{} must be between 1 and 100, got {}",
                    name, quality
                )));
            }
        }

        if let Some(ext) = self
            .common_extensions
            .intersection(&self.raw_extensions)
            .next()
        {
            return Err(Error::Configuration(format!(
                "Extension '{}' is listed as both common and RAW",
                ext
            )));
        }

        if self
            .common_extensions
            .iter()
            .chain(self.raw_extensions.iter())
            .any(|ext| ext.is_empty() || ext.starts_with('.') || *ext != ext.to_lowercase())
        {
            return Err(Error::Configuration(
                "Extensions must be lowercase and given without a leading dot".to_string(),
            ));
        }

        Ok(())
    }

    /// Number of worker threads to use, resolving 0 to the CPU count
    pub fn effective_threads(&self) -> usize {
        match self.threads {
            0 => num_cpus::get(),
            n => n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.thumbnail_size, TargetBox::new(80, 80));
        assert_eq!(config.preview_size, TargetBox::new(1600, 1600));
        assert!(config.common_extensions.contains("jpeg"));
        assert!(config.raw_extensions.contains("nef"));
    }

    #[test]
    fn test_overlapping_extensions_rejected() {
        let mut config = Config::default();
        config.raw_extensions.insert("jpg".to_string());

        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_zero_box_rejected() {
        let config = Config {
            thumbnail_size: TargetBox::new(0, 80),
            ..Default::default()
        };

        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_box_beyond_jpeg_limit_rejected() {
        let config = Config {
            preview_size: TargetBox::new(70_000, 1600),
            ..Default::default()
        };

        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_quality_out_of_range_rejected() {
        let config = Config {
            preview_quality: 0,
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("photo-ingest.json");

        let config = Config {
            preview_root: dir.path().join("large"),
            threads: 4,
            ..Default::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.preview_root, config.preview_root);
        assert_eq!(loaded.threads, 4);
        assert_eq!(loaded.strip_tags, config.strip_tags);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "threads": 0 }"#).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.threads, 0);
        assert_eq!(loaded.thumbnail_quality, 90);
        assert!(loaded.effective_threads() >= 1);
    }
}
