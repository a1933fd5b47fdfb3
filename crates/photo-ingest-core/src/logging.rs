use log::{error, info, warn, LevelFilter};
use std::path::Path;

// For file-based logging with rotation
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

/// Environment variable that overrides the configured log level
pub const LOG_ENV_VAR: &str = "PHOTO_INGEST_LOG";

/// Initialize the logger with timestamp, log level, and module path.
/// Logs are written to file only so they don't interfere with progress bars.
pub fn init_logger(log_dir: &Path, level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;

    let log_file_path = log_dir.join("ingest.log");
    let archived_logs_pattern = format!("{}/ingest.{{}}.log", log_dir.display());

    // Rotate at 10MB
    let file_trigger = SizeTrigger::new(10 * 1024 * 1024);

    // Keep 5 archived log files
    let file_roller = FixedWindowRoller::builder()
        .build(&archived_logs_pattern, 5)
        .map_err(|e| format!("Failed to create log roller: {}", e))?;

    let compound_policy = CompoundPolicy::new(Box::new(file_trigger), Box::new(file_roller));

    let rolling_file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] [{M}:{L}] - {m}{n}",
        )))
        .build(&log_file_path, Box::new(compound_policy))
        .map_err(|e| format!("Failed to create log appender: {}", e))?;

    let level = std::env::var(LOG_ENV_VAR)
        .ok()
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .unwrap_or(level);

    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(rolling_file)))
        .build(Root::builder().appender("file").build(level))
        .map_err(|e| format!("Failed to build log config: {}", e))?;

    log4rs::init_config(config).map_err(|e| format!("Failed to initialize log4rs: {}", e))?;

    info!("Photo ingestion logging started");
    info!("Logging to file: {}", log_file_path.display());
    Ok(())
}

/// Log a file-scoped failure at a named pipeline stage
pub fn log_file_error(path: &Path, stage: &str, cause: &dyn std::fmt::Display) {
    error!(
        "Ingest failed - Stage: {}, Path: {}, Error: {}",
        stage,
        path.display(),
        cause
    );
}

/// Log a thumbnail or preview that could not be produced.
///
/// `stage` is `decode` when the source itself could not be read, otherwise
/// the tier being rendered.
pub fn log_rendition_error(path: &Path, stage: &str, cause: &dyn std::fmt::Display) {
    error!(
        "Rendition failed - Stage: {}, Path: {}, Error: {}",
        stage,
        path.display(),
        cause
    );
}

/// Log unreadable metadata; the file is still ingested
pub fn log_metadata_error(path: &Path, cause: &dyn std::fmt::Display) {
    warn!(
        "Could not read EXIF data - Path: {}, Error: {}",
        path.display(),
        cause
    );
}

/// Log a duplicate skip, naming the file that was ingested first
pub fn log_duplicate(path: &Path, existing: &Path) {
    warn!(
        "Duplicate found for \"{}\". Existing file is \"{}\". Skipping.",
        file_name(path),
        file_name(existing)
    );
}

/// Log file system modification
pub fn log_fs_modification(operation: &str, path: &Path, details: Option<&str>) {
    let details_str = details.unwrap_or("");
    info!(
        "FS CHANGE - Operation: {}, Path: {}{}",
        operation,
        path.display(),
        if details_str.is_empty() {
            "".to_string()
        } else {
            format!(", Details: {}", details_str)
        }
    );
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
