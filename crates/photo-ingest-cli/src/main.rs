use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use photo_ingest_core::config::LogLevel;
use photo_ingest_core::logging::{init_logger, LOG_ENV_VAR};
use photo_ingest_core::{
    Config, IngestOutcome, PhotoIngestor, PreviewStore, RecordStore, SqliteStore,
};

#[derive(Parser)]
#[command(name = "photo-ingest")]
#[command(about = "Ingest photos into a deduplicated library")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write logs to rotating files in this directory instead of the console
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every photo under a directory
    Import {
        /// Directory to walk
        directory: PathBuf,

        /// Worker threads (1 = sequential, 0 = one per CPU)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored photos, newest first
    List {
        /// Maximum number of records to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Show one stored photo
    Show {
        id: i64,
    },

    /// Delete a stored photo and its preview
    Delete {
        id: i64,

        /// Leave the large preview on disk
        #[arg(long)]
        keep_preview: bool,
    },

    /// Print where the preview for a content hash is stored
    PreviewPath {
        hash: String,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "photo-ingest.json")]
        path: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.validate()?;
    Ok(config)
}

fn init_logging(cli: &Cli, configured: LogLevel) -> anyhow::Result<()> {
    // Set log level based on verbosity
    let level = match cli.verbose {
        0 => LevelFilter::from(configured),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    match &cli.log_dir {
        Some(dir) => init_logger(dir, level).map_err(|e| anyhow::anyhow!("{}", e))?,
        None => env_logger::Builder::from_env(
            env_logger::Env::new().filter_or(LOG_ENV_VAR, level.to_string()),
        )
        .init(),
    }
    Ok(())
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) - {msg}",
    ) {
        bar.set_style(style.progress_chars("█▓▒░ "));
    }
    bar
}

fn import(config: Config, directory: &Path, json: bool) -> anyhow::Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        eprintln!("Finishing files in flight, press Ctrl-C again to abort");
    })
    .context("Failed to install Ctrl-C handler")?;

    let ingestor = PhotoIngestor::open(config)?
        .with_progress(progress_bar())
        .with_shutdown_flag(shutdown);

    info!("Starting import of {}", directory.display());
    let report = ingestor.run(directory)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for outcome in &report.outcomes {
        if let IngestOutcome::Failed { path, kind, cause } = outcome {
            println!("FAILED  {} ({}): {}", path.display(), kind, cause);
        }
    }
    println!("{}", report.summary);
    if report.summary.metadata_failures > 0 {
        println!(
            "{} photos were stored without metadata",
            report.summary.metadata_failures
        );
    }
    Ok(())
}

fn list(store: &SqliteStore, limit: usize) -> anyhow::Result<()> {
    let records = store.list(Some(limit))?;
    if records.is_empty() {
        println!("No photos stored");
        return Ok(());
    }

    for record in records {
        println!(
            "{:>6}  {}  {:<19}  {}",
            record.id,
            record.content_hash,
            record.taken_timestamp().unwrap_or_default(),
            record.source_path.display()
        );
    }
    Ok(())
}

fn show(store: &SqliteStore, previews: &PreviewStore, id: i64) -> anyhow::Result<()> {
    let Some(record) = store.get_by_id(id)? else {
        bail!("No photo with id {}", id);
    };

    println!("id:        {}", record.id);
    println!("source:    {}", record.source_path.display());
    println!("hash:      {}", record.content_hash);
    if let Some(at) = record.ingested_at() {
        println!("ingested:  {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!(
        "taken:     {}",
        record.taken_timestamp().as_deref().unwrap_or("-")
    );
    match record.gps_coordinates() {
        Some((lat, lon)) => println!("gps:       {:.6}, {:.6}", lat, lon),
        None => println!("gps:       -"),
    }
    println!("thumbnail: {} bytes", record.thumbnail.len());
    match &record.metadata {
        Some(blob) => println!("metadata:  {} bytes", blob.len()),
        None => println!("metadata:  -"),
    }
    let preview = previews.path_for(&record.content_hash)?;
    println!(
        "preview:   {}{}",
        preview.display(),
        if preview.is_file() { "" } else { " (missing)" }
    );
    Ok(())
}

fn delete(
    store: &SqliteStore,
    previews: &PreviewStore,
    id: i64,
    keep_preview: bool,
) -> anyhow::Result<()> {
    let Some(record) = store.get_by_id(id)? else {
        bail!("No photo with id {}", id);
    };

    store.delete(id)?;
    if !keep_preview && !previews.remove(&record.content_hash)? {
        warn!("No preview on disk for {}", record.content_hash);
    }
    println!("Deleted #{} ({})", id, record.source_path.display());
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    // Parse command line arguments
    let cli = Cli::parse();

    if let Commands::GenerateConfig { path } = &cli.command {
        let config = Config::default();
        config.save_to_file(path)?;
        println!("Configuration file generated at: {}", path.display());
        return Ok(());
    }

    // Set up configuration
    let mut config = load_config(cli.config.as_deref())?;
    init_logging(&cli, config.log_level)?;

    match &cli.command {
        Commands::Import {
            directory,
            threads,
            json,
        } => {
            // Override config with command line arguments
            if let Some(threads) = threads {
                config.threads = *threads;
            }
            import(config, directory, *json)
        }
        Commands::List { limit } => list(&SqliteStore::open(&config.database_path)?, *limit),
        Commands::Show { id } => show(
            &SqliteStore::open(&config.database_path)?,
            &PreviewStore::new(&config.preview_root),
            *id,
        ),
        Commands::Delete { id, keep_preview } => delete(
            &SqliteStore::open(&config.database_path)?,
            &PreviewStore::new(&config.preview_root),
            *id,
            *keep_preview,
        ),
        Commands::PreviewPath { hash } => {
            let path = PreviewStore::new(&config.preview_root).path_for(hash)?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::GenerateConfig { .. } => Ok(()),
    }
}
