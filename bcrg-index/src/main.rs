//! bcrg-index - index a directory of BCR call recordings
//!
//! **Usage:**
//! ```bash
//! bcrg-index refresh [--dir <DIR>] [--reparse]
//! bcrg-index list [--dir <DIR>]
//! bcrg-index check-pattern <TEMPLATE> [--test <FILENAME>]
//! bcrg-index set-pattern <TEMPLATE>
//! bcrg-index templates
//! ```

use anyhow::{Context, Result};
use bcrg_common::config::{
    config_file_path, load_config_or_default, load_toml_config, resolve_recordings_directory,
    IndexSettings, TomlConfig, RECORDINGS_DIR_ENV,
};
use bcrg_index::config::save_config;
use bcrg_common::events::{EventBus, IndexEvent};
use bcrg_common::time::millis_to_datetime;
use bcrg_index::services::{
    accept_template, extract_from_filename, LocalDirectory, RecordingsIndex, RefreshOutcome,
    WELL_KNOWN_TEMPLATES,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// BCR recordings index
#[derive(Parser, Debug)]
#[clap(name = "bcrg-index")]
#[clap(about = "Index a directory of BCR call recordings")]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile the index with the recordings directory
    Refresh {
        /// Recordings directory (overrides BCRG_RECORDINGS_DIR and config)
        #[clap(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Re-derive recordings without a sidecar from their filename
        #[clap(long)]
        reparse: bool,
    },

    /// Print the indexed recordings
    List {
        /// Recordings directory (overrides BCRG_RECORDINGS_DIR and config)
        #[clap(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Print the recordings as JSON
        #[clap(long)]
        json: bool,
    },

    /// Validate a filename template, optionally testing it on a filename
    CheckPattern {
        template: String,

        /// Filename to extract metadata from
        #[clap(long, value_name = "FILENAME")]
        test: Option<String>,
    },

    /// Validate a filename template and save it to the config file
    SetPattern { template: String },

    /// List well-known filename templates
    Templates,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!("Starting bcrg-index v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Refresh { dir, reparse } => refresh(&config, dir.as_deref(), reparse).await,
        Command::List { dir, json } => list(&config, dir.as_deref(), json).await,
        Command::CheckPattern { template, test } => check_pattern(&template, test.as_deref()),
        Command::SetPattern { template } => set_pattern(&template),
        Command::Templates => {
            for template in WELL_KNOWN_TEMPLATES {
                println!("{:<28} {}", template.name, template.pattern);
            }
            Ok(())
        }
    }
}

fn open_index(config: &TomlConfig, dir: Option<&Path>) -> Result<RecordingsIndex> {
    let directory = resolve_recordings_directory(dir, RECORDINGS_DIR_ENV, config)?;
    info!("Recordings directory: {}", directory.display());

    Ok(RecordingsIndex::new(
        Arc::new(LocalDirectory::new(directory)),
        IndexSettings::from_toml(config),
        EventBus::default(),
    ))
}

async fn refresh(config: &TomlConfig, dir: Option<&Path>, reparse: bool) -> Result<()> {
    let index = open_index(config, dir)?;
    index.load().await.context("Failed to load recordings database")?;

    let mut rx = index.events().subscribe();
    let progress = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                IndexEvent::RefreshProgress { processed, total, fraction } => {
                    debug!(processed, total, "Refresh {:.0}%", fraction * 100.0);
                }
                IndexEvent::RefreshCompleted { .. } | IndexEvent::RefreshFailed { .. } => break,
                _ => {}
            }
        }
    });

    let outcome = index.refresh(reparse).await;
    progress.abort();

    match outcome.context("Refresh failed")? {
        RefreshOutcome::Completed(summary) => {
            println!(
                "{} recordings ({} added, {} removed, {} reparsed)",
                summary.total, summary.added, summary.removed, summary.reparsed
            );
        }
        RefreshOutcome::AlreadyRunning => println!("A refresh is already running"),
    }
    Ok(())
}

async fn list(config: &TomlConfig, dir: Option<&Path>, json: bool) -> Result<()> {
    let index = open_index(config, dir)?;
    if !index.load().await.context("Failed to load recordings database")? {
        println!("No recordings database yet; run `bcrg-index refresh` first");
        return Ok(());
    }

    let mut recordings = index.recordings().await;
    recordings.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));

    if json {
        println!("{}", serde_json::to_string_pretty(&recordings)?);
        return Ok(());
    }

    for recording in &recordings {
        let date = millis_to_datetime(recording.timestamp_ms)
            .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {:<10} {:>6}s  {} <{}>",
            date,
            recording.direction,
            recording.duration_seconds,
            recording.other_party_name,
            recording.other_party_number
        );
    }
    Ok(())
}

fn check_pattern(template: &str, test: Option<&str>) -> Result<()> {
    let pattern = accept_template(template)?;
    println!("Pattern OK: {}", pattern.as_str());

    if let Some(filename) = test {
        let metadata = extract_from_filename(filename, &pattern);
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    }
    Ok(())
}

fn set_pattern(template: &str) -> Result<()> {
    let path = config_file_path()?;
    let mut config = if path.exists() {
        load_toml_config(&path)?
    } else {
        TomlConfig::default()
    };
    config.filename_pattern = Some(template.to_string());
    save_config(&config, &path).context("Filename pattern rejected")?;

    println!("Filename pattern saved to {}", path.display());
    Ok(())
}
