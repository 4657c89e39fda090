//! Phonetic Asset Sync
//!
//! Mirrors IPA pronunciation clips from a public media host, and mouth-shape
//! illustrations from the frontend tree, into object storage. Prints the SQL
//! that links each symbol in the `phonetics` table to its new public URL.
//! Entries are processed one at a time with a fixed pause between them.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod domain;
mod storage;
mod sync;

#[cfg(test)]
mod test_support;

use crate::config::{Settings, SettingsError};
use crate::domain::{
    audio_entries, directory_entries, image_entries, select_entries, AssetEntry, AssetKind,
};
use crate::storage::StorageClient;
use crate::sync::{write_report, write_upload_listing, HttpFetcher, MediaResolver, SyncPipeline};

/// Exit status when configuration is missing or invalid
const CONFIG_EXIT_CODE: u8 = 1;

#[derive(Debug, Parser)]
#[command(name = "phonetic-asset-sync", version, about = "Mirror phonetic assets into object storage")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download pronunciation clips from the media host and publish them
    Audio {
        /// Pause after each entry, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Store clips as phonetic_<n>.ogg instead of name-derived keys
        #[arg(long)]
        stable_ids: bool,
        #[command(flatten)]
        selection: Selection,
    },
    /// Publish mouth-shape images from the local frontend tree
    Images {
        /// Pause after each entry, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Directory the image table paths are relative to
        #[arg(long)]
        root: Option<PathBuf>,
        /// Upload every visible file in DIR under its own name instead of the image table
        #[arg(long, value_name = "DIR", conflicts_with = "root")]
        dir: Option<PathBuf>,
        #[command(flatten)]
        selection: Selection,
    },
}

/// Restrict a run to part of the table
#[derive(Debug, Args)]
struct Selection {
    /// Process only this symbol (repeatable)
    #[arg(long = "only", value_name = "SYMBOL")]
    only: Vec<String>,
    /// Leave this symbol out (repeatable)
    #[arg(long = "skip", value_name = "SYMBOL")]
    skip: Vec<String>,
}

/// One batch, resolved from the command line and settings
struct Plan {
    kind: AssetKind,
    entries: Vec<AssetEntry>,
    delay_ms: u64,
    stable_ids: bool,
    /// Entries are `phonetics` symbols, so the report carries SQL
    linked: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load environment variables from the env file
    match std::env::var_os("ENV_FILE") {
        Some(path) => {
            dotenvy::from_path(&path).ok();
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    init_tracing();
    let cli = Cli::parse();

    let settings = match startup_settings(Settings::load()) {
        Ok(settings) => settings,
        Err(code) => return ExitCode::from(code),
    };

    match run(cli.command, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Validate loaded settings, or report why startup cannot proceed
fn startup_settings(loaded: Result<Settings, SettingsError>) -> Result<Settings, u8> {
    loaded.and_then(Settings::validate).map_err(|e| {
        eprintln!("error: {}", e);
        CONFIG_EXIT_CODE
    })
}

/// Structured logs go to stderr; stdout carries only the report
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("phonetic_asset_sync=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false) {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn plan(command: Command, settings: &Settings) -> anyhow::Result<Plan> {
    let (plan, selection) = match command {
        Command::Audio { delay_ms, stable_ids, selection } => (
            Plan {
                kind: AssetKind::Audio,
                entries: audio_entries(),
                delay_ms: delay_ms.unwrap_or(settings.sync.audio_delay_ms),
                stable_ids,
                linked: true,
            },
            selection,
        ),
        Command::Images { delay_ms, root, dir, selection } => {
            let (entries, linked) = match dir {
                Some(dir) => {
                    let entries = directory_entries(&dir)
                        .with_context(|| format!("Failed to list image directory {}", dir.display()))?;
                    (entries, false)
                }
                None => (
                    image_entries(root.as_deref().unwrap_or(&settings.sync.image_root)),
                    true,
                ),
            };
            (
                Plan {
                    kind: AssetKind::Image,
                    entries,
                    delay_ms: delay_ms.unwrap_or(settings.sync.image_delay_ms),
                    stable_ids: false,
                    linked,
                },
                selection,
            )
        }
    };

    let entries = select_entries(plan.entries, &selection.only, &selection.skip)?;
    Ok(Plan { entries, ..plan })
}

async fn run(command: Command, settings: Settings) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(settings.media.timeout_secs);
    let plan = plan(command, &settings)?;

    let bucket = match plan.kind {
        AssetKind::Audio => &settings.storage.audio_bucket,
        AssetKind::Image => &settings.storage.image_bucket,
    };

    let fetcher = HttpFetcher::new(
        &settings.media.user_agent,
        timeout,
        settings.media.min_body_bytes,
    )
    .context("Failed to create media HTTP client")?;

    let storage = StorageClient::new(&settings.storage.url, &settings.storage.token, bucket, timeout)
        .context("Failed to create storage client")?;

    info!(
        "Starting {} sync v{}: {} entries into bucket {}",
        plan.kind,
        env!("CARGO_PKG_VERSION"),
        plan.entries.len(),
        storage.bucket()
    );

    let pipeline = SyncPipeline::new(
        plan.kind,
        MediaResolver::new(&settings.media.host, &settings.media.collection),
        Box::new(fetcher),
        Box::new(storage),
        &settings.sync.scratch_dir,
    )
    .with_delay(Duration::from_millis(plan.delay_ms))
    .with_stable_ids(plan.stable_ids);

    let report = pipeline.run(&plan.entries).await.with_context(|| {
        format!(
            "Failed to create scratch directory {}",
            settings.sync.scratch_dir.display()
        )
    })?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let written = if plan.linked {
        write_report(&report, &mut out)
    } else {
        write_upload_listing(&report, &mut out)
    };
    written.context("Failed to write report")?;

    Ok(())
}
