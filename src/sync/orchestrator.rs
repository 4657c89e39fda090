//! Batch orchestrator for asset synchronization
//!
//! Walks a sync table strictly in order. Each entry moves through
//! ```text
//! PENDING -> FETCHING -> FETCH_FAILED
//!                     -> FETCHED -> PUBLISHING -> PUBLISH_FAILED
//!                                             -> PUBLISHED -> CLEANED_UP
//! ```
//! A failed entry is logged and skipped; it never aborts the batch. Scratch
//! copies are only removed once the publish has succeeded, so failed
//! downloads stay on disk for inspection.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn, instrument};

use crate::domain::{AssetEntry, AssetKind, AssetSource};
use crate::storage::{StorageError, StorageKey};

use super::fetcher::{FetchError, Fetcher};
use super::publisher::Publisher;
use super::resolver::{MediaResolver, ResolveError};

/// Per-entry failures. None of these stop the batch.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Cannot resolve source URL: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Upload failed: {0}")]
    Publish(#[from] StorageError),

    #[error("Local file missing: {}", .0.display())]
    LocalFileMissing(PathBuf),

    #[error("Storage key {key} for {symbol} is already used by {other}")]
    KeyCollision { key: StorageKey, symbol: String, other: String },

    #[error("No storage key can be derived from the source")]
    NoStorageKey,
}

/// Lifecycle of a single entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Pending,
    Fetching,
    FetchFailed,
    Fetched,
    Publishing,
    PublishFailed,
    Published,
    CleanedUp,
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryState::Pending => write!(f, "pending"),
            EntryState::Fetching => write!(f, "fetching"),
            EntryState::FetchFailed => write!(f, "fetch_failed"),
            EntryState::Fetched => write!(f, "fetched"),
            EntryState::Publishing => write!(f, "publishing"),
            EntryState::PublishFailed => write!(f, "publish_failed"),
            EntryState::Published => write!(f, "published"),
            EntryState::CleanedUp => write!(f, "cleaned_up"),
        }
    }
}

/// Where an entry ended up
#[derive(Debug)]
pub struct EntryOutcome {
    pub symbol: String,
    pub state: EntryState,
    /// Public URL on success
    pub result: Result<String, SyncError>,
}

/// Tracks one entry through its states
struct EntryRun<'a> {
    symbol: &'a str,
    state: EntryState,
}

impl<'a> EntryRun<'a> {
    fn new(symbol: &'a str) -> Self {
        Self { symbol, state: EntryState::Pending }
    }

    fn advance(&mut self, state: EntryState) {
        debug!(symbol = %self.symbol, from = %self.state, to = %state, "Entry state change");
        self.state = state;
    }

    fn fail(mut self, state: EntryState, error: SyncError) -> EntryOutcome {
        self.advance(state);
        self.finish(Err(error))
    }

    fn finish(self, result: Result<String, SyncError>) -> EntryOutcome {
        EntryOutcome {
            symbol: self.symbol.to_string(),
            state: self.state,
            result,
        }
    }
}

/// A symbol whose asset is now publicly reachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedAsset {
    pub symbol: String,
    pub public_url: String,
}

/// A symbol that did not make it, and why
#[derive(Debug)]
pub struct FailedAsset {
    pub symbol: String,
    pub state: EntryState,
    pub error: SyncError,
}

/// Batch result, in table order
#[derive(Debug)]
pub struct BatchReport {
    pub kind: AssetKind,
    pub published: Vec<PublishedAsset>,
    pub failures: Vec<FailedAsset>,
    /// Total time in milliseconds
    pub total_time_ms: u64,
}

impl BatchReport {
    pub fn new(kind: AssetKind) -> Self {
        Self {
            kind,
            published: Vec::new(),
            failures: Vec::new(),
            total_time_ms: 0,
        }
    }

    pub fn success_count(&self) -> usize {
        self.published.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.success_count() + self.failed_count()
    }

    fn record(&mut self, outcome: EntryOutcome) {
        match outcome.result {
            Ok(public_url) => {
                info!(symbol = %outcome.symbol, url = %public_url, "Published");
                self.published.push(PublishedAsset { symbol: outcome.symbol, public_url });
            }
            Err(error) => {
                warn!(
                    symbol = %outcome.symbol,
                    state = %outcome.state,
                    reason = %error,
                    "Entry failed"
                );
                self.failures.push(FailedAsset {
                    symbol: outcome.symbol,
                    state: outcome.state,
                    error,
                });
            }
        }
    }
}

/// A file ready to be published
struct Staged {
    path: PathBuf,
    /// Scratch copies are removed after a successful publish
    scratch: bool,
}

/// Resolve → fetch → publish pipeline over one asset table
pub struct SyncPipeline {
    kind: AssetKind,
    resolver: MediaResolver,
    fetcher: Box<dyn Fetcher>,
    publisher: Box<dyn Publisher>,
    scratch_dir: PathBuf,
    /// Pause after every entry to stay under the media host's rate limits
    delay: Duration,
    use_stable_ids: bool,
}

impl SyncPipeline {
    pub fn new(
        kind: AssetKind,
        resolver: MediaResolver,
        fetcher: Box<dyn Fetcher>,
        publisher: Box<dyn Publisher>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            kind,
            resolver,
            fetcher,
            publisher,
            scratch_dir: scratch_dir.into(),
            delay: Duration::ZERO,
            use_stable_ids: false,
        }
    }

    /// Set the inter-entry delay
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Store entries under `phonetic_<id>` keys when they carry an id
    pub fn with_stable_ids(mut self, enabled: bool) -> Self {
        self.use_stable_ids = enabled;
        self
    }

    /// Run the whole table. Only a scratch directory that cannot be created
    /// is fatal; everything else is recorded per entry.
    #[instrument(skip(self, entries), fields(kind = %self.kind, entry_count = entries.len()))]
    pub async fn run(&self, entries: &[AssetEntry]) -> std::io::Result<BatchReport> {
        let start = Instant::now();

        let needs_scratch = entries
            .iter()
            .any(|e| matches!(e.source, AssetSource::Remote { .. }));
        if needs_scratch {
            tokio::fs::create_dir_all(&self.scratch_dir).await?;
        }

        let keys = self.assign_keys(entries);
        let mut report = BatchReport::new(self.kind);

        for (position, (entry, key)) in entries.iter().zip(keys).enumerate() {
            info!(
                symbol = %entry.symbol,
                "Processing entry {}/{}",
                position + 1,
                entries.len()
            );

            // Entries without a usable key never reach the network
            let outcome = match key {
                Ok(key) => self.process_entry(entry, &key).await,
                Err(e) => EntryRun::new(&entry.symbol).fail(EntryState::FetchFailed, e),
            };
            report.record(outcome);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        report.total_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "Batch completed: {} success, {} failed in {}ms",
            report.success_count(),
            report.failed_count(),
            report.total_time_ms
        );

        Ok(report)
    }

    /// Derive every key up front; a key claimed twice fails the later entry
    fn assign_keys(&self, entries: &[AssetEntry]) -> Vec<Result<StorageKey, SyncError>> {
        let mut claimed: HashMap<StorageKey, &str> = HashMap::new();

        entries
            .iter()
            .map(|entry| {
                let key = StorageKey::for_entry(entry, self.kind, self.use_stable_ids)
                    .ok_or(SyncError::NoStorageKey)?;

                if let Some(other) = claimed.get(&key) {
                    return Err(SyncError::KeyCollision {
                        key,
                        symbol: entry.symbol.clone(),
                        other: other.to_string(),
                    });
                }
                claimed.insert(key.clone(), &entry.symbol);
                Ok(key)
            })
            .collect()
    }

    async fn process_entry(&self, entry: &AssetEntry, key: &StorageKey) -> EntryOutcome {
        let mut progress = EntryRun::new(&entry.symbol);

        progress.advance(EntryState::Fetching);
        let staged = match self.stage(entry, key).await {
            Ok(staged) => staged,
            Err(e) => return progress.fail(EntryState::FetchFailed, e),
        };
        progress.advance(EntryState::Fetched);

        progress.advance(EntryState::Publishing);
        info!(symbol = %entry.symbol, key = %key, "Uploading");
        let public_url = match self
            .publisher
            .publish(&staged.path, key, self.kind.content_type())
            .await
        {
            Ok(url) => url,
            Err(e) => return progress.fail(EntryState::PublishFailed, e.into()),
        };
        progress.advance(EntryState::Published);

        if staged.scratch {
            match tokio::fs::remove_file(&staged.path).await {
                Ok(()) => progress.advance(EntryState::CleanedUp),
                Err(e) => warn!(
                    path = %staged.path.display(),
                    error = %e,
                    "Failed to remove scratch file"
                ),
            }
        } else {
            progress.advance(EntryState::CleanedUp);
        }

        progress.finish(Ok(public_url))
    }

    async fn stage(&self, entry: &AssetEntry, key: &StorageKey) -> Result<Staged, SyncError> {
        match &entry.source {
            AssetSource::Remote { filename } => {
                let url = self.resolver.resolve(filename)?;
                let dest = self.scratch_dir.join(key.as_str());

                info!(symbol = %entry.symbol, url = %url, "Downloading");
                let bytes = self.fetcher.fetch(&url, &dest).await?;
                info!(symbol = %entry.symbol, bytes, "Downloaded");

                Ok(Staged { path: dest, scratch: true })
            }
            AssetSource::Local { path } => {
                let is_file = tokio::fs::metadata(path)
                    .await
                    .map(|m| m.is_file())
                    .unwrap_or(false);
                if !is_file {
                    return Err(SyncError::LocalFileMissing(path.clone()));
                }
                Ok(Staged { path: path.clone(), scratch: false })
            }
        }
    }
}
