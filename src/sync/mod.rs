//! Sync module for phonetic asset mirroring
//!
//! Resolves source URLs on the media host, downloads into a scratch
//! directory, publishes to object storage and reports the SQL needed to link
//! each symbol to its new public URL.

mod fetcher;
mod orchestrator;
mod publisher;
mod report;
mod resolver;

pub use fetcher::HttpFetcher;
pub use orchestrator::SyncPipeline;
pub use report::{write_report, write_upload_listing};
pub use resolver::MediaResolver;
