//! Storage module for phonetic asset publishing
//!
//! Uploads audio clips and mouth-shape images to a bucketed object store and
//! hands back the public URL each object is served from.

mod key;
mod object_store;

pub use key::StorageKey;
pub use object_store::{StorageClient, StorageError};
