//! Storage key derivation
//!
//! IPA symbols contain non-ASCII characters and slashes, so they never appear
//! in a key directly. Keys are one of:
//! ```text
//! phonetic_{id}.{ext}                      # caller-supplied stable id
//! {sanitized_stem}_{md5(symbol)[..8]}.{ext} # derived from the source filename
//! {basename}                               # local files keep their name
//! ```

use std::fmt;
use std::path::Path;

use crate::domain::{md5_hex, AssetEntry, AssetKind, AssetSource};

/// Hex characters of the symbol digest appended to derived keys
pub const SYMBOL_HASH_LEN: usize = 8;

/// Name of an object inside a bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    /// Key built from a stable row identifier
    pub fn stable(id: u32, extension: &str) -> Self {
        Self(format!("phonetic_{}.{}", id, extension))
    }

    /// Key built from the source filename plus a short digest of the symbol
    pub fn derived(filename: &str, symbol: &str, default_extension: &str) -> Self {
        let (stem, extension) = match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, ext),
            _ => (filename, default_extension),
        };

        let symbol_hash = &md5_hex(symbol)[..SYMBOL_HASH_LEN];
        Self(format!("{}_{}.{}", sanitize(stem), symbol_hash, sanitize(extension)))
    }

    /// Key equal to the file's own name
    pub fn basename(path: &Path) -> Option<Self> {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .map(Self)
    }

    /// Choose the key for an entry of the given kind
    pub fn for_entry(entry: &AssetEntry, kind: AssetKind, use_stable_ids: bool) -> Option<Self> {
        match (&entry.source, entry.id) {
            (_, Some(id)) if use_stable_ids => Some(Self::stable(id, kind.extension())),
            (AssetSource::Remote { filename }, _) => {
                Some(Self::derived(filename, &entry.symbol, kind.extension()))
            }
            (AssetSource::Local { path }, _) => Self::basename(path),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map dashes and spaces to underscores and drop anything else outside `[A-Za-z0-9_]`
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
