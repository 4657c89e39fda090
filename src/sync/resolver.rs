//! Media host URL resolution
//!
//! The media host shards uploads by the MD5 of the file *name*:
//! `{host}/{collection}/{h[0]}/{h[0..2]}/{filename}`.

use thiserror::Error;

use crate::domain::md5_hex;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Cannot resolve an empty filename")]
    EmptyFilename,
}

/// Shard directories for a filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardPath {
    pub prefix: String,
    pub subprefix: String,
}

impl ShardPath {
    pub fn for_filename(filename: &str) -> Self {
        let digest = md5_hex(filename);
        Self {
            prefix: digest[..1].to_string(),
            subprefix: digest[..2].to_string(),
        }
    }
}

/// Derives source URLs on the media host
#[derive(Debug, Clone)]
pub struct MediaResolver {
    host: String,
    collection: String,
}

impl MediaResolver {
    pub fn new(host: &str, collection: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            collection: collection.trim_matches('/').to_string(),
        }
    }

    pub fn resolve(&self, filename: &str) -> Result<String, ResolveError> {
        if filename.trim().is_empty() {
            return Err(ResolveError::EmptyFilename);
        }

        let shard = ShardPath::for_filename(filename);
        Ok(format!(
            "{}/{}/{}/{}/{}",
            self.host, self.collection, shard.prefix, shard.subprefix, filename
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commons() -> MediaResolver {
        MediaResolver::new("https://upload.wikimedia.org/", "wikipedia/commons")
    }

    #[test]
    fn test_resolve_uses_name_digest() {
        assert_eq!(
            commons().resolve("Voiceless_bilabial_plosive.ogg").unwrap(),
            "https://upload.wikimedia.org/wikipedia/commons/5/51/Voiceless_bilabial_plosive.ogg"
        );
        assert_eq!(
            commons().resolve("Close_front_unrounded_vowel.ogg").unwrap(),
            "https://upload.wikimedia.org/wikipedia/commons/9/91/Close_front_unrounded_vowel.ogg"
        );
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let resolver = commons();
        for filename in ["Bilabial_nasal.ogg", "Velar_nasal.ogg", "Mid-central_vowel.ogg"] {
            let first = resolver.resolve(filename).unwrap();
            let second = resolver.resolve(filename).unwrap();
            assert_eq!(first, second);

            let digest = md5_hex(filename);
            let shard = ShardPath::for_filename(filename);
            assert_eq!(shard.prefix, &digest[..1]);
            assert_eq!(shard.subprefix, &digest[..2]);
            assert!(first.ends_with(&format!("/{}/{}/{}", &digest[..1], &digest[..2], filename)));
        }
    }

    #[test]
    fn test_resolve_rejects_empty_filename() {
        assert_eq!(commons().resolve(""), Err(ResolveError::EmptyFilename));
        assert_eq!(commons().resolve("   "), Err(ResolveError::EmptyFilename));
    }
}
