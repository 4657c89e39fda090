//! Phonetic asset tables
//!
//! Each IPA symbol in the `phonetics` table is linked to one pronunciation
//! clip on the media host and, for a subset, a mouth-shape illustration that
//! ships with the frontend. Diphthongs and consonant clusters reuse the clip of
//! their leading sound.

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// What kind of asset a batch moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Audio,
    Image,
}

impl AssetKind {
    /// MIME type sent with the upload
    pub fn content_type(&self) -> &'static str {
        match self {
            AssetKind::Audio => "audio/ogg",
            AssetKind::Image => "image/png",
        }
    }

    /// Column of the `phonetics` table holding the public URL
    pub fn url_column(&self) -> &'static str {
        match self {
            AssetKind::Audio => "audio_url",
            AssetKind::Image => "mouth_shape_image",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AssetKind::Audio => "ogg",
            AssetKind::Image => "png",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Audio => write!(f, "audio"),
            AssetKind::Image => write!(f, "image"),
        }
    }
}

/// Where the bytes for an entry come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// A file on the media host, addressed by its canonical filename
    Remote { filename: String },
    /// A file already on local disk
    Local { path: PathBuf },
}

/// One row of a sync table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    /// IPA notation, the business key of the `phonetics` table
    pub symbol: String,
    pub source: AssetSource,
    /// Stable identifier used for `phonetic_<id>` storage keys
    pub id: Option<u32>,
}

impl AssetEntry {
    pub fn remote(symbol: &str, filename: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            source: AssetSource::Remote { filename: filename.to_string() },
            id: None,
        }
    }

    pub fn local(symbol: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            symbol: symbol.to_string(),
            source: AssetSource::Local { path: path.into() },
            id: None,
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }
}

const AUDIO_TABLE: &[(&str, &str)] = &[
    // Vowels
    ("/i:/", "Close_front_unrounded_vowel.ogg"),
    ("/ɪ/", "Near-close_near-front_unrounded_vowel.ogg"),
    ("/e/", "Close-mid_front_unrounded_vowel.ogg"),
    ("/æ/", "Near-open_front_unrounded_vowel.ogg"),
    ("/ɑ:/", "Open_back_unrounded_vowel.ogg"),
    ("/ɒ/", "Open_back_rounded_vowel.ogg"),
    ("/ɔ:/", "Open-mid_back_rounded_vowel.ogg"),
    ("/ʊ/", "Near-close_near-back_rounded_vowel.ogg"),
    ("/u:/", "Close_back_rounded_vowel.ogg"),
    ("/ʌ/", "Open-mid_back_unrounded_vowel.ogg"),
    ("/ɜ:/", "Open-mid_central_unrounded_vowel.ogg"),
    ("/ə/", "Mid-central_vowel.ogg"),
    // Diphthongs
    ("/eɪ/", "Close-mid_front_unrounded_vowel.ogg"),
    ("/aɪ/", "Open_front_unrounded_vowel.ogg"),
    ("/ɔɪ/", "Open-mid_back_rounded_vowel.ogg"),
    ("/aʊ/", "Open_front_unrounded_vowel.ogg"),
    ("/əʊ/", "Mid-central_vowel.ogg"),
    ("/ɪə/", "Near-close_near-front_unrounded_vowel.ogg"),
    ("/eə/", "Close-mid_front_unrounded_vowel.ogg"),
    ("/ʊə/", "Near-close_near-back_rounded_vowel.ogg"),
    // Consonants
    ("/p/", "Voiceless_bilabial_plosive.ogg"),
    ("/b/", "Voiced_bilabial_plosive.ogg"),
    ("/t/", "Voiceless_alveolar_plosive.ogg"),
    ("/d/", "Voiced_alveolar_plosive.ogg"),
    ("/k/", "Voiceless_velar_plosive.ogg"),
    ("/g/", "Voiced_velar_plosive.ogg"),
    ("/f/", "Voiceless_labiodental_fricative.ogg"),
    ("/v/", "Voiced_labiodental_fricative.ogg"),
    ("/θ/", "Voiceless_dental_fricative.ogg"),
    ("/ð/", "Voiced_dental_fricative.ogg"),
    ("/s/", "Voiceless_alveolar_sibilant.ogg"),
    ("/z/", "Voiced_alveolar_sibilant.ogg"),
    ("/ʃ/", "Voiceless_palato-alveolar_sibilant.ogg"),
    ("/ʒ/", "Voiced_palato-alveolar_sibilant.ogg"),
    ("/h/", "Voiceless_glottal_fricative.ogg"),
    ("/m/", "Bilabial_nasal.ogg"),
    ("/n/", "Alveolar_nasal.ogg"),
    ("/ŋ/", "Velar_nasal.ogg"),
    ("/l/", "Alveolar_lateral_approximant.ogg"),
    ("/r/", "Alveolar_approximant.ogg"),
    ("/j/", "Palatal_approximant.ogg"),
    ("/w/", "Labio-velar_approximant.ogg"),
    // Affricates and clusters
    ("/tʃ/", "Voiceless_palato-alveolar_affricate.ogg"),
    ("/dʒ/", "Voiced_palato-alveolar_affricate.ogg"),
    ("/tr/", "Voiceless_alveolar_plosive.ogg"),
    ("/dr/", "Voiced_alveolar_plosive.ogg"),
    ("/ts/", "Voiceless_alveolar_plosive.ogg"),
    ("/dz/", "Voiced_alveolar_plosive.ogg"),
];

const IMAGE_TABLE: &[(&str, &str)] = &[
    ("/ɪ/", "frontend/public/images/phonetics/mouth_short_i.png"),
    ("/e/", "frontend/public/images/phonetics/mouth_e.png"),
    ("/ɑ:/", "frontend/public/images/phonetics/mouth_long_a.png"),
    ("/ɔ:/", "frontend/public/images/phonetics/mouth_long_o.png"),
    ("/u:/", "frontend/public/images/phonetics/mouth_long_u.png"),
];

/// Audio entries in table order; ids are 1-based table positions
pub fn audio_entries() -> Vec<AssetEntry> {
    AUDIO_TABLE
        .iter()
        .zip(1..)
        .map(|(&(symbol, filename), id)| AssetEntry::remote(symbol, filename).with_id(id))
        .collect()
}

/// Mouth-shape entries with paths resolved against `root`
pub fn image_entries(root: &Path) -> Vec<AssetEntry> {
    IMAGE_TABLE
        .iter()
        .map(|&(symbol, path)| AssetEntry::local(symbol, root.join(path)))
        .collect()
}

/// Every visible file in `dir`, sorted by name, keyed by its file name
///
/// Dotfiles, subdirectories and names that are not valid UTF-8 are skipped.
pub fn directory_entries(dir: &Path) -> io::Result<Vec<AssetEntry>> {
    let mut entries = Vec::new();

    for item in std::fs::read_dir(dir)? {
        let item = item?;
        if !item.file_type()?.is_file() {
            continue;
        }
        let name = match item.file_name().into_string() {
            Ok(name) if !name.starts_with('.') => name,
            _ => continue,
        };
        entries.push(AssetEntry::local(&name, item.path()));
    }

    entries.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(entries)
}

/// Symbols named in a selection that the table does not contain
#[derive(Debug, Error)]
#[error("Unknown symbol(s): {}", .0.join(", "))]
pub struct UnknownSymbols(pub Vec<String>);

/// Narrow a table to a subset of its symbols
///
/// An empty `only` keeps every entry. Table order and ids are preserved, so
/// stable storage keys do not shift when a subset is re-run.
pub fn select_entries(
    entries: Vec<AssetEntry>,
    only: &[String],
    skip: &[String],
) -> Result<Vec<AssetEntry>, UnknownSymbols> {
    let known: HashSet<&str> = entries.iter().map(|e| e.symbol.as_str()).collect();
    let unknown: Vec<String> = only
        .iter()
        .chain(skip)
        .filter(|symbol| !known.contains(symbol.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(UnknownSymbols(unknown));
    }

    Ok(entries
        .into_iter()
        .filter(|e| only.is_empty() || only.contains(&e.symbol))
        .filter(|e| !skip.contains(&e.symbol))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_table_covers_every_symbol_once() {
        let entries = audio_entries();
        assert_eq!(entries.len(), 48);

        let symbols: HashSet<_> = entries.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols.len(), entries.len());

        assert_eq!(entries[0].id, Some(1));
        assert_eq!(entries[47].id, Some(48));
        assert!(entries.iter().all(|e| matches!(e.source, AssetSource::Remote { .. })));
    }

    #[test]
    fn test_image_entries_resolve_against_root() {
        let entries = image_entries(Path::new("/srv/app"));
        assert_eq!(entries.len(), 5);
        assert_eq!(
            entries[0].source,
            AssetSource::Local {
                path: PathBuf::from("/srv/app/frontend/public/images/phonetics/mouth_short_i.png"),
            }
        );
    }

    #[test]
    fn test_asset_kind_metadata() {
        assert_eq!(AssetKind::Audio.content_type(), "audio/ogg");
        assert_eq!(AssetKind::Image.content_type(), "image/png");
        assert_eq!(AssetKind::Audio.url_column(), "audio_url");
        assert_eq!(AssetKind::Image.url_column(), "mouth_shape_image");
    }

    fn names(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_only_keeps_table_order_and_ids() {
        let selected = select_entries(audio_entries(), &names(&["/b/", "/p/"]), &[]).unwrap();

        let picked: Vec<_> = selected.iter().map(|e| (e.symbol.as_str(), e.id)).collect();
        assert_eq!(picked, [("/p/", Some(21)), ("/b/", Some(22))]);
    }

    #[test]
    fn test_select_skip_drops_symbols() {
        let selected = select_entries(audio_entries(), &[], &names(&["/i:/"])).unwrap();
        assert_eq!(selected.len(), 47);
        assert_eq!(selected[0].symbol, "/ɪ/");
        assert_eq!(selected[0].id, Some(2));
    }

    #[test]
    fn test_select_rejects_unknown_symbols() {
        let err = select_entries(audio_entries(), &names(&["/p/", "/q/"]), &names(&["/x/"]))
            .unwrap_err();
        assert_eq!(err.0, names(&["/q/", "/x/"]));
        assert_eq!(err.to_string(), "Unknown symbol(s): /q/, /x/");
    }

    #[test]
    fn test_directory_entries_skip_dotfiles_and_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mouth_o.png"), b"o").unwrap();
        std::fs::write(dir.path().join("mouth_a.png"), b"a").unwrap();
        std::fs::write(dir.path().join(".DS_Store"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("drafts")).unwrap();

        let entries = directory_entries(dir.path()).unwrap();

        assert_eq!(
            entries,
            vec![
                AssetEntry::local("mouth_a.png", dir.path().join("mouth_a.png")),
                AssetEntry::local("mouth_o.png", dir.path().join("mouth_o.png")),
            ]
        );
    }

    #[test]
    fn test_directory_entries_missing_dir_is_error() {
        assert!(directory_entries(Path::new("/nonexistent/generated_images")).is_err());
    }
}
