//! Domain types and models

pub mod digest;
pub mod phonetics;

pub use digest::md5_hex;
pub use phonetics::{
    AssetEntry, AssetKind, AssetSource, audio_entries, directory_entries,
    image_entries, select_entries,
};
