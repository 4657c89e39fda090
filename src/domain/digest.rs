//! Name digests shared by URL resolution and storage key derivation

use md5::{Digest, Md5};

/// Lowercase hex MD5 of a string's UTF-8 bytes
pub fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}
