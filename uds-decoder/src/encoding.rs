//! Legacy code page handling and container passwords
//!
//! Database text is stored as Windows-1252. Everything above the container
//! layer works with Rust strings; this module is the only place bytes and
//! the legacy code page meet.

use encoding_rs::WINDOWS_1252;
use md5::{Digest, Md5};
use std::path::Path;

/// Decode Windows-1252 bytes into a string
pub fn decode_text(bytes: &[u8]) -> String {
    let (text, _had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Encode a string as Windows-1252, unmappable characters become `&#NNNN;`
pub fn encode_text(text: &str) -> Vec<u8> {
    let (bytes, _, _) = WINDOWS_1252.encode(text);
    bytes.into_owned()
}

/// Uppercase hex MD5 digest of the Windows-1252 bytes of `text`
///
/// Empty input yields an empty string.
pub fn md5_hex(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    hex::encode_upper(Md5::digest(encode_text(text)))
}

/// Password of a database container, derived from its upper-cased file stem
pub fn container_password(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_default();
    md5_hex(&stem)
}
