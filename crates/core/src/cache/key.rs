//! Flat, filename-safe cache keys derived from asset paths.
//!
//! Bytes in `[A-Za-z0-9.-]` pass through; every other byte, `_` included,
//! becomes `_XX` with uppercase hex. A leading `.` is escaped as well so a
//! key can never be `.`, `..`, or a hidden file. The encoding decodes
//! unambiguously, which makes it injective over all strings.
//!
//! Escaped keys longer than [`MAX_KEY_LEN`] are replaced by `~` followed by
//! the SHA-256 of the path. `~` is never emitted by the escaping, so long
//! keys cannot collide with short ones.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

/// Key used for the empty path. Never produced by a non-empty input.
const EMPTY_KEY: &str = "_";

/// Longest escaped key kept as-is; well under common `NAME_MAX` (255).
pub const MAX_KEY_LEN: usize = 200;

/// Marker for digest-form keys.
const HASHED_PREFIX: char = '~';

/// Map a logical asset path to its on-disk key.
pub fn sanitize_key(path: &str) -> String {
    if path.is_empty() {
        return EMPTY_KEY.to_string();
    }

    let mut key = String::with_capacity(path.len());
    for (i, byte) in path.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric() || byte == b'-' || (byte == b'.' && i > 0);
        if keep {
            key.push(byte as char);
        } else {
            let _ = write!(key, "_{byte:02X}");
        }
    }

    if key.len() > MAX_KEY_LEN {
        return format!("{HASHED_PREFIX}{}", hex::encode(Sha256::digest(path.as_bytes())));
    }
    key
}

/// Whether a directory entry name could have been produced by [`sanitize_key`].
///
/// Temporary files are dot-prefixed and therefore never match.
pub fn is_entry_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.')
}
