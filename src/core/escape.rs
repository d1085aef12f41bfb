//! Portable, collision-resistant file names for compiled test binaries.
//!
//! Short paths are flattened by replacing separators and characters that
//! are reserved on at least one target platform. Paths long enough to
//! overflow common file-name limits are replaced by a digest of the cleaned
//! path plus the original base name.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::infra::paths::{base_name, clean_path};

/// Cleaned paths at or above this length are hashed. File names top out
/// at 255 bytes on Darwin and 259 on Windows.
pub const HASH_THRESHOLD: usize = 254;

/// Suffix appended to hashed names.
pub const HASHED_SUFFIX: &str = ".test.exe";

/// Digest bytes kept in a hashed name (16 hex characters).
const DIGEST_PREFIX_BYTES: usize = 8;

/// Characters replaced by [`PLACEHOLDER`] in flattened names.
pub const RESERVED: [char; 11] = ['*', '.', '"', '/', '\\', '[', ']', ':', ';', '|', ','];

/// Replacement for every reserved character.
pub const PLACEHOLDER: char = '%';

/// Map a package path to a single-segment artifact name.
pub fn escape_path(path: &str) -> String {
    let cleaned = clean_path(Path::new(path));
    let cleaned = cleaned.to_string_lossy();

    if should_hash(&cleaned) {
        hashed_name(&cleaned)
    } else {
        flatten(path)
    }
}

fn should_hash(cleaned: &str) -> bool {
    cleaned.len() >= HASH_THRESHOLD
}

fn hashed_name(cleaned: &str) -> String {
    let digest = Sha256::digest(cleaned.as_bytes());
    let prefix = hex::encode(&digest[..DIGEST_PREFIX_BYTES]);
    format!("{prefix}.{}{HASHED_SUFFIX}", base_name(cleaned))
}

fn flatten(path: &str) -> String {
    path.chars()
        .map(|c| if RESERVED.contains(&c) { PLACEHOLDER } else { c })
        .collect()
}
