//! SHA256 checksums for source tarballs and patches, and the digest
//! behind package ids.
//!
//! Checksums are lowercase hex. Recipe values are normalized with
//! [`parse_checksum`] so comparisons never depend on how a recipe author
//! typed the hash.

use std::fmt::Display;
use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA256 checksum.
pub const CHECKSUM_LEN: usize = 64;

/// Normalize a recipe checksum, or `None` if it is not 64 hex digits.
pub fn parse_checksum(value: &str) -> Option<String> {
    let value = value.trim();
    if value.len() == CHECKSUM_LEN && value.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(value.to_ascii_lowercase())
    } else {
        None
    }
}

/// Checksum of in-memory data, such as a downloaded tarball.
pub fn checksum_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Checksum of a file on disk.
pub fn checksum_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("failed to hash {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Fail unless `actual` is the checksum `expected` names.
///
/// `what` names the checked object in the error, e.g. `tarball https://...`.
pub fn ensure_checksum(what: impl Display, expected: &str, actual: &str) -> Result<()> {
    if !expected.trim().eq_ignore_ascii_case(actual) {
        bail!(
            "{} hash mismatch:\n  expected: {}\n  actual:   {}",
            what,
            expected,
            actual
        );
    }
    Ok(())
}

/// Digest over `key=value` fields describing one package configuration.
///
/// Fields are hashed in the order they are added. An absent optional field
/// hashes differently from any present value.
#[derive(Default)]
pub struct ConfigDigest {
    hasher: Sha256,
}

impl ConfigDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: &str, value: impl Display) -> Self {
        self.hasher.update(format!("{}={}\n", key, value).as_bytes());
        self
    }

    pub fn opt_field(mut self, key: &str, value: Option<impl Display>) -> Self {
        match value {
            Some(value) => self.field(key, value),
            None => {
                self.hasher.update(format!("{}\n", key).as_bytes());
                self
            }
        }
    }

    /// First 8 bytes of the digest as 16 hex characters.
    pub fn finish(self) -> String {
        hex::encode(&self.hasher.finalize()[..8])
    }
}
