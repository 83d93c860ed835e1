//! Checksum calculation for written output files.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::Path;

use crate::error::EtlResult;

/// Calculate the SHA-256 checksum of a byte slice.
///
/// # Returns
/// Hexadecimal string representation of the hash.
pub fn calculate_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Calculate the SHA-256 checksum of a file, streaming its contents.
pub fn calculate_file_checksum(path: &Path) -> EtlResult<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
