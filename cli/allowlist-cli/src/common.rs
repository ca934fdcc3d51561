use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::Context;

use crate::error::AllowlistError;
use crate::hasher::Hash;

/// Encodes bytes as a lowercase `0x`-prefixed hex string.
pub fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parses a 32-byte hash from a hex string.
///
/// # Arguments
/// * `value` - The hash string, with or without "0x" prefix
///
/// # Errors
/// Returns [`AllowlistError::InvalidHash`] if the value is not 64 hex characters
pub fn parse_hash(value: &str) -> Result<Hash, AllowlistError> {
    let trimmed = value.trim();
    let cleaned = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if cleaned.len() != 64 {
        return Err(AllowlistError::InvalidHash {
            value: value.to_string(),
            reason: format!("expected 64 hex chars, got {}", cleaned.len()),
        });
    }
    let mut hash = [0u8; 32];
    hex::decode_to_slice(cleaned, &mut hash).map_err(|e| AllowlistError::InvalidHash {
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    Ok(hash)
}

/// Writes `contents` to `path` through a sibling temp file and a rename, so
/// readers never observe a half-written file.
pub fn write_file_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path).context("Failed to create temp file")?;
    file.write_all(contents.as_bytes())
        .context("Failed to write to temp file")?;
    file.flush().context("Failed to flush temp file")?;
    drop(file);
    std::fs::rename(&temp_path, path).context("Failed to move temp file to output")?;
    Ok(())
}
