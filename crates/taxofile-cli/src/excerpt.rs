//! Bounded text excerpt of an input file.
//!
//! Only the leading bytes are read. Non-UTF-8 content is decoded lossily;
//! binary formats are not extracted.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

// UTF-8 needs at most four bytes per char.
const MAX_BYTES_PER_CHAR: usize = 4;

pub fn read_excerpt(path: &Path, max_chars: usize) -> Result<String> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut bytes = Vec::new();
    file.take(max_chars.saturating_mul(MAX_BYTES_PER_CHAR) as u64)
        .read_to_end(&mut bytes)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let text = String::from_utf8_lossy(&bytes);
    Ok(text.chars().take(max_chars).collect())
}

/// Item description sent to the oracle: file name plus excerpt.
pub fn describe_item(path: &Path, max_chars: usize) -> Result<String> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let excerpt = read_excerpt(path, max_chars)?;
    Ok(format!("File name: {name}\n\n{excerpt}"))
}
