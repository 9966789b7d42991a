use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::codec::ChunkFormat;
use crate::manifest::MANIFEST_FILE;

/// What to do with chunk files and a manifest left behind by an earlier run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StalePolicy {
    /// Delete previous chunk files and the manifest before writing.
    #[default]
    Remove,
    /// Leave existing files in place; same-index chunks get overwritten.
    Keep,
}

/// Standard chunk filename for index `idx`.
pub fn chunk_name(idx: u64, format: ChunkFormat) -> String {
    format!("chunk_{}.{}", idx, format.extension())
}

pub fn chunk_path(dir: &Path, idx: u64, format: ChunkFormat) -> PathBuf {
    dir.join(chunk_name(idx, format))
}

/// Inverse of [`chunk_name`]. Only canonical decimal indices are accepted,
/// so `chunk_01.gz` is not a chunk file.
pub fn parse_chunk_name(name: &str) -> Option<(u64, ChunkFormat)> {
    let rest = name.strip_prefix("chunk_")?;
    let (digits, ext) = rest.split_once('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    let idx = digits.parse().ok()?;
    Some((idx, ChunkFormat::from_extension(ext)?))
}

/// Remove every chunk file (any known format) and the manifest from `dir`.
/// Unrelated files are untouched. Returns how many files were deleted.
pub fn remove_stale(dir: &Path) -> Result<usize> {
    let mut removed = 0usize;
    for ent in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let ent = ent?;
        if !ent.file_type()?.is_file() {
            continue;
        }
        let name = ent.file_name();
        let Some(name) = name.to_str() else { continue };
        if name == MANIFEST_FILE || parse_chunk_name(name).is_some() {
            let p = ent.path();
            fs::remove_file(&p).with_context(|| format!("remove {}", p.display()))?;
            debug!(path = %p.display(), "removed stale output");
            removed += 1;
        }
    }
    Ok(removed)
}

/// Chunk files currently present in `dir`, sorted by index.
pub fn list_chunks(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let mut v = Vec::new();
    for ent in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let ent = ent?;
        if let Some((idx, _)) = ent.file_name().to_str().and_then(parse_chunk_name) {
            v.push((idx, ent.path()));
        }
    }
    v.sort();
    Ok(v)
}
