use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Patterns tried when the source path is a directory.
pub const DEFAULT_PATTERNS: &[&str] = &["*.onnx_data", "*.onnx"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// A regular file to chunk, with its size at resolution time.
    File { path: PathBuf, size: u64 },
    Missing,
    /// Directory input with nothing matching the candidate patterns.
    NoCandidates,
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut b = GlobSetBuilder::new();
    if patterns.is_empty() {
        for p in DEFAULT_PATTERNS {
            b.add(Glob::new(p)?);
        }
    }
    for p in patterns {
        b.add(Glob::new(p).with_context(|| format!("bad pattern {:?}", p))?);
    }
    Ok(b.build()?)
}

/// Turn a user-supplied source path into the file that will be chunked.
///
/// A plain file resolves to itself. A directory resolves to the largest
/// regular file directly inside it whose name matches `patterns`; ties go
/// to the lexically smallest name so the choice is stable.
pub fn resolve(source: &Path, patterns: &GlobSet) -> Result<Resolved> {
    let md = match fs::metadata(source) {
        Ok(md) => md,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Resolved::Missing),
        Err(e) => return Err(e).with_context(|| format!("stat {}", source.display())),
    };
    if !md.is_dir() {
        return Ok(Resolved::File { path: source.to_path_buf(), size: md.len() });
    }

    debug!(dir = %source.display(), "source is a directory, searching for model files");
    let mut best: Option<(u64, PathBuf)> = None;
    for e in WalkDir::new(source).min_depth(1).max_depth(1).sort_by_file_name() {
        let e = e?;
        if !e.file_type().is_file() {
            continue;
        }
        if !patterns.is_match(Path::new(e.file_name())) {
            continue;
        }
        let size = e.metadata()?.len();
        if best.as_ref().map_or(true, |(s, _)| size > *s) {
            best = Some((size, e.path().to_path_buf()));
        }
    }
    match best {
        Some((size, path)) => {
            info!(
                file = %path.display(),
                bytes = size,
                "auto-selected largest model file"
            );
            Ok(Resolved::File { path, size })
        }
        None => Ok(Resolved::NoCandidates),
    }
}
