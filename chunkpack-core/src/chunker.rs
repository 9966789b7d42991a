use anyhow::{bail, Context, Result};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::codec::ChunkFormat;
use crate::job::{ChunkJob, DEFAULT_CHUNK_SIZE_MB};
use crate::layout::{self, StalePolicy};
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::progress::Progress;
use crate::source::{self, Resolved};
use crate::MIB;

/// Upper bound on the block buffer reserved before any bytes are read.
const READ_RESERVE: u64 = 64 * MIB;

pub struct ChunkerConfig {
    pub chunk_size_mb: u32,
    pub format: ChunkFormat,
    pub stale: StalePolicy,
    /// Candidate globs for directory sources; empty means the defaults.
    pub patterns: Vec<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size_mb: DEFAULT_CHUNK_SIZE_MB,
            format: ChunkFormat::default(),
            stale: StalePolicy::default(),
            patterns: Vec::new(),
        }
    }
}

impl ChunkerConfig {
    pub fn from_job(job: &ChunkJob) -> Self {
        Self {
            chunk_size_mb: job.chunk_size_mb,
            format: job.format,
            stale: job.stale_policy(),
            patterns: job.patterns.clone(),
        }
    }

    pub fn chunk_size_bytes(&self) -> Result<u64> {
        if self.chunk_size_mb == 0 {
            bail!("chunk size must be at least 1 MB");
        }
        Ok(u64::from(self.chunk_size_mb) * MIB)
    }
}

/// Why a job produced no output at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    SourceMissing { path: PathBuf },
    NoCandidates { dir: PathBuf },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SourceMissing { path } => write!(f, "{} not found", path.display()),
            SkipReason::NoCandidates { dir } => {
                write!(f, "no model files found in directory {}", dir.display())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkOutcome {
    Written(Manifest),
    Skipped(SkipReason),
}

impl ChunkOutcome {
    pub fn manifest(&self) -> Option<&Manifest> {
        match self {
            ChunkOutcome::Written(m) => Some(m),
            ChunkOutcome::Skipped(_) => None,
        }
    }
}

/// Number of chunks a source of `size` bytes splits into.
pub fn expected_chunk_count(size: u64, chunk_bytes: u64) -> u64 {
    size.div_ceil(chunk_bytes)
}

#[derive(Default)]
pub struct Chunker {
    progress: Progress,
}

impl Chunker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(progress: Progress) -> Self {
        Self { progress }
    }

    pub fn run_job(&self, job: &ChunkJob) -> Result<ChunkOutcome> {
        job.validate()?;
        self.chunk_file(&job.source, &job.output_dir, &ChunkerConfig::from_job(job))
    }

    /// Split `source` into compressed chunks under `output` and write the
    /// manifest last. A missing source is reported as a skip and leaves the
    /// filesystem untouched.
    pub fn chunk_file(
        &self,
        source: &Path,
        output: &Path,
        cfg: &ChunkerConfig,
    ) -> Result<ChunkOutcome> {
        let chunk_bytes = cfg.chunk_size_bytes()?;
        let patterns = source::build_globset(&cfg.patterns)?;

        let (path, original_size) = match source::resolve(source, &patterns)? {
            Resolved::File { path, size } => (path, size),
            Resolved::Missing => {
                warn!(source = %source.display(), "source not found, skipping");
                return Ok(ChunkOutcome::Skipped(SkipReason::SourceMissing {
                    path: source.to_path_buf(),
                }));
            }
            Resolved::NoCandidates => {
                warn!(dir = %source.display(), "no model files in directory, skipping");
                return Ok(ChunkOutcome::Skipped(SkipReason::NoCandidates {
                    dir: source.to_path_buf(),
                }));
            }
        };

        fs::create_dir_all(output).with_context(|| format!("create dir {}", output.display()))?;
        if cfg.stale == StalePolicy::Remove {
            let n = layout::remove_stale(output)?;
            if n > 0 {
                debug!(removed = n, dir = %output.display(), "cleared previous output");
            }
        }

        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        info!(
            source = %path.display(),
            bytes = original_size,
            chunk_size_mb = cfg.chunk_size_mb,
            format = %cfg.format,
            "chunking"
        );
        self.progress.set_stage(&original_name);
        self.progress.reset(original_size);

        let f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
        let chunk_count = self.write_chunks(BufReader::new(f), output, chunk_bytes, cfg.format)?;

        let manifest = Manifest {
            original_name,
            original_size,
            chunk_count,
            chunk_size_mb: cfg.chunk_size_mb,
            format: cfg.format,
        };
        manifest.write_to_dir(output)?;
        info!(dir = %output.display(), chunks = chunk_count, "wrote {}", MANIFEST_FILE);

        Ok(ChunkOutcome::Written(manifest))
    }

    /// Read `reader` to EOF in blocks of `chunk_bytes`, writing each block as
    /// its own compressed chunk file. Returns the number of chunks written.
    pub fn write_chunks<R: Read>(
        &self,
        mut reader: R,
        output: &Path,
        chunk_bytes: u64,
        format: ChunkFormat,
    ) -> Result<u64> {
        if chunk_bytes == 0 {
            bail!("chunk size must be non-zero");
        }
        // read_to_end grows the buffer past this as bytes arrive
        let reserve = chunk_bytes.min(READ_RESERVE) as usize;
        let mut buf: Vec<u8> = Vec::with_capacity(reserve);
        let mut idx = 0u64;
        loop {
            buf.clear();
            let n = reader.by_ref().take(chunk_bytes).read_to_end(&mut buf)?;
            if n == 0 {
                break;
            }
            let compressed = format.compress_into(&buf, Vec::new())?;
            let cpath = layout::chunk_path(output, idx, format);
            fs::write(&cpath, &compressed).with_context(|| format!("write {}", cpath.display()))?;
            info!(
                chunk = %cpath.display(),
                compressed_bytes = compressed.len(),
                "created chunk"
            );
            self.progress.chunk_done(n as u64);
            idx += 1;
        }
        Ok(idx)
    }
}
