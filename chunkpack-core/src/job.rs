use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::codec::ChunkFormat;
use crate::layout::StalePolicy;

pub const DEFAULT_CHUNK_SIZE_MB: u32 = 20;

fn default_chunk_size_mb() -> u32 {
    DEFAULT_CHUNK_SIZE_MB
}

/// One unit of work: chunk `source` into `output_dir`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChunkJob {
    pub source: PathBuf,
    pub output_dir: PathBuf,
    #[serde(rename = "chunkSizeMB", default = "default_chunk_size_mb")]
    pub chunk_size_mb: u32,
    #[serde(default)]
    pub format: ChunkFormat,
    #[serde(default)]
    pub keep_stale: bool,
    /// Candidate globs used when `source` is a directory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
}

impl ChunkJob {
    pub fn new(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_dir: output_dir.into(),
            chunk_size_mb: DEFAULT_CHUNK_SIZE_MB,
            format: ChunkFormat::default(),
            keep_stale: false,
            patterns: Vec::new(),
        }
    }

    pub fn stale_policy(&self) -> StalePolicy {
        if self.keep_stale {
            StalePolicy::Keep
        } else {
            StalePolicy::Remove
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size_mb == 0 {
            bail!("chunkSizeMB must be at least 1 (job for {})", self.source.display());
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    pub jobs: Vec<ChunkJob>,
}

impl JobFile {
    pub fn load(path: &Path) -> Result<Self> {
        let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let jf: JobFile =
            serde_json::from_reader(f).with_context(|| format!("parse {}", path.display()))?;
        for j in &jf.jobs {
            j.validate()?;
        }
        Ok(jf)
    }
}

/// The model shards the web app serves: both halves of the q4 weights.
pub fn default_jobs() -> Vec<ChunkJob> {
    let model_dir = Path::new("public/models/translategemma/onnx");
    vec![
        ChunkJob::new("tmp/model_q4.onnx_data", model_dir.join("data_0")),
        ChunkJob::new("tmp/model_q4.onnx_data_1", model_dir.join("data_1")),
    ]
}
