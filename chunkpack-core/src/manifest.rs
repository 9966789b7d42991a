use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::Path;

use crate::codec::ChunkFormat;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Summary written next to the chunks once every chunk is on disk.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub original_name: String,
    pub original_size: u64,
    pub chunk_count: u64,
    #[serde(rename = "chunkSizeMB")]
    pub chunk_size_mb: u32,
    pub format: ChunkFormat,
}

impl Manifest {
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        let mpath = dir.join(MANIFEST_FILE);
        let mut json = serde_json::to_string_pretty(self).context("serialize manifest")?;
        json.push('\n');
        fs::write(&mpath, json).with_context(|| format!("write {}", mpath.display()))
    }

    pub fn read_from_dir(dir: &Path) -> Result<Self> {
        let mpath = dir.join(MANIFEST_FILE);
        let f = File::open(&mpath).with_context(|| format!("open {}", mpath.display()))?;
        serde_json::from_reader(f).with_context(|| format!("parse {}", mpath.display()))
    }
}
