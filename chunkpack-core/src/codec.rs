use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

/// Compression applied to every chunk. Each chunk is a complete, standalone
/// stream in this format.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChunkFormat {
    #[default]
    Gzip,
    Zstd,
}

impl ChunkFormat {
    pub const ALL: [ChunkFormat; 2] = [ChunkFormat::Gzip, ChunkFormat::Zstd];

    /// Identifier recorded in the manifest's `format` field.
    pub fn as_str(self) -> &'static str {
        match self {
            ChunkFormat::Gzip => "gzip",
            ChunkFormat::Zstd => "zstd",
        }
    }

    /// File extension used for chunk files, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ChunkFormat::Gzip => "gz",
            ChunkFormat::Zstd => "zst",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    /// Compress `data` as one complete stream into `out`, returning `out`
    /// once the stream trailer has been written.
    pub fn compress_into<W: Write>(self, data: &[u8], out: W) -> Result<W> {
        match self {
            ChunkFormat::Gzip => {
                let mut enc = flate2::write::GzEncoder::new(out, flate2::Compression::default());
                enc.write_all(data).context("gzip compress chunk")?;
                enc.finish().context("gzip finish chunk")
            }
            ChunkFormat::Zstd => {
                // level 0 selects zstd's default level
                let mut enc = zstd::stream::Encoder::new(out, 0).context("zstd init")?;
                enc.write_all(data).context("zstd compress chunk")?;
                enc.finish().context("zstd finish chunk")
            }
        }
    }
}

impl fmt::Display for ChunkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
