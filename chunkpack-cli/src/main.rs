use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;

use chunkpack_core::job::{self, ChunkJob, JobFile, DEFAULT_CHUNK_SIZE_MB};
use chunkpack_core::layout::StalePolicy;
use chunkpack_core::progress::Progress;
use chunkpack_core::{ChunkFormat, ChunkOutcome, Chunker, ChunkerConfig};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Gzip,
    Zstd,
}

impl From<FormatArg> for ChunkFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Gzip => ChunkFormat::Gzip,
            FormatArg::Zstd => ChunkFormat::Zstd,
        }
    }
}

#[derive(Parser)]
#[command(name = "chunkpack", version, about = "Split large model files into compressed chunks")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    /// Periodically log chunking progress
    #[arg(long, global = true, default_value_t = false)]
    progress: bool,
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Chunk a single file (or the largest model file in a directory)
    Split {
        input: PathBuf,
        outdir: PathBuf,
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE_MB,
              value_parser = clap::value_parser!(u32).range(1..))]
        chunk_size_mb: u32,
        #[arg(long, value_enum, default_value_t = FormatArg::Gzip)]
        format: FormatArg,
        /// Leave chunk files from earlier runs in place
        #[arg(long, default_value_t = false)]
        keep_stale: bool,
        /// Candidate glob for directory inputs (repeatable)
        #[arg(long = "pattern")]
        patterns: Vec<String>,
    },
    /// Run every job listed in a JSON job file
    Run { jobs: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let progress = Progress::new(cli.progress);
    let chunker = Chunker::with_progress(progress.clone());
    progress.start();
    let res = match cli.cmd {
        None => run_jobs(&chunker, &job::default_jobs()),
        Some(Cmd::Split { input, outdir, chunk_size_mb, format, keep_stale, patterns }) => {
            let stale = if keep_stale { StalePolicy::Keep } else { StalePolicy::Remove };
            let cfg = ChunkerConfig { chunk_size_mb, format: format.into(), stale, patterns };
            chunker.chunk_file(&input, &outdir, &cfg).map(|o| report(&input, &outdir, &o))
        }
        Some(Cmd::Run { jobs }) => JobFile::load(&jobs)
            .context("load job file")
            .and_then(|jf| run_jobs(&chunker, &jf.jobs)),
    };
    progress.stop();
    res
}

fn setup_tracing(verbose: bool) {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run_jobs(chunker: &Chunker, jobs: &[ChunkJob]) -> Result<()> {
    for j in jobs {
        let outcome = chunker.run_job(j).with_context(|| {
            format!("chunk {} into {}", j.source.display(), j.output_dir.display())
        })?;
        report(&j.source, &j.output_dir, &outcome);
    }
    Ok(())
}

fn report(source: &Path, outdir: &Path, outcome: &ChunkOutcome) {
    match outcome {
        ChunkOutcome::Written(m) => {
            println!("wrote {} chunk(s) to {}", m.chunk_count, outdir.display())
        }
        ChunkOutcome::Skipped(why) => println!("skipped {}: {}", source.display(), why),
    }
}
