use chunkpack_core::layout::{chunk_path, list_chunks, StalePolicy};
use chunkpack_core::manifest::{Manifest, MANIFEST_FILE};
use chunkpack_core::{ChunkFormat, ChunkOutcome, Chunker, ChunkerConfig, SkipReason, MIB};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

fn write_random(path: &Path, bytes: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; bytes];
    rng.fill(&mut data[..]);
    fs::write(path, &data).unwrap();
    data
}

fn decode(path: &Path, format: ChunkFormat) -> Vec<u8> {
    let f = File::open(path).unwrap();
    match format {
        ChunkFormat::Gzip => {
            let mut out = Vec::new();
            flate2::read::GzDecoder::new(f).read_to_end(&mut out).unwrap();
            out
        }
        ChunkFormat::Zstd => zstd::stream::decode_all(f).unwrap(),
    }
}

// Reassemble the way a consumer would: trust the manifest, not the listing.
fn reassemble(dir: &Path, m: &Manifest) -> Vec<u8> {
    let mut out = Vec::with_capacity(m.original_size as usize);
    for idx in 0..m.chunk_count {
        out.extend(decode(&chunk_path(dir, idx, m.format), m.format));
    }
    out
}

fn cfg(chunk_size_mb: u32, format: ChunkFormat) -> ChunkerConfig {
    ChunkerConfig { chunk_size_mb, format, ..ChunkerConfig::default() }
}

#[test]
fn gzip_chunks_reassemble_to_source() {
    let td = tempfile::tempdir().unwrap();
    let src = td.path().join("model.onnx_data");
    let data = write_random(&src, 2 * MIB as usize + 12_345, 7);
    let out = td.path().join("out");

    let outcome = Chunker::new().chunk_file(&src, &out, &cfg(1, ChunkFormat::Gzip)).unwrap();
    let m = outcome.manifest().expect("written").clone();

    assert_eq!(m.original_name, "model.onnx_data");
    assert_eq!(m.original_size, data.len() as u64);
    assert_eq!(m.chunk_count, 3);
    assert_eq!(m.chunk_size_mb, 1);
    assert_eq!(m.format, ChunkFormat::Gzip);
    assert_eq!(list_chunks(&out).unwrap().len(), 3);

    // every chunk but the last holds exactly the threshold
    assert_eq!(decode(&out.join("chunk_0.gz"), ChunkFormat::Gzip).len(), MIB as usize);
    assert_eq!(decode(&out.join("chunk_1.gz"), ChunkFormat::Gzip).len(), MIB as usize);
    assert_eq!(decode(&out.join("chunk_2.gz"), ChunkFormat::Gzip).len(), 12_345);

    assert_eq!(reassemble(&out, &m), data);
    assert_eq!(Manifest::read_from_dir(&out).unwrap(), m);
}

#[test]
fn zstd_chunks_use_zst_extension() {
    let td = tempfile::tempdir().unwrap();
    let src = td.path().join("w.bin");
    let data = write_random(&src, MIB as usize + 1, 11);
    let out = td.path().join("out");

    let outcome = Chunker::new().chunk_file(&src, &out, &cfg(1, ChunkFormat::Zstd)).unwrap();
    let m = outcome.manifest().unwrap().clone();
    assert_eq!(m.chunk_count, 2);
    assert!(out.join("chunk_0.zst").exists());
    assert!(out.join("chunk_1.zst").exists());
    assert!(!out.join("chunk_0.gz").exists());
    assert_eq!(reassemble(&out, &m), data);

    let raw = fs::read_to_string(out.join(MANIFEST_FILE)).unwrap();
    assert!(raw.contains("\"format\": \"zstd\""));
}

#[test]
fn manifest_json_uses_expected_field_names() {
    let td = tempfile::tempdir().unwrap();
    let src = td.path().join("model_q4.onnx_data");
    fs::write(&src, vec![3u8; 1000]).unwrap();
    let out = td.path().join("data_0");

    Chunker::new().chunk_file(&src, &out, &ChunkerConfig::default()).unwrap();

    let raw = fs::read_to_string(out.join(MANIFEST_FILE)).unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let obj = v.as_object().unwrap();
    let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, ["chunkCount", "chunkSizeMB", "format", "originalName", "originalSize"]);
    assert_eq!(v["originalName"], "model_q4.onnx_data");
    assert_eq!(v["originalSize"], 1000);
    assert_eq!(v["chunkCount"], 1);
    assert_eq!(v["chunkSizeMB"], 20);
    assert_eq!(v["format"], "gzip");
    // two-space pretty printing
    assert!(raw.starts_with("{\n  \"originalName\""));
}

#[test]
fn empty_source_writes_manifest_with_zero_chunks() {
    let td = tempfile::tempdir().unwrap();
    let src = td.path().join("empty.bin");
    fs::write(&src, b"").unwrap();
    let out = td.path().join("out");

    let outcome = Chunker::new().chunk_file(&src, &out, &ChunkerConfig::default()).unwrap();
    let m = outcome.manifest().unwrap();
    assert_eq!(m.chunk_count, 0);
    assert_eq!(m.original_size, 0);
    assert!(out.join(MANIFEST_FILE).exists());
    assert!(list_chunks(&out).unwrap().is_empty());
}

#[test]
fn missing_source_is_skipped_without_side_effects() {
    let td = tempfile::tempdir().unwrap();
    let src = td.path().join("nope.onnx_data");
    let out = td.path().join("nested/out");

    let outcome = Chunker::new().chunk_file(&src, &out, &ChunkerConfig::default()).unwrap();
    assert_eq!(outcome, ChunkOutcome::Skipped(SkipReason::SourceMissing { path: src.clone() }));
    assert!(!out.exists());
    assert!(!td.path().join("nested").exists());
}

#[test]
fn zero_chunk_size_is_rejected() {
    let td = tempfile::tempdir().unwrap();
    let src = td.path().join("a.bin");
    fs::write(&src, b"abc").unwrap();
    let out = td.path().join("out");

    let err = Chunker::new()
        .chunk_file(&src, &out, &cfg(0, ChunkFormat::Gzip))
        .expect_err("zero chunk size must fail");
    assert!(format!("{:#}", err).contains("at least 1 MB"));
    assert!(!out.exists());
}

#[test]
fn forty_five_mib_source_splits_into_three_chunks() {
    let td = tempfile::tempdir().unwrap();
    let src = td.path().join("big.onnx_data");
    let data: Vec<u8> = (0..45 * MIB as usize).map(|i| (i % 251) as u8).collect();
    fs::write(&src, &data).unwrap();
    let out = td.path().join("out");

    let outcome = Chunker::new().chunk_file(&src, &out, &ChunkerConfig::default()).unwrap();
    let m = outcome.manifest().unwrap().clone();
    assert_eq!(m.chunk_count, 3);
    assert_eq!(m.chunk_size_mb, 20);
    assert_eq!(m.original_size, 47_185_920);

    let sizes: Vec<usize> = (0..3)
        .map(|i| decode(&chunk_path(&out, i, ChunkFormat::Gzip), ChunkFormat::Gzip).len())
        .collect();
    assert_eq!(sizes, [20 * MIB as usize, 20 * MIB as usize, 5 * MIB as usize]);
    assert_eq!(reassemble(&out, &m), data);
}

#[test]
fn output_directory_may_already_exist() {
    let td = tempfile::tempdir().unwrap();
    let src = td.path().join("a.bin");
    let data = write_random(&src, 4096, 3);
    let out = td.path().join("out");
    fs::create_dir_all(&out).unwrap();

    let cfg = ChunkerConfig { stale: StalePolicy::Keep, ..ChunkerConfig::default() };
    let m = Chunker::new().chunk_file(&src, &out, &cfg).unwrap().manifest().unwrap().clone();
    assert_eq!(reassemble(&out, &m), data);
}

#[test]
fn huge_chunk_size_on_small_file_yields_one_chunk() {
    let td = tempfile::tempdir().unwrap();
    let src = td.path().join("tiny.bin");
    fs::write(&src, b"abc").unwrap();
    let out = td.path().join("out");

    let outcome =
        Chunker::new().chunk_file(&src, &out, &cfg(u32::MAX, ChunkFormat::Gzip)).unwrap();
    let m = outcome.manifest().unwrap().clone();
    assert_eq!(m.chunk_count, 1);
    assert_eq!(m.chunk_size_mb, u32::MAX);
    assert_eq!(reassemble(&out, &m), b"abc");
}

#[test]
fn manifest_write_failure_names_the_path() {
    let td = tempfile::tempdir().unwrap();
    let gone = td.path().join("never_created");
    let m = Manifest {
        original_name: "a.bin".into(),
        original_size: 3,
        chunk_count: 1,
        chunk_size_mb: 20,
        format: ChunkFormat::Gzip,
    };

    let err = m.write_to_dir(&gone).expect_err("parent directory is missing");
    let msg = format!("{:#}", err);
    assert!(msg.contains("never_created"), "unexpected error: {}", msg);
    assert!(msg.contains(MANIFEST_FILE), "unexpected error: {}", msg);
}
