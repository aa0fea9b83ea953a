//! Generic compressed persistence for on-disk index state.
//!
//! Mirrors the host crate's `save_compressed`/`load_compressed` in
//! `index.rs`: a 4-byte magic-number header followed by bincode data run
//! through an LZ4 frame, with backward-compatible loading of a legacy
//! uncompressed payload (no magic bytes).

use std::fs;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::Instant;

use crate::error::ApiLensError;

pub const LZ4_MAGIC: &[u8; 4] = b"ALZ4";

pub fn save_compressed<T: serde::Serialize>(path: &Path, data: &T, label: &str) -> Result<(), ApiLensError> {
    let start = Instant::now();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(LZ4_MAGIC)?;
    let mut encoder = lz4_flex::frame::FrameEncoder::new(writer);
    bincode::serialize_into(&mut encoder, data)?;
    let mut writer = encoder
        .finish()
        .map_err(|e| ApiLensError::storage(format!("lz4 encode failed: {e}")))?;
    writer.flush()?;

    let compressed_size = fs::metadata(path)?.len();
    tracing::debug!(
        label,
        path = %path.display(),
        bytes = compressed_size,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "saved compressed index state"
    );
    Ok(())
}

pub fn load_compressed<T: serde::de::DeserializeOwned>(path: &Path, label: &str) -> Result<T, ApiLensError> {
    let path_str = path.display().to_string();
    let file = fs::File::open(path)
        .map_err(|e| ApiLensError::storage(format!("cannot open {path_str}: {e}")))?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|e| ApiLensError::storage(format!("cannot read magic bytes from {path_str}: {e}")))?;

    let result = if &magic == LZ4_MAGIC {
        let decoder = lz4_flex::frame::FrameDecoder::new(reader);
        bincode::deserialize_from(decoder)
            .map_err(|e| ApiLensError::storage(format!("lz4 deserialization failed for {path_str}: {e}")))?
    } else {
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| ApiLensError::storage(format!("seek failed for {path_str}: {e}")))?;
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|e| ApiLensError::storage(format!("read failed for {path_str}: {e}")))?;
        bincode::deserialize(&buf)
            .map_err(|e| ApiLensError::storage(format!("legacy deserialization failed for {path_str}: {e}")))?
    };

    tracing::debug!(label, path = %path_str, "loaded compressed index state");
    Ok(result)
}

/// A small FNV-1a hash used to derive a stable on-disk file name from the
/// canonicalized index directory, in the spirit of the host crate's
/// `stable_hash` (used there by `index_path_for`/`content_index_path_for`).
pub fn stable_hash(parts: &[&[u8]]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for part in parts {
        for byte in *part {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(PRIME);
        }
        hash ^= 0xff;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// The on-disk file name for the index rooted at `index_dir`.
pub fn index_file_name(index_dir: &Path) -> String {
    let canonical = fs::canonicalize(index_dir).unwrap_or_else(|_| index_dir.to_path_buf());
    let hash = stable_hash(&[canonical.to_string_lossy().as_bytes()]);
    format!("apilens_{hash:016x}.idx")
}
