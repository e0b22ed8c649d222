//! Snapshot archive - compressed snapshot read/write operations.
//!
//! Snapshots are pretty-printed JSON compressed with zstd, written through
//! a temp file and atomically renamed into place so offline readers never
//! observe a partial snapshot.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use envsnap_core::domain::{Snapshot, SnapshotName};
use envsnap_core::port::snapshot_store::{SnapshotStore, StoreError};

/// Zstd compression level for snapshot files. Diagnostic text is highly
/// repetitive, so mid-level compression already shrinks it well.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 6;

/// Snapshot store writing one `*.json.zst` file per sampling round
pub struct ZstdSnapshotStore {
    output_dir: PathBuf,
    level: i32,
}

impl ZstdSnapshotStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::with_level(output_dir, DEFAULT_COMPRESSION_LEVEL)
    }

    pub fn with_level(output_dir: impl Into<PathBuf>, level: i32) -> Self {
        Self {
            output_dir: output_dir.into(),
            level,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_compressed(&self, path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
        let file = File::create(path).map_err(|e| StoreError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut encoder =
            zstd::Encoder::new(file, self.level).map_err(|e| StoreError::Encode(e.to_string()))?;

        // Indented output: snapshots are routinely eyeballed with zstdcat
        serde_json::to_writer_pretty(&mut encoder, snapshot.as_map())
            .map_err(|e| StoreError::Encode(e.to_string()))?;

        encoder.finish().map_err(|e| StoreError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for ZstdSnapshotStore {
    async fn save(&self, name: &SnapshotName, snapshot: &Snapshot) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| StoreError::CreateDir {
            dir: self.output_dir.display().to_string(),
            message: e.to_string(),
        })?;

        let path = self.output_dir.join(name.file_name());

        // Write to temp file first for atomic publish
        let tmp_path = path.with_extension("tmp");
        self.write_compressed(&tmp_path, snapshot)?;

        fs::rename(&tmp_path, &path).map_err(|e| StoreError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        debug!(
            path = %path.display(),
            entries = snapshot.len(),
            "Snapshot archived"
        );

        Ok(path)
    }
}

/// Load a previously archived snapshot (offline analysis, tests).
pub fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
    let file = File::open(path).map_err(|e| StoreError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let decoder = zstd::Decoder::new(file).map_err(|e| StoreError::Decode {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    serde_json::from_reader(BufReader::new(decoder)).map_err(|e| StoreError::Decode {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
