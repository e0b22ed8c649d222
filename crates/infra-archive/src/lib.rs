// envsnap Infrastructure - Snapshot Archive
// Implements: SnapshotStore

pub mod zstd_store;

pub use zstd_store::{load_snapshot, ZstdSnapshotStore, DEFAULT_COMPRESSION_LEVEL};
