// Snapshot Store Port
// Abstraction over how a completed sampling round is persisted

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{Snapshot, SnapshotName};

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to create snapshot directory {dir}: {message}")]
    CreateDir { dir: String, message: String },

    #[error("Failed to encode snapshot: {0}")]
    Encode(String),

    #[error("Failed to write snapshot {path}: {message}")]
    Write { path: String, message: String },

    #[error("Failed to read snapshot {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to decode snapshot {path}: {message}")]
    Decode { path: String, message: String },
}

/// Snapshot Store trait
///
/// Contract: one call produces exactly one decompressible snapshot file,
/// published atomically (readers never observe a partial write).
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist one snapshot under the derived name; returns the path written
    ///
    /// # Errors
    /// - `StoreError::CreateDir` if the output directory cannot be created
    /// - `StoreError::Encode` / `StoreError::Write` on serialization or IO
    ///   failure
    async fn save(&self, name: &SnapshotName, snapshot: &Snapshot) -> Result<PathBuf, StoreError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock Snapshot Store recording every save
    pub struct MockSnapshotStore {
        saved: Arc<Mutex<Vec<(String, Snapshot)>>>,
        fail_with: Arc<Mutex<Option<String>>>,
    }

    impl MockSnapshotStore {
        pub fn new() -> Self {
            Self {
                saved: Arc::new(Mutex::new(Vec::new())),
                fail_with: Arc::new(Mutex::new(None)),
            }
        }

        pub fn new_failing(message: impl Into<String>) -> Self {
            let store = Self::new();
            *store.fail_with.lock().unwrap() = Some(message.into());
            store
        }

        pub fn save_count(&self) -> usize {
            self.saved.lock().unwrap().len()
        }

        /// File names in save order
        pub fn saved_names(&self) -> Vec<String> {
            self.saved
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _)| name.clone())
                .collect()
        }

        pub fn last_snapshot(&self) -> Option<Snapshot> {
            self.saved
                .lock()
                .unwrap()
                .last()
                .map(|(_, snapshot)| snapshot.clone())
        }
    }

    impl Default for MockSnapshotStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl SnapshotStore for MockSnapshotStore {
        async fn save(
            &self,
            name: &SnapshotName,
            snapshot: &Snapshot,
        ) -> Result<PathBuf, StoreError> {
            if let Some(message) = self.fail_with.lock().unwrap().clone() {
                return Err(StoreError::Write {
                    path: name.file_name(),
                    message,
                });
            }
            let file_name = name.file_name();
            self.saved
                .lock()
                .unwrap()
                .push((file_name.clone(), snapshot.clone()));
            Ok(PathBuf::from(file_name))
        }
    }
}
