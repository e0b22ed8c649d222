// Port Layer - Interfaces for external dependencies

pub mod command_runner;
pub mod run_id_provider; // For deterministic testing
pub mod snapshot_store;
pub mod time_provider;

// Re-exports
pub use command_runner::{CaptureError, CaptureOutput, CommandRunner};
pub use run_id_provider::RunIdProvider;
pub use snapshot_store::{SnapshotStore, StoreError};
pub use time_provider::TimeProvider;
