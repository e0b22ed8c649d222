// Domain Layer - Pure business logic and entities

pub mod command;
pub mod device;
pub mod error;
pub mod snapshot;

// Re-exports
pub use command::{CommandLabel, CommandSpec, CommandTable};
pub use device::DeviceProfile;
pub use error::DomainError;
pub use snapshot::{Snapshot, SnapshotName};
