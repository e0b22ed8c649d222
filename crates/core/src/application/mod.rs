// Application Layer - Use Cases and Business Logic

pub mod collector;
pub mod sampler;

// Re-exports
pub use collector::Collector;
pub use sampler::{shutdown_channel, Sampler, ShutdownSender, ShutdownToken};
