// Command Runner Port
// Abstraction for fanning out a table of diagnostic commands as subprocesses

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::CommandTable;

/// Result of capturing a command table
#[derive(Debug, Clone, Default)]
pub struct CaptureOutput {
    /// Captured stdout per command label
    pub outputs: BTreeMap<String, String>,
    /// Labels whose program does not exist on this system
    pub skipped: Vec<String>,
    pub duration_ms: i64,
}

/// Capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Spawn failed for '{label}': {message}")]
    SpawnFailed { label: String, message: String },

    #[error("Command '{label}' timed out after {timeout_ms}ms")]
    Timeout { label: String, timeout_ms: i64 },

    #[error("IO error for '{label}': {message}")]
    Io { label: String, message: String },
}

/// Command Runner trait
///
/// Contract:
/// - every command in the table is launched concurrently, then the handles
///   are joined sequentially with a fixed wall-clock timeout per command
/// - a command whose program is missing (hardware variant mismatch) is
///   logged and silently skipped; its label lands in `skipped`
/// - a timeout is fatal for the whole capture
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run every command in the table and collect stdout per label
    ///
    /// # Errors
    /// - `CaptureError::Timeout` if a command exceeds the wall-clock timeout
    /// - `CaptureError::SpawnFailed` if a program exists but cannot start
    /// - `CaptureError::Io` if reading a command's output fails
    async fn capture(&self, table: &CommandTable) -> Result<CaptureOutput, CaptureError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock runner behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Echo back one line of canned text per table entry
        EchoLabels,
        /// Return exactly these outputs/skips regardless of the table
        Fixed {
            outputs: BTreeMap<String, String>,
            skipped: Vec<String>,
        },
        /// Fail with a timeout on the given label
        Timeout { label: String, timeout_ms: i64 },
        /// Fail spawning the given label
        SpawnFail { label: String },
    }

    /// Mock Command Runner for testing
    pub struct MockCommandRunner {
        behavior: Arc<Mutex<MockBehavior>>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockCommandRunner {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                call_count: Arc::new(Mutex::new(0)),
            }
        }

        pub fn new_echo() -> Self {
            Self::new(MockBehavior::EchoLabels)
        }

        pub fn new_fixed(outputs: BTreeMap<String, String>, skipped: Vec<String>) -> Self {
            Self::new(MockBehavior::Fixed { outputs, skipped })
        }

        pub fn new_timeout(label: impl Into<String>, timeout_ms: i64) -> Self {
            Self::new(MockBehavior::Timeout {
                label: label.into(),
                timeout_ms,
            })
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl CommandRunner for MockCommandRunner {
        async fn capture(&self, table: &CommandTable) -> Result<CaptureOutput, CaptureError> {
            *self.call_count.lock().unwrap() += 1;

            let behavior = self.behavior.lock().unwrap().clone();

            match behavior {
                MockBehavior::EchoLabels => Ok(CaptureOutput {
                    outputs: table
                        .labels()
                        .map(|l| (l.to_string(), format!("output of {l}\n")))
                        .collect(),
                    skipped: Vec::new(),
                    duration_ms: 1,
                }),
                MockBehavior::Fixed { outputs, skipped } => Ok(CaptureOutput {
                    outputs,
                    skipped,
                    duration_ms: 1,
                }),
                MockBehavior::Timeout { label, timeout_ms } => {
                    Err(CaptureError::Timeout { label, timeout_ms })
                }
                MockBehavior::SpawnFail { label } => Err(CaptureError::SpawnFailed {
                    label,
                    message: "mock spawn failure".to_string(),
                }),
            }
        }
    }
}
