// Subprocess runner implementation
// tokio for async process management: all commands are launched up front,
// then the handles are joined sequentially under a wall-clock timeout.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use envsnap_core::domain::CommandTable;
use envsnap_core::port::command_runner::{CaptureError, CaptureOutput, CommandRunner};
use envsnap_core::port::TimeProvider;

/// Subprocess command runner
///
/// Missing programs are expected on mismatched hardware variants (e.g.
/// fabric diagnostics on a fixed chassis) and are skipped; any command
/// exceeding `command_timeout` fails the whole capture.
pub struct SubprocessRunner {
    time_provider: Arc<dyn TimeProvider>,
    command_timeout: Duration,
}

impl SubprocessRunner {
    /// Create a new subprocess runner
    ///
    /// # Arguments
    /// * `time_provider` - Time provider for duration tracking
    /// * `command_timeout` - Wall-clock timeout applied to each command
    pub fn new(time_provider: Arc<dyn TimeProvider>, command_timeout: Duration) -> Self {
        Self {
            time_provider,
            command_timeout,
        }
    }

    /// Launch every command in the table. Programs missing on this system
    /// are skipped; their labels are returned separately.
    fn spawn_all(
        &self,
        table: &CommandTable,
    ) -> Result<(Vec<(String, Child)>, Vec<String>), CaptureError> {
        let mut children = Vec::with_capacity(table.len());
        let mut skipped = Vec::new();

        for spec in table.iter() {
            let spawned = Command::new(&spec.program)
                .args(&spec.args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn();

            match spawned {
                Ok(child) => children.push((spec.label.clone(), child)),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(
                        label = %spec.label,
                        program = %spec.program,
                        "Command not present on this system, skipping"
                    );
                    skipped.push(spec.label.clone());
                }
                Err(e) => {
                    return Err(CaptureError::SpawnFailed {
                        label: spec.label.clone(),
                        message: e.to_string(),
                    })
                }
            }
        }

        Ok((children, skipped))
    }

    /// Join one child under the wall-clock timeout and capture its stdout.
    /// On timeout the child (and all still-pending siblings) are killed via
    /// kill_on_drop when their handles fall out of scope.
    async fn join_one(&self, label: String, child: Child) -> Result<(String, String), CaptureError> {
        let output = match timeout(self.command_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(CaptureError::Io {
                    label,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(CaptureError::Timeout {
                    label,
                    timeout_ms: self.command_timeout.as_millis() as i64,
                })
            }
        };

        if !output.status.success() {
            warn!(
                label = %label,
                exit_code = ?output.status.code(),
                "Command exited non-zero, keeping captured output"
            );
        }

        // Diagnostic output is not guaranteed to be clean UTF-8
        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        Ok((label, text))
    }
}

#[async_trait]
impl CommandRunner for SubprocessRunner {
    async fn capture(&self, table: &CommandTable) -> Result<CaptureOutput, CaptureError> {
        let started = self.time_provider.now_millis();

        let (children, skipped) = self.spawn_all(table)?;

        let mut outputs = BTreeMap::new();
        for (label, child) in children {
            let (label, text) = self.join_one(label, child).await?;
            outputs.insert(label, text);
        }

        let duration_ms = self.time_provider.now_millis() - started;
        debug!(
            executed = outputs.len(),
            skipped = skipped.len(),
            duration_ms,
            "Command table captured"
        );

        Ok(CaptureOutput {
            outputs,
            skipped,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envsnap_core::domain::CommandSpec;
    use envsnap_core::port::time_provider::SystemTimeProvider;

    fn runner(timeout: Duration) -> SubprocessRunner {
        SubprocessRunner::new(Arc::new(SystemTimeProvider), timeout)
    }

    #[tokio::test]
    async fn test_capture_success() {
        let mut table = CommandTable::new();
        table
            .insert(CommandSpec::new("greeting", "echo", ["hello"]))
            .unwrap();
        table
            .insert(CommandSpec::new("farewell", "echo", ["goodbye"]))
            .unwrap();

        let result = runner(Duration::from_secs(5)).capture(&table).await.unwrap();

        assert_eq!(result.outputs.len(), 2);
        assert_eq!(result.outputs["greeting"], "hello\n");
        assert_eq!(result.outputs["farewell"], "goodbye\n");
        assert!(result.skipped.is_empty());
        assert!(result.duration_ms >= 0);
    }

    #[tokio::test]
    async fn test_missing_program_is_skipped() {
        let mut table = CommandTable::new();
        table
            .insert(CommandSpec::new("present", "echo", ["here"]))
            .unwrap();
        table
            .insert(CommandSpec::new(
                "absent",
                "envsnap_no_such_diagnostic_binary",
                Vec::<String>::new(),
            ))
            .unwrap();

        let result = runner(Duration::from_secs(5)).capture(&table).await.unwrap();

        assert_eq!(result.outputs.len(), 1);
        assert!(result.outputs.contains_key("present"));
        assert_eq!(result.skipped, vec!["absent".to_string()]);
    }

    #[tokio::test]
    async fn test_timeout_is_fatal() {
        let mut table = CommandTable::new();
        table
            .insert(CommandSpec::new("slow", "sleep", ["10"]))
            .unwrap();

        let err = runner(Duration::from_millis(100))
            .capture(&table)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CaptureError::Timeout { label, .. } if label == "slow"
        ));
    }

    #[tokio::test]
    async fn test_non_zero_exit_output_is_kept() {
        let mut table = CommandTable::new();
        table
            .insert(CommandSpec::new("failing", "sh", ["-c", "echo partial; exit 3"]))
            .unwrap();

        let result = runner(Duration::from_secs(5)).capture(&table).await.unwrap();

        assert_eq!(result.outputs["failing"], "partial\n");
    }

    #[tokio::test]
    async fn test_stderr_is_not_captured() {
        let mut table = CommandTable::new();
        table
            .insert(CommandSpec::new(
                "noisy",
                "sh",
                ["-c", "echo out; echo err 1>&2"],
            ))
            .unwrap();

        let result = runner(Duration::from_secs(5)).capture(&table).await.unwrap();

        assert_eq!(result.outputs["noisy"], "out\n");
    }
}
