//! Collector - executes one sampling round
//!
//! Captures the show table through the command-runner port, wraps the
//! output into a snapshot, derives the snapshot name from the captured
//! hostname and device clock, and persists it through the store port.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::domain::{CommandTable, Snapshot, SnapshotName};
use crate::error::Result;
use crate::port::{CommandRunner, RunIdProvider, SnapshotStore, TimeProvider};

/// Hostname used when the hostname command was skipped on this system
const FALLBACK_HOSTNAME: &str = "unknown-host";

pub struct Collector {
    runner: Arc<dyn CommandRunner>,
    store: Arc<dyn SnapshotStore>,
    time_provider: Arc<dyn TimeProvider>,
    run_ids: Arc<dyn RunIdProvider>,
    leader: String,
    show_table: CommandTable,
}

impl Collector {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        store: Arc<dyn SnapshotStore>,
        time_provider: Arc<dyn TimeProvider>,
        run_ids: Arc<dyn RunIdProvider>,
        leader: impl Into<String>,
        show_table: CommandTable,
    ) -> Self {
        Self {
            runner,
            store,
            time_provider,
            run_ids,
            leader: leader.into(),
            show_table,
        }
    }

    pub fn command_count(&self) -> usize {
        self.show_table.len()
    }

    /// Execute one sampling round and return the path of the written snapshot
    ///
    /// # Errors
    /// - `AppError::Capture` if a command times out or fails to start
    /// - `AppError::Store` if the snapshot cannot be persisted
    pub async fn collect_round(&self) -> Result<PathBuf> {
        let run_id = self.run_ids.next_run_id();
        let started = self.time_provider.now_millis();

        info!(
            run_id = %run_id,
            commands = self.show_table.len(),
            "Starting sampling round"
        );

        let capture = self.runner.capture(&self.show_table).await?;
        let snapshot = Snapshot::new(capture.outputs);

        let name = self.snapshot_name(&run_id, &snapshot);
        let path = self.store.save(&name, &snapshot).await?;

        info!(
            run_id = %run_id,
            path = %path.display(),
            captured = snapshot.len(),
            skipped = capture.skipped.len(),
            duration_ms = self.time_provider.now_millis() - started,
            "Snapshot written"
        );

        Ok(path)
    }

    /// Derive the snapshot name from the captured hostname and device clock,
    /// falling back to the system clock and a placeholder hostname when the
    /// respective commands were skipped. A round that captured counters is
    /// still worth keeping.
    fn snapshot_name(&self, run_id: &str, snapshot: &Snapshot) -> SnapshotName {
        let hostname = match snapshot.hostname() {
            Some(h) => h.to_string(),
            None => {
                warn!(
                    run_id = %run_id,
                    fallback = FALLBACK_HOSTNAME,
                    "Hostname not captured, using fallback for snapshot name"
                );
                FALLBACK_HOSTNAME.to_string()
            }
        };

        let sampled_at = match snapshot.sampled_epoch_secs().and_then(local_time_from_secs) {
            Some(at) => at,
            None => {
                warn!(
                    run_id = %run_id,
                    "Device clock not captured, using system clock for snapshot name"
                );
                local_time_from_millis(self.time_provider.now_millis())
                    .unwrap_or_else(Local::now)
            }
        };

        SnapshotName::new(self.leader.clone(), hostname, sampled_at)
    }
}

fn local_time_from_secs(epoch_secs: i64) -> Option<DateTime<Local>> {
    DateTime::from_timestamp(epoch_secs, 0).map(|utc| utc.with_timezone(&Local))
}

fn local_time_from_millis(epoch_millis: i64) -> Option<DateTime<Local>> {
    DateTime::from_timestamp_millis(epoch_millis).map(|utc| utc.with_timezone(&Local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommandSpec, DeviceProfile};
    use crate::port::command_runner::mocks::MockCommandRunner;
    use crate::port::snapshot_store::mocks::MockSnapshotStore;
    use std::collections::BTreeMap;

    struct FixedTimeProvider {
        now_millis: i64,
    }

    impl TimeProvider for FixedTimeProvider {
        fn now_millis(&self) -> i64 {
            self.now_millis
        }
    }

    struct FixedRunIdProvider;

    impl RunIdProvider for FixedRunIdProvider {
        fn next_run_id(&self) -> String {
            "round-1".to_string()
        }
    }

    fn small_table() -> CommandTable {
        let mut table = CommandTable::new();
        table
            .insert(CommandSpec::new(Snapshot::TIMESTAMP_KEY, "date", ["+%s"]))
            .unwrap();
        table
            .insert(CommandSpec::new(Snapshot::HOSTNAME_KEY, "cat", ["/etc/hostname"]))
            .unwrap();
        table
            .insert(CommandSpec::new("npu_drops0_0", "ofa_npu_stats_show", ["-v", "a"]))
            .unwrap();
        table
    }

    fn collector_with(
        runner: MockCommandRunner,
        store: Arc<MockSnapshotStore>,
        leader: &str,
    ) -> Collector {
        Collector::new(
            Arc::new(runner),
            store,
            Arc::new(FixedTimeProvider {
                now_millis: 1_700_000_123_000,
            }),
            Arc::new(FixedRunIdProvider),
            leader,
            small_table(),
        )
    }

    fn captured_outputs() -> BTreeMap<String, String> {
        let mut outputs = BTreeMap::new();
        outputs.insert(Snapshot::TIMESTAMP_KEY.to_string(), "1700000000\n".to_string());
        outputs.insert(Snapshot::HOSTNAME_KEY.to_string(), "lab-rtr\n".to_string());
        outputs.insert("npu_drops0_0".to_string(), "drops: 0".to_string());
        outputs
    }

    #[tokio::test]
    async fn test_round_persists_snapshot_named_from_capture() {
        let store = Arc::new(MockSnapshotStore::new());
        let collector = collector_with(
            MockCommandRunner::new_fixed(captured_outputs(), Vec::new()),
            store.clone(),
            "lab_",
        );

        collector.collect_round().await.unwrap();

        assert_eq!(store.save_count(), 1);
        let name = store.saved_names().remove(0);
        let expected_ts = local_time_from_secs(1_700_000_000)
            .unwrap()
            .format("%y%m%d-%H%M%S")
            .to_string();
        assert_eq!(name, format!("lab_lab-rtr_cmds_{expected_ts}.json.zst"));

        let snapshot = store.last_snapshot().unwrap();
        assert_eq!(snapshot.get("npu_drops0_0"), Some("drops: 0"));
    }

    #[tokio::test]
    async fn test_round_falls_back_when_hostname_and_clock_missing() {
        let mut outputs = BTreeMap::new();
        outputs.insert("npu_drops0_0".to_string(), "drops: 7".to_string());
        let skipped = vec![
            Snapshot::TIMESTAMP_KEY.to_string(),
            Snapshot::HOSTNAME_KEY.to_string(),
        ];

        let store = Arc::new(MockSnapshotStore::new());
        let collector = collector_with(
            MockCommandRunner::new_fixed(outputs, skipped),
            store.clone(),
            "",
        );

        collector.collect_round().await.unwrap();

        let name = store.saved_names().remove(0);
        let expected_ts = local_time_from_millis(1_700_000_123_000)
            .unwrap()
            .format("%y%m%d-%H%M%S")
            .to_string();
        assert_eq!(name, format!("unknown-host_cmds_{expected_ts}.json.zst"));
    }

    #[tokio::test]
    async fn test_capture_timeout_is_fatal() {
        let store = Arc::new(MockSnapshotStore::new());
        let collector = collector_with(
            MockCommandRunner::new_timeout("npu_drops0_0", 180_000),
            store.clone(),
            "",
        );

        let err = collector.collect_round().await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::Capture(crate::port::CaptureError::Timeout { .. })
        ));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = Arc::new(MockSnapshotStore::new_failing("disk full"));
        let collector = collector_with(
            MockCommandRunner::new_fixed(captured_outputs(), Vec::new()),
            store,
            "",
        );

        let err = collector.collect_round().await.unwrap_err();
        assert!(matches!(err, crate::error::AppError::Store(_)));
    }

    #[test]
    fn test_command_count_reflects_profile() {
        let profile = DeviceProfile::new(2, 2, "Bundle-Ether21").unwrap();
        let collector = Collector::new(
            Arc::new(MockCommandRunner::new_echo()),
            Arc::new(MockSnapshotStore::new()),
            Arc::new(FixedTimeProvider { now_millis: 0 }),
            Arc::new(FixedRunIdProvider),
            "",
            profile.show_table().unwrap(),
        );
        assert_eq!(collector.command_count(), 7 + 4);
    }
}
