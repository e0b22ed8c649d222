// Sampler - repeated-sampling driver loop

pub mod constants;
mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::application::collector::Collector;
use crate::domain::CommandTable;
use crate::error::Result;
use crate::port::CommandRunner;

/// Sampler drives the collector on a fixed interval.
///
/// Before the first round it runs the counter-reset table once, so that
/// snapshots taken later in the session show deltas accumulated since
/// startup. A capture timeout or store failure aborts the loop; commands
/// missing on this hardware variant never do.
pub struct Sampler {
    collector: Collector,
    runner: Arc<dyn CommandRunner>,
    clear_table: CommandTable,
    interval: Duration,
    num_runs: u32,
}

impl Sampler {
    /// Create a new sampler
    ///
    /// # Arguments
    /// * `collector` - executes one sampling round
    /// * `runner` - used for the one-shot counter-reset pass
    /// * `clear_table` - counter-reset commands (may be empty)
    /// * `interval` - sleep between rounds
    /// * `num_runs` - rounds to execute, 0 = run forever
    pub fn new(
        collector: Collector,
        runner: Arc<dyn CommandRunner>,
        clear_table: CommandTable,
        interval: Duration,
        num_runs: u32,
    ) -> Self {
        Self {
            collector,
            runner,
            clear_table,
            interval,
            num_runs,
        }
    }

    /// Run the sampling loop with graceful shutdown support.
    /// Returns the number of completed rounds.
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<u32> {
        info!(
            interval_secs = self.interval.as_secs(),
            num_runs = self.num_runs,
            commands = self.collector.command_count(),
            "Sampler started"
        );

        self.clear_counters().await?;

        let mut completed = 0u32;
        loop {
            // Check for shutdown signal
            if shutdown.is_shutdown() {
                info!("Sampler shutting down");
                break;
            }

            self.collector.collect_round().await?;
            completed += 1;

            // 0 configured runs means run forever
            if self.num_runs != 0 && completed >= self.num_runs {
                break;
            }

            tokio::select! {
                _ = sleep(self.interval) => {},
                _ = shutdown.wait() => {
                    info!("Sampler interrupted during sleep");
                    break;
                }
            }
        }

        info!(rounds = completed, "Sampler stopped");
        Ok(completed)
    }

    /// One-shot counter-reset pass. Output is discarded; only the side
    /// effect on the device counters matters.
    async fn clear_counters(&self) -> Result<()> {
        if self.clear_table.is_empty() {
            return Ok(());
        }

        info!(
            commands = self.clear_table.len(),
            "Clearing NPU counters before first round"
        );
        let cleared = self.runner.capture(&self.clear_table).await?;
        debug!(
            executed = cleared.outputs.len(),
            skipped = cleared.skipped.len(),
            duration_ms = cleared.duration_ms,
            "Counter clear pass finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommandSpec, Snapshot};
    use crate::port::command_runner::mocks::MockCommandRunner;
    use crate::port::snapshot_store::mocks::MockSnapshotStore;
    use crate::port::{RunIdProvider, TimeProvider};

    struct FixedTimeProvider;

    impl TimeProvider for FixedTimeProvider {
        fn now_millis(&self) -> i64 {
            1_700_000_000_000
        }
    }

    struct CountingRunIdProvider;

    impl RunIdProvider for CountingRunIdProvider {
        fn next_run_id(&self) -> String {
            "test-run".to_string()
        }
    }

    fn show_table() -> CommandTable {
        let mut table = CommandTable::new();
        table
            .insert(CommandSpec::new(Snapshot::HOSTNAME_KEY, "cat", ["/etc/hostname"]))
            .unwrap();
        table
            .insert(CommandSpec::new("npu_drops0_0", "ofa_npu_stats_show", ["-v", "a"]))
            .unwrap();
        table
    }

    fn clear_table() -> CommandTable {
        let mut table = CommandTable::new();
        table
            .insert(CommandSpec::new("clear_command_0_0", "npd_npu_driver_clear", ["-c", "s"]))
            .unwrap();
        table
    }

    fn sampler_with(
        runner: Arc<MockCommandRunner>,
        store: Arc<MockSnapshotStore>,
        clear: CommandTable,
        num_runs: u32,
    ) -> Sampler {
        let collector = Collector::new(
            runner.clone(),
            store,
            Arc::new(FixedTimeProvider),
            Arc::new(CountingRunIdProvider),
            "",
            show_table(),
        );
        Sampler::new(collector, runner, clear, Duration::from_millis(1), num_runs)
    }

    #[tokio::test]
    async fn test_finite_runs_produce_one_snapshot_each() {
        let runner = Arc::new(MockCommandRunner::new_echo());
        let store = Arc::new(MockSnapshotStore::new());
        let sampler = sampler_with(runner.clone(), store.clone(), CommandTable::new(), 3);

        let (_tx, rx) = shutdown_channel();
        let completed = sampler.run(rx).await.unwrap();

        assert_eq!(completed, 3);
        assert_eq!(store.save_count(), 3);
        // No clear table, so the runner only saw the three show captures
        assert_eq!(runner.call_count(), 3);
    }

    #[tokio::test]
    async fn test_clear_pass_runs_once_before_rounds() {
        let runner = Arc::new(MockCommandRunner::new_echo());
        let store = Arc::new(MockSnapshotStore::new());
        let sampler = sampler_with(runner.clone(), store.clone(), clear_table(), 2);

        let (_tx, rx) = shutdown_channel();
        sampler.run(rx).await.unwrap();

        // 1 clear capture + 2 show captures
        assert_eq!(runner.call_count(), 3);
        assert_eq!(store.save_count(), 2);
    }

    #[tokio::test]
    async fn test_infinite_mode_stops_on_shutdown() {
        let runner = Arc::new(MockCommandRunner::new_echo());
        let store = Arc::new(MockSnapshotStore::new());
        let sampler = sampler_with(runner, store.clone(), CommandTable::new(), 0);

        let (tx, rx) = shutdown_channel();
        let handle = tokio::spawn(async move { sampler.run(rx).await });

        // Let a few rounds happen, then stop
        sleep(Duration::from_millis(20)).await;
        tx.shutdown();

        let completed = handle.await.unwrap().unwrap();
        assert!(completed >= 1);
        assert_eq!(store.save_count() as u32, completed);
    }

    #[tokio::test]
    async fn test_capture_timeout_aborts_loop() {
        let runner = Arc::new(MockCommandRunner::new_timeout("npu_drops0_0", 500));
        let store = Arc::new(MockSnapshotStore::new());
        let sampler = sampler_with(runner, store.clone(), CommandTable::new(), 5);

        let (_tx, rx) = shutdown_channel();
        let err = sampler.run(rx).await.unwrap_err();

        assert!(matches!(err, crate::error::AppError::Capture(_)));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_clear_pass_timeout_is_fatal() {
        let runner = Arc::new(MockCommandRunner::new_timeout("clear_command_0_0", 500));
        let store = Arc::new(MockSnapshotStore::new());
        let sampler = sampler_with(runner, store.clone(), clear_table(), 1);

        let (_tx, rx) = shutdown_channel();
        assert!(sampler.run(rx).await.is_err());
        assert_eq!(store.save_count(), 0);
    }
}
